// Error types shared by the booking engine
use chrono::NaiveDate;
use thiserror::Error;

use crate::packages::PackageType;

// Errors raised by the synchronous engine (catalog lookups, transitions, submission checks)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Unknown package: {0}")]
    UnknownPackage(String),

    #[error("Package {0} is not configured in the catalog")]
    MissingPackageConfig(PackageType),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Date {0} is not available")]
    DateUnavailable(NaiveDate),

    #[error("No date selected")]
    NoDateSelected,

    #[error("Invalid travelers for {package}: {travelers} not in [{min}, {max}]")]
    InvalidTravelers {
        package: PackageType,
        travelers: u32,
        min: u32,
        max: u32,
    },

    #[error("Children are not allowed for {0}")]
    ChildrenNotAllowed(PackageType),

    #[error("Insufficient capacity: {requested} travelers, {available} slots left")]
    InsufficientCapacity { requested: u32, available: i64 },
}

// Errors at the availability fetch boundary
#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Availability endpoint reported failure for {0}")]
    Unsuccessful(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

impl AvailabilityError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AvailabilityError::NetworkError(_) | AvailabilityError::Timeout(_) => true,
            AvailabilityError::ApiResponseError { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }
}

// Errors loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid package config for {package}: {message}")]
    InvalidPackage { package: PackageType, message: String },

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
