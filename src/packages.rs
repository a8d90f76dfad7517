// Package catalog: the immutable per-package configuration and pricing policy
// consulted by every engine function.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BookingError, ConfigError};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    Solo,
    Couple,
    Family,
    Group,
}

impl PackageType {
    pub const ALL: [PackageType; 4] = [
        PackageType::Solo,
        PackageType::Couple,
        PackageType::Family,
        PackageType::Group,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Solo => "solo",
            PackageType::Couple => "couple",
            PackageType::Family => "family",
            PackageType::Group => "group",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solo" => Ok(PackageType::Solo),
            "couple" => Ok(PackageType::Couple),
            "family" => Ok(PackageType::Family),
            "group" => Ok(PackageType::Group),
            _ => Err(BookingError::UnknownPackage(s.to_string())),
        }
    }
}

// Per-package rules. Traveler bounds apply to adults + children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub min_adults: u32,
    pub max_adults: u32,
    pub allow_children: bool,
    pub discount: f64,
    pub persons_per_room: u32,
    pub max_rooms: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

impl PackageConfig {
    // Clamp a traveler total into this package's bounds
    pub fn clamp_travelers(&self, travelers: u32) -> u32 {
        travelers.clamp(self.min_adults, self.max_adults)
    }

    pub fn accepts_travelers(&self, travelers: u32) -> bool {
        (self.min_adults..=self.max_adults).contains(&travelers)
    }

    fn validate(&self, package: PackageType) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidPackage { package, message };

        if self.min_adults == 0 {
            return Err(invalid("min_adults must be at least 1".to_string()));
        }
        if self.min_adults > self.max_adults {
            return Err(invalid(format!(
                "min_adults {} exceeds max_adults {}",
                self.min_adults, self.max_adults
            )));
        }
        if !self.discount.is_finite() || !(0.0..1.0).contains(&self.discount) {
            return Err(invalid(format!("discount {} not in [0, 1)", self.discount)));
        }
        if self.persons_per_room == 0 {
            return Err(invalid("persons_per_room must be at least 1".to_string()));
        }
        let rooms_needed = self.max_adults.div_ceil(self.persons_per_room);
        if self.max_rooms < rooms_needed {
            return Err(invalid(format!(
                "max_rooms {} cannot house {} travelers",
                self.max_rooms, self.max_adults
            )));
        }
        Ok(())
    }
}

// Explicit pricing constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    // Currency units charged per booked room
    pub room_rate: f64,
    // Fraction of the per-person price charged for a child
    pub child_rate: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            room_rate: 1500.0,
            child_rate: 0.5,
        }
    }
}

impl PricingPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.room_rate.is_finite() || self.room_rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "room_rate".to_string(),
                message: format!("{} is not a non-negative amount", self.room_rate),
            });
        }
        if !self.child_rate.is_finite() || !(0.0..=1.0).contains(&self.child_rate) {
            return Err(ConfigError::InvalidValue {
                key: "child_rate".to_string(),
                message: format!("{} not in [0, 1]", self.child_rate),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageCatalog {
    packages: HashMap<PackageType, PackageConfig>,
    #[serde(default)]
    pricing: PricingPolicy,
}

// Process-wide default catalog, built once on first use and never mutated
pub static PACKAGE_CONFIG: LazyLock<PackageCatalog> = LazyLock::new(PackageCatalog::standard);

impl PackageCatalog {
    pub fn standard() -> Self {
        let packages = HashMap::from([
            (
                PackageType::Solo,
                PackageConfig {
                    min_adults: 1,
                    max_adults: 1,
                    allow_children: false,
                    discount: 0.0,
                    persons_per_room: 1,
                    max_rooms: 1,
                    label: "Solo Traveler".to_string(),
                    description: "Perfect for independent explorers".to_string(),
                },
            ),
            (
                PackageType::Couple,
                PackageConfig {
                    min_adults: 2,
                    max_adults: 2,
                    allow_children: false,
                    discount: 0.05,
                    persons_per_room: 2,
                    max_rooms: 2,
                    label: "Couple".to_string(),
                    description: "Romantic getaway for two".to_string(),
                },
            ),
            (
                PackageType::Family,
                PackageConfig {
                    min_adults: 2,
                    max_adults: 6,
                    allow_children: true,
                    discount: 0.10,
                    persons_per_room: 3,
                    max_rooms: 3,
                    label: "Family".to_string(),
                    description: "Fun for the whole family, kids at 50% price".to_string(),
                },
            ),
            (
                PackageType::Group,
                PackageConfig {
                    min_adults: 4,
                    max_adults: 12,
                    allow_children: true,
                    discount: 0.15,
                    persons_per_room: 3,
                    max_rooms: 6,
                    label: "Group".to_string(),
                    description: "Travel together and save more".to_string(),
                },
            ),
        ]);

        Self {
            packages,
            pricing: PricingPolicy::default(),
        }
    }

    // Build a catalog from explicit entries, rejecting inconsistent ones
    pub fn new(
        packages: HashMap<PackageType, PackageConfig>,
        pricing: PricingPolicy,
    ) -> Result<Self, ConfigError> {
        let catalog = Self { packages, pricing };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let catalog: PackageCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        debug!(packages = catalog.packages.len(), "Loaded package catalog");
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (package, config) in &self.packages {
            config.validate(*package)?;
        }
        self.pricing.validate()
    }

    pub fn get(&self, package: PackageType) -> Result<&PackageConfig, BookingError> {
        self.packages
            .get(&package)
            .ok_or(BookingError::MissingPackageConfig(package))
    }

    // Look up a package by its wire label
    pub fn get_by_label(&self, label: &str) -> Result<(PackageType, &PackageConfig), BookingError> {
        let package: PackageType = label.parse()?;
        Ok((package, self.get(package)?))
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    // Configured packages in display order
    pub fn packages(&self) -> impl Iterator<Item = (PackageType, &PackageConfig)> {
        PackageType::ALL
            .into_iter()
            .filter_map(|package| self.packages.get(&package).map(|config| (package, config)))
    }
}

impl Default for PackageCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
