// Booking pricing and capacity engine for the travel site's booking pages

pub mod availability;
pub mod availability_cache;
pub mod availability_client;
pub mod booking;
pub mod config;
pub mod error;
pub mod loader;
pub mod packages;
pub mod pricing;
pub mod room_limits;
pub mod session;
pub mod wire;

// Re-export key types for convenience
pub use availability::{AvailabilityCalendar, AvailabilityMap, CalendarSelection};
pub use availability_cache::{AvailabilityCache, CacheConfig, CacheStatsReport, EvictionPolicy};
pub use availability_client::{
    AvailabilitySource, ClientConfig, HttpAvailabilitySource, RetryConfig,
    StaticAvailabilitySource, StaticSourceConfig,
};
pub use booking::{
    on_adults_change, on_children_change, on_date_select, on_package_change, on_rooms_change,
    BookingQuote, BookingState, BookingView,
};
pub use config::EngineConfig;
pub use error::{AvailabilityError, BookingError, ConfigError};
pub use loader::{AvailabilityLoader, LoadStatus};
pub use packages::{PackageCatalog, PackageConfig, PackageType, PricingPolicy, PACKAGE_CONFIG};
pub use pricing::{calculate_pricing, format_inr, PricingResult};
pub use room_limits::{get_room_limits, RoomLimits};
pub use session::BookingSession;
pub use wire::{AvailableDatesResponse, Destination};
