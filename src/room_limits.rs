// Room limits: the valid inclusive range of room counts for a traveler composition
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BookingError;
use crate::packages::{PackageCatalog, PackageType, PACKAGE_CONFIG};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLimits {
    pub min: u32,
    pub max: u32,
}

impl RoomLimits {
    pub fn clamp(&self, rooms: u32) -> u32 {
        rooms.clamp(self.min, self.max)
    }

    pub fn contains(&self, rooms: u32) -> bool {
        (self.min..=self.max).contains(&rooms)
    }
}

impl PackageCatalog {
    pub fn room_limits(
        &self,
        adults: u32,
        children: u32,
        package: PackageType,
    ) -> Result<RoomLimits, BookingError> {
        let config = self.get(package)?;

        let requested = adults.saturating_add(children);
        let travelers = config.clamp_travelers(requested);
        if travelers != requested {
            warn!(
                %package,
                adults,
                children,
                "Traveler count outside package bounds, clamping to {}",
                travelers
            );
        }

        let min = travelers.div_ceil(config.persons_per_room).max(1);
        let max = travelers.min(config.max_rooms).max(min);

        Ok(RoomLimits { min, max })
    }
}

// Resolve room limits against the default catalog
pub fn get_room_limits(
    adults: u32,
    children: u32,
    package: PackageType,
) -> Result<RoomLimits, BookingError> {
    PACKAGE_CONFIG.room_limits(adults, children, package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, 0, PackageType::Solo, 1, 1; "solo traveler")]
    #[test_case(2, 0, PackageType::Couple, 1, 2; "couple")]
    #[test_case(2, 1, PackageType::Family, 1, 3; "family of three")]
    #[test_case(4, 2, PackageType::Family, 2, 3; "family of six")]
    #[test_case(4, 0, PackageType::Group, 2, 4; "smallest group")]
    #[test_case(10, 2, PackageType::Group, 4, 6; "largest group")]
    fn test_room_limits(
        adults: u32,
        children: u32,
        package: PackageType,
        expected_min: u32,
        expected_max: u32,
    ) {
        let limits = get_room_limits(adults, children, package).unwrap();
        assert_eq!(limits, RoomLimits { min: expected_min, max: expected_max });
    }

    #[test]
    fn test_limits_sound_for_every_valid_composition() {
        let catalog = PackageCatalog::standard();
        for (package, config) in catalog.packages() {
            for travelers in config.min_adults..=config.max_adults {
                for children in 0..=travelers {
                    let adults = travelers - children;
                    let limits = catalog.room_limits(adults, children, package).unwrap();
                    assert!(limits.min >= 1);
                    assert!(limits.min <= limits.max, "{package}: {limits:?}");

                    for rooms in 0..=20 {
                        assert!(limits.contains(limits.clamp(rooms)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_malformed_travelers_are_clamped() {
        // No travelers at all behaves like the package minimum
        let limits = get_room_limits(0, 0, PackageType::Group).unwrap();
        assert_eq!(limits, get_room_limits(4, 0, PackageType::Group).unwrap());

        // Overfull solo booking still yields a usable range
        let limits = get_room_limits(3, 2, PackageType::Solo).unwrap();
        assert_eq!(limits, RoomLimits { min: 1, max: 1 });

        let limits = get_room_limits(u32::MAX, u32::MAX, PackageType::Family).unwrap();
        assert!(limits.min <= limits.max);
    }

    #[test]
    fn test_unconfigured_package_fails() {
        let catalog = PackageCatalog::new(Default::default(), Default::default()).unwrap();
        assert_eq!(
            catalog.room_limits(1, 0, PackageType::Solo),
            Err(BookingError::MissingPackageConfig(PackageType::Solo))
        );
    }
}
