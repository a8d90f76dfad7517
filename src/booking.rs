// Booking state and its transitions. Every transition takes the current state by
// reference and returns the next one; the caller owns the state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::availability::AvailabilityMap;
use crate::error::BookingError;
use crate::packages::{PackageCatalog, PackageType, PACKAGE_CONFIG};
use crate::pricing::PricingResult;
use crate::room_limits::RoomLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingState {
    pub package_type: PackageType,
    pub adults: u32,
    pub children: u32,
    pub rooms: u32,
    pub selected_date: Option<NaiveDate>,
    // Slots left on selected_date, refreshed on date selection
    pub available_slots: i64,
}

impl Default for BookingState {
    fn default() -> Self {
        Self {
            package_type: PackageType::default(),
            adults: 1,
            children: 0,
            rooms: 1,
            selected_date: None,
            available_slots: 0,
        }
    }
}

impl BookingState {
    pub fn travelers(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

// Everything the presentation layer renders after a state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingView {
    pub state: BookingState,
    pub limits: RoomLimits,
    pub pricing: PricingResult,
}

// Snapshot handed to the submission flow once the state passes check_bookable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingQuote {
    pub destination_id: String,
    pub package_type: PackageType,
    pub adults: u32,
    pub children: u32,
    pub rooms: u32,
    pub date: NaiveDate,
    pub pricing: PricingResult,
}

impl PackageCatalog {
    // Reset to the new package's defaults. Rooms go back to a literal 1 and are
    // corrected by the next apply_room_limits pass.
    pub fn on_package_change(&self, package: PackageType) -> Result<BookingState, BookingError> {
        let config = self.get(package)?;
        debug!(%package, "Package changed, resetting booking");

        Ok(BookingState {
            package_type: package,
            adults: config.min_adults,
            children: 0,
            rooms: 1,
            selected_date: None,
            available_slots: 0,
        })
    }

    // Room-limits effect: clamp rooms into the limits for the current travelers
    pub fn apply_room_limits(&self, state: &BookingState) -> Result<BookingState, BookingError> {
        let limits = self.room_limits(state.adults, state.children, state.package_type)?;
        let rooms = limits.clamp(state.rooms);
        if rooms != state.rooms {
            debug!(from = state.rooms, to = rooms, "Clamped rooms into limits");
        }

        Ok(BookingState {
            rooms,
            ..state.clone()
        })
    }

    pub fn on_adults_change(
        &self,
        state: &BookingState,
        adults: u32,
    ) -> Result<BookingState, BookingError> {
        let config = self.get(state.package_type)?;

        // Adults fill whatever the children leave of the package bounds
        let min = config.min_adults.saturating_sub(state.children).max(1);
        let max = config.max_adults.saturating_sub(state.children).max(min);
        let clamped = adults.clamp(min, max);
        if clamped != adults {
            debug!(requested = adults, clamped, "Adults clamped to package bounds");
        }

        self.apply_room_limits(&BookingState {
            adults: clamped,
            ..state.clone()
        })
    }

    pub fn on_children_change(
        &self,
        state: &BookingState,
        children: u32,
    ) -> Result<BookingState, BookingError> {
        let config = self.get(state.package_type)?;

        let clamped = if config.allow_children {
            let max = config.max_adults.saturating_sub(state.adults);
            children.min(max)
        } else {
            0
        };
        if clamped != children {
            debug!(requested = children, clamped, "Children clamped to package bounds");
        }

        let next = BookingState {
            children: clamped,
            ..state.clone()
        };
        // Removing children may drop the party below the package minimum
        let next = if next.travelers() < config.min_adults {
            BookingState {
                adults: config.min_adults - next.children,
                ..next
            }
        } else {
            next
        };

        self.apply_room_limits(&next)
    }

    pub fn on_rooms_change(
        &self,
        state: &BookingState,
        rooms: u32,
    ) -> Result<BookingState, BookingError> {
        self.apply_room_limits(&BookingState {
            rooms,
            ..state.clone()
        })
    }

    // Check the traveler invariant, logging instead of failing
    pub fn is_well_formed(&self, state: &BookingState) -> Result<bool, BookingError> {
        let config = self.get(state.package_type)?;
        let well_formed = config.accepts_travelers(state.travelers())
            && (config.allow_children || state.children == 0);
        if !well_formed {
            warn!(
                package = %state.package_type,
                adults = state.adults,
                children = state.children,
                "Booking state violates package traveler bounds"
            );
        }
        Ok(well_formed)
    }

    // Final gate before a booking is handed to the submission flow
    pub fn check_bookable(&self, state: &BookingState) -> Result<(), BookingError> {
        let config = self.get(state.package_type)?;

        if state.children > 0 && !config.allow_children {
            return Err(BookingError::ChildrenNotAllowed(state.package_type));
        }

        let travelers = state.travelers();
        if !config.accepts_travelers(travelers) {
            return Err(BookingError::InvalidTravelers {
                package: state.package_type,
                travelers,
                min: config.min_adults,
                max: config.max_adults,
            });
        }

        if state.selected_date.is_none() {
            return Err(BookingError::NoDateSelected);
        }

        if state.available_slots < i64::from(travelers) {
            return Err(BookingError::InsufficientCapacity {
                requested: travelers,
                available: state.available_slots,
            });
        }

        Ok(())
    }

    pub fn quote(
        &self,
        destination_id: &str,
        state: &BookingState,
        base_price: f64,
    ) -> Result<BookingQuote, BookingError> {
        self.check_bookable(state)?;
        let date = state.selected_date.ok_or(BookingError::NoDateSelected)?;
        let pricing = self.calculate_pricing(state, base_price)?;

        Ok(BookingQuote {
            destination_id: destination_id.to_string(),
            package_type: state.package_type,
            adults: state.adults,
            children: state.children,
            rooms: state.rooms,
            date,
            pricing,
        })
    }
}

// Select a date without checking the calendar guard; a missing date has zero slots
pub fn on_date_select(
    state: &BookingState,
    date: NaiveDate,
    availability: &AvailabilityMap,
) -> BookingState {
    let available_slots = availability.slots(date);
    debug!(%date, available_slots, "Date selected");

    BookingState {
        selected_date: Some(date),
        available_slots,
        ..state.clone()
    }
}

// Transitions against the default catalog
pub fn on_package_change(package: PackageType) -> Result<BookingState, BookingError> {
    PACKAGE_CONFIG.on_package_change(package)
}

pub fn on_adults_change(state: &BookingState, adults: u32) -> Result<BookingState, BookingError> {
    PACKAGE_CONFIG.on_adults_change(state, adults)
}

pub fn on_children_change(
    state: &BookingState,
    children: u32,
) -> Result<BookingState, BookingError> {
    PACKAGE_CONFIG.on_children_change(state, children)
}

pub fn on_rooms_change(state: &BookingState, rooms: u32) -> Result<BookingState, BookingError> {
    PACKAGE_CONFIG.on_rooms_change(state, rooms)
}
