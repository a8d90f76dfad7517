// Booking session: one page visit's booking state, calendar and pricing, driven by UI events.
// Each event runs a single transition and returns the view to render.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::availability::{AvailabilityCalendar, AvailabilityMap, CalendarSelection};
use crate::booking::{on_date_select, BookingQuote, BookingState, BookingView};
use crate::error::BookingError;
use crate::loader::AvailabilityLoader;
use crate::packages::{PackageCatalog, PackageType};
use crate::wire::Destination;

pub struct BookingSession {
    catalog: Arc<PackageCatalog>,
    destination: Destination,
    state: BookingState,
    calendar: AvailabilityCalendar,
}

impl BookingSession {
    pub fn new(
        catalog: Arc<PackageCatalog>,
        destination: Destination,
        today: NaiveDate,
    ) -> Result<Self, BookingError> {
        let state = catalog.apply_room_limits(&BookingState::default())?;
        Ok(Self {
            catalog,
            destination,
            state,
            calendar: AvailabilityCalendar::new(today),
        })
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn calendar(&self) -> &AvailabilityCalendar {
        &self.calendar
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn view(&self) -> Result<BookingView, BookingError> {
        let limits = self.catalog.room_limits(
            self.state.adults,
            self.state.children,
            self.state.package_type,
        )?;
        let pricing = self
            .catalog
            .calculate_pricing(&self.state, self.destination.base_price())?;

        Ok(BookingView {
            state: self.state.clone(),
            limits,
            pricing,
        })
    }

    pub fn change_package(&mut self, package: PackageType) -> Result<BookingView, BookingError> {
        let reset = self.catalog.on_package_change(package)?;
        // Room-limits pass that follows the reset
        self.state = self.catalog.apply_room_limits(&reset)?;
        self.calendar.clear_selection();
        self.view()
    }

    pub fn change_adults(&mut self, adults: u32) -> Result<BookingView, BookingError> {
        self.state = self.catalog.on_adults_change(&self.state, adults)?;
        self.view()
    }

    pub fn change_children(&mut self, children: u32) -> Result<BookingView, BookingError> {
        self.state = self.catalog.on_children_change(&self.state, children)?;
        self.view()
    }

    pub fn change_rooms(&mut self, rooms: u32) -> Result<BookingView, BookingError> {
        self.state = self.catalog.on_rooms_change(&self.state, rooms)?;
        self.view()
    }

    // Select a day of the viewed month; unavailable days leave the state untouched
    pub fn select_day(&mut self, day: u32) -> Result<BookingView, BookingError> {
        let (year, month) = self.calendar.view_month();
        let date = self
            .calendar
            .date_for_day(day)
            .ok_or_else(|| BookingError::InvalidDate(format!("{}-{:02}-{:02}", year, month, day)))?;

        match self.calendar.select_day(day) {
            Some(CalendarSelection::DateSelected { date, .. }) => {
                self.state = on_date_select(&self.state, date, self.calendar.availability());
                self.view()
            }
            _ => Err(BookingError::DateUnavailable(date)),
        }
    }

    // Unguarded selection by date string, as the page's onDateSelect handler does
    pub fn select_date_str(&mut self, value: &str) -> Result<BookingView, BookingError> {
        if let CalendarSelection::DateSelected { date, .. } = self.calendar.select_date_str(value)? {
            self.state = on_date_select(&self.state, date, self.calendar.availability());
        }
        self.view()
    }

    pub fn go_prev_month(&mut self) -> bool {
        self.calendar.go_prev_month()
    }

    pub fn go_next_month(&mut self) {
        self.calendar.go_next_month()
    }

    // Install a new availability map, dropping a selected date it no longer supports
    pub fn apply_availability(&mut self, availability: AvailabilityMap) {
        self.calendar.set_availability(availability);

        self.state = match self.calendar.selection() {
            CalendarSelection::DateSelected { date, slots } => BookingState {
                selected_date: Some(date),
                available_slots: slots,
                ..self.state.clone()
            },
            CalendarSelection::NoDateSelected => {
                if self.state.selected_date.is_some() {
                    debug!("Selected date no longer available, clearing it");
                }
                BookingState {
                    selected_date: None,
                    available_slots: 0,
                    ..self.state.clone()
                }
            }
        };
    }

    pub async fn refresh_availability(
        &mut self,
        loader: &AvailabilityLoader,
    ) -> Result<BookingView, BookingError> {
        let availability = loader.refresh_availability().await;
        self.apply_availability(availability.as_ref().clone());
        self.view()
    }

    pub fn quote(&self) -> Result<BookingQuote, BookingError> {
        self.catalog
            .quote(&self.destination.id, &self.state, self.destination.base_price())
    }
}
