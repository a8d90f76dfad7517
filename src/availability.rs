// Availability map and the calendar state machine that drives date selection
use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BookingError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(value: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| BookingError::InvalidDate(value.to_string()))
}

// Remaining slots per date. Dates absent from the map have no slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityMap {
    dates: BTreeMap<NaiveDate, i64>,
}

impl AvailabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    // Build from the wire shape (date string -> slots), skipping keys that are not dates
    pub fn from_wire(dates: HashMap<String, i64>) -> Self {
        let mut map = Self::new();
        for (key, slots) in dates {
            match parse_date(&key) {
                Ok(date) => map.insert(date, slots),
                Err(_) => warn!(key = %key, "Skipping malformed availability date"),
            }
        }
        map
    }

    pub fn insert(&mut self, date: NaiveDate, slots: i64) {
        self.dates.insert(date, slots);
    }

    pub fn slots(&self, date: NaiveDate) -> i64 {
        self.dates.get(&date).copied().unwrap_or(0)
    }

    pub fn has_slots(&self, date: NaiveDate) -> bool {
        self.slots(date) > 0
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, i64)> + '_ {
        self.dates.iter().map(|(date, slots)| (*date, *slots))
    }
}

impl FromIterator<(NaiveDate, i64)> for AvailabilityMap {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, i64)>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalendarSelection {
    NoDateSelected,
    DateSelected { date: NaiveDate, slots: i64 },
}

// Month-view calendar over an availability map. `today` is fixed at construction
// so the past/future split is stable for the lifetime of the view.
#[derive(Debug, Clone)]
pub struct AvailabilityCalendar {
    today: NaiveDate,
    year: i32,
    month: u32,
    availability: AvailabilityMap,
    selection: CalendarSelection,
}

impl AvailabilityCalendar {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            year: today.year(),
            month: today.month(),
            availability: AvailabilityMap::new(),
            selection: CalendarSelection::NoDateSelected,
        }
    }

    pub fn starting_today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn view_month(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    pub fn availability(&self) -> &AvailabilityMap {
        &self.availability
    }

    // Replace the map; a selection the new map no longer supports is dropped
    pub fn set_availability(&mut self, availability: AvailabilityMap) {
        self.availability = availability;
        if let CalendarSelection::DateSelected { date, .. } = self.selection {
            self.selection = if self.is_available_on(date) {
                CalendarSelection::DateSelected {
                    date,
                    slots: self.availability.slots(date),
                }
            } else {
                CalendarSelection::NoDateSelected
            };
        }
    }

    pub fn selection(&self) -> CalendarSelection {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = CalendarSelection::NoDateSelected;
    }

    pub fn date_for_day(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn days_in_month(&self) -> u32 {
        let (next_year, next_month) = next_month(self.year, self.month);
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first| first.pred_opt())
            .map_or(31, |last| last.day())
    }

    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        date >= self.today && self.availability.has_slots(date)
    }

    // Day of the viewed month: on or after today and with slots left
    pub fn is_date_available(&self, day: u32) -> bool {
        self.date_for_day(day)
            .is_some_and(|date| self.is_available_on(date))
    }

    pub fn available_days(&self) -> Vec<u32> {
        (1..=self.days_in_month())
            .filter(|day| self.is_date_available(*day))
            .collect()
    }

    // Guarded transition; returns the selection only if the day is available
    pub fn select_day(&mut self, day: u32) -> Option<CalendarSelection> {
        let date = self.date_for_day(day)?;
        if !self.is_available_on(date) {
            debug!(%date, "Rejected selection of unavailable date");
            return None;
        }

        self.selection = CalendarSelection::DateSelected {
            date,
            slots: self.availability.slots(date),
        };
        Some(self.selection)
    }

    // Unguarded selection by date string; unknown dates resolve to zero slots
    pub fn select_date_str(&mut self, value: &str) -> Result<CalendarSelection, BookingError> {
        let date = parse_date(value)?;
        self.selection = CalendarSelection::DateSelected {
            date,
            slots: self.availability.slots(date),
        };
        Ok(self.selection)
    }

    // Never moves before the current real-world month
    pub fn go_prev_month(&mut self) -> bool {
        if (self.year, self.month) <= (self.today.year(), self.today.month()) {
            debug!("Ignoring navigation before the current month");
            return false;
        }
        let (year, month) = prev_month(self.year, self.month);
        self.year = year;
        self.month = month;
        true
    }

    pub fn go_next_month(&mut self) {
        let (year, month) = next_month(self.year, self.month);
        self.year = year;
        self.month = month;
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn calendar() -> AvailabilityCalendar {
        let mut calendar = AvailabilityCalendar::new(date("2025-12-10"));
        calendar.set_availability(AvailabilityMap::from_iter([
            (date("2025-12-05"), 20),
            (date("2025-12-10"), 4),
            (date("2025-12-24"), 2),
            (date("2025-12-25"), 0),
            (date("2025-12-26"), -3),
            (date("2026-01-02"), 9),
        ]));
        calendar
    }

    #[test_case(5, false; "past date with slots")]
    #[test_case(9, false; "yesterday without entry")]
    #[test_case(10, true; "today")]
    #[test_case(24, true; "future with slots")]
    #[test_case(25, false; "zero slots")]
    #[test_case(26, false; "negative slots")]
    #[test_case(27, false; "missing key")]
    #[test_case(32, false; "not a day of the month")]
    fn test_is_date_available(day: u32, expected: bool) {
        assert_eq!(calendar().is_date_available(day), expected);
    }

    #[test]
    fn test_available_days() {
        assert_eq!(calendar().available_days(), vec![10, 24]);
    }

    #[test]
    fn test_select_day_guarded() {
        let mut calendar = calendar();
        assert_eq!(calendar.select_day(25), None);
        assert_eq!(calendar.selection(), CalendarSelection::NoDateSelected);

        let selection = calendar.select_day(24);
        assert_eq!(
            selection,
            Some(CalendarSelection::DateSelected {
                date: date("2025-12-24"),
                slots: 2
            })
        );
    }

    #[test]
    fn test_forced_selection_of_zero_slot_day() {
        let mut calendar = calendar();
        let selection = calendar.select_date_str("2025-12-25").unwrap();
        assert_eq!(
            selection,
            CalendarSelection::DateSelected {
                date: date("2025-12-25"),
                slots: 0
            }
        );

        assert_eq!(
            calendar.select_date_str("25/12/2025"),
            Err(BookingError::InvalidDate("25/12/2025".to_string()))
        );
    }

    #[test]
    fn test_month_navigation_never_reaches_the_past() {
        let mut calendar = calendar();
        assert!(!calendar.go_prev_month());
        assert_eq!(calendar.view_month(), (2025, 12));

        calendar.go_next_month();
        assert_eq!(calendar.view_month(), (2026, 1));
        assert_eq!(calendar.available_days(), vec![2]);

        // Months without data render as fully unavailable
        calendar.go_next_month();
        assert_eq!(calendar.view_month(), (2026, 2));
        assert_eq!(calendar.days_in_month(), 28);
        assert!(calendar.available_days().is_empty());

        assert!(calendar.go_prev_month());
        assert!(calendar.go_prev_month());
        assert!(!calendar.go_prev_month());
        assert_eq!(calendar.view_month(), (2025, 12));
    }

    #[test]
    fn test_refresh_drops_unsupported_selection() {
        let mut calendar = calendar();
        calendar.select_day(24);

        calendar.set_availability(AvailabilityMap::new());
        assert_eq!(calendar.selection(), CalendarSelection::NoDateSelected);
        assert!(calendar.available_days().is_empty());
    }

    #[test]
    fn test_from_wire_skips_malformed_keys() {
        let wire = HashMap::from([
            ("2025-12-24".to_string(), 3),
            ("tomorrow".to_string(), 10),
            ("2025-02-30".to_string(), 1),
        ]);
        let map = AvailabilityMap::from_wire(wire);
        assert_eq!(map.len(), 1);
        assert_eq!(map.slots(date("2025-12-24")), 3);
        assert_eq!(map.slots(date("2025-12-25")), 0);
    }
}
