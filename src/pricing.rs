// Pricing calculator: turns a booking state and a destination's base price into a cost breakdown.
// Runs on every UI state change, so malformed input yields a clamped result instead of an error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::booking::BookingState;
use crate::error::BookingError;
use crate::packages::{PackageCatalog, PACKAGE_CONFIG};

// All amounts are whole currency units (rupees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingResult {
    pub price_per_person: f64,
    pub people_total: f64,
    pub room_cost: f64,
    pub discount: f64,
    pub total: f64,
}

impl PricingResult {
    pub fn subtotal(&self) -> f64 {
        self.people_total + self.room_cost
    }

    pub fn formatted_total(&self) -> String {
        format_inr(self.total)
    }
}

// Ceiling for every computed amount; whole rupees stay exact in f64 below it
pub const MAX_AMOUNT: f64 = 1e15;

// Non-finite and negative amounts collapse to zero
fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

// Overflowing amounts saturate at MAX_AMOUNT
fn saturate(amount: f64) -> f64 {
    if amount.is_nan() {
        0.0
    } else {
        amount.clamp(0.0, MAX_AMOUNT)
    }
}

impl PackageCatalog {
    pub fn calculate_pricing(
        &self,
        booking: &BookingState,
        base_price: f64,
    ) -> Result<PricingResult, BookingError> {
        let config = self.get(booking.package_type)?;
        let policy = self.pricing();

        if !(base_price.is_finite() && base_price > 0.0) {
            warn!(base_price, "Invalid base price, pricing travelers at zero");
        }
        let price_per_person = saturate(sanitize_amount(base_price).round());

        let adults = f64::from(booking.adults);
        let children = f64::from(booking.children);
        let child_price = saturate(price_per_person * sanitize_amount(policy.child_rate));
        let people_total = saturate((adults * price_per_person + children * child_price).round());

        let room_rate = saturate(sanitize_amount(policy.room_rate).round());
        let room_cost = saturate(f64::from(booking.rooms) * room_rate);

        let subtotal = people_total + room_cost;
        let discount = (subtotal * sanitize_amount(config.discount).min(1.0)).round();
        let total = (subtotal - discount).max(0.0);

        Ok(PricingResult {
            price_per_person,
            people_total,
            room_cost,
            discount,
            total,
        })
    }
}

// Price a booking against the default catalog
pub fn calculate_pricing(
    booking: &BookingState,
    base_price: f64,
) -> Result<PricingResult, BookingError> {
    PACKAGE_CONFIG.calculate_pricing(booking, base_price)
}

// Render an amount the way the site shows prices: ₹ with Indian digit grouping (12,34,567)
pub fn format_inr(amount: f64) -> String {
    let rounded = sanitize_amount(amount).round() as u64;
    let digits = rounded.to_string();

    if digits.len() <= 3 {
        return format!("₹{}", digits);
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("₹{},{}", groups.join(","), last_three)
}
