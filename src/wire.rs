use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// Destination or activity record as served by the site's API.
// Only price_min feeds the pricing calculator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub slug: String,
    pub price_min: f64,
    pub price_max: f64,
}

impl Destination {
    pub fn base_price(&self) -> f64 {
        self.price_min
    }
}

// Body of GET /api/destinations/available-dates?destinationId=<id>
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AvailableDatesResponse {
    pub success: bool,
    #[serde(default)]
    pub dates: HashMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_destination() {
        let json = r#"{"id": "d1", "slug": "goa-beach", "priceMin": 12999, "priceMax": 24999.5}"#;
        let destination: Destination = serde_json::from_str(json).unwrap();
        assert_eq!(destination.slug, "goa-beach");
        assert_eq!(destination.base_price(), 12999.0);
    }

    #[test]
    fn test_parse_failed_response_without_dates() {
        let response: AvailableDatesResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!response.success);
        assert!(response.dates.is_empty());
    }
}
