//! Hotel model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hotel property, owned by exactly one tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hotel {
    pub fn new(
        tenant_id: Uuid,
        name: String,
        address: String,
        city: String,
        country: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name,
            description: None,
            address,
            city,
            country,
            phone: None,
            email: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Three-letter prefix used in shop order numbers
    pub fn order_prefix(&self) -> String {
        let letters: String = self
            .name
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .take(3)
            .collect::<String>()
            .to_uppercase();
        if letters.is_empty() {
            "HTL".to_string()
        } else {
            letters
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelStatistics {
    pub total_hotels: u64,
    pub active_hotels: u64,
    pub inactive_hotels: u64,
    pub total_rooms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_prefix() {
        let mut hotel = Hotel::new(
            Uuid::new_v4(),
            "Blue Nile Lodge".into(),
            "Main St".into(),
            "Bahir Dar".into(),
            "Ethiopia".into(),
        );
        assert_eq!(hotel.order_prefix(), "BLU");

        hotel.name = "42".into();
        assert_eq!(hotel.order_prefix(), "HTL");
    }
}
