//! Self-service hotel registrations awaiting review

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    pub enum RegistrationStatus {
        Pending => "PENDING",
        UnderReview => "UNDER_REVIEW",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

impl RegistrationStatus {
    /// Still awaiting a decision
    pub fn is_open(&self) -> bool {
        matches!(self, RegistrationStatus::Pending | RegistrationStatus::UnderReview)
    }

    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        match self {
            Pending => matches!(next, UnderReview | Approved | Rejected),
            UnderReview => matches!(next, Approved | Rejected),
            Approved | Rejected => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelRegistration {
    pub id: Uuid,
    pub hotel_name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub country: String,
    pub contact_email: String,
    pub contact_person: String,
    pub phone: Option<String>,
    pub status: RegistrationStatus,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub tenant_id: Option<Uuid>,
    pub hotel_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStatistics {
    pub total: u64,
    pub pending: u64,
    pub under_review: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl RegistrationStatistics {
    pub fn add(&mut self, status: RegistrationStatus, count: u64) {
        self.total += count;
        match status {
            RegistrationStatus::Pending => self.pending += count,
            RegistrationStatus::UnderReview => self.under_review += count,
            RegistrationStatus::Approved => self.approved += count,
            RegistrationStatus::Rejected => self.rejected += count,
        }
    }
}
