//! Maintenance work orders

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TaskPriority;
use crate::error::{Error, Result};

string_enum! {
    pub enum MaintenanceStatus {
        Open => "OPEN",
        Assigned => "ASSIGNED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Verified => "VERIFIED",
        Cancelled => "CANCELLED",
    }
}

impl MaintenanceStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, MaintenanceStatus::Completed | MaintenanceStatus::Verified)
    }

    pub fn is_closed(&self) -> bool {
        self.is_completed() || *self == MaintenanceStatus::Cancelled
    }
}

string_enum! {
    pub enum MaintenanceType {
        Plumbing => "PLUMBING",
        Electrical => "ELECTRICAL",
        Hvac => "HVAC",
        Carpentry => "CARPENTRY",
        Painting => "PAINTING",
        Appliance => "APPLIANCE",
        Safety => "SAFETY",
        General => "GENERAL",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceTask {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub hotel_id: Uuid,
    pub room_id: Option<Uuid>,
    pub task_type: MaintenanceType,
    pub title: String,
    pub description: Option<String>,
    pub status: MaintenanceStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub location: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub work_performed: Option<String>,
    pub verification_notes: Option<String>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceTask {
    pub fn new(
        tenant_id: Uuid,
        hotel_id: Uuid,
        task_type: MaintenanceType,
        title: String,
        priority: TaskPriority,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            hotel_id,
            room_id: None,
            task_type,
            title,
            description: None,
            status: MaintenanceStatus::Open,
            priority,
            assigned_to: None,
            created_by,
            location: None,
            estimated_cost: None,
            actual_cost: None,
            scheduled_start: None,
            actual_start: None,
            actual_end: None,
            work_performed: None,
            verification_notes: None,
            verified_by: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn assign(&mut self, staff_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        if !matches!(self.status, MaintenanceStatus::Open | MaintenanceStatus::Assigned) {
            return Err(Error::InvalidState(format!(
                "Cannot assign maintenance task in status {}",
                self.status
            )));
        }
        self.assigned_to = Some(staff_id);
        self.status = MaintenanceStatus::Assigned;
        self.updated_at = now;
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != MaintenanceStatus::Assigned || self.assigned_to.is_none() {
            return Err(Error::InvalidState(
                "Task must be assigned before work can start".to_string(),
            ));
        }
        self.status = MaintenanceStatus::InProgress;
        self.actual_start = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn complete(
        &mut self,
        work_performed: String,
        actual_cost: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != MaintenanceStatus::InProgress {
            return Err(Error::InvalidState(
                "Only tasks in progress can be completed".to_string(),
            ));
        }
        if actual_cost.is_some_and(|c| c.is_sign_negative()) {
            return Err(Error::Validation("Actual cost cannot be negative".to_string()));
        }
        self.status = MaintenanceStatus::Completed;
        self.work_performed = Some(work_performed);
        self.actual_cost = actual_cost;
        self.actual_end = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn verify(
        &mut self,
        verifier: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != MaintenanceStatus::Completed {
            return Err(Error::InvalidState(
                "Only completed tasks can be verified".to_string(),
            ));
        }
        self.status = MaintenanceStatus::Verified;
        self.verified_by = Some(verifier);
        self.verification_notes = notes;
        self.verified_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status.is_closed() {
            return Err(Error::InvalidState(format!(
                "Cannot cancel maintenance task in status {}",
                self.status
            )));
        }
        self.status = MaintenanceStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_start {
            Some(start) => now > start && !self.status.is_closed(),
            None => false,
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self.priority, TaskPriority::Urgent | TaskPriority::Critical)
    }

    /// Hours between start and end of the work, when both are known
    pub fn duration_hours(&self) -> Option<i64> {
        match (self.actual_start, self.actual_end) {
            (Some(start), Some(end)) => Some((end - start).num_hours()),
            _ => None,
        }
    }
}
