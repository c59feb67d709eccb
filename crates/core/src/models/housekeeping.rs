//! Housekeeping tasks
//!
//! Tasks follow a fixed transition table. Timestamps are stamped as a
//! task moves through the table, which feeds the overdue and efficiency
//! calculations used by the supervisor dashboards.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

string_enum! {
    /// Priority shared by housekeeping and maintenance work
    pub enum TaskPriority {
        Low => "LOW",
        Normal => "NORMAL",
        High => "HIGH",
        Urgent => "URGENT",
        Critical => "CRITICAL",
    }
}

impl TaskPriority {
    pub fn is_high(&self) -> bool {
        *self >= TaskPriority::High
    }
}

string_enum! {
    pub enum HousekeepingTaskStatus {
        Pending => "PENDING",
        Assigned => "ASSIGNED",
        InProgress => "IN_PROGRESS",
        Paused => "PAUSED",
        Completed => "COMPLETED",
        CompletedWithIssues => "COMPLETED_WITH_ISSUES",
        PendingInspection => "PENDING_INSPECTION",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        QualityIssue => "QUALITY_ISSUE",
        GuestComplaint => "GUEST_COMPLAINT",
        Escalated => "ESCALATED",
        Rescheduled => "RESCHEDULED",
        Cancelled => "CANCELLED",
    }
}

impl HousekeepingTaskStatus {
    pub fn valid_next(&self) -> &'static [HousekeepingTaskStatus] {
        use HousekeepingTaskStatus::*;
        match self {
            Pending => &[Assigned, Cancelled, Rescheduled],
            Assigned => &[InProgress, Cancelled, Rescheduled, Escalated],
            InProgress => &[
                Completed,
                CompletedWithIssues,
                Paused,
                Cancelled,
                Escalated,
                QualityIssue,
            ],
            Paused => &[InProgress, Cancelled, Rescheduled],
            Completed => &[PendingInspection, Approved, Rejected],
            CompletedWithIssues => &[PendingInspection, Approved, Rejected, QualityIssue],
            PendingInspection => &[Approved, Rejected],
            Rejected => &[Assigned, Cancelled],
            QualityIssue => &[Assigned, Cancelled, Escalated],
            GuestComplaint => &[Assigned, Escalated, Cancelled],
            Escalated => &[Assigned, Cancelled],
            Rescheduled => &[Pending, Cancelled],
            Approved | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: HousekeepingTaskStatus) -> bool {
        self.valid_next().contains(&next)
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            HousekeepingTaskStatus::InProgress | HousekeepingTaskStatus::Paused
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            HousekeepingTaskStatus::Approved
                | HousekeepingTaskStatus::Completed
                | HousekeepingTaskStatus::CompletedWithIssues
        )
    }

    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            HousekeepingTaskStatus::Rejected
                | HousekeepingTaskStatus::QualityIssue
                | HousekeepingTaskStatus::GuestComplaint
                | HousekeepingTaskStatus::Escalated
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            HousekeepingTaskStatus::Pending
                | HousekeepingTaskStatus::Assigned
                | HousekeepingTaskStatus::Rescheduled
        )
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            HousekeepingTaskStatus::Approved | HousekeepingTaskStatus::Cancelled
        )
    }
}

string_enum! {
    pub enum HousekeepingTaskType {
        RoomCleaning => "ROOM_CLEANING",
        CheckoutCleaning => "CHECKOUT_CLEANING",
        MaintenanceCleaning => "MAINTENANCE_CLEANING",
        DeepCleaning => "DEEP_CLEANING",
        Inspection => "INSPECTION",
        MaintenanceTask => "MAINTENANCE_TASK",
        Restocking => "RESTOCKING",
        Laundry => "LAUNDRY",
        SpecialRequest => "SPECIAL_REQUEST",
        EmergencyCleanup => "EMERGENCY_CLEANUP",
        PreventiveMaintenance => "PREVENTIVE_MAINTENANCE",
        PublicAreaCleaning => "PUBLIC_AREA_CLEANING",
        BathroomDeepClean => "BATHROOM_DEEP_CLEAN",
        CarpetCleaning => "CARPET_CLEANING",
        EquipmentCheck => "EQUIPMENT_CHECK",
        HvacMaintenance => "HVAC_MAINTENANCE",
        SeasonalPreparation => "SEASONAL_PREPARATION",
        QualityCheck => "QUALITY_CHECK",
        GuestComplaintFollowup => "GUEST_COMPLAINT_FOLLOWUP",
    }
}

impl HousekeepingTaskType {
    pub fn estimated_minutes(&self) -> u32 {
        use HousekeepingTaskType::*;
        match self {
            RoomCleaning => 40,
            CheckoutCleaning => 45,
            MaintenanceCleaning => 30,
            DeepCleaning => 90,
            Inspection => 15,
            MaintenanceTask => 60,
            Restocking => 20,
            Laundry => 25,
            SpecialRequest => 30,
            EmergencyCleanup => 45,
            PreventiveMaintenance => 60,
            PublicAreaCleaning => 120,
            BathroomDeepClean => 60,
            CarpetCleaning => 90,
            EquipmentCheck => 30,
            HvacMaintenance => 90,
            SeasonalPreparation => 60,
            QualityCheck => 20,
            GuestComplaintFollowup => 45,
        }
    }

    pub fn requires_inspection(&self) -> bool {
        use HousekeepingTaskType::*;
        matches!(
            self,
            CheckoutCleaning
                | DeepCleaning
                | MaintenanceTask
                | EmergencyCleanup
                | BathroomDeepClean
                | CarpetCleaning
                | GuestComplaintFollowup
        )
    }

    /// Work that readies a room for the next guest
    pub fn is_cleaning(&self) -> bool {
        use HousekeepingTaskType::*;
        matches!(
            self,
            RoomCleaning
                | CheckoutCleaning
                | MaintenanceCleaning
                | DeepCleaning
                | EmergencyCleanup
                | BathroomDeepClean
                | CarpetCleaning
        )
    }

    pub fn recommended_priority(&self) -> TaskPriority {
        use HousekeepingTaskType::*;
        match self {
            EmergencyCleanup => TaskPriority::Urgent,
            CheckoutCleaning | GuestComplaintFollowup => TaskPriority::High,
            Restocking | Laundry | SeasonalPreparation => TaskPriority::Low,
            _ => TaskPriority::Normal,
        }
    }
}

/// Grace period after the estimate before an assigned, unstarted task is overdue
const ASSIGNED_GRACE_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingTask {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    pub assigned_staff_id: Option<Uuid>,
    pub task_type: HousekeepingTaskType,
    pub status: HousekeepingTaskStatus,
    pub priority: TaskPriority,
    pub description: Option<String>,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_duration_minutes: u32,
    pub actual_duration_minutes: Option<u32>,
    pub quality_score: Option<u8>,
    pub inspector_notes: Option<String>,
}

impl HousekeepingTask {
    /// New pending task with the type's default estimate and priority
    pub fn new(hotel_id: Uuid, room_id: Uuid, task_type: HousekeepingTaskType) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            room_id,
            assigned_staff_id: None,
            task_type,
            status: HousekeepingTaskStatus::Pending,
            priority: task_type.recommended_priority(),
            description: None,
            special_instructions: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
            estimated_duration_minutes: task_type.estimated_minutes(),
            actual_duration_minutes: None,
            quality_score: None,
            inspector_notes: None,
        }
    }

    /// Apply a status change at `now`, stamping lifecycle timestamps
    pub fn transition_to(
        &mut self,
        next: HousekeepingTaskStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "Housekeeping task cannot move from {} to {}",
                self.status, next
            )));
        }

        match next {
            HousekeepingTaskStatus::Assigned => {
                self.assigned_at = Some(now);
            }
            HousekeepingTaskStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            HousekeepingTaskStatus::Completed | HousekeepingTaskStatus::CompletedWithIssues => {
                self.completed_at = Some(now);
                if let Some(started) = self.started_at {
                    let minutes = (now - started).num_minutes().max(0);
                    self.actual_duration_minutes = Some(u32::try_from(minutes).unwrap_or(u32::MAX));
                }
            }
            _ => {}
        }

        self.status = next;
        Ok(())
    }

    /// Assign to a staff member; only pending, rejected or escalated work can be (re)assigned
    pub fn assign_to(&mut self, staff_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(HousekeepingTaskStatus::Assigned, now)?;
        self.assigned_staff_id = Some(staff_id);
        Ok(())
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        if self.status.is_completed() || self.status == HousekeepingTaskStatus::Cancelled {
            return false;
        }
        let estimate = Duration::minutes(i64::from(self.estimated_duration_minutes));
        let deadline = match (self.started_at, self.assigned_at) {
            (Some(started), _) => started + estimate,
            (None, Some(assigned)) => {
                assigned + estimate + Duration::minutes(ASSIGNED_GRACE_MINUTES)
            }
            (None, None) => return false,
        };
        now > deadline
    }

    pub fn is_high_priority(&self) -> bool {
        matches!(self.priority, TaskPriority::High | TaskPriority::Urgent)
    }

    /// Score from 1 (slow) to 5 (fast); 0 when the task has no measured duration
    pub fn efficiency_score(&self) -> u8 {
        let Some(actual) = self.actual_duration_minutes else {
            return 0;
        };
        if self.estimated_duration_minutes == 0 {
            return 0;
        }
        let ratio = f64::from(actual) / f64::from(self.estimated_duration_minutes);
        if ratio <= 0.8 {
            5
        } else if ratio <= 1.0 {
            4
        } else if ratio <= 1.2 {
            3
        } else if ratio <= 1.5 {
            2
        } else {
            1
        }
    }
}

/// Task counts for a hotel dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousekeepingStatistics {
    pub pending: u64,
    pub active: u64,
    pub completed: u64,
    pub needs_attention: u64,
    pub overdue: u64,
    pub high_priority: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> HousekeepingTask {
        HousekeepingTask::new(Uuid::new_v4(), Uuid::new_v4(), HousekeepingTaskType::RoomCleaning)
    }

    #[test]
    fn test_every_listed_transition_is_accepted() {
        for status in HousekeepingTaskStatus::ALL {
            for next in status.valid_next() {
                assert!(status.can_transition_to(*next));
            }
        }
        assert!(HousekeepingTaskStatus::Approved.valid_next().is_empty());
        assert!(HousekeepingTaskStatus::Cancelled.valid_next().is_empty());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        use HousekeepingTaskStatus::*;
        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Assigned.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(InProgress));
    }

    #[test]
    fn test_status_predicates() {
        use HousekeepingTaskStatus::*;
        assert!(InProgress.is_active());
        assert!(Paused.is_active());
        assert!(CompletedWithIssues.is_completed());
        assert!(Escalated.needs_attention());
        assert!(Rescheduled.is_pending());
        assert!(Approved.is_final());
        assert!(!Completed.is_final());
    }

    #[test]
    fn test_task_type_defaults() {
        assert_eq!(HousekeepingTaskType::CheckoutCleaning.estimated_minutes(), 45);
        assert_eq!(HousekeepingTaskType::PublicAreaCleaning.estimated_minutes(), 120);
        assert!(HousekeepingTaskType::CheckoutCleaning.requires_inspection());
        assert!(!HousekeepingTaskType::RoomCleaning.requires_inspection());
        assert_eq!(
            HousekeepingTaskType::EmergencyCleanup.recommended_priority(),
            TaskPriority::Urgent
        );
        assert_eq!(
            HousekeepingTaskType::Laundry.recommended_priority(),
            TaskPriority::Low
        );

        let t = HousekeepingTask::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            HousekeepingTaskType::CheckoutCleaning,
        );
        assert_eq!(t.priority, TaskPriority::High);
        assert_eq!(t.estimated_duration_minutes, 45);
    }

    #[test]
    fn test_lifecycle_stamps_timestamps() {
        let mut t = task();
        let start = Utc::now();
        t.assign_to(Uuid::new_v4(), start).unwrap();
        assert_eq!(t.assigned_at, Some(start));

        let working = start + Duration::minutes(5);
        t.transition_to(HousekeepingTaskStatus::InProgress, working).unwrap();
        t.transition_to(HousekeepingTaskStatus::Paused, working + Duration::minutes(5)).unwrap();
        t.transition_to(HousekeepingTaskStatus::InProgress, working + Duration::minutes(10))
            .unwrap();
        assert_eq!(t.started_at, Some(working));

        t.transition_to(HousekeepingTaskStatus::Completed, working + Duration::minutes(30))
            .unwrap();
        assert_eq!(t.actual_duration_minutes, Some(30));
        assert!(t.completed_at.is_some());
        assert_eq!(t.efficiency_score(), 5);
    }

    #[test]
    fn test_transition_out_of_table_fails() {
        let mut t = task();
        let err = t.transition_to(HousekeepingTaskStatus::Completed, Utc::now());
        assert!(matches!(err, Err(Error::InvalidState(_))));
        assert_eq!(t.status, HousekeepingTaskStatus::Pending);
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let mut t = task();
        assert!(!t.is_overdue(now));

        t.assign_to(Uuid::new_v4(), now - Duration::minutes(60)).unwrap();
        // 40 minute estimate + 30 minute grace
        assert!(!t.is_overdue(now));
        assert!(t.is_overdue(now + Duration::minutes(11)));

        t.transition_to(HousekeepingTaskStatus::InProgress, now - Duration::minutes(41)).unwrap();
        assert!(t.is_overdue(now));

        t.transition_to(HousekeepingTaskStatus::Completed, now).unwrap();
        assert!(!t.is_overdue(now + Duration::hours(5)));
    }

    #[test]
    fn test_efficiency_bands() {
        let mut t = task();
        t.estimated_duration_minutes = 100;
        for (actual, score) in [(80, 5), (100, 4), (120, 3), (150, 2), (151, 1)] {
            t.actual_duration_minutes = Some(actual);
            assert_eq!(t.efficiency_score(), score, "actual {actual}");
        }
        t.actual_duration_minutes = None;
        assert_eq!(t.efficiency_score(), 0);
    }
}
