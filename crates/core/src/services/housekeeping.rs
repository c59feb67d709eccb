//! Housekeeping task workflow
//!
//! Supervisors create, assign and inspect tasks; housekeepers work only
//! the tasks assigned to them.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{optional, require, staff_hotel, works_at};
use crate::error::{Error, Result};
use crate::models::{
    HousekeepingStatistics, HousekeepingTask, HousekeepingTaskStatus, HousekeepingTaskType,
    RoomStatus, TaskPriority, User, UserRole,
};
use crate::permissions::{Action, PermissionMatrix};
use crate::scope::TenantScope;
use crate::storage::{Database, HousekeepingStore, RoomStore, UserStore};

#[derive(Debug, Clone, Deserialize)]
pub struct NewHousekeepingTask {
    pub room_id: Uuid,
    pub task_type: HousekeepingTaskType,
    /// Defaults to the type's recommended priority
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub assigned_staff_id: Option<Uuid>,
}

/// Active housekeeper working at the task's hotel
fn housekeeper(
    conn: &Connection,
    scope: TenantScope,
    staff_id: Uuid,
    hotel_id: Uuid,
) -> Result<User> {
    let staff = UserStore::new(conn)
        .find_by_id(scope, staff_id)?
        .ok_or_else(|| Error::not_found("User", staff_id))?;
    if !staff.is_active || !staff.has_role(UserRole::Housekeeping) {
        return Err(Error::validation(format!(
            "{} is not active housekeeping staff",
            staff.email
        )));
    }
    if staff.hotel_id != Some(hotel_id) {
        return Err(Error::validation(format!("{} works at another hotel", staff.email)));
    }
    Ok(staff)
}

/// Return a room left for cleaning to service
fn room_ready(conn: &Connection, task: &HousekeepingTask) -> Result<()> {
    if !task.task_type.is_cleaning() {
        return Ok(());
    }
    let rooms = RoomStore::new(conn);
    if let Some(room) = rooms.find_by_id(TenantScope::System, task.room_id)? {
        if room.status == RoomStatus::Maintenance {
            rooms.set_status(room.id, RoomStatus::Available)?;
            info!(room = %room.room_number, "Room cleaned and available");
        }
    }
    Ok(())
}

pub struct HousekeepingService<'a> {
    db: &'a Database,
}

impl<'a> HousekeepingService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn load(&self, conn: &Connection, actor: &User, task_id: Uuid) -> Result<HousekeepingTask> {
        let scope = TenantScope::for_user(actor)?;
        HousekeepingStore::new(conn)
            .find_by_id(scope, task_id)?
            .filter(|task| works_at(actor, task.hotel_id))
            .ok_or_else(|| Error::not_found("Housekeeping task", task_id))
    }

    /// Task the actor is assigned to
    fn load_own(&self, conn: &Connection, actor: &User, task_id: Uuid) -> Result<HousekeepingTask> {
        require(actor, Action::WorkHousekeepingTasks)?;
        let task = self.load(conn, actor, task_id)?;
        if task.assigned_staff_id != Some(actor.id) {
            return Err(Error::PermissionDenied("Task is assigned to someone else".into()));
        }
        Ok(task)
    }

    #[instrument(skip(self, actor, request), fields(room_id = %request.room_id))]
    pub fn create_task(
        &self,
        actor: &User,
        request: NewHousekeepingTask,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        require(actor, Action::ManageHousekeeping)?;
        let scope = TenantScope::for_user(actor)?;
        self.db.transaction(|conn| {
            let room = RoomStore::new(conn)
                .find_by_id(scope, request.room_id)?
                .ok_or_else(|| Error::not_found("Room", request.room_id))?;
            staff_hotel(conn, actor, Action::ManageHousekeeping, room.hotel_id)?;

            let mut task = HousekeepingTask::new(room.hotel_id, room.id, request.task_type);
            task.created_at = now;
            if let Some(priority) = request.priority {
                task.priority = priority;
            }
            task.description = optional(request.description);
            task.special_instructions = optional(request.special_instructions);
            if let Some(staff_id) = request.assigned_staff_id {
                let staff = housekeeper(conn, scope, staff_id, room.hotel_id)?;
                task.assign_to(staff.id, now)?;
            }
            HousekeepingStore::new(conn).create(&task)?;
            info!(
                task_id = %task.id,
                task_type = %task.task_type,
                room = %room.room_number,
                "Housekeeping task created"
            );
            Ok(task)
        })
    }

    #[instrument(skip(self, actor))]
    pub fn assign(
        &self,
        actor: &User,
        task_id: Uuid,
        staff_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        require(actor, Action::ManageHousekeeping)?;
        self.db.transaction(|conn| {
            let mut task = self.load(conn, actor, task_id)?;
            let staff = housekeeper(conn, TenantScope::for_user(actor)?, staff_id, task.hotel_id)?;
            task.assign_to(staff.id, now)?;
            HousekeepingStore::new(conn).update(&task)?;
            info!(task_id = %task.id, staff = %staff.email, "Housekeeping task assigned");
            Ok(task)
        })
    }

    fn advance(
        &self,
        actor: &User,
        task_id: Uuid,
        next: HousekeepingTaskStatus,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        self.db.transaction(|conn| {
            let mut task = self.load_own(conn, actor, task_id)?;
            task.transition_to(next, now)?;
            HousekeepingStore::new(conn).update(&task)?;
            Ok(task)
        })
    }

    pub fn start(
        &self,
        actor: &User,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        self.advance(actor, task_id, HousekeepingTaskStatus::InProgress, now)
    }

    pub fn pause(
        &self,
        actor: &User,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        self.advance(actor, task_id, HousekeepingTaskStatus::Paused, now)
    }

    pub fn resume(
        &self,
        actor: &User,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        self.advance(actor, task_id, HousekeepingTaskStatus::InProgress, now)
    }

    /// Finish a task. Types that need a supervisor's check go on to
    /// PENDING_INSPECTION.
    #[instrument(skip(self, actor))]
    pub fn complete(
        &self,
        actor: &User,
        task_id: Uuid,
        with_issues: bool,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        self.db.transaction(|conn| {
            let mut task = self.load_own(conn, actor, task_id)?;
            let done = if with_issues {
                HousekeepingTaskStatus::CompletedWithIssues
            } else {
                HousekeepingTaskStatus::Completed
            };
            task.transition_to(done, now)?;
            if task.task_type.requires_inspection() {
                task.transition_to(HousekeepingTaskStatus::PendingInspection, now)?;
            }
            HousekeepingStore::new(conn).update(&task)?;
            info!(
                task_id = %task.id,
                status = %task.status,
                minutes = ?task.actual_duration_minutes,
                "Housekeeping task completed"
            );
            Ok(task)
        })
    }

    /// Approve or reject finished work with a 1-5 quality score
    #[instrument(skip(self, actor, notes))]
    pub fn inspect(
        &self,
        actor: &User,
        task_id: Uuid,
        approved: bool,
        quality_score: Option<u8>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        require(actor, Action::InspectHousekeeping)?;
        if quality_score.is_some_and(|score| !(1..=5).contains(&score)) {
            return Err(Error::validation("Quality score must be between 1 and 5"));
        }
        self.db.transaction(|conn| {
            let mut task = self.load(conn, actor, task_id)?;
            let verdict = if approved {
                HousekeepingTaskStatus::Approved
            } else {
                HousekeepingTaskStatus::Rejected
            };
            task.transition_to(verdict, now)?;
            task.quality_score = quality_score;
            task.inspector_notes = optional(notes);
            HousekeepingStore::new(conn).update(&task)?;
            if approved {
                room_ready(conn, &task)?;
            }
            Ok(task)
        })
    }

    /// Supervisor override along the transition table
    #[instrument(skip(self, actor))]
    pub fn update_status(
        &self,
        actor: &User,
        task_id: Uuid,
        status: HousekeepingTaskStatus,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingTask> {
        require(actor, Action::ManageHousekeeping)?;
        if status == HousekeepingTaskStatus::Assigned {
            return Err(Error::validation("Use assignment to hand a task to staff"));
        }
        self.db.transaction(|conn| {
            let mut task = self.load(conn, actor, task_id)?;
            task.transition_to(status, now)?;
            HousekeepingStore::new(conn).update(&task)?;
            if status == HousekeepingTaskStatus::Approved {
                room_ready(conn, &task)?;
            }
            Ok(task)
        })
    }

    pub fn task(&self, actor: &User, task_id: Uuid) -> Result<HousekeepingTask> {
        let task = self.load(self.db.connection(), actor, task_id)?;
        let supervises = PermissionMatrix::allows(actor, Action::ManageHousekeeping);
        if supervises || task.assigned_staff_id == Some(actor.id) {
            Ok(task)
        } else {
            Err(Error::not_found("Housekeeping task", task_id))
        }
    }

    pub fn list(
        &self,
        actor: &User,
        hotel_id: Uuid,
        status: Option<HousekeepingTaskStatus>,
    ) -> Result<Vec<HousekeepingTask>> {
        staff_hotel(self.db.connection(), actor, Action::ManageHousekeeping, hotel_id)?;
        self.db.housekeeping().list_by_hotel(hotel_id, status)
    }

    pub fn my_tasks(&self, actor: &User) -> Result<Vec<HousekeepingTask>> {
        require(actor, Action::WorkHousekeepingTasks)?;
        self.db.housekeeping().list_by_staff(actor.id)
    }

    /// Active housekeepers of a hotel, for assignment pickers
    pub fn staff(&self, actor: &User, hotel_id: Uuid) -> Result<Vec<User>> {
        staff_hotel(self.db.connection(), actor, Action::ManageHousekeeping, hotel_id)?;
        self.db.users().list_by_role(UserRole::Housekeeping, Some(hotel_id))
    }

    pub fn statistics(
        &self,
        actor: &User,
        hotel_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingStatistics> {
        let tasks = self.list(actor, hotel_id, None)?;
        let mut stats = HousekeepingStatistics::default();
        for task in &tasks {
            if task.status.is_pending() {
                stats.pending += 1;
            }
            if task.status.is_active() {
                stats.active += 1;
            }
            if task.status.is_completed() {
                stats.completed += 1;
            }
            if task.status.needs_attention() {
                stats.needs_attention += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            if task.is_high_priority() && !task.status.is_final() {
                stats.high_priority += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::services::testing::World;

    fn request(world: &World, task_type: HousekeepingTaskType) -> NewHousekeepingTask {
        NewHousekeepingTask {
            room_id: world.room.id,
            task_type,
            priority: None,
            description: Some("Turn down".into()),
            special_instructions: None,
            assigned_staff_id: None,
        }
    }

    #[test]
    fn test_workflow_with_inspection_frees_room() {
        let world = World::new();
        let supervisor = world.staff(UserRole::OperationsSupervisor);
        let cleaner = world.staff(UserRole::Housekeeping);
        let service = HousekeepingService::new(&world.db);
        world.db.rooms().set_status(world.room.id, RoomStatus::Maintenance).unwrap();
        let now = Utc::now();

        let task = service
            .create_task(&supervisor, request(&world, HousekeepingTaskType::CheckoutCleaning), now)
            .unwrap();
        assert_eq!(task.priority, TaskPriority::High);

        service.assign(&supervisor, task.id, cleaner.id, now).unwrap();
        service.start(&cleaner, task.id, now).unwrap();
        let done = service
            .complete(&cleaner, task.id, false, now + Duration::minutes(40))
            .unwrap();
        assert_eq!(done.status, HousekeepingTaskStatus::PendingInspection);
        assert_eq!(done.actual_duration_minutes, Some(40));

        assert!(matches!(
            service.inspect(&supervisor, task.id, true, Some(6), None, now),
            Err(Error::Validation(_))
        ));
        let approved = service
            .inspect(&supervisor, task.id, true, Some(5), Some("Spotless".into()), now)
            .unwrap();
        assert_eq!(approved.status, HousekeepingTaskStatus::Approved);

        let room =
            world.db.rooms().find_by_id(TenantScope::System, world.room.id).unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Available);
    }

    #[test]
    fn test_only_assignee_works_task() {
        let world = World::new();
        let supervisor = world.staff(UserRole::HotelManager);
        let cleaner = world.staff(UserRole::Housekeeping);
        let other = world.staff(UserRole::Housekeeping);
        let service = HousekeepingService::new(&world.db);
        let now = Utc::now();

        let mut req = request(&world, HousekeepingTaskType::RoomCleaning);
        req.assigned_staff_id = Some(cleaner.id);
        let task = service.create_task(&supervisor, req, now).unwrap();
        assert_eq!(task.status, HousekeepingTaskStatus::Assigned);

        assert!(matches!(service.start(&other, task.id, now), Err(Error::PermissionDenied(_))));
        assert!(matches!(
            service.start(&supervisor, task.id, now),
            Err(Error::PermissionDenied(_))
        ));

        service.start(&cleaner, task.id, now).unwrap();
        service.pause(&cleaner, task.id, now).unwrap();
        service.resume(&cleaner, task.id, now).unwrap();
        let done = service.complete(&cleaner, task.id, false, now).unwrap();
        // plain room cleaning skips inspection
        assert_eq!(done.status, HousekeepingTaskStatus::Completed);
        assert_eq!(service.my_tasks(&cleaner).unwrap().len(), 1);
        assert!(service.my_tasks(&other).unwrap().is_empty());
    }

    #[test]
    fn test_assign_requires_housekeeper_of_hotel() {
        let world = World::new();
        let supervisor = world.staff(UserRole::OperationsSupervisor);
        let desk = world.staff(UserRole::Frontdesk);
        let service = HousekeepingService::new(&world.db);
        let now = Utc::now();
        let task = service
            .create_task(&supervisor, request(&world, HousekeepingTaskType::DeepCleaning), now)
            .unwrap();

        assert!(matches!(
            service.assign(&supervisor, task.id, desk.id, now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.assign(&supervisor, task.id, Uuid::new_v4(), now),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.create_task(&desk, request(&world, HousekeepingTaskType::Laundry), now),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_statistics() {
        let world = World::new();
        let supervisor = world.staff(UserRole::OperationsSupervisor);
        let cleaner = world.staff(UserRole::Housekeeping);
        let service = HousekeepingService::new(&world.db);
        let now = Utc::now();

        let mut urgent = request(&world, HousekeepingTaskType::EmergencyCleanup);
        urgent.assigned_staff_id = Some(cleaner.id);
        let urgent = service.create_task(&supervisor, urgent, now - Duration::hours(3)).unwrap();
        service.start(&cleaner, urgent.id, now - Duration::hours(2)).unwrap();
        let pending = service
            .create_task(&supervisor, request(&world, HousekeepingTaskType::Restocking), now)
            .unwrap();
        service
            .update_status(&supervisor, pending.id, HousekeepingTaskStatus::Cancelled, now)
            .unwrap();
        service
            .create_task(&supervisor, request(&world, HousekeepingTaskType::Inspection), now)
            .unwrap();

        let stats = service.statistics(&supervisor, world.hotel.id, now).unwrap();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.high_priority, 1);
        assert_eq!(service.staff(&supervisor, world.hotel.id).unwrap().len(), 1);
    }
}
