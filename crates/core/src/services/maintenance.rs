//! Maintenance work orders

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{optional, require, required, staff_hotel, works_at};
use crate::error::{Error, Result};
use crate::models::{
    MaintenanceStatus, MaintenanceTask, MaintenanceType, TaskPriority, User, UserRole,
};
use crate::permissions::Action;
use crate::scope::TenantScope;
use crate::storage::{Database, MaintenanceStore, RoomStore, UserStore};

#[derive(Debug, Clone, Deserialize)]
pub struct NewMaintenanceTask {
    pub hotel_id: Uuid,
    #[serde(default)]
    pub room_id: Option<Uuid>,
    pub task_type: MaintenanceType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<Decimal>,
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

fn default_priority() -> TaskPriority {
    TaskPriority::Normal
}

fn technician(
    conn: &Connection,
    scope: TenantScope,
    staff_id: Uuid,
    hotel_id: Uuid,
) -> Result<User> {
    let staff = UserStore::new(conn)
        .find_by_id(scope, staff_id)?
        .ok_or_else(|| Error::not_found("User", staff_id))?;
    if !staff.is_active || !staff.has_role(UserRole::Maintenance) {
        return Err(Error::validation(format!("{} is not active maintenance staff", staff.email)));
    }
    if staff.hotel_id != Some(hotel_id) {
        return Err(Error::validation(format!("{} works at another hotel", staff.email)));
    }
    Ok(staff)
}

pub struct MaintenanceService<'a> {
    db: &'a Database,
}

impl<'a> MaintenanceService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn load(&self, conn: &Connection, actor: &User, task_id: Uuid) -> Result<MaintenanceTask> {
        let scope = TenantScope::for_user(actor)?;
        MaintenanceStore::new(conn)
            .find_by_id(scope, task_id)?
            .filter(|task| works_at(actor, task.hotel_id))
            .ok_or_else(|| Error::not_found("Maintenance task", task_id))
    }

    fn load_own(&self, conn: &Connection, actor: &User, task_id: Uuid) -> Result<MaintenanceTask> {
        require(actor, Action::WorkMaintenanceTasks)?;
        let task = self.load(conn, actor, task_id)?;
        if task.assigned_to != Some(actor.id) {
            return Err(Error::PermissionDenied("Task is assigned to someone else".into()));
        }
        Ok(task)
    }

    #[instrument(skip(self, actor, request), fields(hotel_id = %request.hotel_id))]
    pub fn create(
        &self,
        actor: &User,
        request: NewMaintenanceTask,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceTask> {
        let title = required(&request.title, "Title")?;
        if request.estimated_cost.is_some_and(|c| c.is_sign_negative()) {
            return Err(Error::validation("Estimated cost cannot be negative"));
        }
        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManageMaintenance, request.hotel_id)?;
            let scope = TenantScope::for_user(actor)?;
            if let Some(room_id) = request.room_id {
                RoomStore::new(conn)
                    .find_by_id(scope, room_id)?
                    .filter(|room| room.hotel_id == hotel.id)
                    .ok_or_else(|| Error::not_found("Room", room_id))?;
            }

            let mut task = MaintenanceTask::new(
                hotel.tenant_id,
                hotel.id,
                request.task_type,
                title,
                request.priority,
                actor.id,
            );
            task.room_id = request.room_id;
            task.description = optional(request.description);
            task.location = optional(request.location);
            task.estimated_cost = request.estimated_cost;
            task.scheduled_start = request.scheduled_start;
            task.created_at = now;
            task.updated_at = now;
            if let Some(staff_id) = request.assigned_to {
                let staff = technician(conn, scope, staff_id, hotel.id)?;
                task.assign(staff.id, now)?;
            }
            MaintenanceStore::new(conn).create(&task)?;

            if task.is_emergency() {
                warn!(
                    task_id = %task.id,
                    hotel = %hotel.name,
                    priority = %task.priority,
                    "Emergency maintenance reported"
                );
            } else {
                info!(task_id = %task.id, hotel = %hotel.name, "Maintenance task created");
            }
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
    ) -> Result<MaintenanceTask> {
        require(actor, Action::ManageMaintenance)?;
        self.db.transaction(|conn| {
            let mut task = self.load(conn, actor, task_id)?;
            let staff = technician(conn, TenantScope::for_user(actor)?, staff_id, task.hotel_id)?;
            task.assign(staff.id, now)?;
            MaintenanceStore::new(conn).update(&task)?;
            Ok(task)
        })
    }

    pub fn start(
        &self,
        actor: &User,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceTask> {
        self.db.transaction(|conn| {
            let mut task = self.load_own(conn, actor, task_id)?;
            task.start(now)?;
            MaintenanceStore::new(conn).update(&task)?;
            Ok(task)
        })
    }

    #[instrument(skip(self, actor, work_performed))]
    pub fn complete(
        &self,
        actor: &User,
        task_id: Uuid,
        work_performed: &str,
        actual_cost: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceTask> {
        let work = required(work_performed, "Work performed")?;
        self.db.transaction(|conn| {
            let mut task = self.load_own(conn, actor, task_id)?;
            task.complete(work, actual_cost, now)?;
            MaintenanceStore::new(conn).update(&task)?;
            info!(task_id = %task.id, hours = ?task.duration_hours(), "Maintenance task completed");
            Ok(task)
        })
    }

    pub fn verify(
        &self,
        actor: &User,
        task_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceTask> {
        require(actor, Action::VerifyMaintenance)?;
        self.db.transaction(|conn| {
            let mut task = self.load(conn, actor, task_id)?;
            task.verify(actor.id, optional(notes), now)?;
            MaintenanceStore::new(conn).update(&task)?;
            Ok(task)
        })
    }

    pub fn cancel(
        &self,
        actor: &User,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceTask> {
        require(actor, Action::ManageMaintenance)?;
        self.db.transaction(|conn| {
            let mut task = self.load(conn, actor, task_id)?;
            task.cancel(now)?;
            MaintenanceStore::new(conn).update(&task)?;
            Ok(task)
        })
    }

    pub fn task(&self, actor: &User, task_id: Uuid) -> Result<MaintenanceTask> {
        let task = self.load(self.db.connection(), actor, task_id)?;
        if require(actor, Action::ManageMaintenance).is_ok() || task.assigned_to == Some(actor.id) {
            Ok(task)
        } else {
            Err(Error::not_found("Maintenance task", task_id))
        }
    }

    pub fn list(
        &self,
        actor: &User,
        hotel_id: Uuid,
        status: Option<MaintenanceStatus>,
    ) -> Result<Vec<MaintenanceTask>> {
        staff_hotel(self.db.connection(), actor, Action::ManageMaintenance, hotel_id)?;
        self.db.maintenance().list_by_hotel(hotel_id, status)
    }

    /// Open work past its scheduled start
    pub fn overdue(
        &self,
        actor: &User,
        hotel_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<MaintenanceTask>> {
        let mut tasks = self.list(actor, hotel_id, None)?;
        tasks.retain(|task| task.is_overdue(now));
        Ok(tasks)
    }

    pub fn my_tasks(&self, actor: &User) -> Result<Vec<MaintenanceTask>> {
        require(actor, Action::WorkMaintenanceTasks)?;
        self.db.maintenance().list_by_assignee(actor.id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::services::testing::World;

    fn request(world: &World, title: &str) -> NewMaintenanceTask {
        NewMaintenanceTask {
            hotel_id: world.hotel.id,
            room_id: Some(world.room.id),
            task_type: MaintenanceType::Plumbing,
            title: title.into(),
            description: None,
            priority: TaskPriority::Normal,
            location: None,
            estimated_cost: Some(dec!(40)),
            scheduled_start: None,
            assigned_to: None,
        }
    }

    #[test]
    fn test_work_order_lifecycle() {
        let world = World::new();
        let supervisor = world.staff(UserRole::OperationsSupervisor);
        let tech = world.staff(UserRole::Maintenance);
        let service = MaintenanceService::new(&world.db);
        let now = Utc::now();

        let task = service.create(&supervisor, request(&world, "Leaking tap"), now).unwrap();
        assert_eq!(task.status, MaintenanceStatus::Open);
        assert_eq!(task.tenant_id, world.tenant.id);
        assert_eq!(task.created_by, supervisor.id);

        assert!(matches!(service.start(&tech, task.id, now), Err(Error::PermissionDenied(_))));
        service.assign(&supervisor, task.id, tech.id, now).unwrap();
        service.start(&tech, task.id, now).unwrap();
        assert!(matches!(
            service.complete(&tech, task.id, " ", None, now),
            Err(Error::Validation(_))
        ));
        let done = service
            .complete(
                &tech,
                task.id,
                "Replaced washer",
                Some(dec!(12.50)),
                now + Duration::hours(2),
            )
            .unwrap();
        assert_eq!(done.duration_hours(), Some(2));

        assert!(matches!(
            service.verify(&tech, task.id, None, now),
            Err(Error::PermissionDenied(_))
        ));
        let verified = service.verify(&supervisor, task.id, Some("Dry".into()), now).unwrap();
        assert_eq!(verified.status, MaintenanceStatus::Verified);
        assert_eq!(verified.verified_by, Some(supervisor.id));
        assert!(matches!(service.cancel(&supervisor, task.id, now), Err(Error::InvalidState(_))));
        assert_eq!(service.my_tasks(&tech).unwrap().len(), 1);
    }

    #[test]
    fn test_create_validation() {
        let world = World::new();
        let supervisor = world.staff(UserRole::HotelManager);
        let housekeeper = world.staff(UserRole::Housekeeping);
        let service = MaintenanceService::new(&world.db);
        let now = Utc::now();

        assert!(matches!(
            service.create(&supervisor, request(&world, ""), now),
            Err(Error::Validation(_))
        ));
        let mut negative = request(&world, "Paint");
        negative.estimated_cost = Some(dec!(-1));
        assert!(matches!(service.create(&supervisor, negative, now), Err(Error::Validation(_))));

        let mut wrong_staff = request(&world, "Fuse box");
        wrong_staff.assigned_to = Some(housekeeper.id);
        assert!(matches!(service.create(&supervisor, wrong_staff, now), Err(Error::Validation(_))));

        let mut foreign_room = request(&world, "Door");
        foreign_room.room_id = Some(Uuid::new_v4());
        assert!(matches!(service.create(&supervisor, foreign_room, now), Err(Error::NotFound(_))));
        assert!(matches!(
            service.create(&housekeeper, request(&world, "Lamp"), now),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_overdue_listing() {
        let world = World::new();
        let supervisor = world.staff(UserRole::OperationsSupervisor);
        let service = MaintenanceService::new(&world.db);
        let now = Utc::now();

        let mut late = request(&world, "AC service");
        late.scheduled_start = Some(now - Duration::hours(1));
        late.priority = TaskPriority::Critical;
        let late = service.create(&supervisor, late, now).unwrap();
        let mut upcoming = request(&world, "Repaint hall");
        upcoming.scheduled_start = Some(now + Duration::days(3));
        service.create(&supervisor, upcoming, now).unwrap();

        let overdue = service.overdue(&supervisor, world.hotel.id, now).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);
        assert!(overdue[0].is_emergency());

        service.cancel(&supervisor, late.id, now).unwrap();
        assert!(service.overdue(&supervisor, world.hotel.id, now).unwrap().is_empty());
        assert_eq!(
            service
                .list(&supervisor, world.hotel.id, Some(MaintenanceStatus::Cancelled))
                .unwrap()
                .len(),
            1
        );
    }
}
