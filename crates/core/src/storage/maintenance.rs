//! Maintenance work order storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_datetime_opt, parse_decimal_opt, parse_enum, parse_uuid, parse_uuid_opt,
    OptionalExt,
};
use crate::error::Result;
use crate::models::{MaintenanceStatus, MaintenanceTask, MaintenanceType, TaskPriority};
use crate::scope::TenantScope;

const COLUMNS: &str = "id, tenant_id, hotel_id, room_id, task_type, title, description, status, \
                       priority, assigned_to, created_by, location, estimated_cost, actual_cost, \
                       scheduled_start, actual_start, actual_end, work_performed, \
                       verification_notes, verified_by, verified_at, created_at, updated_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<MaintenanceTask> {
    Ok(MaintenanceTask {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(&row.get::<_, String>(1)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(2)?)?,
        room_id: parse_uuid_opt(row.get(3)?)?,
        task_type: parse_enum(
            &row.get::<_, String>(4)?,
            "maintenance type",
            MaintenanceType::from_str,
        )?,
        title: row.get(5)?,
        description: row.get(6)?,
        status: parse_enum(
            &row.get::<_, String>(7)?,
            "maintenance status",
            MaintenanceStatus::from_str,
        )?,
        priority: parse_enum(&row.get::<_, String>(8)?, "task priority", TaskPriority::from_str)?,
        assigned_to: parse_uuid_opt(row.get(9)?)?,
        created_by: parse_uuid(&row.get::<_, String>(10)?)?,
        location: row.get(11)?,
        estimated_cost: parse_decimal_opt(row.get(12)?)?,
        actual_cost: parse_decimal_opt(row.get(13)?)?,
        scheduled_start: parse_datetime_opt(row.get(14)?)?,
        actual_start: parse_datetime_opt(row.get(15)?)?,
        actual_end: parse_datetime_opt(row.get(16)?)?,
        work_performed: row.get(17)?,
        verification_notes: row.get(18)?,
        verified_by: parse_uuid_opt(row.get(19)?)?,
        verified_at: parse_datetime_opt(row.get(20)?)?,
        created_at: parse_datetime(&row.get::<_, String>(21)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(22)?)?,
    })
}

pub struct MaintenanceStore<'a> {
    conn: &'a Connection,
}

impl<'a> MaintenanceStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, task), fields(hotel_id = %task.hotel_id, title = %task.title))]
    pub fn create(&self, task: &MaintenanceTask) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO maintenance_tasks ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23)"
            ),
            params![
                task.id.to_string(),
                task.tenant_id.to_string(),
                task.hotel_id.to_string(),
                task.room_id.map(|id| id.to_string()),
                task.task_type.as_str(),
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.assigned_to.map(|id| id.to_string()),
                task.created_by.to_string(),
                task.location,
                task.estimated_cost.map(|c| c.to_string()),
                task.actual_cost.map(|c| c.to_string()),
                task.scheduled_start.map(|t| t.to_rfc3339()),
                task.actual_start.map(|t| t.to_rfc3339()),
                task.actual_end.map(|t| t.to_rfc3339()),
                task.work_performed,
                task.verification_notes,
                task.verified_by.map(|id| id.to_string()),
                task.verified_at.map(|t| t.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<MaintenanceTask>> {
        let task = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM maintenance_tasks
                     WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, status = %task.status))]
    pub fn update(&self, task: &MaintenanceTask) -> Result<()> {
        self.conn.execute(
            "UPDATE maintenance_tasks SET room_id = ?1, title = ?2, description = ?3, status = ?4,
                priority = ?5, assigned_to = ?6, location = ?7, estimated_cost = ?8,
                actual_cost = ?9, scheduled_start = ?10, actual_start = ?11, actual_end = ?12,
                work_performed = ?13,
                verification_notes = ?14, verified_by = ?15, verified_at = ?16, updated_at = ?17
             WHERE id = ?18",
            params![
                task.room_id.map(|id| id.to_string()),
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.assigned_to.map(|id| id.to_string()),
                task.location,
                task.estimated_cost.map(|c| c.to_string()),
                task.actual_cost.map(|c| c.to_string()),
                task.scheduled_start.map(|t| t.to_rfc3339()),
                task.actual_start.map(|t| t.to_rfc3339()),
                task.actual_end.map(|t| t.to_rfc3339()),
                task.work_performed,
                task.verification_notes,
                task.verified_by.map(|id| id.to_string()),
                task.verified_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
                task.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn list_by_hotel(
        &self,
        hotel_id: Uuid,
        status: Option<MaintenanceStatus>,
    ) -> Result<Vec<MaintenanceTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM maintenance_tasks
             WHERE hotel_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC"
        ))?;
        let tasks = stmt
            .query_map(
                params![hotel_id.to_string(), status.map(|s| s.as_str())],
                task_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn list_by_assignee(&self, staff_id: Uuid) -> Result<Vec<MaintenanceTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM maintenance_tasks WHERE assigned_to = ?1
             ORDER BY created_at DESC"
        ))?;
        let tasks = stmt
            .query_map(params![staff_id.to_string()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}
