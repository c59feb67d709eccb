//! Housekeeping task storage operations
//!
//! Tasks carry no tenant column; scoped reads join through `hotels`.

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_datetime_opt, parse_enum, parse_uuid, parse_uuid_opt, OptionalExt,
};
use crate::error::Result;
use crate::models::{HousekeepingTask, HousekeepingTaskStatus, HousekeepingTaskType, TaskPriority};
use crate::scope::TenantScope;

const COLUMNS: &str = "t.id, t.hotel_id, t.room_id, t.assigned_staff_id, t.task_type, t.status, \
                       t.priority, t.description, t.special_instructions, t.created_at, \
                       t.assigned_at, t.started_at, t.completed_at, t.estimated_duration_minutes, \
                       t.actual_duration_minutes, t.quality_score, t.inspector_notes";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<HousekeepingTask> {
    Ok(HousekeepingTask {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(1)?)?,
        room_id: parse_uuid(&row.get::<_, String>(2)?)?,
        assigned_staff_id: parse_uuid_opt(row.get(3)?)?,
        task_type: parse_enum(
            &row.get::<_, String>(4)?,
            "housekeeping task type",
            HousekeepingTaskType::from_str,
        )?,
        status: parse_enum(
            &row.get::<_, String>(5)?,
            "housekeeping status",
            HousekeepingTaskStatus::from_str,
        )?,
        priority: parse_enum(&row.get::<_, String>(6)?, "task priority", TaskPriority::from_str)?,
        description: row.get(7)?,
        special_instructions: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
        assigned_at: parse_datetime_opt(row.get(10)?)?,
        started_at: parse_datetime_opt(row.get(11)?)?,
        completed_at: parse_datetime_opt(row.get(12)?)?,
        estimated_duration_minutes: row.get(13)?,
        actual_duration_minutes: row.get(14)?,
        quality_score: row.get(15)?,
        inspector_notes: row.get(16)?,
    })
}

pub struct HousekeepingStore<'a> {
    conn: &'a Connection,
}

impl<'a> HousekeepingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, task), fields(room_id = %task.room_id, task_type = %task.task_type))]
    pub fn create(&self, task: &HousekeepingTask) -> Result<()> {
        self.conn.execute(
            "INSERT INTO housekeeping_tasks (id, hotel_id, room_id, assigned_staff_id, task_type,
                status, priority, description, special_instructions, created_at, assigned_at,
                started_at, completed_at, estimated_duration_minutes, actual_duration_minutes,
                quality_score, inspector_notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                task.id.to_string(),
                task.hotel_id.to_string(),
                task.room_id.to_string(),
                task.assigned_staff_id.map(|id| id.to_string()),
                task.task_type.as_str(),
                task.status.as_str(),
                task.priority.as_str(),
                task.description,
                task.special_instructions,
                task.created_at.to_rfc3339(),
                task.assigned_at.map(|t| t.to_rfc3339()),
                task.started_at.map(|t| t.to_rfc3339()),
                task.completed_at.map(|t| t.to_rfc3339()),
                task.estimated_duration_minutes,
                task.actual_duration_minutes,
                task.quality_score,
                task.inspector_notes,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<HousekeepingTask>> {
        let task = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM housekeeping_tasks t JOIN hotels h ON h.id = t.hotel_id
                     WHERE t.id = ?1 AND (?2 IS NULL OR h.tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, status = %task.status))]
    pub fn update(&self, task: &HousekeepingTask) -> Result<()> {
        self.conn.execute(
            "UPDATE housekeeping_tasks SET assigned_staff_id = ?1, status = ?2, priority = ?3,
                description = ?4, special_instructions = ?5, assigned_at = ?6, started_at = ?7,
                completed_at = ?8, actual_duration_minutes = ?9, quality_score = ?10,
                inspector_notes = ?11
             WHERE id = ?12",
            params![
                task.assigned_staff_id.map(|id| id.to_string()),
                task.status.as_str(),
                task.priority.as_str(),
                task.description,
                task.special_instructions,
                task.assigned_at.map(|t| t.to_rfc3339()),
                task.started_at.map(|t| t.to_rfc3339()),
                task.completed_at.map(|t| t.to_rfc3339()),
                task.actual_duration_minutes,
                task.quality_score,
                task.inspector_notes,
                task.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// A hotel's tasks, most urgent first
    pub fn list_by_hotel(
        &self,
        hotel_id: Uuid,
        status: Option<HousekeepingTaskStatus>,
    ) -> Result<Vec<HousekeepingTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM housekeeping_tasks t
             WHERE t.hotel_id = ?1 AND (?2 IS NULL OR t.status = ?2)
             ORDER BY CASE t.priority
                 WHEN 'CRITICAL' THEN 0 WHEN 'URGENT' THEN 1 WHEN 'HIGH' THEN 2
                 WHEN 'NORMAL' THEN 3 ELSE 4 END,
                 t.created_at"
        ))?;
        let tasks = stmt
            .query_map(
                params![hotel_id.to_string(), status.map(|s| s.as_str())],
                task_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn list_by_staff(&self, staff_id: Uuid) -> Result<Vec<HousekeepingTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM housekeeping_tasks t
             WHERE t.assigned_staff_id = ?1
             ORDER BY t.assigned_at DESC"
        ))?;
        let tasks = stmt
            .query_map(params![staff_id.to_string()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn list_by_room(&self, room_id: Uuid) -> Result<Vec<HousekeepingTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM housekeeping_tasks t WHERE t.room_id = ?1
             ORDER BY t.created_at DESC"
        ))?;
        let tasks = stmt
            .query_map(params![room_id.to_string()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}
