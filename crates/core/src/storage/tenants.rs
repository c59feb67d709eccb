//! Tenant storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Page, PageRequest, Tenant, TenantStatistics};

const COLUMNS: &str = "id, name, subdomain, description, is_active, created_at, updated_at";

fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        subdomain: row.get(2)?,
        description: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

pub struct TenantStore<'a> {
    conn: &'a Connection,
}

impl<'a> TenantStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, tenant), fields(subdomain = %tenant.subdomain))]
    pub fn create(&self, tenant: &Tenant) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tenants (id, name, subdomain, description, is_active, created_at,
                updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tenant.id.to_string(),
                tenant.name,
                tenant.subdomain,
                tenant.description,
                tenant.is_active,
                tenant.created_at.to_rfc3339(),
                tenant.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        let tenant = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM tenants WHERE id = ?1"),
                params![id.to_string()],
                tenant_from_row,
            )
            .optional()?;
        Ok(tenant)
    }

    pub fn subdomain_taken(&self, subdomain: &str, except: Option<Uuid>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tenants WHERE subdomain = ?1 AND (?2 IS NULL OR id != ?2)",
            params![subdomain, except.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id))]
    pub fn update(&self, tenant: &Tenant) -> Result<()> {
        self.conn.execute(
            "UPDATE tenants SET name = ?1, subdomain = ?2, description = ?3, is_active = ?4,
                updated_at = ?5
             WHERE id = ?6",
            params![
                tenant.name,
                tenant.subdomain,
                tenant.description,
                tenant.is_active,
                Utc::now().to_rfc3339(),
                tenant.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM tenants WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn list(&self, page: PageRequest, active_only: bool) -> Result<Page<Tenant>> {
        let total: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tenants WHERE (?1 = 0 OR is_active = 1)",
            params![active_only],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM tenants WHERE (?1 = 0 OR is_active = 1)
             ORDER BY name LIMIT ?2 OFFSET ?3"
        ))?;
        let tenants = stmt
            .query_map(params![active_only, page.limit(), page.offset()], tenant_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(tenants, page, total))
    }

    pub fn count_hotels(&self, id: Uuid) -> Result<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM hotels WHERE tenant_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn statistics(&self) -> Result<TenantStatistics> {
        let (total, active): (u64, u64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM tenants",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(TenantStatistics {
            total_tenants: total,
            active_tenants: active,
            inactive_tenants: total - active,
        })
    }
}
