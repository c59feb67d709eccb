//! User storage operations
//!
//! Roles live in `user_roles`; reads fold them back in with `GROUP_CONCAT`.

use std::collections::BTreeSet;

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::in_transaction;
use super::parse::{
    parse_datetime, parse_datetime_opt, parse_enum, parse_uuid, parse_uuid_opt, OptionalExt,
};
use crate::error::Result;
use crate::models::{Page, PageRequest, User, UserRole};
use crate::scope::TenantScope;

const COLUMNS: &str = "u.id, u.tenant_id, u.hotel_id, u.email, u.password_hash, u.first_name, \
                       u.last_name, u.phone, u.is_active, u.created_at, u.updated_at, \
                       u.last_login, \
                       (SELECT GROUP_CONCAT(ur.role) FROM user_roles ur WHERE ur.user_id = u.id)";

fn parse_roles(list: Option<String>) -> rusqlite::Result<BTreeSet<UserRole>> {
    list.as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_enum(s, "user role", UserRole::from_str))
        .collect()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid_opt(row.get(1)?)?,
        hotel_id: parse_uuid_opt(row.get(2)?)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        first_name: row.get(5)?,
        last_name: row.get(6)?,
        phone: row.get(7)?,
        is_active: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(10)?)?,
        last_login: parse_datetime_opt(row.get(11)?)?,
        roles: parse_roles(row.get(12)?)?,
    })
}

fn write_roles(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "DELETE FROM user_roles WHERE user_id = ?1",
        params![user.id.to_string()],
    )?;
    let mut stmt = conn.prepare("INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)")?;
    for role in &user.roles {
        stmt.execute(params![user.id.to_string(), role.as_str()])?;
    }
    Ok(())
}

/// Filters for user listings
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub hotel_id: Option<Uuid>,
    pub role: Option<UserRole>,
    /// Matched against email, first and last name
    pub query: Option<String>,
}

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a user together with its roles
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn create(&self, user: &User) -> Result<()> {
        in_transaction(self.conn, |conn| {
            conn.execute(
                "INSERT INTO users (id, tenant_id, hotel_id, email, password_hash, first_name,
                    last_name, phone, is_active, created_at, updated_at, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    user.id.to_string(),
                    user.tenant_id.map(|id| id.to_string()),
                    user.hotel_id.map(|id| id.to_string()),
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.phone,
                    user.is_active,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                    user.last_login.map(|t| t.to_rfc3339()),
                ],
            )?;
            write_roles(conn, user)
        })
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM users u
                     WHERE u.id = ?1 AND (?2 IS NULL OR u.tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users u WHERE u.email = ?1"),
                params![email.trim().to_lowercase()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2)",
            params![email.trim().to_lowercase(), except.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Update profile fields and replace the role set
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn update(&self, user: &User) -> Result<()> {
        in_transaction(self.conn, |conn| {
            conn.execute(
                "UPDATE users SET tenant_id = ?1, hotel_id = ?2, email = ?3, password_hash = ?4,
                    first_name = ?5, last_name = ?6, phone = ?7, is_active = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    user.tenant_id.map(|id| id.to_string()),
                    user.hotel_id.map(|id| id.to_string()),
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.phone,
                    user.is_active,
                    Utc::now().to_rfc3339(),
                    user.id.to_string(),
                ],
            )?;
            write_roles(conn, user)
        })
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn update_last_login(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn list(
        &self,
        scope: TenantScope,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>> {
        let pattern = filter.query.as_ref().map(|q| format!("%{}%", q.trim()));
        let hotel = filter.hotel_id.map(|id| id.to_string());
        let role = filter.role.map(|r| r.as_str());
        let predicate = "(?1 IS NULL OR u.tenant_id = ?1)
              AND (?2 IS NULL OR u.hotel_id = ?2)
              AND (?3 IS NULL OR EXISTS (
                  SELECT 1 FROM user_roles ur WHERE ur.user_id = u.id AND ur.role = ?3))
              AND (?4 IS NULL OR u.email LIKE ?4 OR u.first_name LIKE ?4 OR u.last_name LIKE ?4)";

        let total: u64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM users u WHERE {predicate}"),
            params![scope.param(), hotel, role, pattern],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM users u WHERE {predicate}
             ORDER BY u.last_name, u.first_name LIMIT ?5 OFFSET ?6"
        ))?;
        let users = stmt
            .query_map(
                params![scope.param(), hotel, role, pattern, page.limit(), page.offset()],
                user_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(users, page, total))
    }

    /// Active users holding `role`, optionally restricted to one hotel
    pub fn list_by_role(&self, role: UserRole, hotel_id: Option<Uuid>) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM users u
             WHERE u.is_active = 1
               AND EXISTS (SELECT 1 FROM user_roles ur WHERE ur.user_id = u.id AND ur.role = ?1)
               AND (?2 IS NULL OR u.hotel_id = ?2)
             ORDER BY u.last_name, u.first_name"
        ))?;
        let users = stmt
            .query_map(
                params![role.as_str(), hotel_id.map(|id| id.to_string())],
                user_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn count_with_role(&self, role: UserRole) -> Result<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM user_roles WHERE role = ?1",
            params![role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
