//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Tenants: isolated customer organizations
            CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                subdomain TEXT NOT NULL UNIQUE,
                description TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS hotels (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                address TEXT NOT NULL,
                city TEXT NOT NULL,
                country TEXT NOT NULL,
                phone TEXT,
                email TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id)
            );

            -- Money columns hold decimal text, prices are never negative
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                hotel_id TEXT NOT NULL,
                room_number TEXT NOT NULL,
                room_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'AVAILABLE',
                price_per_night TEXT NOT NULL,
                capacity INTEGER NOT NULL CHECK (capacity > 0),
                description TEXT,
                is_available INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE,
                UNIQUE(hotel_id, room_number)
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                tenant_id TEXT,
                hotel_id TEXT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                phone TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_login TEXT,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                PRIMARY KEY (user_id, role),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- seq feeds the public confirmation number
            CREATE TABLE IF NOT EXISTS reservations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                tenant_id TEXT NOT NULL,
                hotel_id TEXT NOT NULL,
                room_id TEXT NOT NULL,
                guest_id TEXT,
                guest_name TEXT NOT NULL,
                guest_email TEXT NOT NULL,
                guest_phone TEXT,
                confirmation_number TEXT NOT NULL UNIQUE,
                check_in TEXT NOT NULL,
                check_out TEXT NOT NULL,
                guests INTEGER NOT NULL CHECK (guests > 0),
                total_amount TEXT NOT NULL,
                status TEXT NOT NULL,
                promo_code TEXT,
                special_requests TEXT,
                payment_method TEXT,
                cancellation_reason TEXT,
                cancelled_at TEXT,
                actual_check_in TEXT,
                actual_check_out TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (check_in < check_out),
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (hotel_id) REFERENCES hotels(id),
                FOREIGN KEY (room_id) REFERENCES rooms(id),
                FOREIGN KEY (guest_id) REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                hotel_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL,
                price TEXT NOT NULL,
                stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
                sku TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS shop_orders (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                hotel_id TEXT NOT NULL,
                order_number TEXT NOT NULL UNIQUE,
                reservation_id TEXT,
                customer_name TEXT NOT NULL,
                customer_email TEXT,
                room_number TEXT,
                status TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                tax_amount TEXT NOT NULL,
                payment_method TEXT,
                is_delivery INTEGER NOT NULL DEFAULT 0,
                delivery_address TEXT,
                is_paid INTEGER NOT NULL DEFAULT 0,
                paid_at TEXT,
                payment_reference TEXT,
                notes TEXT,
                completed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (hotel_id) REFERENCES hotels(id),
                FOREIGN KEY (reservation_id) REFERENCES reservations(id)
            );

            CREATE TABLE IF NOT EXISTS shop_order_items (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                product_id TEXT NOT NULL,
                product_name TEXT NOT NULL,
                product_sku TEXT,
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                unit_price TEXT NOT NULL,
                FOREIGN KEY (order_id) REFERENCES shop_orders(id) ON DELETE CASCADE,
                FOREIGN KEY (product_id) REFERENCES products(id)
            );

            -- Hotel-scoped: tenant comes from the owning hotel
            CREATE TABLE IF NOT EXISTS housekeeping_tasks (
                id TEXT PRIMARY KEY,
                hotel_id TEXT NOT NULL,
                room_id TEXT NOT NULL,
                assigned_staff_id TEXT,
                task_type TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                description TEXT,
                special_instructions TEXT,
                created_at TEXT NOT NULL,
                assigned_at TEXT,
                started_at TEXT,
                completed_at TEXT,
                estimated_duration_minutes INTEGER NOT NULL,
                actual_duration_minutes INTEGER,
                quality_score INTEGER CHECK (quality_score BETWEEN 1 AND 5),
                inspector_notes TEXT,
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE,
                FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE,
                FOREIGN KEY (assigned_staff_id) REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS maintenance_tasks (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                hotel_id TEXT NOT NULL,
                room_id TEXT,
                task_type TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                assigned_to TEXT,
                created_by TEXT NOT NULL,
                location TEXT,
                estimated_cost TEXT,
                actual_cost TEXT,
                scheduled_start TEXT,
                actual_start TEXT,
                actual_end TEXT,
                work_performed TEXT,
                verification_notes TEXT,
                verified_by TEXT,
                verified_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE,
                FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE SET NULL,
                FOREIGN KEY (assigned_to) REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS room_charges (
                id TEXT PRIMARY KEY,
                hotel_id TEXT NOT NULL,
                reservation_id TEXT NOT NULL,
                shop_order_id TEXT,
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                charge_type TEXT NOT NULL,
                is_paid INTEGER NOT NULL DEFAULT 0,
                paid_at TEXT,
                payment_reference TEXT,
                created_by TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE,
                FOREIGN KEY (reservation_id) REFERENCES reservations(id) ON DELETE CASCADE,
                FOREIGN KEY (shop_order_id) REFERENCES shop_orders(id) ON DELETE SET NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add pricing configuration",
        sql: r#"
            CREATE TABLE IF NOT EXISTS pricing_strategies (
                id TEXT PRIMARY KEY,
                hotel_id TEXT NOT NULL,
                strategy_type TEXT NOT NULL,
                name TEXT NOT NULL,
                base_rate_multiplier TEXT NOT NULL,
                min_occupancy_threshold TEXT,
                max_occupancy_threshold TEXT,
                advance_booking_days INTEGER,
                effective_from TEXT NOT NULL,
                effective_to TEXT,
                room_type TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                priority INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS seasonal_rates (
                id TEXT PRIMARY KEY,
                hotel_id TEXT NOT NULL,
                season_name TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                room_type TEXT,
                adjustment_type TEXT NOT NULL,
                rate_multiplier TEXT NOT NULL,
                fixed_adjustment TEXT,
                priority INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                CHECK (start_date <= end_date),
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS promotional_codes (
                id TEXT PRIMARY KEY,
                hotel_id TEXT NOT NULL,
                code TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                discount_type TEXT NOT NULL,
                discount_value TEXT NOT NULL,
                max_discount_amount TEXT,
                min_booking_amount TEXT,
                valid_from TEXT NOT NULL,
                valid_to TEXT NOT NULL,
                usage_limit INTEGER,
                usage_count INTEGER NOT NULL DEFAULT 0,
                min_nights INTEGER,
                room_type TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                FOREIGN KEY (hotel_id) REFERENCES hotels(id) ON DELETE CASCADE,
                UNIQUE(hotel_id, code)
            );
        "#,
    },
    Migration {
        version: 3,
        description: "Add hotel registrations",
        sql: r#"
            -- Self-service sign-ups reviewed by a system admin
            CREATE TABLE IF NOT EXISTS hotel_registrations (
                id TEXT PRIMARY KEY,
                hotel_name TEXT NOT NULL,
                description TEXT,
                address TEXT NOT NULL,
                city TEXT NOT NULL,
                country TEXT NOT NULL,
                contact_email TEXT NOT NULL,
                contact_person TEXT NOT NULL,
                phone TEXT,
                status TEXT NOT NULL DEFAULT 'PENDING',
                review_notes TEXT,
                reviewed_by TEXT,
                reviewed_at TEXT,
                tenant_id TEXT,
                hotel_id TEXT,
                submitted_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 4,
        description: "Add indexes for query performance",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_hotels_tenant ON hotels(tenant_id);
            CREATE INDEX IF NOT EXISTS idx_rooms_hotel ON rooms(hotel_id);
            CREATE INDEX IF NOT EXISTS idx_users_tenant ON users(tenant_id);

            -- Overlap check: room + date range
            CREATE INDEX IF NOT EXISTS idx_reservations_room_dates
                ON reservations(room_id, check_in, check_out);
            CREATE INDEX IF NOT EXISTS idx_reservations_hotel_status
                ON reservations(hotel_id, status);
            CREATE INDEX IF NOT EXISTS idx_reservations_guest ON reservations(guest_id);

            CREATE INDEX IF NOT EXISTS idx_products_hotel ON products(hotel_id);
            CREATE INDEX IF NOT EXISTS idx_shop_orders_hotel ON shop_orders(hotel_id, status);
            CREATE INDEX IF NOT EXISTS idx_shop_order_items_order ON shop_order_items(order_id);
            CREATE INDEX IF NOT EXISTS idx_housekeeping_hotel_status
                ON housekeeping_tasks(hotel_id, status);
            CREATE INDEX IF NOT EXISTS idx_housekeeping_staff
                ON housekeeping_tasks(assigned_staff_id);
            CREATE INDEX IF NOT EXISTS idx_maintenance_hotel_status
                ON maintenance_tasks(hotel_id, status);
            CREATE INDEX IF NOT EXISTS idx_room_charges_reservation ON room_charges(reservation_id);
            CREATE INDEX IF NOT EXISTS idx_registrations_status ON hotel_registrations(status);
        "#,
    },
    Migration {
        version: 5,
        description: "Add booking history",
        sql: r#"
            -- One row per status change or modification of a reservation
            CREATE TABLE IF NOT EXISTS booking_history (
                id TEXT PRIMARY KEY,
                reservation_id TEXT NOT NULL,
                hotel_id TEXT NOT NULL,
                action TEXT NOT NULL,
                changed_by TEXT NOT NULL,
                reason TEXT,
                old_values TEXT,
                new_values TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (reservation_id) REFERENCES reservations(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_booking_history_reservation
                ON booking_history(reservation_id, created_at);
        "#,
    },
];

fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Highest applied version, 0 for a fresh database
pub(crate) fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// Apply one migration and record it atomically
fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        params![
            migration.version,
            migration.description,
            Utc::now().to_rfc3339()
        ],
    )?;
    tx.commit()?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let from = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    if pending.is_empty() {
        debug!(version = from, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        info!(
            version = migration.version,
            description = migration.description,
            "Applying migration"
        );
        apply(conn, migration)?;
    }

    let to = current_version(conn)?;
    info!(from, to, "Database schema updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: u32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }

    #[test]
    fn test_reservation_dates_checked_by_schema() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO reservations (id, tenant_id, hotel_id, room_id, guest_name, guest_email,
                confirmation_number, check_in, check_out, guests, total_amount, status,
                created_at, updated_at)
             VALUES ('r', 't', 'h', 'room', 'n', 'e', 'c', '2026-05-02', '2026-05-02', 1, '0',
                'CONFIRMED', 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
