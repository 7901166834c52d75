use tably_sql::SQLStore;

use crate::service::LicensingError;

/// Initialize the SQLite schema for the licensing core.
///
/// The dependent collaborator tables (categories through order_items) are
/// created here because revocation must cascade over them in dependency
/// order; their CRUD lives outside this module.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), LicensingError> {
    let statements = [
        // Activation code ledger. `id` is the code string itself.
        // is_used is a legacy redundant flag kept in sync with status.
        "CREATE TABLE IF NOT EXISTS activation_codes (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            is_used INTEGER NOT NULL DEFAULT 0,
            used_at TEXT,
            expires_at TEXT,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_codes_status ON activation_codes(status)",

        // Provisioned installations. The UNIQUE constraint on
        // activation_code_id is the second line of defense against a
        // double-activation race.
        "CREATE TABLE IF NOT EXISTS restaurants (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            activation_code_id TEXT UNIQUE,
            configured INTEGER NOT NULL DEFAULT 0,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (activation_code_id) REFERENCES activation_codes(id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_restaurants_status ON restaurants(status)",

        // Device registry: one row per device+role pairing.
        "CREATE TABLE IF NOT EXISTS devices (
            id TEXT PRIMARY KEY,
            restaurant_id TEXT NOT NULL,
            role TEXT NOT NULL,
            last_used TEXT NOT NULL,
            data TEXT NOT NULL,
            FOREIGN KEY (restaurant_id) REFERENCES restaurants(id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_devices_restaurant ON devices(restaurant_id)",

        // Append-only audit log.
        "CREATE TABLE IF NOT EXISTS audit_log (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            actor TEXT NOT NULL,
            target TEXT NOT NULL,
            created_at TEXT NOT NULL,
            data TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_log(action)",
        "CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at)",

        // ── Collaborator tables (revocation cascade targets) ──

        "CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            restaurant_id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS menu_items (
            id TEXT PRIMARY KEY,
            restaurant_id TEXT NOT NULL,
            category_id TEXT,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS dining_tables (
            id TEXT PRIMARY KEY,
            restaurant_id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS qr_sessions (
            id TEXT PRIMARY KEY,
            restaurant_id TEXT NOT NULL,
            table_id TEXT,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            restaurant_id TEXT NOT NULL,
            session_id TEXT,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS order_items (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ];

    for stmt in &statements {
        sql.exec(stmt, &[])
            .map_err(|e| LicensingError::Storage(e.to_string()))?;
    }

    Ok(())
}
