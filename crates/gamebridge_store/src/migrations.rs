//! Embedded DDL migrations.
//!
//! The full schema is created with `IF NOT EXISTS` statements on every open,
//! so a fresh database and an existing one go through the same path.

use crate::error::{StoreError, StoreResult};
use diesel::sql_query;
use diesel::sqlite::SqliteConnection;
use diesel::RunQueryDsl;

const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS players (
        xuid TEXT PRIMARY KEY NOT NULL,
        last_name TEXT NOT NULL DEFAULT 'Unknown',
        first_seen_at INTEGER NOT NULL,
        last_seen_at INTEGER NOT NULL,
        online INTEGER NOT NULL DEFAULT 0,
        online_updated_at INTEGER NOT NULL,
        last_ip TEXT,
        last_hwid TEXT
    )",
    "CREATE TABLE IF NOT EXISTS bans (
        ban_id INTEGER PRIMARY KEY AUTOINCREMENT,
        xuid TEXT NOT NULL,
        reason TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        expires_at INTEGER,
        revoked_at INTEGER,
        updated_at INTEGER NOT NULL,
        actor_type TEXT NOT NULL,
        actor_username TEXT,
        actor_server_key TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_bans_xuid ON bans(xuid)",
    "CREATE INDEX IF NOT EXISTS idx_bans_updated_at ON bans(updated_at)",
    "CREATE TABLE IF NOT EXISTS ban_targets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ban_id INTEGER NOT NULL REFERENCES bans(ban_id),
        target_type TEXT NOT NULL,
        target_value TEXT NOT NULL,
        UNIQUE(ban_id, target_type, target_value)
    )",
    "CREATE TABLE IF NOT EXISTS ban_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ban_id INTEGER NOT NULL REFERENCES bans(ban_id),
        event_type TEXT NOT NULL,
        actor_type TEXT NOT NULL,
        actor_username TEXT,
        actor_server_key TEXT,
        details TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_ban_events_ban_id ON ban_events(ban_id)",
    "CREATE TABLE IF NOT EXISTS server_commands (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_key TEXT NOT NULL,
        cmd_type TEXT NOT NULL,
        payload_json TEXT,
        created_at INTEGER NOT NULL,
        acknowledged_at INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_server_commands_poll
        ON server_commands(server_key, acknowledged_at, id)",
    "CREATE TABLE IF NOT EXISTS server_metrics_latest (
        server_key TEXT PRIMARY KEY NOT NULL,
        updated_at INTEGER NOT NULL,
        ram_used_mb INTEGER,
        ram_max_mb INTEGER,
        cpu_load REAL,
        players_online INTEGER,
        players_max INTEGER,
        tps REAL,
        rx_kbps REAL,
        tx_kbps REAL
    )",
    "CREATE TABLE IF NOT EXISTS server_metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_key TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        ram_used_mb INTEGER,
        ram_max_mb INTEGER,
        cpu_load REAL,
        players_online INTEGER,
        players_max INTEGER,
        tps REAL,
        rx_kbps REAL,
        tx_kbps REAL
    )",
    "CREATE INDEX IF NOT EXISTS idx_server_metrics_history
        ON server_metrics(server_key, created_at)",
    "CREATE TABLE IF NOT EXISTS player_stats (
        xuid TEXT PRIMARY KEY NOT NULL,
        playtime_seconds INTEGER NOT NULL DEFAULT 0,
        kills INTEGER NOT NULL DEFAULT 0,
        deaths INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        actor_username TEXT,
        action_key TEXT NOT NULL,
        details TEXT,
        created_at INTEGER NOT NULL
    )",
];

/// Applies all DDL statements to the given connection.
pub(crate) fn run(conn: &mut SqliteConnection) -> StoreResult<()> {
    for ddl in DDL {
        sql_query(*ddl)
            .execute(conn)
            .map_err(|e| StoreError::migration(format!("{e}: {}", first_line(ddl))))?;
    }
    Ok(())
}

fn first_line(ddl: &str) -> &str {
    ddl.lines().next().unwrap_or(ddl).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::Connection;

    #[test]
    fn migrations_apply_cleanly() {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        run(&mut conn).unwrap();
        // Idempotent: a second pass must not fail.
        run(&mut conn).unwrap();
    }
}
