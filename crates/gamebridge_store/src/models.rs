//! Row models for the gamebridge tables.
//!
//! `*Row` structs are `Queryable` and mirror the column order declared in
//! [`crate::schema`]; `New*` structs are `Insertable` and omit
//! store-generated ids.

use diesel::prelude::*;

/// A player row.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct PlayerRow {
    /// Opaque stable player id.
    pub xuid: String,
    /// Most recently reported display name.
    pub last_name: String,
    /// When the player was first seen (epoch ms).
    pub first_seen_at: i64,
    /// Last confirmed presence (epoch ms).
    pub last_seen_at: i64,
    /// Whether the player is currently considered online.
    pub online: bool,
    /// When the online flag last changed (epoch ms).
    pub online_updated_at: i64,
    /// Last known IP, sticky across reports.
    pub last_ip: Option<String>,
    /// Last known hardware id, sticky across reports.
    pub last_hwid: Option<String>,
}

/// Insertable player row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::players)]
pub struct NewPlayer {
    /// Opaque stable player id.
    pub xuid: String,
    /// Display name ("Unknown" when not reported).
    pub last_name: String,
    /// First-seen timestamp (epoch ms).
    pub first_seen_at: i64,
    /// Last-seen timestamp (epoch ms).
    pub last_seen_at: i64,
    /// Online flag.
    pub online: bool,
    /// Online-flag-updated timestamp (epoch ms).
    pub online_updated_at: i64,
    /// Last known IP, if reported.
    pub last_ip: Option<String>,
    /// Last known hardware id, if reported.
    pub last_hwid: Option<String>,
}

/// A ban ledger row.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct BanRow {
    /// Monotonic ban id.
    pub ban_id: i64,
    /// Banned player.
    pub xuid: String,
    /// Human-readable reason.
    pub reason: String,
    /// Creation timestamp (epoch ms).
    pub created_at: i64,
    /// Expiry timestamp (epoch ms), `None` for permanent bans.
    pub expires_at: Option<i64>,
    /// Revocation timestamp (epoch ms), `None` while not revoked.
    pub revoked_at: Option<i64>,
    /// Last modification timestamp (epoch ms); drives the change feed.
    pub updated_at: i64,
    /// Actor classification: `WEB` or `SERVER`.
    pub actor_type: String,
    /// Acting admin username, when issued from the UI.
    pub actor_username: Option<String>,
    /// Originating server key, when reported by a game server.
    pub actor_server_key: Option<String>,
}

/// A ban enforcement target row.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct BanTargetRow {
    /// Row id.
    pub id: i64,
    /// Owning ban.
    pub ban_id: i64,
    /// Target type: `XUID`, `IP` or `HWID`.
    pub target_type: String,
    /// Target value.
    pub target_value: String,
}

/// Insertable ban target.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::ban_targets)]
pub struct NewBanTarget {
    /// Owning ban.
    pub ban_id: i64,
    /// Target type: `XUID`, `IP` or `HWID`.
    pub target_type: String,
    /// Target value.
    pub target_value: String,
}

/// An append-only ban audit event row.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct BanEventRow {
    /// Row id.
    pub id: i64,
    /// Owning ban.
    pub ban_id: i64,
    /// Event type: `CREATED`, `ENFORCED` or `REVOKED`.
    pub event_type: String,
    /// Actor classification: `WEB` or `SERVER`.
    pub actor_type: String,
    /// Acting admin username, if any.
    pub actor_username: Option<String>,
    /// Originating server key, if any.
    pub actor_server_key: Option<String>,
    /// Free-form details.
    pub details: Option<String>,
    /// Creation timestamp (epoch ms).
    pub created_at: i64,
}

/// Insertable ban audit event.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::ban_events)]
pub struct NewBanEvent {
    /// Owning ban.
    pub ban_id: i64,
    /// Event type: `CREATED`, `ENFORCED` or `REVOKED`.
    pub event_type: String,
    /// Actor classification: `WEB` or `SERVER`.
    pub actor_type: String,
    /// Acting admin username, if any.
    pub actor_username: Option<String>,
    /// Originating server key, if any.
    pub actor_server_key: Option<String>,
    /// Free-form details.
    pub details: Option<String>,
    /// Creation timestamp (epoch ms).
    pub created_at: i64,
}

/// A queued server command row.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct ServerCommandRow {
    /// Monotonic command id.
    pub id: i64,
    /// Addressed remote agent.
    pub server_key: String,
    /// Command type (stored uppercased).
    pub cmd_type: String,
    /// Optional JSON payload, passed through opaquely.
    pub payload_json: Option<String>,
    /// Enqueue timestamp (epoch ms).
    pub created_at: i64,
    /// Acknowledgement timestamp (epoch ms), set exactly once.
    pub acknowledged_at: Option<i64>,
}

/// Insertable server command.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::server_commands)]
pub struct NewServerCommand {
    /// Addressed remote agent.
    pub server_key: String,
    /// Command type (uppercased).
    pub cmd_type: String,
    /// Optional JSON payload.
    pub payload_json: Option<String>,
    /// Enqueue timestamp (epoch ms).
    pub created_at: i64,
}

/// The latest telemetry snapshot row for one server key.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct MetricsLatestRow {
    /// Reporting server.
    pub server_key: String,
    /// Snapshot timestamp (epoch ms).
    pub updated_at: i64,
    /// RAM in use, MB.
    pub ram_used_mb: Option<i32>,
    /// RAM ceiling, MB.
    pub ram_max_mb: Option<i32>,
    /// CPU load in [0, 1.5].
    pub cpu_load: Option<f64>,
    /// Players currently online.
    pub players_online: Option<i32>,
    /// Player slot ceiling.
    pub players_max: Option<i32>,
    /// Ticks per second.
    pub tps: Option<f64>,
    /// Receive throughput, kbps.
    pub rx_kbps: Option<f64>,
    /// Transmit throughput, kbps.
    pub tx_kbps: Option<f64>,
}

/// Upsert payload for the latest-snapshot table.
///
/// `treat_none_as_null`: a `None` field must overwrite the stored value
/// with NULL, not keep the previous sample's number.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::server_metrics_latest, treat_none_as_null = true)]
pub struct MetricsLatestUpsert {
    /// Reporting server.
    pub server_key: String,
    /// Snapshot timestamp (epoch ms).
    pub updated_at: i64,
    /// RAM in use, MB.
    pub ram_used_mb: Option<i32>,
    /// RAM ceiling, MB.
    pub ram_max_mb: Option<i32>,
    /// CPU load in [0, 1.5].
    pub cpu_load: Option<f64>,
    /// Players currently online.
    pub players_online: Option<i32>,
    /// Player slot ceiling.
    pub players_max: Option<i32>,
    /// Ticks per second.
    pub tps: Option<f64>,
    /// Receive throughput, kbps.
    pub rx_kbps: Option<f64>,
    /// Transmit throughput, kbps.
    pub tx_kbps: Option<f64>,
}

/// Insertable telemetry history row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::server_metrics)]
pub struct NewMetricPoint {
    /// Reporting server.
    pub server_key: String,
    /// Sample timestamp (epoch ms).
    pub created_at: i64,
    /// RAM in use, MB.
    pub ram_used_mb: Option<i32>,
    /// RAM ceiling, MB.
    pub ram_max_mb: Option<i32>,
    /// CPU load in [0, 1.5].
    pub cpu_load: Option<f64>,
    /// Players currently online.
    pub players_online: Option<i32>,
    /// Player slot ceiling.
    pub players_max: Option<i32>,
    /// Ticks per second.
    pub tps: Option<f64>,
    /// Receive throughput, kbps.
    pub rx_kbps: Option<f64>,
    /// Transmit throughput, kbps.
    pub tx_kbps: Option<f64>,
}

/// Accumulated per-player stats row.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct PlayerStatsRow {
    /// Player id.
    pub xuid: String,
    /// Total playtime in seconds.
    pub playtime_seconds: i64,
    /// Total kills.
    pub kills: i64,
    /// Total deaths.
    pub deaths: i64,
    /// Last accumulation timestamp (epoch ms).
    pub updated_at: i64,
}

/// Insertable per-player stats row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::player_stats)]
pub struct NewPlayerStats {
    /// Player id.
    pub xuid: String,
    /// Total playtime in seconds.
    pub playtime_seconds: i64,
    /// Total kills.
    pub kills: i64,
    /// Total deaths.
    pub deaths: i64,
    /// Last accumulation timestamp (epoch ms).
    pub updated_at: i64,
}

/// An admin audit log row.
#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct AuditEntryRow {
    /// Row id.
    pub id: i64,
    /// Acting admin username, if known.
    pub actor_username: Option<String>,
    /// Stable action identifier, e.g. `bans.create`.
    pub action_key: String,
    /// Free-form details; never secrets.
    pub details: Option<String>,
    /// Creation timestamp (epoch ms).
    pub created_at: i64,
}

/// Insertable audit entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::audit_log)]
pub struct NewAuditEntry {
    /// Acting admin username, if known.
    pub actor_username: Option<String>,
    /// Stable action identifier.
    pub action_key: String,
    /// Free-form details; never secrets.
    pub details: Option<String>,
    /// Creation timestamp (epoch ms).
    pub created_at: i64,
}
