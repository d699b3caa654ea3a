//! Stable JSON wire messages.
//!
//! Every field name here is wire vocabulary shared with deployed game
//! servers and the admin UI; renaming one is a breaking protocol change.

use serde::{Deserialize, Serialize};

/// Health probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok` when the process is serving.
    pub status: String,
    /// Backend time, ISO-8601.
    pub server_time: String,
    /// Whether the store answered a liveness probe.
    pub db_ok: bool,
}

/// One open command in a poll response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDto {
    /// Monotonic command id.
    pub id: i64,
    /// Command type, uppercased.
    #[serde(rename = "type")]
    pub cmd_type: String,
    /// Enqueue time, ISO-8601.
    pub created_at: String,
    /// Opaque JSON payload, `null` when absent.
    pub payload_json: Option<String>,
}

/// Commands poll response. Never echoes the server key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandsPollResponse {
    /// Backend time, ISO-8601.
    pub server_time: String,
    /// Open commands, ascending by id.
    pub commands: Vec<CommandDto>,
}

/// Command acknowledgement request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    /// Acknowledging agent.
    pub server_key: String,
    /// Command id being acknowledged.
    pub id: i64,
}

/// One entry of the ban change feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanChangeDto {
    /// Always `BAN_UPSERT`.
    #[serde(rename = "type")]
    pub change_type: String,
    /// Ban id, stable across updates.
    pub ban_id: i64,
    /// Banned player.
    pub xuid: String,
    /// Reason.
    pub reason: String,
    /// Creation time, ISO-8601.
    pub created_at: String,
    /// Expiry time, ISO-8601, `null` for permanent bans.
    pub expires_at: Option<String>,
    /// Revocation time, ISO-8601, `null` while not revoked.
    pub revoked_at: Option<String>,
    /// Last modification time, ISO-8601; the consumer's next cursor.
    pub updated_at: String,
}

/// Ban change feed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanChangesResponse {
    /// Backend time, ISO-8601.
    pub server_time: String,
    /// Changed bans, ascending by `updatedAt`.
    pub changes: Vec<BanChangeDto>,
}

/// A ban already enforced by a game server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanReportRequest {
    /// Banned player.
    pub xuid: String,
    /// Reason; a placeholder is recorded when blank.
    #[serde(default)]
    pub reason: Option<String>,
    /// IP enforcement target.
    #[serde(default)]
    pub ip: Option<String>,
    /// Hardware-id enforcement target.
    #[serde(default)]
    pub hwid: Option<String>,
    /// Ban duration in seconds; absent or non-positive means permanent.
    #[serde(default)]
    pub duration_seconds: Option<i64>,
}

/// Envelope for a ban report: the reporting agent plus the ban itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanReportEnvelope {
    /// Reporting agent.
    pub server_key: String,
    /// The enforced ban.
    pub ban: BanReportRequest,
}

/// One reported presence entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntryDto {
    /// Player id; entries without one are skipped.
    #[serde(default)]
    pub xuid: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Online flag; mode-dependent default when absent.
    #[serde(default)]
    pub online: Option<bool>,
    /// Reported IP.
    #[serde(default)]
    pub ip: Option<String>,
    /// Reported hardware id.
    #[serde(default)]
    pub hwid: Option<String>,
}

/// Presence request: either the legacy bare array or the snapshot
/// envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresenceRequest {
    /// Legacy clients POST just the players array (event mode).
    Players(Vec<PresenceEntryDto>),
    /// Envelope with an optional snapshot flag.
    #[serde(rename_all = "camelCase")]
    Envelope {
        /// When true, the list is the complete online set.
        #[serde(default)]
        snapshot: Option<bool>,
        /// Reported players.
        players: Vec<PresenceEntryDto>,
    },
}

impl PresenceRequest {
    /// Splits the request into its mode flag and entries.
    pub fn into_parts(self) -> (bool, Vec<PresenceEntryDto>) {
        match self {
            PresenceRequest::Players(players) => (false, players),
            PresenceRequest::Envelope { snapshot, players } => {
                (snapshot.unwrap_or(false), players)
            }
        }
    }
}

/// Telemetry ingest request.
///
/// Numeric fields are accepted as any JSON number (agents have been seen
/// sending `512.0` for integers) and normalized on ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsIngestRequest {
    /// Reporting agent.
    pub server_key: String,
    /// RAM in use, MB.
    #[serde(default)]
    pub ram_used_mb: Option<f64>,
    /// RAM ceiling, MB.
    #[serde(default)]
    pub ram_max_mb: Option<f64>,
    /// CPU load.
    #[serde(default)]
    pub cpu_load: Option<f64>,
    /// Players currently online.
    #[serde(default)]
    pub players_online: Option<f64>,
    /// Player slot ceiling.
    #[serde(default)]
    pub players_max: Option<f64>,
    /// Ticks per second.
    #[serde(default)]
    pub tps: Option<f64>,
    /// Receive throughput, kbps.
    #[serde(default)]
    pub rx_kbps: Option<f64>,
    /// Transmit throughput, kbps.
    #[serde(default)]
    pub tx_kbps: Option<f64>,
}

/// One stats delta entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsEntryDto {
    /// Player id; entries without one are skipped.
    #[serde(default)]
    pub xuid: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Playtime since the last report, seconds.
    #[serde(default)]
    pub playtime_delta_seconds: Option<i64>,
    /// Kills since the last report.
    #[serde(default)]
    pub kills_delta: Option<i64>,
    /// Deaths since the last report.
    #[serde(default)]
    pub deaths_delta: Option<i64>,
}

/// Stats batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBatchRequest {
    /// Reported players.
    pub players: Vec<StatsEntryDto>,
}

/// Latest telemetry snapshot for the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    /// Snapshot time, ISO-8601.
    pub updated_at: String,
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

/// One telemetry history point for charting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPointDto {
    /// Sample time, ISO-8601.
    pub at: String,
    /// Players online at the sample.
    pub players_online: Option<i32>,
    /// Ticks per second at the sample.
    pub tps: Option<f64>,
    /// CPU load at the sample.
    pub cpu_load: Option<f64>,
    /// RAM in use at the sample, MB.
    pub ram_used_mb: Option<i32>,
}

/// Telemetry history response, chronological.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsHistoryResponse {
    /// Backend time, ISO-8601.
    pub server_time: String,
    /// History points, oldest first.
    pub points: Vec<MetricPointDto>,
}
