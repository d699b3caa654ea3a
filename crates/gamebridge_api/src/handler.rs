//! Request handlers for the backend endpoints.

use crate::error::ApiResult;
use crate::messages::{
    AckRequest, BanChangeDto, BanChangesResponse, BanReportEnvelope, CommandDto,
    CommandsPollResponse, HealthResponse, MetricPointDto, MetricsHistoryResponse,
    MetricsIngestRequest, MetricsSnapshotDto, PresenceRequest, StatsBatchRequest,
};
use crate::sse::LiveStream;
use gamebridge_core::clock::{now_ms, to_iso};
use gamebridge_core::{
    BanReport, Bridge, MetricsSample, PresenceEntry, StatDelta,
};
use std::sync::Arc;

/// Epoch cursor used when a ban-changes request carries none.
const EPOCH_ISO: &str = "1970-01-01T00:00:00Z";

fn int_field(value: Option<f64>) -> Option<i32> {
    value.map(|v| v as i32)
}

/// Synchronous handler for every backend endpoint.
///
/// The transport layer owns routing, authentication and serialization;
/// each method here takes a deserialized request and returns the response
/// message.
pub struct RequestHandler {
    bridge: Arc<Bridge>,
}

impl RequestHandler {
    /// Creates a handler over the wired services.
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    /// `GET /api/server/health`
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            server_time: to_iso(now_ms()),
            db_ok: self.bridge.db().ping(),
        }
    }

    /// `POST /api/server/stats/batch`
    pub fn stats_batch(&self, request: StatsBatchRequest) -> ApiResult<()> {
        let deltas: Vec<StatDelta> = request
            .players
            .into_iter()
            .filter_map(|entry| {
                let xuid = entry.xuid?;
                Some(StatDelta {
                    xuid,
                    name: entry.name,
                    playtime_seconds: entry.playtime_delta_seconds.unwrap_or(0),
                    kills: entry.kills_delta.unwrap_or(0),
                    deaths: entry.deaths_delta.unwrap_or(0),
                })
            })
            .collect();
        self.bridge.stats().apply_batch(&deltas)?;
        Ok(())
    }

    /// `POST /api/server/metrics`
    pub fn metrics_ingest(&self, request: MetricsIngestRequest) -> ApiResult<()> {
        let sample = MetricsSample {
            ram_used_mb: int_field(request.ram_used_mb),
            ram_max_mb: int_field(request.ram_max_mb),
            cpu_load: request.cpu_load,
            players_online: int_field(request.players_online),
            players_max: int_field(request.players_max),
            tps: request.tps,
            rx_kbps: request.rx_kbps,
            tx_kbps: request.tx_kbps,
        };
        self.bridge.metrics().ingest(&request.server_key, sample)?;
        Ok(())
    }

    /// `POST /api/server/presence`
    pub fn presence(&self, request: PresenceRequest) -> ApiResult<()> {
        let (snapshot, players) = request.into_parts();
        let entries: Vec<PresenceEntry> = players
            .into_iter()
            .filter_map(|dto| {
                let xuid = dto.xuid?;
                Some(PresenceEntry {
                    xuid,
                    name: dto.name,
                    online: dto.online,
                    ip: dto.ip,
                    hwid: dto.hwid,
                })
            })
            .collect();
        self.bridge.presence().apply(snapshot, &entries)?;
        Ok(())
    }

    /// `POST /api/server/bans/report`
    pub fn ban_report(&self, request: BanReportEnvelope) -> ApiResult<()> {
        let report = BanReport {
            xuid: request.ban.xuid,
            reason: request.ban.reason,
            ip: request.ban.ip,
            hwid: request.ban.hwid,
            duration_seconds: request.ban.duration_seconds,
        };
        self.bridge
            .bans()
            .report_server_ban(&request.server_key, &report)?;
        Ok(())
    }

    /// `GET /api/server/bans/changes?since=...`
    pub fn ban_changes(&self, since: Option<&str>) -> ApiResult<BanChangesResponse> {
        let since = match since.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => EPOCH_ISO,
        };
        let page = self.bridge.bans().fetch_changes_since(since)?;

        Ok(BanChangesResponse {
            server_time: to_iso(page.server_time),
            changes: page
                .changes
                .into_iter()
                .map(|change| BanChangeDto {
                    change_type: "BAN_UPSERT".to_string(),
                    ban_id: change.ban_id,
                    xuid: change.xuid,
                    reason: change.reason,
                    created_at: to_iso(change.created_at),
                    expires_at: change.expires_at.map(to_iso),
                    revoked_at: change.revoked_at.map(to_iso),
                    updated_at: to_iso(change.updated_at),
                })
                .collect(),
        })
    }

    /// `GET /api/server/commands/poll?serverKey=...&sinceId=...`
    pub fn commands_poll(
        &self,
        server_key: &str,
        since_id: i64,
        limit: Option<i64>,
    ) -> ApiResult<CommandsPollResponse> {
        let batch = self.bridge.commands().poll_open(server_key, since_id, limit)?;

        Ok(CommandsPollResponse {
            server_time: to_iso(batch.server_time),
            commands: batch
                .commands
                .into_iter()
                .map(|cmd| CommandDto {
                    id: cmd.id,
                    cmd_type: cmd.cmd_type,
                    created_at: to_iso(cmd.created_at),
                    payload_json: cmd.payload_json,
                })
                .collect(),
        })
    }

    /// `POST /api/server/commands/ack`
    pub fn commands_ack(&self, request: AckRequest) -> ApiResult<()> {
        self.bridge.commands().ack(&request.server_key, request.id)?;
        Ok(())
    }

    /// `GET /admin/api/live/stats/latest?serverKey=...`
    pub fn metrics_latest(&self, server_key: &str) -> ApiResult<Option<MetricsSnapshotDto>> {
        let snapshot = self.bridge.metrics().load_latest(server_key)?;
        Ok(snapshot.map(|snap| MetricsSnapshotDto {
            updated_at: to_iso(snap.updated_at),
            ram_used_mb: snap.sample.ram_used_mb,
            ram_max_mb: snap.sample.ram_max_mb,
            cpu_load: snap.sample.cpu_load,
            players_online: snap.sample.players_online,
            players_max: snap.sample.players_max,
            tps: snap.sample.tps,
            rx_kbps: snap.sample.rx_kbps,
            tx_kbps: snap.sample.tx_kbps,
        }))
    }

    /// `GET /admin/api/live/stats/history?serverKey=...&limit=...`
    pub fn metrics_history(
        &self,
        server_key: &str,
        limit: Option<i64>,
    ) -> ApiResult<MetricsHistoryResponse> {
        let points = self
            .bridge
            .metrics()
            .load_history(server_key, limit.unwrap_or(600))?;

        Ok(MetricsHistoryResponse {
            server_time: to_iso(now_ms()),
            points: points
                .into_iter()
                .map(|p| MetricPointDto {
                    at: to_iso(p.at),
                    players_online: p.players_online,
                    tps: p.tps,
                    cpu_load: p.cpu_load,
                    ram_used_mb: p.ram_used_mb,
                })
                .collect(),
        })
    }

    /// `GET /admin/api/live/stream`
    ///
    /// Subscribes a new live stream; the transport writes the frames the
    /// stream yields and drops it on disconnect (which unsubscribes).
    pub fn open_stream(&self) -> LiveStream {
        LiveStream::subscribe(Arc::clone(self.bridge.bus()))
            .with_keep_alive(self.bridge.config().keep_alive_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebridge_core::Config;

    fn handler() -> RequestHandler {
        RequestHandler::new(Arc::new(Bridge::in_memory(Config::default()).unwrap()))
    }

    #[test]
    fn health_reports_db_ok() {
        let h = handler();
        let health = h.health();
        assert_eq!(health.status, "ok");
        assert!(health.db_ok);
        assert!(health.server_time.ends_with('Z'));
    }

    #[test]
    fn commands_poll_and_ack_round_trip() {
        let h = handler();
        h.bridge.commands().enqueue("srv1", "reload", None).unwrap();

        let response = h.commands_poll("srv1", 0, None).unwrap();
        assert_eq!(response.commands.len(), 1);
        assert_eq!(response.commands[0].cmd_type, "RELOAD");

        h.commands_ack(AckRequest {
            server_key: "srv1".into(),
            id: response.commands[0].id,
        })
        .unwrap();
        assert!(h.commands_poll("srv1", 0, None).unwrap().commands.is_empty());
    }

    #[test]
    fn commands_poll_rejects_blank_key() {
        let h = handler();
        let err = h.commands_poll("  ", 0, None).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn ban_changes_defaults_to_epoch() {
        let h = handler();
        h.bridge.bans().ban_player("X1", "spam", Some(24)).unwrap();

        let response = h.ban_changes(None).unwrap();
        assert_eq!(response.changes.len(), 1);
        assert_eq!(response.changes[0].change_type, "BAN_UPSERT");
        assert!(response.changes[0].expires_at.is_some());

        let blank = h.ban_changes(Some("  ")).unwrap();
        assert_eq!(blank.changes.len(), 1);
    }

    #[test]
    fn ban_report_goes_through_the_ledger() {
        let h = handler();
        let body = r#"{"serverKey":"srv1","ban":{"xuid":"X2","ip":"1.2.3.4"}}"#;
        let envelope: BanReportEnvelope = serde_json::from_str(body).unwrap();
        h.ban_report(envelope).unwrap();

        assert!(h.bridge.bans().has_active_ban("X2").unwrap());
    }

    #[test]
    fn presence_snapshot_mode_reaches_the_reconciler() {
        use diesel::prelude::*;
        use gamebridge_store::schema::players;

        let h = handler();
        let warmup: PresenceRequest =
            serde_json::from_str(r#"[{"xuid":"A","online":true},{"xuid":"B","online":true}]"#)
                .unwrap();
        h.presence(warmup).unwrap();

        let snapshot: PresenceRequest =
            serde_json::from_str(r#"{"snapshot":true,"players":[{"xuid":"A"}]}"#).unwrap();
        h.presence(snapshot).unwrap();

        // B was absent from the snapshot, so the sweep took it offline.
        let online: Vec<String> = h
            .bridge
            .db()
            .with_conn(|conn| {
                Ok(players::table
                    .filter(players::online.eq(true))
                    .select(players::xuid)
                    .load(conn)?)
            })
            .unwrap();
        assert_eq!(online, vec!["A".to_string()]);
    }

    #[test]
    fn metrics_ingest_truncates_float_integers() {
        let h = handler();
        let request: MetricsIngestRequest =
            serde_json::from_str(r#"{"serverKey":"srv1","ramUsedMb":512.0,"playersOnline":7.0}"#)
                .unwrap();
        h.metrics_ingest(request).unwrap();

        let latest = h.metrics_latest("srv1").unwrap().unwrap();
        assert_eq!(latest.ram_used_mb, Some(512));
        assert_eq!(latest.players_online, Some(7));
    }

    #[test]
    fn metrics_history_is_chronological() {
        let h = handler();
        for _ in 0..2 {
            h.metrics_ingest(MetricsIngestRequest {
                server_key: "srv1".into(),
                tps: Some(20.0),
                ..MetricsIngestRequest::default()
            })
            .unwrap();
        }
        let history = h.metrics_history("srv1", None).unwrap();
        assert_eq!(history.points.len(), 2);
    }

    #[test]
    fn stats_batch_accumulates() {
        let h = handler();
        let request: StatsBatchRequest = serde_json::from_str(
            r#"{"players":[{"xuid":"A","name":"Steve","playtimeDeltaSeconds":60,"killsDelta":2}]}"#,
        )
        .unwrap();
        h.stats_batch(request).unwrap();

        let stats = h.bridge.stats().load("A").unwrap().unwrap();
        assert_eq!(stats.playtime_seconds, 60);
        assert_eq!(stats.kills, 2);
    }
}
