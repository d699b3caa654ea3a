//! Ban lifecycle, audit trail and incremental change feed.
//!
//! Per xuid the lifecycle is `NO_BAN -> ACTIVE -> {EXPIRED | REVOKED}`.
//! Neither `ACTIVE` nor `EXPIRED` is ever stored: only the
//! `expires_at`/`revoked_at` timestamps are, and "active" is recomputed at
//! every read. At most one active ban may exist per xuid; the invariant is
//! enforced by the store itself with a conditional insert, so two
//! concurrent ban calls cannot both insert.

use crate::clock::{now_ms, parse_iso_or_epoch};
use crate::config::Config;
use crate::error::{require_non_blank, CoreResult};
use crate::players;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel::sqlite::SqliteConnection;
use gamebridge_live::LiveBus;
use gamebridge_store::models::{BanRow, NewBanEvent, NewBanTarget};
use gamebridge_store::schema::{ban_events, ban_targets, bans};
use gamebridge_store::{last_insert_id, Db, StoreResult};
use std::sync::Arc;

/// Reason recorded when the caller supplied none.
pub const DEFAULT_REASON: &str = "No reason";

/// Who issued a ban action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorType {
    /// Issued from the admin UI.
    Web,
    /// Enforced and reported by a game server.
    Server,
}

impl ActorType {
    /// Stable storage string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::Web => "WEB",
            ActorType::Server => "SERVER",
        }
    }
}

/// Audit event types written to the ban trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanEventType {
    /// The ban row was created.
    Created,
    /// A game server enforced the ban locally.
    Enforced,
    /// The ban was revoked.
    Revoked,
}

impl BanEventType {
    /// Stable storage string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BanEventType::Created => "CREATED",
            BanEventType::Enforced => "ENFORCED",
            BanEventType::Revoked => "REVOKED",
        }
    }
}

/// A ban reported by a game server that already enforced it locally.
#[derive(Debug, Clone, Default)]
pub struct BanReport {
    /// Banned player.
    pub xuid: String,
    /// Reason; defaults to [`DEFAULT_REASON`] when blank.
    pub reason: Option<String>,
    /// IP enforcement target, if known.
    pub ip: Option<String>,
    /// Hardware-id enforcement target, if known.
    pub hwid: Option<String>,
    /// Ban duration in seconds; `None` or non-positive means permanent.
    pub duration_seconds: Option<i64>,
}

/// One entry of the incremental change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct BanChange {
    /// Ban id; stable across updates to the same ban.
    pub ban_id: i64,
    /// Banned player.
    pub xuid: String,
    /// Reason.
    pub reason: String,
    /// Creation timestamp (epoch ms).
    pub created_at: i64,
    /// Expiry timestamp (epoch ms), if any.
    pub expires_at: Option<i64>,
    /// Revocation timestamp (epoch ms), if any.
    pub revoked_at: Option<i64>,
    /// Last modification timestamp (epoch ms); the feed cursor.
    pub updated_at: i64,
}

/// One page of the change feed.
///
/// The feed never marks "more available": a consumer advances its cursor
/// to the last row's `updated_at`, re-requests, and checks whether the
/// page came back full.
#[derive(Debug, Clone)]
pub struct BanChangePage {
    /// Backend time at the fetch (epoch ms).
    pub server_time: i64,
    /// Changed bans, ascending by `updated_at`.
    pub changes: Vec<BanChange>,
}

/// The ban ledger service.
pub struct BanLedger {
    db: Arc<Db>,
    bus: Arc<LiveBus>,
    config: Config,
}

/// Inserts a ban row unless an active ban for the xuid already exists.
///
/// A single statement, so concurrent callers cannot both pass the check:
/// the first insert wins and the second observes zero affected rows.
const INSERT_BAN_IF_NO_ACTIVE: &str = "INSERT INTO bans \
    (xuid, reason, created_at, expires_at, revoked_at, updated_at, actor_type, actor_username, actor_server_key) \
    SELECT ?, ?, ?, ?, NULL, ?, ?, NULL, ? \
    WHERE NOT EXISTS (SELECT 1 FROM bans \
        WHERE xuid = ? AND revoked_at IS NULL AND (expires_at IS NULL OR expires_at > ?))";

fn insert_ban_if_no_active(
    conn: &mut SqliteConnection,
    xuid: &str,
    reason: &str,
    now: i64,
    expires_at: Option<i64>,
    actor: ActorType,
    actor_server_key: Option<&str>,
) -> StoreResult<usize> {
    Ok(diesel::sql_query(INSERT_BAN_IF_NO_ACTIVE)
        .bind::<Text, _>(xuid)
        .bind::<Text, _>(reason)
        .bind::<BigInt, _>(now)
        .bind::<Nullable<BigInt>, _>(expires_at)
        .bind::<BigInt, _>(now)
        .bind::<Text, _>(actor.as_str())
        .bind::<Nullable<Text>, _>(actor_server_key)
        .bind::<Text, _>(xuid)
        .bind::<BigInt, _>(now)
        .execute(conn)?)
}

fn insert_event(
    conn: &mut SqliteConnection,
    ban_id: i64,
    event_type: BanEventType,
    actor: ActorType,
    actor_server_key: Option<&str>,
    details: Option<&str>,
    now: i64,
) -> StoreResult<()> {
    diesel::insert_into(ban_events::table)
        .values(NewBanEvent {
            ban_id,
            event_type: event_type.as_str().to_string(),
            actor_type: actor.as_str().to_string(),
            actor_username: None,
            actor_server_key: actor_server_key.map(str::to_string),
            details: details.map(str::to_string),
            created_at: now,
        })
        .execute(conn)?;
    Ok(())
}

fn insert_target(
    conn: &mut SqliteConnection,
    ban_id: i64,
    target_type: &str,
    target_value: &str,
) -> StoreResult<()> {
    diesel::insert_or_ignore_into(ban_targets::table)
        .values(NewBanTarget {
            ban_id,
            target_type: target_type.to_string(),
            target_value: target_value.to_string(),
        })
        .execute(conn)?;
    Ok(())
}

fn clean_reason(reason: Option<&str>) -> String {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => DEFAULT_REASON.to_string(),
    }
}

impl BanLedger {
    pub(crate) fn new(db: Arc<Db>, bus: Arc<LiveBus>, config: Config) -> Self {
        Self { db, bus, config }
    }

    /// Bans a player from the admin UI.
    ///
    /// Ensures a player row exists first. When an active ban already
    /// exists the call is a silent idempotent no-op (returns `false`, no
    /// publish). Returns `true` when a new ban row was created.
    pub fn ban_player(
        &self,
        xuid: &str,
        reason: &str,
        duration_hours: Option<i64>,
    ) -> CoreResult<bool> {
        let xuid = require_non_blank(xuid, "xuid")?;
        let reason = clean_reason(Some(reason));
        let now = now_ms();
        let expires_at = duration_hours
            .filter(|h| *h > 0)
            .map(|h| now + h * 3_600_000);

        let inserted = self.db.transaction(|conn| {
            players::upsert_stub(conn, xuid, now)?;
            let rows =
                insert_ban_if_no_active(conn, xuid, &reason, now, expires_at, ActorType::Web, None)?;
            if rows > 0 {
                let ban_id = last_insert_id(conn)?;
                insert_event(conn, ban_id, BanEventType::Created, ActorType::Web, None, None, now)?;
            }
            Ok(rows > 0)
        })?;

        if inserted {
            tracing::debug!(xuid, "player banned");
            self.bus.publish_invalidate(&["bans", "players"]);
        }
        Ok(inserted)
    }

    /// Revokes the active ban for `xuid`, if there is one.
    ///
    /// Bans already revoked or already expired are left untouched. Returns
    /// the number of revoked rows; publishes even when that is zero.
    pub fn unban(&self, xuid: &str) -> CoreResult<usize> {
        let xuid = require_non_blank(xuid, "xuid")?;
        let now = now_ms();

        let revoked = self.db.transaction(|conn| {
            let ids: Vec<i64> = bans::table
                .filter(bans::xuid.eq(xuid))
                .filter(bans::revoked_at.is_null())
                .filter(bans::expires_at.is_null().or(bans::expires_at.gt(now)))
                .select(bans::ban_id)
                .load(conn)?;

            if !ids.is_empty() {
                diesel::update(bans::table.filter(bans::ban_id.eq_any(&ids)))
                    .set((bans::revoked_at.eq(Some(now)), bans::updated_at.eq(now)))
                    .execute(conn)?;
                for ban_id in &ids {
                    insert_event(
                        conn,
                        *ban_id,
                        BanEventType::Revoked,
                        ActorType::Web,
                        None,
                        None,
                        now,
                    )?;
                }
            }
            Ok(ids.len())
        })?;

        tracing::debug!(xuid, revoked, "unban");
        self.bus.publish_invalidate(&["bans", "players"]);
        Ok(revoked)
    }

    /// Records a ban that a game server has already enforced locally.
    ///
    /// One transaction: player stub, ban row, enforcement targets (XUID
    /// always, IP/HWID when supplied), CREATED and ENFORCED audit events.
    /// Any failure rolls the whole write back; callers never observe a
    /// half-written ban. When an active ban already exists the call is an
    /// idempotent no-op (returns `false`, no publish).
    pub fn report_server_ban(&self, server_key: &str, report: &BanReport) -> CoreResult<bool> {
        let sk = require_non_blank(server_key, "serverKey")?;
        let xuid = require_non_blank(&report.xuid, "xuid")?.to_string();
        let reason = clean_reason(report.reason.as_deref());
        let now = now_ms();
        let expires_at = report
            .duration_seconds
            .filter(|s| *s > 0)
            .map(|s| now + s * 1000);

        let inserted = self.db.transaction(|conn| {
            players::upsert_stub(conn, &xuid, now)?;

            let rows = insert_ban_if_no_active(
                conn,
                &xuid,
                &reason,
                now,
                expires_at,
                ActorType::Server,
                Some(sk),
            )?;
            if rows == 0 {
                return Ok(false);
            }
            let ban_id = last_insert_id(conn)?;

            insert_target(conn, ban_id, "XUID", &xuid)?;
            if let Some(ip) = report.ip.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                insert_target(conn, ban_id, "IP", ip)?;
            }
            if let Some(hwid) = report
                .hwid
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
            {
                insert_target(conn, ban_id, "HWID", hwid)?;
            }

            insert_event(conn, ban_id, BanEventType::Created, ActorType::Server, Some(sk), None, now)?;
            insert_event(
                conn,
                ban_id,
                BanEventType::Enforced,
                ActorType::Server,
                Some(sk),
                Some("enforced by game server"),
                now,
            )?;
            Ok(true)
        })?;

        if inserted {
            tracing::debug!(server_key = sk, xuid = %xuid, "server ban recorded");
            self.bus.publish_invalidate(&["bans", "players"]);
        }
        Ok(inserted)
    }

    /// Returns bans modified after the given ISO-8601 cursor.
    ///
    /// Ascending by `updated_at`, capped at the configured page size. A
    /// malformed cursor degrades to the epoch and returns the full
    /// backlog.
    pub fn fetch_changes_since(&self, since_iso: &str) -> CoreResult<BanChangePage> {
        let since = parse_iso_or_epoch(since_iso);

        let rows = self.db.with_conn(|conn| {
            Ok(bans::table
                .filter(bans::updated_at.gt(since))
                .order(bans::updated_at.asc())
                .limit(self.config.ban_feed_max_rows)
                .load::<BanRow>(conn)?)
        })?;

        Ok(BanChangePage {
            server_time: now_ms(),
            changes: rows
                .into_iter()
                .map(|row| BanChange {
                    ban_id: row.ban_id,
                    xuid: row.xuid,
                    reason: row.reason,
                    created_at: row.created_at,
                    expires_at: row.expires_at,
                    revoked_at: row.revoked_at,
                    updated_at: row.updated_at,
                })
                .collect(),
        })
    }

    /// Whether `xuid` currently has an active ban.
    pub fn has_active_ban(&self, xuid: &str) -> CoreResult<bool> {
        let xuid = require_non_blank(xuid, "xuid")?;
        let now = now_ms();
        let count: i64 = self.db.with_conn(|conn| {
            Ok(bans::table
                .filter(bans::xuid.eq(xuid))
                .filter(bans::revoked_at.is_null())
                .filter(bans::expires_at.is_null().or(bans::expires_at.gt(now)))
                .count()
                .get_result(conn)?)
        })?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ledger() -> (BanLedger, Arc<Db>, Arc<LiveBus>) {
        let db = Arc::new(Db::open_in_memory().unwrap());
        let bus = Arc::new(LiveBus::new());
        let ledger = BanLedger::new(Arc::clone(&db), Arc::clone(&bus), Config::default());
        (ledger, db, bus)
    }

    fn active_count(db: &Db, xuid: &str) -> i64 {
        let now = now_ms();
        db.with_conn(|conn| {
            Ok(bans::table
                .filter(bans::xuid.eq(xuid))
                .filter(bans::revoked_at.is_null())
                .filter(bans::expires_at.is_null().or(bans::expires_at.gt(now)))
                .count()
                .get_result::<i64>(conn)?)
        })
        .unwrap()
    }

    fn event_types(db: &Db, ban_id: i64) -> Vec<String> {
        db.with_conn(|conn| {
            Ok(ban_events::table
                .filter(ban_events::ban_id.eq(ban_id))
                .order(ban_events::id.asc())
                .select(ban_events::event_type)
                .load::<String>(conn)?)
        })
        .unwrap()
    }

    #[test]
    fn ban_player_creates_one_active_ban() {
        let (ledger, db, _bus) = ledger();
        assert!(ledger.ban_player("X1", "spam", Some(24)).unwrap());
        assert_eq!(active_count(&db, "X1"), 1);
        assert!(ledger.has_active_ban("X1").unwrap());
    }

    #[test]
    fn banning_twice_is_a_silent_noop() {
        let (ledger, db, bus) = ledger();
        let sub = bus.subscribe();

        assert!(ledger.ban_player("X1", "spam", None).unwrap());
        assert!(sub.poll(Duration::from_millis(100)).is_some());

        assert!(!ledger.ban_player("X1", "again", None).unwrap());
        assert_eq!(active_count(&db, "X1"), 1);
        // The no-op does not publish.
        assert!(sub.poll(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn blank_reason_gets_the_placeholder() {
        let (ledger, db, _bus) = ledger();
        ledger.ban_player("X1", "   ", None).unwrap();
        let reason: String = db
            .with_conn(|conn| {
                Ok(bans::table
                    .filter(bans::xuid.eq("X1"))
                    .select(bans::reason)
                    .first(conn)?)
            })
            .unwrap();
        assert_eq!(reason, DEFAULT_REASON);
    }

    #[test]
    fn unban_revokes_only_active_bans() {
        let (ledger, db, _bus) = ledger();
        ledger.ban_player("X1", "spam", None).unwrap();

        assert_eq!(ledger.unban("X1").unwrap(), 1);
        assert_eq!(active_count(&db, "X1"), 0);
        assert!(!ledger.has_active_ban("X1").unwrap());

        // Second unban touches nothing but still succeeds.
        assert_eq!(ledger.unban("X1").unwrap(), 0);
    }

    #[test]
    fn unban_writes_a_revoked_event() {
        let (ledger, db, _bus) = ledger();
        ledger.ban_player("X1", "spam", None).unwrap();
        ledger.unban("X1").unwrap();
        assert_eq!(event_types(&db, 1), vec!["CREATED", "REVOKED"]);
    }

    #[test]
    fn rebanning_after_unban_creates_a_new_ban() {
        let (ledger, db, _bus) = ledger();
        ledger.ban_player("X1", "spam", None).unwrap();
        ledger.unban("X1").unwrap();
        assert!(ledger.ban_player("X1", "again", None).unwrap());
        assert_eq!(active_count(&db, "X1"), 1);

        let total: i64 = db
            .with_conn(|conn| {
                Ok(bans::table
                    .filter(bans::xuid.eq("X1"))
                    .count()
                    .get_result(conn)?)
            })
            .unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn expired_ban_does_not_block_a_new_one() {
        let (ledger, db, _bus) = ledger();
        ledger.ban_player("X1", "spam", Some(1)).unwrap();
        // Age the ban past its expiry.
        db.with_conn(|conn| {
            Ok(diesel::update(bans::table.filter(bans::xuid.eq("X1")))
                .set(bans::expires_at.eq(Some(now_ms() - 1000)))
                .execute(conn)?)
        })
        .unwrap();

        assert!(!ledger.has_active_ban("X1").unwrap());
        assert!(ledger.ban_player("X1", "again", None).unwrap());
        assert_eq!(active_count(&db, "X1"), 1);
    }

    #[test]
    fn unban_skips_expired_bans() {
        let (ledger, db, _bus) = ledger();
        ledger.ban_player("X1", "spam", Some(1)).unwrap();
        db.with_conn(|conn| {
            Ok(diesel::update(bans::table.filter(bans::xuid.eq("X1")))
                .set(bans::expires_at.eq(Some(now_ms() - 1000)))
                .execute(conn)?)
        })
        .unwrap();

        assert_eq!(ledger.unban("X1").unwrap(), 0);
        let revoked: Option<i64> = db
            .with_conn(|conn| {
                Ok(bans::table
                    .filter(bans::xuid.eq("X1"))
                    .select(bans::revoked_at)
                    .first(conn)?)
            })
            .unwrap();
        assert!(revoked.is_none());
    }

    #[test]
    fn report_writes_ban_targets_and_events() {
        let (ledger, db, _bus) = ledger();
        let report = BanReport {
            xuid: "X2".into(),
            reason: Some("cheating".into()),
            ip: Some("1.2.3.4".into()),
            hwid: None,
            duration_seconds: Some(3600),
        };
        assert!(ledger.report_server_ban("srv1", &report).unwrap());

        let targets: Vec<(String, String)> = db
            .with_conn(|conn| {
                Ok(ban_targets::table
                    .order(ban_targets::id.asc())
                    .select((ban_targets::target_type, ban_targets::target_value))
                    .load(conn)?)
            })
            .unwrap();
        assert_eq!(
            targets,
            vec![
                ("XUID".to_string(), "X2".to_string()),
                ("IP".to_string(), "1.2.3.4".to_string())
            ]
        );
        assert_eq!(event_types(&db, 1), vec!["CREATED", "ENFORCED"]);

        let ban: BanRow = db
            .with_conn(|conn| Ok(bans::table.filter(bans::xuid.eq("X2")).first(conn)?))
            .unwrap();
        assert_eq!(ban.actor_type, "SERVER");
        assert_eq!(ban.actor_server_key.as_deref(), Some("srv1"));
        assert!(ban.expires_at.is_some());
    }

    #[test]
    fn report_for_already_banned_player_is_a_noop() {
        let (ledger, db, _bus) = ledger();
        ledger.ban_player("X2", "spam", None).unwrap();

        let report = BanReport {
            xuid: "X2".into(),
            ..BanReport::default()
        };
        assert!(!ledger.report_server_ban("srv1", &report).unwrap());
        assert_eq!(active_count(&db, "X2"), 1);

        let target_count: i64 = db
            .with_conn(|conn| Ok(ban_targets::table.count().get_result(conn)?))
            .unwrap();
        assert_eq!(target_count, 0);
    }

    #[test]
    fn report_validates_inputs() {
        let (ledger, _db, _bus) = ledger();
        let report = BanReport {
            xuid: "  ".into(),
            ..BanReport::default()
        };
        assert!(ledger.report_server_ban("srv1", &report).is_err());
        let report = BanReport {
            xuid: "X1".into(),
            ..BanReport::default()
        };
        assert!(ledger.report_server_ban("", &report).is_err());
    }

    #[test]
    fn change_feed_tracks_the_lifecycle() {
        let (ledger, _db, _bus) = ledger();
        ledger.ban_player("X1", "spam", Some(24)).unwrap();

        let page = ledger.fetch_changes_since("1970-01-01T00:00:00Z").unwrap();
        assert_eq!(page.changes.len(), 1);
        let change = &page.changes[0];
        assert_eq!(change.xuid, "X1");
        assert!(change.expires_at.is_some());
        assert!(change.revoked_at.is_none());
        let ban_id = change.ban_id;

        ledger.unban("X1").unwrap();
        let page = ledger.fetch_changes_since("1970-01-01T00:00:00Z").unwrap();
        assert_eq!(page.changes.len(), 1);
        let change = &page.changes[0];
        assert_eq!(change.ban_id, ban_id);
        assert!(change.revoked_at.is_some());
    }

    #[test]
    fn change_feed_cursor_filters_older_rows() {
        let (ledger, _db, _bus) = ledger();
        ledger.ban_player("X1", "spam", None).unwrap();

        let page = ledger.fetch_changes_since("1970-01-01T00:00:00Z").unwrap();
        let last = page.changes.last().unwrap().updated_at;
        let cursor = crate::clock::to_iso(last);
        let page = ledger.fetch_changes_since(&cursor).unwrap();
        assert!(page.changes.is_empty());
    }

    #[test]
    fn malformed_cursor_returns_full_backlog() {
        let (ledger, _db, _bus) = ledger();
        ledger.ban_player("X1", "spam", None).unwrap();
        let page = ledger.fetch_changes_since("garbage").unwrap();
        assert_eq!(page.changes.len(), 1);
    }
}
