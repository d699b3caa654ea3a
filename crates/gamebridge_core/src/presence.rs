//! Presence reconciliation.
//!
//! Derives online/offline state and last-seen timestamps from periodic,
//! possibly lossy agent reports. Two caller-selected modes:
//!
//! - **Event mode**: each entry is applied independently; players absent
//!   from the payload keep their stored state. This mode cannot detect a
//!   silently-disconnected player.
//! - **Snapshot mode**: the payload is the complete set of currently-online
//!   players; after applying the entries, every other player still marked
//!   online is forced offline in one bulk update. An empty snapshot marks
//!   the whole player set offline.

use crate::clock::now_ms;
use crate::error::CoreResult;
use crate::players::UNKNOWN_NAME;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use gamebridge_live::LiveBus;
use gamebridge_store::models::{NewPlayer, PlayerRow};
use gamebridge_store::schema::players;
use gamebridge_store::{Db, StoreResult};
use std::sync::Arc;

/// One reported presence entry.
#[derive(Debug, Clone, Default)]
pub struct PresenceEntry {
    /// Player id; entries with a blank xuid are skipped.
    pub xuid: String,
    /// Reported display name.
    pub name: Option<String>,
    /// Online flag. When missing, event mode defaults to offline and
    /// snapshot mode to online (presence in the list implies online).
    pub online: Option<bool>,
    /// Reported IP; blank values keep the stored one.
    pub ip: Option<String>,
    /// Reported hardware id; blank values keep the stored one.
    pub hwid: Option<String>,
}

/// The presence reconciler service.
pub struct PresenceReconciler {
    db: Arc<Db>,
    bus: Arc<LiveBus>,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn safe_name(name: &Option<String>) -> String {
    clean(name).unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

fn upsert_one(
    conn: &mut SqliteConnection,
    xuid: &str,
    entry: &PresenceEntry,
    online: bool,
    now: i64,
) -> StoreResult<()> {
    let name = safe_name(&entry.name);
    let ip = clean(&entry.ip);
    let hwid = clean(&entry.hwid);

    let existing = players::table
        .find(xuid)
        .first::<PlayerRow>(conn)
        .optional()?;

    match existing {
        None => {
            diesel::insert_into(players::table)
                .values(NewPlayer {
                    xuid: xuid.to_string(),
                    last_name: name,
                    first_seen_at: now,
                    last_seen_at: now,
                    online,
                    online_updated_at: now,
                    last_ip: ip,
                    last_hwid: hwid,
                })
                .execute(conn)?;
        }
        Some(prev) => {
            // IP and hardware id are sticky: a report without them keeps
            // the previous value. last_seen_at advances only on a
            // confirmed-online report.
            let last_ip = ip.or(prev.last_ip);
            let last_hwid = hwid.or(prev.last_hwid);
            let target = players::table.find(xuid);
            if online {
                diesel::update(target)
                    .set((
                        players::last_name.eq(name),
                        players::last_seen_at.eq(now),
                        players::online.eq(true),
                        players::online_updated_at.eq(now),
                        players::last_ip.eq(last_ip),
                        players::last_hwid.eq(last_hwid),
                    ))
                    .execute(conn)?;
            } else {
                diesel::update(target)
                    .set((
                        players::last_name.eq(name),
                        players::online.eq(false),
                        players::online_updated_at.eq(now),
                        players::last_ip.eq(last_ip),
                        players::last_hwid.eq(last_hwid),
                    ))
                    .execute(conn)?;
            }
        }
    }
    Ok(())
}

fn mark_others_offline(
    conn: &mut SqliteConnection,
    online_xuids: &[String],
    now: i64,
) -> StoreResult<usize> {
    let swept = if online_xuids.is_empty() {
        diesel::update(players::table.filter(players::online.eq(true)))
            .set((players::online.eq(false), players::online_updated_at.eq(now)))
            .execute(conn)?
    } else {
        diesel::update(
            players::table
                .filter(players::online.eq(true))
                .filter(players::xuid.ne_all(online_xuids)),
        )
        .set((players::online.eq(false), players::online_updated_at.eq(now)))
        .execute(conn)?
    };
    Ok(swept)
}

impl PresenceReconciler {
    pub(crate) fn new(db: Arc<Db>, bus: Arc<LiveBus>) -> Self {
        Self { db, bus }
    }

    /// Applies one presence report in the given mode.
    ///
    /// All writes for the call, including the snapshot-mode offline sweep,
    /// run in one transaction. Publishes a `players` invalidation on
    /// success.
    pub fn apply(&self, snapshot: bool, entries: &[PresenceEntry]) -> CoreResult<()> {
        let now = now_ms();

        self.db.transaction(|conn| {
            let mut online_xuids: Vec<String> = Vec::new();

            for entry in entries {
                let xuid = entry.xuid.trim();
                if xuid.is_empty() {
                    continue;
                }
                let online = entry.online.unwrap_or(snapshot);
                upsert_one(conn, xuid, entry, online, now)?;
                if snapshot && online {
                    online_xuids.push(xuid.to_string());
                }
            }

            if snapshot {
                let swept = mark_others_offline(conn, &online_xuids, now)?;
                tracing::debug!(reported = online_xuids.len(), swept, "presence snapshot");
            }
            Ok(())
        })?;

        self.bus.publish_invalidate(&["players"]);
        Ok(())
    }
}
