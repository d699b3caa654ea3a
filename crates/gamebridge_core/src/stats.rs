//! Per-player statistics accumulation.
//!
//! Game servers report deltas (playtime, kills, deaths) in batches; the
//! backend accumulates them into one row per player. Deltas should never
//! be negative, so negatives are clamped to zero before accumulation.

use crate::clock::now_ms;
use crate::error::CoreResult;
use crate::players;
use diesel::prelude::*;
use gamebridge_live::LiveBus;
use gamebridge_store::models::{NewPlayerStats, PlayerStatsRow};
use gamebridge_store::schema::player_stats;
use gamebridge_store::Db;
use std::sync::Arc;

/// One reported stats delta.
#[derive(Debug, Clone, Default)]
pub struct StatDelta {
    /// Player id; entries with a blank xuid are skipped.
    pub xuid: String,
    /// Reported display name.
    pub name: Option<String>,
    /// Playtime since the last report, seconds.
    pub playtime_seconds: i64,
    /// Kills since the last report.
    pub kills: i64,
    /// Deaths since the last report.
    pub deaths: i64,
}

/// The stats accumulation service.
pub struct PlayerStats {
    db: Arc<Db>,
    bus: Arc<LiveBus>,
}

impl PlayerStats {
    pub(crate) fn new(db: Arc<Db>, bus: Arc<LiveBus>) -> Self {
        Self { db, bus }
    }

    /// Applies a batch of deltas in one transaction.
    ///
    /// Each entry upserts the player row (name, last seen) and adds its
    /// clamped deltas to the accumulated stats. Publishes a `players`
    /// invalidation on success.
    pub fn apply_batch(&self, entries: &[StatDelta]) -> CoreResult<()> {
        let now = now_ms();

        self.db.transaction(|conn| {
            for entry in entries {
                let xuid = entry.xuid.trim();
                if xuid.is_empty() {
                    continue;
                }
                let playtime = entry.playtime_seconds.max(0);
                let kills = entry.kills.max(0);
                let deaths = entry.deaths.max(0);

                players::upsert_reported(conn, xuid, entry.name.as_deref(), now)?;

                let existing = player_stats::table
                    .find(xuid)
                    .first::<PlayerStatsRow>(conn)
                    .optional()?;
                match existing {
                    None => {
                        diesel::insert_into(player_stats::table)
                            .values(NewPlayerStats {
                                xuid: xuid.to_string(),
                                playtime_seconds: playtime,
                                kills,
                                deaths,
                                updated_at: now,
                            })
                            .execute(conn)?;
                    }
                    Some(prev) => {
                        diesel::update(player_stats::table.find(xuid))
                            .set((
                                player_stats::playtime_seconds
                                    .eq(prev.playtime_seconds + playtime),
                                player_stats::kills.eq(prev.kills + kills),
                                player_stats::deaths.eq(prev.deaths + deaths),
                                player_stats::updated_at.eq(now),
                            ))
                            .execute(conn)?;
                    }
                }
            }
            Ok(())
        })?;

        self.bus.publish_invalidate(&["players"]);
        Ok(())
    }

    /// Returns the accumulated stats for `xuid`, if any.
    pub fn load(&self, xuid: &str) -> CoreResult<Option<PlayerStatsRow>> {
        Ok(self.db.with_conn(|conn| {
            Ok(player_stats::table
                .find(xuid.trim())
                .first::<PlayerStatsRow>(conn)
                .optional()?)
        })?)
    }
}
