//! Shared player-row upserts.
//!
//! Players are created on first report from any source and never deleted.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use gamebridge_store::models::NewPlayer;
use gamebridge_store::schema::players;
use gamebridge_store::StoreResult;

/// Fallback display name when a report does not carry one.
pub const UNKNOWN_NAME: &str = "Unknown";

fn stub(xuid: &str, name: &str, now: i64) -> NewPlayer {
    NewPlayer {
        xuid: xuid.to_string(),
        last_name: name.to_string(),
        first_seen_at: now,
        last_seen_at: now,
        online: false,
        online_updated_at: now,
        last_ip: None,
        last_hwid: None,
    }
}

/// Ensures a player row exists; bumps `last_seen_at` when it already does.
pub(crate) fn upsert_stub(conn: &mut SqliteConnection, xuid: &str, now: i64) -> StoreResult<()> {
    diesel::insert_into(players::table)
        .values(stub(xuid, UNKNOWN_NAME, now))
        .on_conflict(players::xuid)
        .do_update()
        .set(players::last_seen_at.eq(now))
        .execute(conn)?;
    Ok(())
}

/// Ensures a player row exists and records the reported name.
pub(crate) fn upsert_reported(
    conn: &mut SqliteConnection,
    xuid: &str,
    name: Option<&str>,
    now: i64,
) -> StoreResult<()> {
    let safe_name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n,
        _ => UNKNOWN_NAME,
    };
    diesel::insert_into(players::table)
        .values(stub(xuid, safe_name, now))
        .on_conflict(players::xuid)
        .do_update()
        .set((
            players::last_name.eq(safe_name),
            players::last_seen_at.eq(now),
        ))
        .execute(conn)?;
    Ok(())
}
