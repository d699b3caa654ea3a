//! Database and service fixtures.

use gamebridge_core::{Bridge, Config, MetricsSample, PresenceEntry};
use gamebridge_live::LiveBus;
use gamebridge_store::Db;
use std::sync::Arc;
use tempfile::TempDir;

/// Initializes a tracing subscriber for test debugging.
///
/// Safe to call from every test; only the first call installs one.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh in-memory store with migrations applied.
pub fn memory_db() -> Arc<Db> {
    Arc::new(Db::open_in_memory().expect("in-memory database"))
}

/// A fresh file-backed store inside a temp directory.
///
/// Returns the directory guard alongside the handle; dropping the guard
/// deletes the database file.
pub fn file_db() -> (TempDir, Arc<Db>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("gamebridge.db");
    let db = Db::open(path.to_str().expect("utf-8 temp path")).expect("file-backed database");
    (dir, Arc::new(db))
}

/// A fully wired [`Bridge`] over an in-memory store and a fresh bus.
pub fn memory_bridge() -> Bridge {
    Bridge::new(memory_db(), Arc::new(LiveBus::new()), Config::default())
}

/// Runs `f` with a fully wired in-memory [`Bridge`].
pub fn with_bridge<F: FnOnce(&Bridge)>(f: F) {
    let bridge = memory_bridge();
    f(&bridge);
}

/// A presence entry reporting `xuid` online.
pub fn online_player(xuid: &str) -> PresenceEntry {
    PresenceEntry {
        xuid: xuid.to_string(),
        online: Some(true),
        ..PresenceEntry::default()
    }
}

/// A presence entry reporting `xuid` offline.
pub fn offline_player(xuid: &str) -> PresenceEntry {
    PresenceEntry {
        xuid: xuid.to_string(),
        online: Some(false),
        ..PresenceEntry::default()
    }
}

/// A plausible healthy telemetry sample.
pub fn healthy_sample() -> MetricsSample {
    MetricsSample {
        ram_used_mb: Some(2048),
        ram_max_mb: Some(4096),
        cpu_load: Some(0.35),
        players_online: Some(12),
        players_max: Some(100),
        tps: Some(19.9),
        rx_kbps: Some(150.0),
        tx_kbps: Some(90.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_build() {
        with_bridge(|bridge| {
            assert!(bridge.db().ping());
        });
        let (_dir, db) = file_db();
        assert!(db.ping());
    }
}
