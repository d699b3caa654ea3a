//! # gamebridge core
//!
//! Domain services for the gamebridge server-sync backend.
//!
//! This crate provides:
//! - [`CommandQueue`]: pull-based command delivery with acknowledgement
//! - [`BanLedger`]: ban lifecycle, audit trail and incremental change feed
//! - [`PresenceReconciler`]: online/offline state from noisy reports
//! - [`MetricsIngestor`]: sanitized telemetry snapshots and history
//! - [`PlayerStats`]: accumulated per-player statistics
//! - [`AuditLog`]: best-effort admin audit trail
//!
//! Services are wired together by [`Bridge`], the composition root that
//! owns the store handle and the invalidation bus and passes both by
//! handle into every service. Each successful ingest-style mutation
//! publishes an invalidation naming the affected domains (`players`,
//! `bans`, `stats`) so live observers can re-fetch.
//!
//! # Example
//!
//! ```rust
//! use gamebridge_core::{Bridge, Config};
//!
//! let bridge = Bridge::in_memory(Config::default()).unwrap();
//! let id = bridge.commands().enqueue("srv1", "RELOAD", None).unwrap();
//! let batch = bridge.commands().poll_open("srv1", 0, None).unwrap();
//! assert_eq!(batch.commands[0].id, id);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod bans;
pub mod clock;
mod commands;
mod config;
mod error;
mod metrics;
mod players;
mod presence;
mod stats;

pub use audit::AuditLog;
pub use bans::{
    ActorType, BanChange, BanChangePage, BanEventType, BanLedger, BanReport, DEFAULT_REASON,
};
pub use commands::{CommandBatch, CommandQueue, OpenCommand};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use metrics::{MetricPoint, MetricsIngestor, MetricsSample, MetricsSnapshot};
pub use players::UNKNOWN_NAME;
pub use presence::{PresenceEntry, PresenceReconciler};
pub use stats::{PlayerStats, StatDelta};

use gamebridge_live::LiveBus;
use gamebridge_store::Db;
use std::sync::Arc;

/// The composition root wiring every service to one store handle and one
/// invalidation bus.
pub struct Bridge {
    db: Arc<Db>,
    bus: Arc<LiveBus>,
    config: Config,
    commands: CommandQueue,
    bans: BanLedger,
    presence: PresenceReconciler,
    metrics: MetricsIngestor,
    stats: PlayerStats,
    audit: AuditLog,
}

impl Bridge {
    /// Wires the services around an existing store handle and bus.
    pub fn new(db: Arc<Db>, bus: Arc<LiveBus>, config: Config) -> Self {
        Self {
            commands: CommandQueue::new(Arc::clone(&db), config.clone()),
            bans: BanLedger::new(Arc::clone(&db), Arc::clone(&bus), config.clone()),
            presence: PresenceReconciler::new(Arc::clone(&db), Arc::clone(&bus)),
            metrics: MetricsIngestor::new(Arc::clone(&db), Arc::clone(&bus), config.clone()),
            stats: PlayerStats::new(Arc::clone(&db), Arc::clone(&bus)),
            audit: AuditLog::new(Arc::clone(&db)),
            db,
            bus,
            config,
        }
    }

    /// Convenience constructor over a fresh in-memory store.
    pub fn in_memory(config: Config) -> CoreResult<Self> {
        let db = Arc::new(Db::open_in_memory()?);
        Ok(Self::new(db, Arc::new(LiveBus::new()), config))
    }

    /// The store handle.
    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    /// The invalidation bus.
    pub fn bus(&self) -> &Arc<LiveBus> {
        &self.bus
    }

    /// The service configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The command queue service.
    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    /// The ban ledger service.
    pub fn bans(&self) -> &BanLedger {
        &self.bans
    }

    /// The presence reconciler service.
    pub fn presence(&self) -> &PresenceReconciler {
        &self.presence
    }

    /// The telemetry ingestor service.
    pub fn metrics(&self) -> &MetricsIngestor {
        &self.metrics
    }

    /// The stats accumulation service.
    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    /// The audit log service.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }
}
