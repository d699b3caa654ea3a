//! Telemetry ingestion.
//!
//! Client-reported samples are noisy; every field is sanitized
//! independently before persistence, and an invalid value is stored as
//! unknown (NULL), never as a wrong number. Each ingest writes the latest
//! snapshot (upsert) and one history row (append) in one transaction.

use crate::clock::now_ms;
use crate::config::Config;
use crate::error::{require_non_blank, CoreResult};
use diesel::prelude::*;
use gamebridge_live::LiveBus;
use gamebridge_store::models::{MetricsLatestRow, MetricsLatestUpsert, NewMetricPoint};
use gamebridge_store::schema::{server_metrics, server_metrics_latest};
use gamebridge_store::Db;
use std::sync::Arc;

/// CPU load above this is rejected as garbage; the headroom over 1.0
/// tolerates brief overload spikes.
const CPU_LOAD_CEILING: f64 = 1.5;

/// One telemetry sample as reported by an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSample {
    /// RAM in use, MB.
    pub ram_used_mb: Option<i32>,
    /// RAM ceiling, MB.
    pub ram_max_mb: Option<i32>,
    /// CPU load, expected in [0, 1].
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

impl MetricsSample {
    /// Returns the sample with physically impossible values normalized.
    ///
    /// Negatives become unknown; used-over-max pairs clamp to the max;
    /// CPU load outside `[0, 1.5]` becomes unknown.
    pub fn sanitized(self) -> Self {
        let mut ram_used = self.ram_used_mb.filter(|v| *v >= 0);
        let ram_max = self.ram_max_mb.filter(|v| *v >= 0);
        if let (Some(used), Some(max)) = (ram_used, ram_max) {
            if used > max {
                ram_used = Some(max);
            }
        }

        let mut players_online = self.players_online.filter(|v| *v >= 0);
        let players_max = self.players_max.filter(|v| *v >= 0);
        if let (Some(online), Some(max)) = (players_online, players_max) {
            if online > max {
                players_online = Some(max);
            }
        }

        Self {
            ram_used_mb: ram_used,
            ram_max_mb: ram_max,
            cpu_load: self
                .cpu_load
                .filter(|v| (0.0..=CPU_LOAD_CEILING).contains(v)),
            players_online,
            players_max,
            tps: self.tps.filter(|v| *v >= 0.0),
            rx_kbps: self.rx_kbps.filter(|v| *v >= 0.0),
            tx_kbps: self.tx_kbps.filter(|v| *v >= 0.0),
        }
    }
}

/// The latest stored snapshot for one server key.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Snapshot timestamp (epoch ms).
    pub updated_at: i64,
    /// Sanitized sample values.
    pub sample: MetricsSample,
}

/// One history point for charting.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    /// Sample timestamp (epoch ms).
    pub at: i64,
    /// Players online at the sample.
    pub players_online: Option<i32>,
    /// Ticks per second at the sample.
    pub tps: Option<f64>,
    /// CPU load at the sample.
    pub cpu_load: Option<f64>,
    /// RAM in use at the sample, MB.
    pub ram_used_mb: Option<i32>,
}

/// The telemetry ingestor service.
pub struct MetricsIngestor {
    db: Arc<Db>,
    bus: Arc<LiveBus>,
    config: Config,
}

impl MetricsIngestor {
    pub(crate) fn new(db: Arc<Db>, bus: Arc<LiveBus>, config: Config) -> Self {
        Self { db, bus, config }
    }

    /// Ingests one sample for `server_key`.
    ///
    /// Upserts the latest snapshot and appends one history row inside one
    /// transaction, then publishes a `stats` invalidation.
    pub fn ingest(&self, server_key: &str, sample: MetricsSample) -> CoreResult<()> {
        let sk = require_non_blank(server_key, "serverKey")?;
        let s = sample.sanitized();
        let now = now_ms();

        self.db.transaction(|conn| {
            let latest = MetricsLatestUpsert {
                server_key: sk.to_string(),
                updated_at: now,
                ram_used_mb: s.ram_used_mb,
                ram_max_mb: s.ram_max_mb,
                cpu_load: s.cpu_load,
                players_online: s.players_online,
                players_max: s.players_max,
                tps: s.tps,
                rx_kbps: s.rx_kbps,
                tx_kbps: s.tx_kbps,
            };
            diesel::insert_into(server_metrics_latest::table)
                .values(&latest)
                .on_conflict(server_metrics_latest::server_key)
                .do_update()
                .set(&latest)
                .execute(conn)?;

            diesel::insert_into(server_metrics::table)
                .values(NewMetricPoint {
                    server_key: sk.to_string(),
                    created_at: now,
                    ram_used_mb: s.ram_used_mb,
                    ram_max_mb: s.ram_max_mb,
                    cpu_load: s.cpu_load,
                    players_online: s.players_online,
                    players_max: s.players_max,
                    tps: s.tps,
                    rx_kbps: s.rx_kbps,
                    tx_kbps: s.tx_kbps,
                })
                .execute(conn)?;
            Ok(())
        })?;

        self.bus.publish_invalidate(&["stats"]);
        Ok(())
    }

    /// Returns the latest snapshot for `server_key`, if any.
    pub fn load_latest(&self, server_key: &str) -> CoreResult<Option<MetricsSnapshot>> {
        let sk = require_non_blank(server_key, "serverKey")?;

        let row = self.db.with_conn(|conn| {
            Ok(server_metrics_latest::table
                .find(sk)
                .first::<MetricsLatestRow>(conn)
                .optional()?)
        })?;

        Ok(row.map(|r| MetricsSnapshot {
            updated_at: r.updated_at,
            sample: MetricsSample {
                ram_used_mb: r.ram_used_mb,
                ram_max_mb: r.ram_max_mb,
                cpu_load: r.cpu_load,
                players_online: r.players_online,
                players_max: r.players_max,
                tps: r.tps,
                rx_kbps: r.rx_kbps,
                tx_kbps: r.tx_kbps,
            },
        }))
    }

    /// Returns up to `limit` most recent history points, oldest first.
    ///
    /// `limit` is clamped to the configured bounds; the newest rows are
    /// fetched and reversed so callers always see chronological order.
    pub fn load_history(&self, server_key: &str, limit: i64) -> CoreResult<Vec<MetricPoint>> {
        let sk = require_non_blank(server_key, "serverKey")?;
        let lim = limit.clamp(self.config.history_min_rows, self.config.history_max_rows);

        let mut rows = self.db.with_conn(|conn| {
            Ok(server_metrics::table
                .filter(server_metrics::server_key.eq(sk))
                .order(server_metrics::created_at.desc())
                .limit(lim)
                .select((
                    server_metrics::created_at,
                    server_metrics::players_online,
                    server_metrics::tps,
                    server_metrics::cpu_load,
                    server_metrics::ram_used_mb,
                ))
                .load::<(i64, Option<i32>, Option<f64>, Option<f64>, Option<i32>)>(conn)?)
        })?;
        rows.reverse();

        Ok(rows
            .into_iter()
            .map(|(at, players_online, tps, cpu_load, ram_used_mb)| MetricPoint {
                at,
                players_online,
                tps,
                cpu_load,
                ram_used_mb,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ingestor() -> MetricsIngestor {
        let db = Arc::new(Db::open_in_memory().unwrap());
        let bus = Arc::new(LiveBus::new());
        MetricsIngestor::new(db, bus, Config::default())
    }

    fn sample() -> MetricsSample {
        MetricsSample {
            ram_used_mb: Some(2048),
            ram_max_mb: Some(4096),
            cpu_load: Some(0.45),
            players_online: Some(12),
            players_max: Some(50),
            tps: Some(19.8),
            rx_kbps: Some(120.0),
            tx_kbps: Some(80.5),
        }
    }

    #[test]
    fn negative_ram_becomes_unknown() {
        let s = MetricsSample {
            ram_used_mb: Some(-5),
            ..MetricsSample::default()
        }
        .sanitized();
        assert_eq!(s.ram_used_mb, None);
    }

    #[test]
    fn ram_used_clamps_to_max() {
        let s = MetricsSample {
            ram_used_mb: Some(5000),
            ram_max_mb: Some(4096),
            ..MetricsSample::default()
        }
        .sanitized();
        assert_eq!(s.ram_used_mb, Some(4096));
    }

    #[test]
    fn cpu_load_tolerates_spikes_but_rejects_garbage() {
        let ok = MetricsSample {
            cpu_load: Some(1.4),
            ..MetricsSample::default()
        }
        .sanitized();
        assert_eq!(ok.cpu_load, Some(1.4));

        let bad = MetricsSample {
            cpu_load: Some(7.0),
            ..MetricsSample::default()
        }
        .sanitized();
        assert_eq!(bad.cpu_load, None);

        let negative = MetricsSample {
            cpu_load: Some(-0.1),
            ..MetricsSample::default()
        }
        .sanitized();
        assert_eq!(negative.cpu_load, None);
    }

    #[test]
    fn players_clamp_to_max() {
        let s = MetricsSample {
            players_online: Some(80),
            players_max: Some(50),
            ..MetricsSample::default()
        }
        .sanitized();
        assert_eq!(s.players_online, Some(50));
    }

    #[test]
    fn ingest_stores_sanitized_values() {
        let ing = ingestor();
        ing.ingest(
            "srv1",
            MetricsSample {
                ram_used_mb: Some(-5),
                tps: Some(19.8),
                ..MetricsSample::default()
            },
        )
        .unwrap();

        let snap = ing.load_latest("srv1").unwrap().unwrap();
        assert_eq!(snap.sample.ram_used_mb, None);
        assert_eq!(snap.sample.tps, Some(19.8));
    }

    #[test]
    fn ingest_requires_server_key() {
        let ing = ingestor();
        assert!(ing.ingest("  ", sample()).is_err());
    }

    #[test]
    fn latest_is_an_upsert() {
        let ing = ingestor();
        ing.ingest("srv1", sample()).unwrap();
        ing.ingest(
            "srv1",
            MetricsSample {
                players_online: Some(3),
                ..MetricsSample::default()
            },
        )
        .unwrap();

        let snap = ing.load_latest("srv1").unwrap().unwrap();
        assert_eq!(snap.sample.players_online, Some(3));
        // A later sample without RAM overwrites the old number with unknown.
        assert_eq!(snap.sample.ram_used_mb, None);
    }

    #[test]
    fn load_latest_missing_key_is_none() {
        let ing = ingestor();
        assert!(ing.load_latest("nope").unwrap().is_none());
    }

    #[test]
    fn history_is_chronological() {
        let ing = ingestor();
        for i in 0..3 {
            ing.ingest(
                "srv1",
                MetricsSample {
                    players_online: Some(i),
                    ..MetricsSample::default()
                },
            )
            .unwrap();
        }

        let points = ing.load_history("srv1", 100).unwrap();
        assert_eq!(points.len(), 3);
        let online: Vec<Option<i32>> = points.iter().map(|p| p.players_online).collect();
        assert_eq!(online, vec![Some(0), Some(1), Some(2)]);
        assert!(points.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn history_keeps_every_ingest() {
        let ing = ingestor();
        ing.ingest("srv1", sample()).unwrap();
        ing.ingest("srv1", sample()).unwrap();
        assert_eq!(ing.load_history("srv1", 100).unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn sanitized_never_stores_impossible_values(
            ram_used in proptest::option::of(-10_000i32..10_000),
            ram_max in proptest::option::of(-10_000i32..10_000),
            cpu in proptest::option::of(-10.0f64..10.0),
            p_on in proptest::option::of(-500i32..500),
            p_max in proptest::option::of(-500i32..500),
            tps in proptest::option::of(-50.0f64..50.0),
        ) {
            let s = MetricsSample {
                ram_used_mb: ram_used,
                ram_max_mb: ram_max,
                cpu_load: cpu,
                players_online: p_on,
                players_max: p_max,
                tps,
                rx_kbps: None,
                tx_kbps: None,
            }.sanitized();

            if let Some(v) = s.ram_used_mb {
                prop_assert!(v >= 0);
                if let Some(max) = s.ram_max_mb {
                    prop_assert!(v <= max);
                }
            }
            if let Some(v) = s.cpu_load {
                prop_assert!((0.0..=1.5).contains(&v));
            }
            if let Some(v) = s.players_online {
                prop_assert!(v >= 0);
                if let Some(max) = s.players_max {
                    prop_assert!(v <= max);
                }
            }
            if let Some(v) = s.tps {
                prop_assert!(v >= 0.0);
            }
        }
    }
}
