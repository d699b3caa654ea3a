//! Best-effort admin audit log.
//!
//! Audit writes must never break the business action that triggered them,
//! and must never store secrets.

use crate::clock::now_ms;
use crate::error::CoreResult;
use diesel::prelude::*;
use gamebridge_store::models::{AuditEntryRow, NewAuditEntry};
use gamebridge_store::schema::audit_log;
use gamebridge_store::Db;
use std::sync::Arc;

/// The audit log service.
pub struct AuditLog {
    db: Arc<Db>,
}

impl AuditLog {
    pub(crate) fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Writes one audit entry, best-effort.
    ///
    /// Blank action keys are ignored. A store failure is logged and
    /// swallowed; the caller never sees it.
    pub fn log(&self, actor_username: Option<&str>, action_key: &str, details: Option<&str>) {
        let action = action_key.trim();
        if action.is_empty() {
            return;
        }

        let result = self.db.with_conn(|conn| {
            diesel::insert_into(audit_log::table)
                .values(NewAuditEntry {
                    actor_username: actor_username
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string),
                    action_key: action.to_string(),
                    details: details.filter(|d| !d.trim().is_empty()).map(str::to_string),
                    created_at: now_ms(),
                })
                .execute(conn)?;
            Ok(())
        });

        if let Err(e) = result {
            tracing::warn!(action, error = %e, "audit write failed");
        }
    }

    /// Returns the most recent audit entries, newest first.
    pub fn recent(&self, limit: i64) -> CoreResult<Vec<AuditEntryRow>> {
        Ok(self.db.with_conn(|conn| {
            Ok(audit_log::table
                .order(audit_log::id.desc())
                .limit(limit.clamp(1, 500))
                .load::<AuditEntryRow>(conn)?)
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> AuditLog {
        AuditLog::new(Arc::new(Db::open_in_memory().unwrap()))
    }

    #[test]
    fn writes_and_reads_entries() {
        let audit = log();
        audit.log(Some("root"), "bans.create", Some("xuid=X1"));
        audit.log(None, "users.create", None);

        let entries = audit.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].action_key, "users.create");
        assert_eq!(entries[1].actor_username.as_deref(), Some("root"));
    }

    #[test]
    fn blank_action_key_is_ignored() {
        let audit = log();
        audit.log(Some("root"), "   ", None);
        assert!(audit.recent(10).unwrap().is_empty());
    }

    #[test]
    fn blank_actor_and_details_store_as_null() {
        let audit = log();
        audit.log(Some("  "), "roles.update", Some(" "));
        let entries = audit.recent(10).unwrap();
        assert!(entries[0].actor_username.is_none());
        assert!(entries[0].details.is_none());
    }
}
