//! Pull-based command delivery queue.
//!
//! Remote agents cannot accept inbound connections, so delivery is a pull
//! model: the backend enqueues, the agent polls open commands and
//! acknowledges each one it has applied. Only acknowledgement removes a
//! command from future polls, which guarantees redelivery across agent
//! crashes at the cost of possible duplicates; agents must treat command
//! application as idempotent.

use crate::clock::now_ms;
use crate::config::Config;
use crate::error::{require_non_blank, CoreResult};
use diesel::prelude::*;
use gamebridge_store::models::{NewServerCommand, ServerCommandRow};
use gamebridge_store::schema::server_commands;
use gamebridge_store::{last_insert_id, Db};
use std::sync::Arc;

/// An open (unacknowledged) command as seen by a polling agent.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCommand {
    /// Monotonic command id.
    pub id: i64,
    /// Command type, always uppercased.
    pub cmd_type: String,
    /// Enqueue timestamp (epoch ms).
    pub created_at: i64,
    /// Opaque JSON payload, if any.
    pub payload_json: Option<String>,
}

/// One poll response: the server clock plus the open commands.
///
/// The batch never carries the server key; the caller already knows it.
#[derive(Debug, Clone)]
pub struct CommandBatch {
    /// Backend time at the poll (epoch ms).
    pub server_time: i64,
    /// Open commands, ascending by id.
    pub commands: Vec<OpenCommand>,
}

/// The command queue service.
pub struct CommandQueue {
    db: Arc<Db>,
    config: Config,
}

impl CommandQueue {
    pub(crate) fn new(db: Arc<Db>, config: Config) -> Self {
        Self { db, config }
    }

    /// Enqueues a command for `server_key` and returns its id.
    ///
    /// No delivery promise is made here; delivery happens when the agent
    /// polls.
    pub fn enqueue(
        &self,
        server_key: &str,
        cmd_type: &str,
        payload_json: Option<&str>,
    ) -> CoreResult<i64> {
        let sk = require_non_blank(server_key, "serverKey")?;
        let ct = require_non_blank(cmd_type, "cmdType")?.to_uppercase();

        let id = self.db.with_conn(|conn| {
            diesel::insert_into(server_commands::table)
                .values(NewServerCommand {
                    server_key: sk.to_string(),
                    cmd_type: ct.clone(),
                    payload_json: payload_json.map(str::to_string),
                    created_at: now_ms(),
                })
                .execute(conn)?;
            last_insert_id(conn)
        })?;

        tracing::debug!(server_key = sk, cmd_type = %ct, id, "command enqueued");
        Ok(id)
    }

    /// Returns open commands for `server_key` with `id > since_id`.
    ///
    /// `limit` defaults to the configured poll limit and is clamped to
    /// `[1, max_poll_limit]`. Advancing `since_id` without acking does not
    /// stop redelivery: an unacked command reappears on any later poll
    /// with a smaller `since_id`.
    pub fn poll_open(
        &self,
        server_key: &str,
        since_id: i64,
        limit: Option<i64>,
    ) -> CoreResult<CommandBatch> {
        let sk = require_non_blank(server_key, "serverKey")?;
        let lim = limit
            .unwrap_or(self.config.default_poll_limit)
            .clamp(1, self.config.max_poll_limit);

        let rows = self.db.with_conn(|conn| {
            Ok(server_commands::table
                .filter(server_commands::server_key.eq(sk))
                .filter(server_commands::acknowledged_at.is_null())
                .filter(server_commands::id.gt(since_id.max(0)))
                .order(server_commands::id.asc())
                .limit(lim)
                .load::<ServerCommandRow>(conn)?)
        })?;

        Ok(CommandBatch {
            server_time: now_ms(),
            commands: rows
                .into_iter()
                .map(|row| OpenCommand {
                    id: row.id,
                    cmd_type: row.cmd_type.to_uppercase(),
                    created_at: row.created_at,
                    payload_json: row.payload_json.filter(|p| !p.trim().is_empty()),
                })
                .collect(),
        })
    }

    /// Acknowledges a delivered command.
    ///
    /// Sets `acknowledged_at` only when currently unset; acking twice or
    /// acking an unknown id is a success no-op.
    pub fn ack(&self, server_key: &str, id: i64) -> CoreResult<()> {
        let sk = require_non_blank(server_key, "serverKey")?;
        if id <= 0 {
            return Err(crate::CoreError::validation("id missing"));
        }

        let updated = self.db.with_conn(|conn| {
            Ok(diesel::update(
                server_commands::table
                    .filter(server_commands::server_key.eq(sk))
                    .filter(server_commands::id.eq(id))
                    .filter(server_commands::acknowledged_at.is_null()),
            )
            .set(server_commands::acknowledged_at.eq(Some(now_ms())))
            .execute(conn)?)
        })?;

        tracing::debug!(server_key = sk, id, updated, "command ack");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> CommandQueue {
        let db = Arc::new(Db::open_in_memory().unwrap());
        CommandQueue::new(db, Config::default())
    }

    #[test]
    fn enqueue_validates_inputs() {
        let q = queue();
        assert!(q.enqueue("", "RELOAD", None).is_err());
        assert!(q.enqueue("srv1", "  ", None).is_err());
    }

    #[test]
    fn enqueue_uppercases_type() {
        let q = queue();
        q.enqueue("srv1", "reload", None).unwrap();
        let batch = q.poll_open("srv1", 0, None).unwrap();
        assert_eq!(batch.commands[0].cmd_type, "RELOAD");
    }

    #[test]
    fn enqueue_poll_ack_cycle() {
        let q = queue();
        let id = q.enqueue("srv1", "RELOAD", None).unwrap();
        assert_eq!(id, 1);

        let batch = q.poll_open("srv1", 0, Some(50)).unwrap();
        assert_eq!(batch.commands.len(), 1);
        assert_eq!(batch.commands[0].id, 1);
        assert_eq!(batch.commands[0].cmd_type, "RELOAD");

        q.ack("srv1", 1).unwrap();
        let batch = q.poll_open("srv1", 0, Some(50)).unwrap();
        assert!(batch.commands.is_empty());
    }

    #[test]
    fn poll_respects_since_id_and_order() {
        let q = queue();
        for i in 0..5 {
            q.enqueue("srv1", &format!("CMD{i}"), None).unwrap();
        }

        let batch = q.poll_open("srv1", 2, None).unwrap();
        let ids: Vec<i64> = batch.commands.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn poll_is_scoped_to_server_key() {
        let q = queue();
        q.enqueue("srv1", "A", None).unwrap();
        q.enqueue("srv2", "B", None).unwrap();

        let batch = q.poll_open("srv2", 0, None).unwrap();
        assert_eq!(batch.commands.len(), 1);
        assert_eq!(batch.commands[0].cmd_type, "B");
    }

    #[test]
    fn poll_clamps_limit() {
        let q = queue();
        for _ in 0..5 {
            q.enqueue("srv1", "X", None).unwrap();
        }
        let batch = q.poll_open("srv1", 0, Some(0)).unwrap();
        assert_eq!(batch.commands.len(), 1);
        let batch = q.poll_open("srv1", 0, Some(100_000)).unwrap();
        assert_eq!(batch.commands.len(), 5);
    }

    #[test]
    fn unacked_commands_are_redelivered() {
        let q = queue();
        q.enqueue("srv1", "RELOAD", None).unwrap();

        // A client may advance sinceId without acking; a later poll with a
        // smaller sinceId must still see the command.
        assert!(q.poll_open("srv1", 1, None).unwrap().commands.is_empty());
        assert_eq!(q.poll_open("srv1", 0, None).unwrap().commands.len(), 1);
    }

    #[test]
    fn ack_is_idempotent() {
        let q = queue();
        let id = q.enqueue("srv1", "RELOAD", None).unwrap();
        q.ack("srv1", id).unwrap();
        q.ack("srv1", id).unwrap();
        assert!(q.poll_open("srv1", 0, None).unwrap().commands.is_empty());
    }

    #[test]
    fn ack_unknown_id_is_a_noop() {
        let q = queue();
        q.ack("srv1", 42).unwrap();
    }

    #[test]
    fn ack_rejects_bad_inputs() {
        let q = queue();
        assert!(q.ack("", 1).is_err());
        assert!(q.ack("srv1", 0).is_err());
        assert!(q.ack("srv1", -3).is_err());
    }

    #[test]
    fn payload_passes_through() {
        let q = queue();
        q.enqueue("srv1", "BROADCAST", Some("{\"msg\":\"hi\"}"))
            .unwrap();
        let batch = q.poll_open("srv1", 0, None).unwrap();
        assert_eq!(
            batch.commands[0].payload_json.as_deref(),
            Some("{\"msg\":\"hi\"}")
        );
    }
}
