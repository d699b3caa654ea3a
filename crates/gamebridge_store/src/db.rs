//! Database connection handle.

use crate::error::StoreResult;
use crate::migrations;
use crate::StoreError;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use parking_lot::Mutex;

diesel::define_sql_function! {
    /// SQLite's rowid of the most recent successful insert on a connection.
    fn last_insert_rowid() -> diesel::sql_types::BigInt;
}

/// Shared handle to the SQLite database.
///
/// A single connection guarded by a mutex: entry points run on caller
/// threads (no async suspension), and SQLite serializes writers anyway.
/// Multi-row mutations go through [`Db::transaction`], which commits on
/// `Ok` and rolls the whole write back on `Err`.
pub struct Db {
    conn: Mutex<SqliteConnection>,
}

impl Db {
    /// Opens (creating if missing) a file-backed database and applies
    /// migrations.
    pub fn open(path: &str) -> StoreResult<Self> {
        Self::init(SqliteConnection::establish(path)?)
    }

    /// Opens a private in-memory database and applies migrations.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(SqliteConnection::establish(":memory:")?)
    }

    fn init(mut conn: SqliteConnection) -> StoreResult<Self> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 10000;")?;
        migrations::run(&mut conn)?;
        tracing::debug!("database ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` with the connection, outside any explicit transaction.
    pub fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    /// Runs `f` inside a transaction: commit on `Ok`, full rollback on `Err`.
    pub fn transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock();
        conn.transaction(f)
    }

    /// Cheap liveness probe (`SELECT 1`).
    pub fn ping(&self) -> bool {
        let mut conn = self.conn.lock();
        diesel::sql_query("SELECT 1").execute(&mut *conn).is_ok()
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

/// Returns the id generated by the most recent insert on `conn`.
pub fn last_insert_id(conn: &mut SqliteConnection) -> StoreResult<i64> {
    diesel::select(last_insert_rowid())
        .get_result::<i64>(conn)
        .map_err(StoreError::from)
}
