use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use constants::*;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use super::{Driver, User};
use crate::error::Result;

/// File-backed SQLite. The insert lives in rusqlite's statement cache, so the statement handle
/// itself carries nothing.
#[derive(Debug, Clone)]
pub struct Sqlite {
  path: PathBuf,
}

impl Sqlite {
  pub fn new(path: impl AsRef<Path>) -> Self {
    return Self {
      path: path.as_ref().to_path_buf(),
    };
  }
}

impl Driver for Sqlite {
  type Manager = SqliteConnectionManager;
  type Statement = ();

  fn name(&self) -> &'static str {
    return "sqlite";
  }

  fn manager(&self) -> Result<Self::Manager> {
    return Ok(
      SqliteConnectionManager::file(&self.path).with_init(|c| c.execute_batch(PRAGMAS)),
    );
  }

  fn reset_schema(conn: &mut Connection) -> Result<()> {
    return Ok(conn.execute_batch(SQLITE_RESET_SCHEMA)?);
  }

  fn begin(conn: &mut Connection) -> Result<()> {
    return Ok(conn.execute_batch("BEGIN")?);
  }

  fn prepare_insert(conn: &mut Connection) -> Result<()> {
    conn.prepare_cached(SQLITE_INSERT)?;
    return Ok(());
  }

  fn execute_insert(conn: &mut Connection, _stmt: &(), id: i32) -> Result<u64> {
    let mut stmt = conn.prepare_cached(SQLITE_INSERT)?;
    return Ok(stmt.execute([id])? as u64);
  }

  fn close_statement(conn: &mut Connection, _stmt: ()) -> Result<()> {
    conn.flush_prepared_statement_cache();
    return Ok(());
  }

  fn commit(conn: &mut Connection) -> Result<()> {
    return Ok(conn.execute_batch("COMMIT")?);
  }

  fn rollback(conn: &mut Connection) -> Result<()> {
    return Ok(conn.execute_batch("ROLLBACK")?);
  }

  fn count_rows(conn: &mut Connection) -> Result<i64> {
    return Ok(conn.query_row(COUNT_QUERY, (), |row| row.get(0))?);
  }

  fn fetch_users(conn: &mut Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare_cached(SELECT_USERS)?;
    let users = stmt
      .query_map((), |row| {
        Ok(User {
          id: row.get(0)?,
          name: row.get(1)?,
          create_time: row.get::<_, Option<NaiveDateTime>>(2)?,
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    return Ok(users);
  }
}
