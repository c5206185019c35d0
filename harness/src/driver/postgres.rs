use chrono::NaiveDateTime;
use constants::*;
use postgres::error::SqlState;
use postgres::{Client, NoTls};
use r2d2_postgres::PostgresConnectionManager;

use super::{Driver, User};
use crate::error::Result;

/// Postgres over the synchronous client. TLS is never negotiated.
#[derive(Debug, Clone)]
pub struct Postgres {
  config: postgres::Config,
}

impl Postgres {
  pub fn from_dsn(dsn: &str) -> Result<Self> {
    let config: postgres::Config = dsn.parse()?;
    return Ok(Self { config });
  }

  pub fn config(&self) -> &postgres::Config {
    return &self.config;
  }
}

impl Driver for Postgres {
  type Manager = PostgresConnectionManager<NoTls>;
  type Statement = postgres::Statement;

  fn name(&self) -> &'static str {
    return "postgres";
  }

  fn manager(&self) -> Result<Self::Manager> {
    return Ok(PostgresConnectionManager::new(self.config.clone(), NoTls));
  }

  fn reset_schema(conn: &mut Client) -> Result<()> {
    return Ok(conn.batch_execute(PG_RESET_SCHEMA)?);
  }

  fn begin(conn: &mut Client) -> Result<()> {
    return Ok(conn.batch_execute("BEGIN")?);
  }

  fn prepare_insert(conn: &mut Client) -> Result<Self::Statement> {
    return Ok(conn.prepare(PG_INSERT)?);
  }

  fn execute_insert(conn: &mut Client, stmt: &Self::Statement, id: i32) -> Result<u64> {
    return Ok(conn.execute(stmt, &[&id])?);
  }

  // The client deallocates the server-side statement once the last handle is dropped.
  fn close_statement(_conn: &mut Client, stmt: Self::Statement) -> Result<()> {
    drop(stmt);
    return Ok(());
  }

  fn commit(conn: &mut Client) -> Result<()> {
    return Ok(conn.batch_execute("COMMIT")?);
  }

  fn rollback(conn: &mut Client) -> Result<()> {
    return Ok(conn.batch_execute("ROLLBACK")?);
  }

  // Any statement in an aborted transaction fails with `in_failed_sql_transaction`.
  fn transaction_aborted(conn: &mut Client) -> Result<bool> {
    return match conn.simple_query("SELECT 1") {
      Ok(_) => Ok(false),
      Err(err) if err.code() == Some(&SqlState::IN_FAILED_SQL_TRANSACTION) => Ok(true),
      Err(err) => Err(err.into()),
    };
  }

  fn count_rows(conn: &mut Client) -> Result<i64> {
    let row = conn.query_one(COUNT_QUERY, &[])?;
    return Ok(row.try_get(0)?);
  }

  fn fetch_users(conn: &mut Client) -> Result<Vec<User>> {
    let mut users = Vec::new();
    for row in conn.query(SELECT_USERS, &[])? {
      users.push(User {
        id: row.try_get(0)?,
        name: row.try_get::<_, Option<String>>(1)?,
        create_time: row.try_get::<_, Option<NaiveDateTime>>(2)?,
      });
    }
    return Ok(users);
  }
}
