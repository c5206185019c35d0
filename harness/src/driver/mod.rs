//! Backend seams. A [`Driver`] knows how to build pooled connections for one database and how to
//! run every statement the benchmark needs on a borrowed connection.

mod postgres;
mod sqlite;

pub use self::postgres::Postgres;
pub use self::sqlite::Sqlite;

use chrono::NaiveDateTime;
use r2d2::ManageConnection;
use tracing::warn;

use crate::error::Result;

/// Connection type handed out by a driver's pool.
pub type Conn<D> = <<D as Driver>::Manager as ManageConnection>::Connection;

/// One persisted `tb_user` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id: i32,
  pub name: Option<String>,
  pub create_time: Option<NaiveDateTime>,
}

pub trait Driver: Send + Sync + 'static {
  type Manager: ManageConnection;
  /// Prepared insert. Dropping it must be safe even when `close_statement` was never called.
  type Statement: Send + 'static;

  fn name(&self) -> &'static str;

  fn manager(&self) -> Result<Self::Manager>;

  /// Drops and recreates `tb_user`. Destroys any prior data.
  fn reset_schema(conn: &mut Conn<Self>) -> Result<()>;

  fn begin(conn: &mut Conn<Self>) -> Result<()>;

  fn prepare_insert(conn: &mut Conn<Self>) -> Result<Self::Statement>;

  fn execute_insert(conn: &mut Conn<Self>, stmt: &Self::Statement, id: i32) -> Result<u64>;

  fn close_statement(conn: &mut Conn<Self>, stmt: Self::Statement) -> Result<()>;

  fn commit(conn: &mut Conn<Self>) -> Result<()>;

  fn rollback(conn: &mut Conn<Self>) -> Result<()>;

  /// Whether the server already gave up on the open transaction, in which case a `COMMIT` would
  /// silently roll back. Backends that only undo the failing statement never abort.
  fn transaction_aborted(_conn: &mut Conn<Self>) -> Result<bool> {
    return Ok(false);
  }

  fn count_rows(conn: &mut Conn<Self>) -> Result<i64>;

  fn fetch_users(conn: &mut Conn<Self>) -> Result<Vec<User>>;

  /// Begin, insert `id`, commit. Rolls back when anything after `begin` fails.
  fn insert_in_own_transaction(conn: &mut Conn<Self>, id: i32) -> Result<()> {
    Self::begin(conn)?;

    if let Err(err) = insert_and_commit::<Self>(conn, id) {
      if let Err(rollback_err) = Self::rollback(conn) {
        warn!(id, error = %rollback_err, "rollback failed");
      }
      return Err(err);
    }
    return Ok(());
  }
}

fn insert_and_commit<D: Driver + ?Sized>(conn: &mut Conn<D>, id: i32) -> Result<()> {
  let stmt = D::prepare_insert(conn)?;
  let inserted = D::execute_insert(conn, &stmt, id);
  D::close_statement(conn, stmt)?;
  inserted?;
  return D::commit(conn);
}
