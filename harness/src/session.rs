//! A transaction owned by one dedicated thread.
//!
//! Concurrent callers never touch the connection: they ship closures to the session thread over a
//! channel and await the reply, so statements run one at a time against a single transaction.

use crossbeam_channel::{Receiver, Sender};
use r2d2::{Pool, PooledConnection};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::driver::{Conn, Driver};
use crate::error::{Error, Result};

type CallFn<D> = Box<dyn FnOnce(&mut Transaction<D>) + Send + 'static>;

enum Message<D: Driver> {
  Execute(CallFn<D>),
  Finish(Outcome, oneshot::Sender<Result<()>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
  Commit,
  Rollback,
}

/// State living on the session thread: the checked-out connection with an open transaction and,
/// once prepared, the insert statement.
pub struct Transaction<D: Driver> {
  conn: PooledConnection<D::Manager>,
  stmt: Option<D::Statement>,
}

impl<D: Driver> Transaction<D> {
  pub fn conn(&mut self) -> &mut Conn<D> {
    return &mut *self.conn;
  }

  pub fn is_prepared(&self) -> bool {
    return self.stmt.is_some();
  }

  fn close_statement(&mut self) -> Result<()> {
    return match self.stmt.take() {
      Some(stmt) => D::close_statement(&mut *self.conn, stmt),
      None => Ok(()),
    };
  }

  fn finish(mut self, outcome: Outcome) -> Result<()> {
    if let Err(err) = self.close_statement() {
      warn!(error = %err, "closing statement before {outcome:?} failed");
    }
    return match outcome {
      Outcome::Commit => {
        if D::transaction_aborted(&mut *self.conn)? {
          D::rollback(&mut *self.conn)?;
          return Err(Error::TransactionAborted);
        }
        D::commit(&mut *self.conn)
      }
      Outcome::Rollback => D::rollback(&mut *self.conn),
    };
  }
}

/// Cloneable handle to a session thread.
pub struct Session<D: Driver> {
  sender: Sender<Message<D>>,
}

impl<D: Driver> Clone for Session<D> {
  fn clone(&self) -> Self {
    return Self {
      sender: self.sender.clone(),
    };
  }
}

impl<D: Driver> Session<D> {
  /// Checks a connection out of `pool` on a new thread and begins a transaction on it.
  pub async fn begin(pool: Pool<D::Manager>) -> Result<Self> {
    let (sender, receiver) = crossbeam_channel::unbounded::<Message<D>>();
    let (result_sender, result_receiver) = oneshot::channel::<Result<()>>();

    std::thread::spawn(move || {
      let mut conn = match pool.get() {
        Ok(conn) => conn,
        Err(err) => {
          let _ = result_sender.send(Err(err.into()));
          return;
        }
      };

      if let Err(err) = D::begin(&mut *conn) {
        let _ = result_sender.send(Err(err));
        return;
      }

      let tx = Transaction::<D> { conn, stmt: None };
      if result_sender.send(Ok(())).is_err() {
        // Caller went away before the handle existed.
        let _ = tx.finish(Outcome::Rollback);
        return;
      }

      event_loop(tx, receiver);
    });

    result_receiver.await.map_err(|_| Error::SessionClosed)??;
    return Ok(Self { sender });
  }

  /// Runs `function` on the session thread.
  pub async fn call<F, R>(&self, function: F) -> Result<R>
  where
    F: FnOnce(&mut Transaction<D>) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let (sender, receiver) = oneshot::channel::<Result<R>>();

    self
      .sender
      .send(Message::Execute(Box::new(move |tx: &mut Transaction<D>| {
        let value = function(tx);
        let _ = sender.send(value);
      })))
      .map_err(|_| Error::SessionClosed)?;

    return receiver.await.map_err(|_| Error::SessionClosed)?;
  }

  /// Prepares the insert statement. A second call keeps the existing statement.
  pub async fn prepare(&self) -> Result<()> {
    return self
      .call(|tx| {
        if tx.stmt.is_none() {
          tx.stmt = Some(D::prepare_insert(&mut *tx.conn)?);
        }
        Ok(())
      })
      .await;
  }

  pub async fn insert(&self, id: i32) -> Result<u64> {
    return self
      .call(move |tx| {
        let stmt = tx.stmt.as_ref().ok_or(Error::NotPrepared)?;
        D::execute_insert(&mut *tx.conn, stmt, id)
      })
      .await;
  }

  pub async fn close_statement(&self) -> Result<()> {
    return self.call(|tx| tx.close_statement()).await;
  }

  /// Commits and returns the connection to the pool. Other clones of this handle fail with
  /// [`Error::SessionClosed`] afterwards.
  pub async fn commit(self) -> Result<()> {
    return self.finish(Outcome::Commit).await;
  }

  pub async fn rollback(self) -> Result<()> {
    return self.finish(Outcome::Rollback).await;
  }

  async fn finish(self, outcome: Outcome) -> Result<()> {
    let (sender, receiver) = oneshot::channel();
    self
      .sender
      .send(Message::Finish(outcome, sender))
      .map_err(|_| Error::SessionClosed)?;
    return receiver.await.map_err(|_| Error::SessionClosed)?;
  }
}

fn event_loop<D: Driver>(mut tx: Transaction<D>, receiver: Receiver<Message<D>>) {
  while let Ok(message) = receiver.recv() {
    match message {
      Message::Execute(function) => function(&mut tx),
      Message::Finish(outcome, reply) => {
        let result = tx.finish(outcome);
        debug!(?outcome, ok = result.is_ok(), "session finished");
        // The connection is back in the pool once `finish` returned.
        let _ = reply.send(result);
        return;
      }
    }
  }

  warn!("all session handles dropped with an open transaction, rolling back");
  if let Err(err) = tx.finish(Outcome::Rollback) {
    warn!(error = %err, "rollback failed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PoolConfig;
  use crate::database::Database;
  use crate::driver::Sqlite;
  use std::time::Duration;

  fn setup() -> (tempfile::TempDir, Database<Sqlite>) {
    let tmp_dir = tempfile::TempDir::new().unwrap();
    let pool = PoolConfig {
      max_connections: 2,
      min_idle: Some(1),
      connection_timeout: Duration::from_secs(5),
    };
    let db = Database::setup(Sqlite::new(tmp_dir.path().join("session.sqlite")), &pool).unwrap();
    return (tmp_dir, db);
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn insert_requires_prepare() {
    let (_tmp_dir, db) = setup();
    let session = Session::<Sqlite>::begin(db.pool().clone()).await.unwrap();

    assert!(matches!(session.insert(1).await, Err(Error::NotPrepared)));

    session.prepare().await.unwrap();
    assert_eq!(session.insert(1).await.unwrap(), 1);
    assert!(session.call(|tx| Ok(tx.is_prepared())).await.unwrap());

    // Uncommitted rows are visible inside the transaction.
    let in_tx = session
      .call(|tx| Sqlite::count_rows(tx.conn()))
      .await
      .unwrap();
    assert_eq!(in_tx, 1);

    session.close_statement().await.unwrap();
    assert!(!session.call(|tx| Ok(tx.is_prepared())).await.unwrap());
    assert!(matches!(session.insert(2).await, Err(Error::NotPrepared)));

    session.commit().await.unwrap();
    let rows = tokio::task::spawn_blocking(move || db.row_count())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(rows, 1);
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn explicit_rollback_discards_rows() {
    let (_tmp_dir, db) = setup();
    let session = Session::<Sqlite>::begin(db.pool().clone()).await.unwrap();
    session.prepare().await.unwrap();
    session.insert(1).await.unwrap();

    let other = session.clone();
    session.rollback().await.unwrap();
    assert!(matches!(other.insert(2).await, Err(Error::SessionClosed)));

    let rows = tokio::task::spawn_blocking(move || db.row_count())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(rows, 0);
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn dropping_every_handle_rolls_back() {
    let (_tmp_dir, db) = setup();
    {
      let session = Session::<Sqlite>::begin(db.pool().clone()).await.unwrap();
      session.prepare().await.unwrap();
      session.insert(1).await.unwrap();
    }

    // The rollback runs on the session thread; a writer can only start after it released the
    // lock, and sees no row.
    let rows = tokio::task::spawn_blocking(move || {
      let mut conn = db.pool().get().unwrap();
      Sqlite::insert_in_own_transaction(&mut *conn, 2).unwrap();
      db.row_count()
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(rows, 1);
  }
}
