use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{BenchConfig, Strategy};
use crate::database::Database;
use crate::driver::Driver;
use crate::error::{Error, Result, Step};
use crate::session::Session;

/// What a finished run observed.
#[derive(Debug, Clone)]
pub struct RunReport {
  pub strategy: Strategy,
  pub dispatched: usize,
  /// Completion signals drained by the barrier.
  pub signals: usize,
  pub succeeded: usize,
  pub failed: usize,
  /// Dispatch plus barrier only.
  pub elapsed: Duration,
  pub prepare_elapsed: Duration,
  pub commit_elapsed: Duration,
  pub committed: bool,
  /// Rows visible after the commit, `None` if counting failed.
  pub persisted_rows: Option<i64>,
}

impl RunReport {
  pub fn log(&self) {
    info!(
      strategy = %self.strategy,
      dispatched = self.dispatched,
      succeeded = self.succeeded,
      failed = self.failed,
      committed = self.committed,
      persisted_rows = ?self.persisted_rows,
      "Inserted {count} rows in {elapsed:?}",
      count = self.succeeded,
      elapsed = self.elapsed,
    );
  }
}

/// Sends one completion signal when dropped, so a unit signals whether it succeeded, failed or
/// panicked.
struct Completion(mpsc::UnboundedSender<()>);

impl Drop for Completion {
  fn drop(&mut self) {
    let _ = self.0.send(());
  }
}

#[derive(Default)]
struct Tally {
  succeeded: AtomicUsize,
  failed: AtomicUsize,
}

impl Tally {
  fn record(&self, id: i32, result: &Result<()>) {
    match result {
      Ok(()) => {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
      }
      Err(err) => {
        warn!(id, error = %err, "insert failed");
        self.failed.fetch_add(1, Ordering::Relaxed);
      }
    }
  }
}

struct Dispatch {
  signals: usize,
  elapsed: Duration,
}

pub struct Benchmark<D: Driver> {
  db: Database<D>,
  config: BenchConfig,
}

impl<D: Driver> Benchmark<D> {
  pub fn new(db: Database<D>, config: BenchConfig) -> Result<Self> {
    let config = config.validate()?;
    return Ok(Self { db, config });
  }

  /// Runs the configured strategy once.
  ///
  /// Failing units never abort the run. Failing to begin or prepare does, before anything is
  /// dispatched.
  pub async fn run(&self) -> Result<RunReport> {
    info!(
      driver = self.db.driver().name(),
      strategy = %self.config.strategy,
      count = self.config.count,
      "starting run"
    );

    return match self.config.strategy {
      Strategy::SharedTransaction => self.run_shared().await,
      Strategy::TransactionPerUnit => self.run_per_unit().await,
    };
  }

  /// Closes the shared handle. Blocking drivers close their connections here, so call it
  /// outside the runtime.
  pub fn close(self) {
    self.db.close();
  }

  async fn run_shared(&self) -> Result<RunReport> {
    let count = self.config.count;

    let session = match Session::<D>::begin(self.db.pool().clone()).await {
      Ok(session) => session,
      Err(err) => {
        error!(error = %err, "begin failed");
        return Err(Error::aborted(Step::Begin, err));
      }
    };

    let prepare_start = Instant::now();
    if let Err(err) = session.prepare().await {
      error!(error = %err, "prepare failed");
      if let Err(rollback_err) = session.rollback().await {
        error!(error = %rollback_err, "rollback failed");
      }
      return Err(Error::aborted(Step::Prepare, err));
    }
    let prepare_elapsed = prepare_start.elapsed();

    let tally = Arc::new(Tally::default());
    let dispatch = barrier(count, |id, done| {
      let session = session.clone();
      let tally = tally.clone();
      tokio::spawn(async move {
        let _done = done;
        let result = session.insert(id).await.map(|_| ());
        tally.record(id, &result);
      });
    })
    .await;

    if let Err(err) = session.close_statement().await {
      error!(error = %err, "closing statement failed");
    }

    let commit_start = Instant::now();
    let committed = match session.commit().await {
      Ok(()) => true,
      Err(err) => {
        error!(error = %err, "commit failed");
        false
      }
    };
    let commit_elapsed = commit_start.elapsed();

    return Ok(RunReport {
      strategy: Strategy::SharedTransaction,
      dispatched: count,
      signals: dispatch.signals,
      succeeded: tally.succeeded.load(Ordering::Relaxed),
      failed: tally.failed.load(Ordering::Relaxed),
      elapsed: dispatch.elapsed,
      prepare_elapsed,
      commit_elapsed,
      committed,
      persisted_rows: self.persisted_rows().await,
    });
  }

  /// Each unit commits on its own connection; concurrency is capped by the pool size.
  async fn run_per_unit(&self) -> Result<RunReport> {
    let count = self.config.count;
    let tally = Arc::new(Tally::default());

    let dispatch = barrier(count, |id, done| {
      let pool = self.db.pool().clone();
      let tally = tally.clone();
      tokio::task::spawn_blocking(move || {
        let _done = done;
        let result = pool
          .get()
          .map_err(Error::from)
          .and_then(|mut conn| D::insert_in_own_transaction(&mut *conn, id));
        tally.record(id, &result);
      });
    })
    .await;

    let failed = tally.failed.load(Ordering::Relaxed);
    return Ok(RunReport {
      strategy: Strategy::TransactionPerUnit,
      dispatched: count,
      signals: dispatch.signals,
      succeeded: tally.succeeded.load(Ordering::Relaxed),
      failed,
      elapsed: dispatch.elapsed,
      prepare_elapsed: Duration::ZERO,
      commit_elapsed: Duration::ZERO,
      committed: failed == 0,
      persisted_rows: self.persisted_rows().await,
    });
  }

  async fn persisted_rows(&self) -> Option<i64> {
    let db = self.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.row_count())
      .await
      .map_err(Error::from)
      .and_then(|rows| rows);

    return match rows {
      Ok(rows) => {
        info!(rows, "rows persisted");
        Some(rows)
      }
      Err(err) => {
        error!(error = %err, "counting rows failed");
        None
      }
    };
  }
}

/// Launches `count` units through `spawn` and blocks until every one of them has signalled.
/// The timer covers exactly the launch and the drain.
async fn barrier<F>(count: usize, mut spawn: F) -> Dispatch
where
  F: FnMut(i32, Completion),
{
  let (sender, mut receiver) = mpsc::unbounded_channel::<()>();

  let start = Instant::now();
  for id in 0..count {
    spawn(id as i32, Completion(sender.clone()));
  }
  drop(sender);

  let mut signals = 0;
  while signals < count {
    if receiver.recv().await.is_none() {
      break;
    }
    signals += 1;
  }
  let elapsed = start.elapsed();

  info!(signals, ?elapsed, "all units finished");
  return Dispatch { signals, elapsed };
}
