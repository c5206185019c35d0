use constants::*;
use insert_harness::{init_logging, BenchConfig, Benchmark, Database, Error, Postgres, Strategy};
use tracing::{error, info};

const NAME: &str = "R2D2";

/// Every unit runs its own transaction on a pooled connection. No batch-wide atomicity, but no
/// shared transaction either.
fn main() {
  init_logging();

  let driver = match Postgres::from_dsn(DSN) {
    Ok(driver) => driver,
    Err(err) => {
      error!(error = %err, "invalid DSN");
      std::process::exit(1);
    }
  };

  let config = BenchConfig::default().with_strategy(Strategy::TransactionPerUnit);
  info!(
    "[{NAME}] {count} units over at most {max} connections",
    count = config.count,
    max = config.pool.max_connections,
  );

  let db = match Database::setup(driver, &config.pool) {
    Ok(db) => db,
    Err(err @ Error::Open(_)) => {
      error!(error = %err, "[{NAME}] cannot continue without a database handle");
      std::process::exit(1);
    }
    Err(_) => return,
  };

  let bench = match Benchmark::new(db, config) {
    Ok(bench) => bench,
    Err(err) => {
      error!(error = %err, "invalid benchmark config");
      return;
    }
  };

  let rt = match tokio::runtime::Builder::new_multi_thread().build() {
    Ok(rt) => rt,
    Err(err) => {
      error!(error = %err, "building runtime failed");
      return;
    }
  };

  if let Ok(report) = rt.block_on(bench.run()) {
    report.log();
  }
  drop(rt);

  bench.close();
}
