use constants::*;
use insert_harness::{init_logging, BenchConfig, Benchmark, Database, Error, Postgres};
use tracing::{error, info};

const NAME: &str = "POSTGRES";

fn main() {
  init_logging();

  let driver = match Postgres::from_dsn(DSN) {
    Ok(driver) => driver,
    Err(err) => {
      error!(error = %err, "invalid DSN");
      std::process::exit(1);
    }
  };

  let config = BenchConfig::default();
  let db = match Database::setup(driver, &config.pool) {
    Ok(db) => db,
    Err(err @ Error::Open(_)) => {
      error!(error = %err, "[{NAME}] cannot continue without a database handle");
      std::process::exit(1);
    }
    // Already logged; nothing was inserted.
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

  // Blocking clients must be dropped outside the runtime.
  bench.close();
  info!("[{NAME}] done");
}
