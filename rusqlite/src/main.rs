use insert_harness::{init_logging, BenchConfig, Benchmark, Database, Sqlite, Strategy};
use tracing::{error, info};

const NAME: &str = "RUSQLITE";

fn main() {
  init_logging();

  let tmp_dir = match tempfile::TempDir::new() {
    Ok(tmp_dir) => tmp_dir,
    Err(err) => {
      error!(error = %err, "creating temp dir failed");
      std::process::exit(1);
    }
  };

  let fname = tmp_dir.path().join(format!("{NAME}.sqlite"));
  info!("DB file: {fname:?}");

  let rt = match tokio::runtime::Builder::new_multi_thread().build() {
    Ok(rt) => rt,
    Err(err) => {
      error!(error = %err, "building runtime failed");
      return;
    }
  };

  // Setup runs again before each strategy, so the second run starts from an empty table.
  for strategy in [Strategy::SharedTransaction, Strategy::TransactionPerUnit] {
    let config = BenchConfig::default().with_strategy(strategy);

    let db = match Database::setup(Sqlite::new(&fname), &config.pool) {
      Ok(db) => db,
      Err(err) => {
        error!(error = %err, "[{NAME}] setup failed");
        return;
      }
    };

    let bench = match Benchmark::new(db, config) {
      Ok(bench) => bench,
      Err(err) => {
        error!(error = %err, "invalid benchmark config");
        return;
      }
    };

    match rt.block_on(bench.run()) {
      Ok(report) => report.log(),
      Err(err) => error!(error = %err, "[{NAME}] {strategy} aborted"),
    }
    bench.close();
  }
}
