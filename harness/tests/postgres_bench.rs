//! Needs the server behind `constants::DSN`. Run with `cargo test -- --ignored`.

use constants::DSN;
use insert_harness::*;

fn setup() -> Database<Postgres> {
  let driver = Postgres::from_dsn(DSN).unwrap();
  return Database::setup(driver, &PoolConfig::default()).unwrap();
}

#[test]
#[ignore]
fn one_failing_unit_aborts_the_whole_transaction() {
  let db = setup();

  // Occupy id 1 so that unit's insert hits the primary key.
  {
    let mut conn = db.pool().get().unwrap();
    Postgres::insert_in_own_transaction(&mut *conn, 1).unwrap();
  }

  let config = BenchConfig::default().with_count(3);
  let bench = Benchmark::new(db.clone(), config).unwrap();

  let rt = tokio::runtime::Builder::new_multi_thread().build().unwrap();
  let report = rt.block_on(bench.run()).unwrap();
  drop(rt);

  assert_eq!(report.signals, 3);
  assert!(report.failed >= 1);
  // The server rolled back everything the run inserted; only the occupied row is left.
  assert!(!report.committed);
  assert_eq!(report.persisted_rows, Some(1));
  assert_eq!(db.row_count().unwrap(), 1);

  bench.close();
}

#[test]
#[ignore]
fn three_units_commit_on_postgres() {
  let db = setup();
  let bench = Benchmark::new(db.clone(), BenchConfig::default().with_count(3)).unwrap();

  let rt = tokio::runtime::Builder::new_multi_thread().build().unwrap();
  let report = rt.block_on(bench.run()).unwrap();
  drop(rt);

  assert!(report.committed);
  assert_eq!(report.persisted_rows, Some(3));
  let ids: Vec<i32> = db.users().unwrap().iter().map(|u| u.id).collect();
  assert_eq!(ids, vec![0, 1, 2]);

  bench.close();
}
