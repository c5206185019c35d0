//! Shared machinery for the `tb_user` concurrent insert benchmarks.
//!
//! The entry point calls [`Database::setup`] once, hands the handle to a [`Benchmark`] and runs
//! it inside a tokio runtime:
//!
//! ```no_run
//! use insert_harness::{Benchmark, BenchConfig, Database, Sqlite};
//!
//! let config = BenchConfig::default().with_count(100);
//! let db = Database::setup(Sqlite::new("bench.sqlite"), &config.pool).unwrap();
//! let bench = Benchmark::new(db, config).unwrap();
//!
//! let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
//! let report = rt.block_on(bench.run()).unwrap();
//! println!("{report:?}");
//! bench.close();
//! ```

mod bench;
mod config;
mod database;
mod driver;
mod error;
mod logging;
mod session;

pub use crate::bench::{Benchmark, RunReport};
pub use crate::config::{BenchConfig, PoolConfig, Strategy};
pub use crate::database::Database;
pub use crate::driver::{Conn, Driver, Postgres, Sqlite, User};
pub use crate::error::{Error, Result, Step};
pub use crate::logging::init_logging;
pub use crate::session::{Session, Transaction};
