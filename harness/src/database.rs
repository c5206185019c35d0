use std::sync::Arc;

use r2d2::Pool;
use tracing::{error, info};

use crate::config::PoolConfig;
use crate::driver::{Driver, User};
use crate::error::{Error, Result};

/// The shared handle: a bounded connection pool over a freshly reset `tb_user` table.
///
/// Built once by the entry point and passed into the benchmark. All methods block, so call them
/// outside async contexts or through `spawn_blocking`.
pub struct Database<D: Driver> {
  driver: Arc<D>,
  pool: Pool<D::Manager>,
}

impl<D: Driver> Clone for Database<D> {
  fn clone(&self) -> Self {
    return Self {
      driver: self.driver.clone(),
      pool: self.pool.clone(),
    };
  }
}

impl<D: Driver> Database<D> {
  /// Opens the pool, then drops and recreates `tb_user`.
  ///
  /// Fails with [`Error::Open`] when no connection can be established and with
  /// [`Error::Schema`] when the reset fails. In both cases no handle exists afterwards, so no
  /// insert can be issued.
  pub fn setup(driver: D, config: &PoolConfig) -> Result<Self> {
    let config = config.clone().validate()?;

    let pool = build_pool(&driver, &config).map_err(|err| {
      error!(driver = driver.name(), error = %err, "opening database handle failed");
      Error::Open(Box::new(err))
    })?;

    let reset = pool
      .get()
      .map_err(Error::from)
      .and_then(|mut conn| D::reset_schema(&mut *conn));
    if let Err(err) = reset {
      error!(driver = driver.name(), error = %err, "resetting tb_user failed");
      return Err(Error::Schema(Box::new(err)));
    }

    info!(
      driver = driver.name(),
      max_connections = config.max_connections,
      min_idle = ?config.min_idle,
      "tb_user reset"
    );

    return Ok(Self {
      driver: Arc::new(driver),
      pool,
    });
  }

  pub fn driver(&self) -> &D {
    return &self.driver;
  }

  pub fn pool(&self) -> &Pool<D::Manager> {
    return &self.pool;
  }

  pub fn row_count(&self) -> Result<i64> {
    let mut conn = self.pool.get()?;
    return D::count_rows(&mut *conn);
  }

  pub fn users(&self) -> Result<Vec<User>> {
    let mut conn = self.pool.get()?;
    return D::fetch_users(&mut *conn);
  }

  /// Releases this handle. Pooled connections close once the last clone is gone.
  pub fn close(self) {
    let state = self.pool.state();
    info!(
      driver = self.driver.name(),
      connections = state.connections,
      idle = state.idle_connections,
      "closing database handle"
    );
  }
}

fn build_pool<D: Driver>(driver: &D, config: &PoolConfig) -> Result<Pool<D::Manager>> {
  let manager = driver.manager()?;
  let pool = Pool::builder()
    .max_size(config.max_connections)
    .min_idle(config.min_idle)
    .connection_timeout(config.connection_timeout)
    .build(manager)?;
  return Ok(pool);
}
