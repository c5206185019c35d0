use std::time::Duration;

use constants::*;

use crate::error::{Error, Result};

/// How the concurrent units reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// All units funnel into one transaction owned by a single session thread.
  SharedTransaction,
  /// Every unit checks out a pooled connection and commits on its own.
  TransactionPerUnit,
}

impl std::fmt::Display for Strategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Strategy::SharedTransaction => f.write_str("shared_transaction"),
      Strategy::TransactionPerUnit => f.write_str("transaction_per_unit"),
    };
  }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
  /// Hard cap on open connections.
  pub max_connections: u32,
  /// Idle connections the pool keeps warm, never more than `max_connections`.
  pub min_idle: Option<u32>,
  pub connection_timeout: Duration,
}

impl Default for PoolConfig {
  fn default() -> Self {
    let max_connections = max_connections();
    return Self {
      max_connections,
      min_idle: Some(max_connections),
      connection_timeout: CONNECTION_TIMEOUT,
    };
  }
}

impl PoolConfig {
  pub fn validate(mut self) -> Result<Self> {
    if self.max_connections == 0 {
      return Err(Error::Config("max_connections must be positive".into()));
    }
    if self.connection_timeout.is_zero() {
      return Err(Error::Config("connection_timeout must be positive".into()));
    }
    self.min_idle = self.min_idle.map(|idle| idle.min(self.max_connections));
    return Ok(self);
  }
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
  pub count: usize,
  pub strategy: Strategy,
  pub pool: PoolConfig,
}

impl Default for BenchConfig {
  fn default() -> Self {
    return Self {
      count: COUNT,
      strategy: Strategy::SharedTransaction,
      pool: PoolConfig::default(),
    };
  }
}

impl BenchConfig {
  pub fn with_count(mut self, count: usize) -> Self {
    self.count = count;
    return self;
  }

  pub fn with_strategy(mut self, strategy: Strategy) -> Self {
    self.strategy = strategy;
    return self;
  }

  pub fn with_pool(mut self, pool: PoolConfig) -> Self {
    self.pool = pool;
    return self;
  }

  /// Ids are sent as `INTEGER`, so every index in `0..count` has to fit an `i32`.
  pub fn validate(mut self) -> Result<Self> {
    if self.count == 0 {
      return Err(Error::Config("count must be positive".into()));
    }
    if self.count > i32::MAX as usize {
      return Err(Error::Config(format!(
        "count {} exceeds the id range",
        self.count
      )));
    }
    self.pool = self.pool.validate()?;
    return Ok(self);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_is_valid() {
    let config = BenchConfig::default().validate().unwrap();
    assert_eq!(config.count, COUNT);
    assert_eq!(config.strategy, Strategy::SharedTransaction);
    assert!(config.pool.max_connections > 0);
    assert!(config.pool.max_connections < COUNT as u32);
  }

  #[test]
  fn rejects_empty_and_oversized_runs() {
    assert!(matches!(
      BenchConfig::default().with_count(0).validate(),
      Err(Error::Config(_))
    ));
    assert!(matches!(
      BenchConfig::default()
        .with_count(i32::MAX as usize + 1)
        .validate(),
      Err(Error::Config(_))
    ));
  }

  #[test]
  fn idle_is_clamped_to_open() {
    let pool = PoolConfig {
      max_connections: 4,
      min_idle: Some(constants::MAX_IDLE_CONNS),
      connection_timeout: Duration::from_secs(1),
    }
    .validate()
    .unwrap();
    assert_eq!(pool.min_idle, Some(4));

    let zero = PoolConfig {
      max_connections: 0,
      ..PoolConfig::default()
    };
    assert!(zero.validate().is_err());
  }
}
