use std::time::Duration;

/// Number of concurrent insert units fired per run.
pub const COUNT: usize = 10000;

/// Literal for the `name` column, spliced into the insert statements with `concat!`.
#[macro_export]
macro_rules! user_name {
  () => {
    "viney"
  };
}

/// Value of the `name` column, for checking persisted rows.
pub const USER_NAME: &str = user_name!();

pub const DSN: &str =
  "host=192.168.1.138 port=4932 dbname=postgres user=postgres password=admin sslmode=disable";

/// Idle retention the benchmark historically asked for. It never capped open connections, the
/// pool is sized from `num_tasks()` instead.
pub const MAX_IDLE_CONNS: u32 = 10000;

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

pub fn num_tasks() -> usize {
  return std::thread::available_parallelism()
    .map(|n| n.get())
    .unwrap_or(1);
}

/// Default upper bound on open connections: enough to keep every core busy while some
/// connections wait on the server.
pub fn max_connections() -> u32 {
  return (2 * num_tasks()).min(MAX_IDLE_CONNS as usize) as u32;
}

pub const PG_RESET_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS tb_user;
    CREATE TABLE tb_user (
      id          INTEGER PRIMARY KEY NOT NULL,
      name        TEXT,
      create_time TIMESTAMP(0) WITHOUT TIME ZONE DEFAULT CURRENT_TIMESTAMP
    );
"#;

pub const PG_INSERT: &str = concat!(
  "INSERT INTO tb_user (id, name, create_time) VALUES ($1, '",
  user_name!(),
  "', DEFAULT)"
);

pub const PRAGMAS: &str = r#"
    PRAGMA busy_timeout       = 10000;
    PRAGMA journal_mode       = WAL;
    PRAGMA journal_size_limit = 200000000;
    PRAGMA synchronous        = NORMAL;
    PRAGMA foreign_keys       = ON;
    PRAGMA temp_store         = MEMORY;
    PRAGMA cache_size         = -16000;
"#;

pub const SQLITE_RESET_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS tb_user;
    CREATE TABLE tb_user (
      id          INTEGER PRIMARY KEY NOT NULL,
      name        TEXT,
      create_time DATETIME DEFAULT CURRENT_TIMESTAMP
    );
"#;

pub const SQLITE_INSERT: &str = concat!(
  "INSERT INTO tb_user (id, name) VALUES ($1, '",
  user_name!(),
  "')"
);

pub const COUNT_QUERY: &str = "SELECT COUNT(*) FROM tb_user";

pub const SELECT_USERS: &str = "SELECT id, name, create_time FROM tb_user ORDER BY id";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_statements_carry_the_name_literal() {
    assert_eq!(
      PG_INSERT,
      "INSERT INTO tb_user (id, name, create_time) VALUES ($1, 'viney', DEFAULT)"
    );
    assert_eq!(SQLITE_INSERT, "INSERT INTO tb_user (id, name) VALUES ($1, 'viney')");
    assert!(PG_INSERT.contains(&format!("'{USER_NAME}'")));
    assert!(SQLITE_INSERT.contains(&format!("'{USER_NAME}'")));
  }

  #[test]
  fn pool_is_bounded() {
    assert!(max_connections() >= 2);
    assert!(max_connections() <= MAX_IDLE_CONNS);
  }
}
