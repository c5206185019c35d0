use std::fmt;

/// Transaction-lifecycle steps that abort a run when they fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  Begin,
  Prepare,
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    return match self {
      Step::Begin => f.write_str("begin"),
      Step::Prepare => f.write_str("prepare"),
    };
  }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error("Postgres error: {0}")]
  Postgres(#[from] postgres::Error),
  #[error("Pool error: {0}")]
  Pool(#[from] r2d2::Error),
  #[error("Failed to open database handle: {0}")]
  Open(#[source] Box<Error>),
  #[error("Failed to reset schema: {0}")]
  Schema(#[source] Box<Error>),
  #[error("Invalid config: {0}")]
  Config(String),
  #[error("Session closed")]
  SessionClosed,
  #[error("No prepared statement")]
  NotPrepared,
  #[error("Transaction aborted by the server, rolled back instead of committed")]
  TransactionAborted,
  #[error("Worker failed: {0}")]
  Join(#[from] tokio::task::JoinError),
  #[error("Run aborted at {step}: {source}")]
  Aborted {
    step: Step,
    #[source]
    source: Box<Error>,
  },
}

impl Error {
  pub(crate) fn aborted(step: Step, source: Error) -> Self {
    return Error::Aborted {
      step,
      source: Box::new(source),
    };
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
