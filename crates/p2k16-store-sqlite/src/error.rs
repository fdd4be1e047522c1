//! Error type for `p2k16-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row referenced by a just-completed write could not be read back.
  #[error("row vanished after write: {0}")]
  Vanished(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
