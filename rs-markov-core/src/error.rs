use thiserror::Error;

/// Errors produced by the chain engine.
///
/// # Taxonomy
/// - `Config`: invalid construction parameter (order < 1, capacity < 1,
///   invalid directory). Fails fast, never retried internally.
/// - `EmptyChain`: generation requested while the chain holds no edges.
///   Covers both "never trained" and "trained but legitimately empty";
///   the two cases are deliberately not distinguished.
/// - `StoreUnavailable`: operation attempted after an explicit `close`.
/// - `Contention`: the durable store stayed locked past its busy
///   timeout. Transient; the caller may re-invoke training for that file.
/// - `Io` / `Sqlite` / `Serde`: propagated collaborator failures.
#[derive(Debug, Error)]
pub enum ChainError {
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("the chain is empty, train it first")]
	EmptyChain,

	#[error("the store has been closed")]
	StoreUnavailable,

	#[error("write contention on the store: {0}")]
	Contention(String),

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("store error: {0}")]
	Sqlite(rusqlite::Error),

	#[error("serialization error: {0}")]
	Serde(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for ChainError {
	/// Classifies SQLite failures.
	///
	/// Busy/locked conditions become the retryable `Contention` variant;
	/// everything else is surfaced as `Sqlite`.
	fn from(error: rusqlite::Error) -> Self {
		use rusqlite::ErrorCode::{DatabaseBusy, DatabaseLocked};

		match error.sqlite_error_code() {
			Some(DatabaseBusy) | Some(DatabaseLocked) => Self::Contention(error.to_string()),
			_ => Self::Sqlite(error),
		}
	}
}
