//! Chain models and the common backend capability set.
//!
//! Two interchangeable persistence strategies implement [`MarkovChain`]:
//! - [`MemoryChain`]: gram → successor-list map held in memory,
//!   serialized whole to a flat JSON file.
//! - [`SqliteChain`]: durable counted-edge store backed by SQLite,
//!   outliving the process.
//!
//! Call sites should program against the trait and never branch on the
//! backend identity.

pub mod memory;
pub mod multi_file;
pub mod sqlite;

pub use memory::MemoryChain;
pub use multi_file::MultiFileTrainer;
pub use sqlite::{SqliteChain, SqliteConfig};

use crate::error::ChainError;

/// Reserved sentinel marking the end of a trained unit (line or sentence).
///
/// A valid "next" value, never a valid output word: generation stops
/// before emitting it.
pub const END_TOKEN: &str = "<END>";

/// Reserved sentinel seeding the canonical beginning-of-sequence gram in
/// the durable variant (repeated `order` times as the initial key).
pub const START_TOKEN: &str = "<START>";

/// Common capability set shared by both chain backends.
///
/// # Responsibilities
/// - Accumulate n-gram edges from raw text (`train`, `train_lines`)
/// - Produce text by frequency-weighted random walk (`generate`)
/// - Report whether any edge exists (`is_empty`)
pub trait MarkovChain {
	/// Trains the chain on a single line of text.
	fn train(&mut self, text: &str) -> Result<(), ChainError>;

	/// Trains the chain on many lines of text.
	fn train_lines(&mut self, lines: &[String]) -> Result<(), ChainError> {
		for line in lines {
			self.train(line)?;
		}
		Ok(())
	}

	/// Generates text starting from a given gram (or a random one if `None`),
	/// up to `max_words` tokens.
	fn generate(&self, start: Option<&str>, max_words: usize) -> Result<String, ChainError>;

	/// Returns true if the chain holds no edges.
	fn is_empty(&self) -> Result<bool, ChainError>;
}

/// Builds the gram key for `tokens[start..start + order]`, tokens joined
/// by a single space.
pub(crate) fn gram_key(tokens: &[String], start: usize, order: usize) -> String {
	tokens[start..start + order].join(" ")
}

/// Recomputes the current gram as the last `order` tokens of a growing
/// output sequence.
pub(crate) fn last_gram(tokens: &[String], order: usize) -> String {
	let from = tokens.len().saturating_sub(order);
	tokens[from..].join(" ")
}
