//! Word-level Markov chain text generation library.
//!
//! This crate builds order-k n-gram models of word sequences from text
//! corpora and generates new text by frequency-weighted random walk:
//! - Basic and extended (sentence-aware) tokenization
//! - An in-memory chain serialized whole to a flat JSON file
//! - A durable SQLite counted-edge store that outlives the process
//! - A multi-file trainer with resumable sequential and lock-serialized
//!   parallel modes
//!
//! Both backends implement the [`chain::MarkovChain`] trait; generated
//! text carries no natural-language guarantees and generation is
//! randomized by default.

/// Chain models, the backend trait and the multi-file orchestrator.
pub mod chain;

/// Crate-wide error taxonomy.
pub mod error;

/// I/O utilities (line reading, wildcard listing, file inspectors).
pub mod io;

/// Standalone, independently testable tokenization functions.
pub mod tokenizer;

pub use chain::{MarkovChain, MemoryChain, MultiFileTrainer, SqliteChain, SqliteConfig};
pub use error::ChainError;
