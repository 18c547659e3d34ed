use std::collections::HashMap;
use std::io;
use std::path::Path;

use rand::Rng;
use rand::prelude::IteratorRandom;

use super::{END_TOKEN, MarkovChain, gram_key, last_gram};
use crate::error::ChainError;
use crate::tokenizer::tokenize;

/// In-memory Markov chain over word n-grams.
///
/// Maps a gram key (exactly `order` tokens joined by a single space) to
/// the flat multiset of observed successor tokens. Every occurrence
/// recorded during training is one list entry, so generation can pick
/// uniformly by index and the pick is frequency-weighted for free.
///
/// # Responsibilities
/// - Accumulate successor occurrences from raw text lines
/// - Generate sequences by weighted random walk
/// - Round-trip the whole structure through a flat JSON document
///
/// # Invariants
/// - `order >= 1`, enforced at construction
/// - Every gram present as a key has at least one successor entry
/// - Self-loops are legal and never filtered
#[derive(Clone, Debug)]
pub struct MemoryChain {
	/// The order of the model (number of tokens per gram key).
	order: usize,

	/// Mapping from gram key to its successor multiset.
	chain: HashMap<String, Vec<String>>,
}

impl MemoryChain {
	/// Creates a new empty chain of the given order.
	///
	/// `capacity` pre-sizes the underlying map; it is an explicit
	/// per-instance value, never shared across instances.
	///
	/// # Errors
	/// `ChainError::Config` if `order < 1` or `capacity < 1`.
	pub fn new(order: usize, capacity: usize) -> Result<Self, ChainError> {
		if order < 1 {
			return Err(ChainError::Config("order must be at least 1".to_owned()));
		}
		if capacity < 1 {
			return Err(ChainError::Config("capacity must be at least 1".to_owned()));
		}
		Ok(Self {
			order,
			chain: HashMap::with_capacity(capacity),
		})
	}

	/// Returns the raw successor multiset for a gram, empty if absent.
	pub fn lookup(&self, gram: &str) -> &[String] {
		self.chain.get(gram).map_or(&[], Vec::as_slice)
	}

	/// Adds one observed transition from `gram` to `next`.
	///
	/// Duplicates are stored as repeated entries; the weight of an edge is
	/// its repetition count in the successor list.
	pub fn add(&mut self, gram: &str, next: &str) {
		self.chain.entry(gram.to_owned()).or_default().push(next.to_owned());
	}

	/// Generates a sequence using the supplied random source.
	///
	/// Same algorithm as [`MarkovChain::generate`]; tests inject a seeded
	/// RNG here to get deterministic walks.
	///
	/// # Errors
	/// `ChainError::EmptyChain` if the chain holds no edges.
	pub fn generate_with_rng<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		start: Option<&str>,
		max_words: usize,
	) -> Result<String, ChainError> {
		if self.chain.is_empty() {
			return Err(ChainError::EmptyChain);
		}

		// Seed with the given gram, or a uniformly random existing key
		let mut current = match start {
			Some(gram) => gram.to_owned(),
			// Cannot be None: the chain is not empty
			None => self.chain.keys().choose(rng).cloned().unwrap_or_default(),
		};

		let mut result: Vec<String> = current.split(' ').map(str::to_owned).collect();

		for _ in 0..max_words.saturating_sub(self.order) {
			let successors = self.lookup(&current);
			if successors.is_empty() {
				// Dead end: normal termination, not an error
				break;
			}

			let next = &successors[rng.random_range(0..successors.len())];
			if next == END_TOKEN {
				break;
			}

			result.push(next.clone());
			current = last_gram(&result, self.order);
		}

		Ok(result.join(" "))
	}

	/// Saves the whole gram → successor-list structure as a single JSON
	/// document.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ChainError> {
		let document = serde_json::to_string(&self.chain)?;
		std::fs::write(path, document)?;
		Ok(())
	}

	/// Loads the chain from a JSON document written by [`Self::save`].
	///
	/// The round-trip is exact: same keys, same multiset per key.
	///
	/// # Errors
	/// `ChainError::Io` if the file does not exist. A failed load leaves
	/// the currently held chain untouched.
	pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ChainError> {
		let path = path.as_ref();
		if !path.exists() {
			return Err(ChainError::Io(io::Error::new(
				io::ErrorKind::NotFound,
				format!("file not found: {}", path.display()),
			)));
		}

		// Parse into a fresh map first so a malformed document cannot
		// corrupt the chain already held
		let document = std::fs::read_to_string(path)?;
		let loaded: HashMap<String, Vec<String>> = serde_json::from_str(&document)?;
		self.chain = loaded;
		Ok(())
	}

	/// Removes every edge observed fewer than `min_count` times; grams left
	/// without successors are dropped. Irreversible.
	pub fn prune(&mut self, min_count: usize) {
		for successors in self.chain.values_mut() {
			let mut counts: HashMap<&str, usize> = HashMap::new();
			for next in successors.iter() {
				*counts.entry(next.as_str()).or_insert(0) += 1;
			}
			let keep: Vec<String> = successors
				.iter()
				.filter(|next| counts[next.as_str()] >= min_count)
				.cloned()
				.collect();
			*successors = keep;
		}
		self.chain.retain(|_, successors| !successors.is_empty());
	}

	/// Releases excess capacity held by the map and its successor lists.
	pub fn trim(&mut self) {
		for successors in self.chain.values_mut() {
			successors.shrink_to_fit();
		}
		self.chain.shrink_to_fit();
	}

	/// Number of distinct gram keys currently held.
	pub fn gram_count(&self) -> usize {
		self.chain.len()
	}
}

impl MarkovChain for MemoryChain {
	/// Builds n-grams from one line of text and records their transitions.
	///
	/// The line is split with the basic tokenizer and terminated with one
	/// `<END>` sentinel; lines with fewer than `order + 1` tokens produce
	/// no edges.
	fn train(&mut self, text: &str) -> Result<(), ChainError> {
		let mut words = tokenize(text);
		words.push(END_TOKEN.to_owned());

		for i in 0..words.len().saturating_sub(self.order) {
			let key = gram_key(&words, i, self.order);
			let next = words[i + self.order].clone();
			self.add(&key, &next);
		}
		Ok(())
	}

	fn generate(&self, start: Option<&str>, max_words: usize) -> Result<String, ChainError> {
		self.generate_with_rng(&mut rand::rng(), start, max_words)
	}

	fn is_empty(&self) -> Result<bool, ChainError> {
		Ok(self.chain.is_empty())
	}
}
