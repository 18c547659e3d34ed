use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use rand::Rng;
use rusqlite::{Connection, OptionalExtension, params};

use super::{END_TOKEN, MarkovChain, START_TOKEN, gram_key, last_gram};
use crate::error::ChainError;
use crate::tokenizer::sentence_iter;

/// One upsert per observed edge: insert with count 1, or bump the stored
/// count when the (gram, next) pair already exists.
const UPSERT_SQL: &str = "INSERT INTO ngrams (gram, next, count) VALUES (?1, ?2, 1) \
	ON CONFLICT(gram, next) DO UPDATE SET count = count + 1;";

/// Per-instance configuration of the durable store.
///
/// Owned by each engine instance and passed at construction; never shared
/// across instances.
#[derive(Clone, Debug)]
pub struct SqliteConfig {
	/// SQLite page-cache size applied at open time.
	pub cache_size: i64,

	/// Bounded wait on a locked store before a write fails as retryable
	/// contention, in milliseconds.
	pub busy_timeout_ms: u64,

	/// Line count at or above which `train_lines` fans out across workers,
	/// each on an independently-opened connection under the shared lock.
	pub parallel_threshold: usize,

	/// Lower-case input before extended pattern matching.
	pub fold_case: bool,
}

impl Default for SqliteConfig {
	fn default() -> Self {
		Self {
			cache_size: 1_000_000,
			busy_timeout_ms: 5_000,
			parallel_threshold: 10_000,
			fold_case: true,
		}
	}
}

/// Durable Markov chain backed by a SQLite counted-edge store.
///
/// Edges live in a single table `ngrams(id, gram, next, count)` with a
/// uniqueness constraint on `(gram, next)`; counts accumulate, the pair is
/// never duplicated. The store outlives the process: opening an existing
/// path reuses it, opening a fresh path creates the table.
///
/// # Responsibilities
/// - Transactional batch upsert of one training call's edges
/// - Frequency-weighted generation with canonical-start seeding
/// - Pruning of low-frequency edges
///
/// # Invariants
/// - `order >= 1`, checked before any store file is created
/// - Every stored count is >= 1
/// - All mutating access holds the shared write lock; read-only generation
///   queries do not
pub struct SqliteChain {
	order: usize,
	path: PathBuf,
	config: SqliteConfig,
	write_lock: Arc<Mutex<()>>,
	conn: Option<Connection>,
}

impl SqliteChain {
	/// Opens (or creates) the store at `path`.
	///
	/// WAL journaling, the enlarged page cache and the busy timeout are
	/// configured on the connection at open time.
	///
	/// # Errors
	/// - `ChainError::Config` if `order < 1`, before the file is touched.
	/// - `ChainError::Sqlite` if the path cannot be opened (fatal).
	pub fn open<P: AsRef<Path>>(
		path: P,
		order: usize,
		config: SqliteConfig,
	) -> Result<Self, ChainError> {
		Self::open_with_lock(path, order, config, Arc::new(Mutex::new(())))
	}

	/// Opens a handle sharing an existing write lock.
	///
	/// Parallel workers each own their connection to the same store file
	/// while upserts stay serialized by the one lock.
	pub(crate) fn open_with_lock<P: AsRef<Path>>(
		path: P,
		order: usize,
		config: SqliteConfig,
		write_lock: Arc<Mutex<()>>,
	) -> Result<Self, ChainError> {
		if order < 1 {
			return Err(ChainError::Config("order must be at least 1".to_owned()));
		}

		let path = path.as_ref().to_path_buf();
		let conn = Connection::open(&path)?;
		conn.execute_batch(&format!(
			"PRAGMA journal_mode = WAL;\n\
			 PRAGMA cache_size = {};\n\
			 PRAGMA busy_timeout = {};",
			config.cache_size, config.busy_timeout_ms
		))?;
		conn.execute_batch(
			"CREATE TABLE IF NOT EXISTS ngrams (\n\
			 	id INTEGER PRIMARY KEY AUTOINCREMENT,\n\
			 	gram TEXT,\n\
			 	next TEXT,\n\
			 	count INTEGER,\n\
			 	UNIQUE(gram, next)\n\
			 );",
		)?;

		Ok(Self {
			order,
			path,
			config,
			write_lock,
			conn: Some(conn),
		})
	}

	/// The order of the model.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Clones the shared write lock, for workers opening their own handle.
	pub(crate) fn shared_lock(&self) -> Arc<Mutex<()>> {
		Arc::clone(&self.write_lock)
	}

	fn conn(&self) -> Result<&Connection, ChainError> {
		self.conn.as_ref().ok_or(ChainError::StoreUnavailable)
	}

	fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, ChainError> {
		self.write_lock
			.lock()
			.map_err(|_| ChainError::Contention("write lock poisoned".to_owned()))
	}

	/// Total number of distinct edges in the store.
	pub fn edge_count(&self) -> Result<i64, ChainError> {
		let count =
			self.conn()?
				.query_row("SELECT COUNT(*) FROM ngrams;", [], |row| row.get(0))?;
		Ok(count)
	}

	/// All outgoing edges for a gram, as (next token, count) pairs.
	pub fn successors(&self, gram: &str) -> Result<Vec<(String, i64)>, ChainError> {
		let conn = self.conn()?;
		let mut stmt = conn.prepare_cached("SELECT next, count FROM ngrams WHERE gram = ?1;")?;
		let rows = stmt.query_map(params![gram], |row| Ok((row.get(0)?, row.get(1)?)))?;

		let mut edges = Vec::new();
		for row in rows {
			edges.push(row?);
		}
		Ok(edges)
	}

	/// One gram chosen uniformly at random from all existing keys, or
	/// `None` when the store holds no edge.
	pub fn sample_random_gram(&self) -> Result<Option<String>, ChainError> {
		let gram = self
			.conn()?
			.query_row("SELECT gram FROM ngrams ORDER BY RANDOM() LIMIT 1;", [], |row| {
				row.get(0)
			})
			.optional()?;
		Ok(gram)
	}

	/// Deletes every edge with `count < min_count`. Irreversible.
	pub fn prune(&self, min_count: i64) -> Result<usize, ChainError> {
		let _guard = self.lock_writes()?;
		let removed = self
			.conn()?
			.execute("DELETE FROM ngrams WHERE count < ?1;", params![min_count])?;
		Ok(removed)
	}

	/// Generates a sequence using the supplied random source.
	///
	/// Same algorithm as [`MarkovChain::generate`]; tests inject a seeded
	/// RNG here for deterministic walks. The random-row sampling used for
	/// the start-gram fallback stays on the store side.
	///
	/// # Errors
	/// - `ChainError::StoreUnavailable` after `close`.
	/// - `ChainError::EmptyChain` when the store holds no edges.
	pub fn generate_with_rng<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		start: Option<&str>,
		max_words: usize,
	) -> Result<String, ChainError> {
		// Fails early after close, before any query
		self.conn()?;
		if self.edge_count()? == 0 {
			return Err(ChainError::EmptyChain);
		}

		let mut current = match start {
			Some(gram) => gram.to_owned(),
			None => {
				// Canonical beginning-of-sequence key, falling back to a
				// uniformly random stored gram when it has no edges
				let canonical = vec![START_TOKEN; self.order].join(" ");
				if self.successors(&canonical)?.is_empty() {
					self.sample_random_gram()?.ok_or(ChainError::EmptyChain)?
				} else {
					canonical
				}
			}
		};

		let mut result: Vec<String> = current.split(' ').map(str::to_owned).collect();

		for _ in 0..max_words.saturating_sub(self.order) {
			let successors = self.successors(&current)?;
			if successors.is_empty() {
				// Dead end: normal termination, never corruption
				break;
			}

			// Frequency-weighted pick over the cumulative count distribution
			let total: i64 = successors.iter().map(|(_, count)| *count).sum();
			if total <= 0 {
				break;
			}
			let pick = rng.random_range(0..total);
			let mut acc = 0;
			let mut next = successors[0].0.clone();
			for (word, count) in &successors {
				acc += count;
				if pick < acc {
					next = word.clone();
					break;
				}
			}

			if next == END_TOKEN {
				break;
			}
			result.push(next);
			current = last_gram(&result, self.order);
		}

		// The canonical seed may have put start sentinels in front
		let skip = result.iter().take_while(|token| *token == START_TOKEN).count();
		Ok(result[skip..].join(" "))
	}

	/// Closes the store handle. Any later operation fails with
	/// `ChainError::StoreUnavailable`.
	pub fn close(&mut self) {
		self.conn = None;
	}
}

impl MarkovChain for SqliteChain {
	/// Trains the chain on a single line of text.
	///
	/// The line is sanitized (reserved sentinel literals stripped,
	/// whitespace runs collapsed, trimmed) so a corpus can never inject
	/// control tokens, then tokenized per sentence so n-grams never cross
	/// a sentence boundary. Each sentence with at least `order + 1` tokens
	/// is padded with `order` leading `<START>` and one trailing `<END>`.
	/// All upserts of the call commit as one transaction, or roll back
	/// together.
	fn train(&mut self, text: &str) -> Result<(), ChainError> {
		let sanitized = sanitize(text);
		let order = self.order;
		let sentences: Vec<Vec<String>> =
			sentence_iter(&sanitized, self.config.fold_case).collect();

		let lock = Arc::clone(&self.write_lock);
		let conn = self.conn.as_mut().ok_or(ChainError::StoreUnavailable)?;

		let _guard = lock
			.lock()
			.map_err(|_| ChainError::Contention("write lock poisoned".to_owned()))?;
		let tx = conn.transaction()?;
		{
			let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
			for sentence in sentences {
				if sentence.len() < order + 1 {
					// Too short for a single n-gram, commits zero edges
					continue;
				}

				let mut words: Vec<String> = Vec::with_capacity(sentence.len() + order + 1);
				words.resize(order, START_TOKEN.to_owned());
				words.extend(sentence);
				words.push(END_TOKEN.to_owned());

				for i in 0..words.len() - order {
					let gram = gram_key(&words, i, order);
					let next = &words[i + order];
					stmt.execute(params![gram, next])?;
				}
			}
		}
		tx.commit()?;
		Ok(())
	}

	/// Trains the chain on many lines of text.
	///
	/// Below the configured threshold, lines are trained one at a time on
	/// this handle's own connection. At or above it, the lines fan out
	/// across one worker per CPU, each with an independently-opened
	/// connection; tokenization and n-gram extraction run concurrently
	/// while the shared lock serializes the actual upsert transactions.
	fn train_lines(&mut self, lines: &[String]) -> Result<(), ChainError> {
		if lines.len() < self.config.parallel_threshold {
			for line in lines {
				self.train(line)?;
			}
			return Ok(());
		}

		let cpus = num_cpus::get().max(1);
		let chunk_size = lines.len().div_ceil(cpus);

		let (tx, rx) = mpsc::channel();
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			let path = self.path.clone();
			let order = self.order;
			let config = self.config.clone();
			let lock = self.shared_lock();

			thread::spawn(move || {
				let outcome = (|| -> Result<(), ChainError> {
					let mut worker = SqliteChain::open_with_lock(&path, order, config, lock)?;
					for line in &chunk {
						worker.train(line)?;
					}
					Ok(())
				})();
				tx.send(outcome).expect("Failed to send from thread");
			});
		}
		drop(tx);

		// Drain every worker before reporting, so no sender ever finds a
		// closed channel
		let mut first_error = None;
		for outcome in rx.iter() {
			if let Err(error) = outcome {
				first_error.get_or_insert(error);
			}
		}
		match first_error {
			Some(error) => Err(error),
			None => Ok(()),
		}
	}

	fn generate(&self, start: Option<&str>, max_words: usize) -> Result<String, ChainError> {
		self.generate_with_rng(&mut rand::rng(), start, max_words)
	}

	fn is_empty(&self) -> Result<bool, ChainError> {
		Ok(self.edge_count()? == 0)
	}
}

/// Strips reserved sentinel literals from raw corpus text, collapses
/// whitespace runs to a single space and trims the ends.
fn sanitize(text: &str) -> String {
	let cleaned = text.replace(START_TOKEN, " ").replace(END_TOKEN, " ");
	cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
	use super::sanitize;

	#[test]
	fn sanitize_strips_sentinels_and_collapses_whitespace() {
		assert_eq!(sanitize("a  <START>  b\t<END> c"), "a b c");
		assert_eq!(sanitize("<START><END>"), "");
		assert_eq!(sanitize("  plain   text  "), "plain text");
	}
}
