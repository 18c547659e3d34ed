use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::{env, fs};

use super::sqlite::{SqliteChain, SqliteConfig};
use super::MarkovChain;
use crate::error::ChainError;
use crate::io::{list_files, read_lines};

/// Default checkpoint file name, resolved against the process working
/// directory.
const STATUS_FILE_NAME: &str = "training_status";

/// Terminal checkpoint content written once a whole run has committed.
const COMPLETE_MARKER: &str = "training complete";

/// Orchestrates training a durable chain from a directory of input files.
///
/// # Responsibilities
/// - List input files by wildcard pattern, in stable (sorted) order
/// - Sequential mode: train file by file, persisting a resumability
///   checkpoint after each file's edges commit
/// - Parallel mode: fan the file list across one worker per CPU, each
///   with its own store handle, upserts serialized by the shared lock
///
/// # Notes
/// - The checkpoint always names the last file whose edges are fully
///   committed, or the completion marker.
/// - Resume is exclusive: a file named by the checkpoint is treated as
///   committed and is never reprocessed.
/// - Parallel mode bypasses the checkpoint entirely (completion order is
///   not deterministic); it only writes the completion marker at the end.
pub struct MultiFileTrainer {
	chain: SqliteChain,
	db_path: PathBuf,
	order: usize,
	config: SqliteConfig,
	checkpoint_path: PathBuf,
}

impl MultiFileTrainer {
	/// Creates a trainer over the store at `db_path`, with the checkpoint
	/// in its default process-relative location.
	///
	/// # Errors
	/// `ChainError::Config` if `order < 1`; store-open failures are fatal.
	pub fn new<P: AsRef<Path>>(
		db_path: P,
		order: usize,
		config: SqliteConfig,
	) -> Result<Self, ChainError> {
		let checkpoint_path = env::current_dir()
			.unwrap_or_else(|_| PathBuf::from("."))
			.join(STATUS_FILE_NAME);
		Self::with_checkpoint(db_path, order, config, checkpoint_path)
	}

	/// Creates a trainer with an explicit checkpoint location.
	pub fn with_checkpoint<P: AsRef<Path>, C: AsRef<Path>>(
		db_path: P,
		order: usize,
		config: SqliteConfig,
		checkpoint_path: C,
	) -> Result<Self, ChainError> {
		let db_path = db_path.as_ref().to_path_buf();
		let chain = SqliteChain::open(&db_path, order, config.clone())?;
		Ok(Self {
			chain,
			db_path,
			order,
			config,
			checkpoint_path: checkpoint_path.as_ref().to_path_buf(),
		})
	}

	/// The underlying durable chain.
	pub fn chain(&self) -> &SqliteChain {
		&self.chain
	}

	/// The underlying durable chain, mutable.
	pub fn chain_mut(&mut self) -> &mut SqliteChain {
		&mut self.chain
	}

	/// Trains sequentially on every file of `dir` matching `pattern`.
	///
	/// # Parameters
	/// - `dir`: Input directory.
	/// - `pattern`: `*`-wildcard file name pattern, e.g. `"*.txt"`.
	/// - `resumable`: When true and a checkpoint names one of the listed
	///   files, all files up to and including that file are skipped and
	///   processing resumes with the next one.
	///
	/// # Behavior
	/// For each processed file: read all lines, train, then overwrite the
	/// checkpoint with the file's path, so the checkpoint always reflects
	/// the last fully committed file. On completion of the whole
	/// directory the checkpoint becomes the terminal completion marker.
	pub fn train_from_dir<P: AsRef<Path>>(
		&mut self,
		dir: P,
		pattern: &str,
		resumable: bool,
	) -> Result<(), ChainError> {
		let dir = dir.as_ref();
		if !dir.is_dir() {
			return Err(ChainError::Config(format!(
				"expected a directory, got: {}",
				dir.display()
			)));
		}

		let files = list_files(dir, pattern)?;

		let mut resume_after: Option<PathBuf> = None;
		if resumable {
			if let Some(status) = self.load_checkpoint()? {
				if status != COMPLETE_MARKER {
					let last = PathBuf::from(&status);
					// A checkpoint naming a file no longer listed carries
					// no position to resume from; start over
					if files.contains(&last) {
						resume_after = Some(last);
					}
				}
			}
		}

		for file in files {
			if let Some(last) = &resume_after {
				let reached = file == *last;
				tracing::debug!(file = %file.display(), "skipping already committed file");
				if reached {
					resume_after = None;
				}
				continue;
			}

			tracing::info!(file = %file.display(), "processing file");
			let lines = read_lines(&file)?;
			self.chain.train_lines(&lines)?;
			self.save_checkpoint(&file.display().to_string())?;
		}

		self.save_checkpoint(COMPLETE_MARKER)
	}

	/// Trains on every matching file of `dir` using one worker per CPU.
	///
	/// Each worker opens an independent handle to the same store and
	/// trains its share of the files sequentially; the shared lock
	/// serializes the upsert transactions while tokenization and n-gram
	/// extraction proceed concurrently. Final edge counts match a
	/// sequential run regardless of interleaving.
	///
	/// Writes the completion marker at the end but does not support
	/// resumption.
	pub fn train_from_dir_parallel<P: AsRef<Path>>(
		&mut self,
		dir: P,
		pattern: &str,
	) -> Result<(), ChainError> {
		let dir = dir.as_ref();
		if !dir.is_dir() {
			return Err(ChainError::Config(format!(
				"expected a directory, got: {}",
				dir.display()
			)));
		}

		let files = list_files(dir, pattern)?;
		if files.is_empty() {
			return self.save_checkpoint(COMPLETE_MARKER);
		}

		let cpus = num_cpus::get().max(1);
		let chunk_size = files.len().div_ceil(cpus);

		let (tx, rx) = mpsc::channel();
		for chunk in files.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<PathBuf> = chunk.to_vec();
			let db_path = self.db_path.clone();
			let order = self.order;
			let config = self.config.clone();
			let lock = self.chain.shared_lock();

			thread::spawn(move || {
				let outcome = (|| -> Result<(), ChainError> {
					let mut worker = SqliteChain::open_with_lock(&db_path, order, config, lock)?;
					for file in &chunk {
						tracing::info!(file = %file.display(), "processing file");
						let lines = read_lines(file)?;
						for line in &lines {
							worker.train(line)?;
						}
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
		if let Some(error) = first_error {
			return Err(error);
		}

		self.save_checkpoint(COMPLETE_MARKER)
	}

	/// Overwrites the checkpoint file with the given status text.
	fn save_checkpoint(&self, status: &str) -> Result<(), ChainError> {
		fs::write(&self.checkpoint_path, status)?;
		Ok(())
	}

	/// Reads the checkpoint file, `None` if it does not exist.
	fn load_checkpoint(&self) -> Result<Option<String>, ChainError> {
		if !self.checkpoint_path.exists() {
			return Ok(None);
		}
		Ok(Some(fs::read_to_string(&self.checkpoint_path)?.trim().to_owned()))
	}
}
