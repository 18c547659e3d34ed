use rs_markov_core::{MarkovChain, MemoryChain, MultiFileTrainer, SqliteChain, SqliteConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
	// --- In-memory variant -------------------------------------------------
	// Order 2: every key is a pair of consecutive words
	let mut memory = MemoryChain::new(2, 1024)?;

	memory.train("the quick brown fox jumps over the lazy dog")?;
	memory.train("the quick grey wolf runs through the dark wood")?;

	// Random seed gram, at most 12 words out
	println!("memory: {}", memory.generate(None, 12)?);

	// Custom seed gram, output starts with it
	println!("memory (seeded): {}", memory.generate(Some("the quick"), 8)?);

	// Round-trip the whole chain through a flat JSON document
	memory.save("memory_chain.json")?;
	let mut reloaded = MemoryChain::new(2, 1024)?;
	reloaded.load("memory_chain.json")?;
	println!("memory (reloaded): {}", reloaded.generate(None, 12)?);

	// --- Durable variant ---------------------------------------------------
	// The store file outlives the process; reopening it reuses the table
	let mut durable = SqliteChain::open("chain.sqlite", 2, SqliteConfig::default())?;

	durable.train("Markov chains hop from one state to another. They are popular in text generation.")?;

	// No explicit seed: the canonical start gram is tried first, then a
	// random stored gram
	println!("durable: {}", durable.generate(None, 20)?);

	// Drop edges seen only once
	let removed = durable.prune(2)?;
	println!("pruned {} rare edges, {} remain", removed, durable.edge_count()?);

	durable.close();

	// --- Multi-file training -----------------------------------------------
	// Sequential mode checkpoints after each file and resumes after an
	// interruption without reprocessing committed files
	let mut trainer = MultiFileTrainer::new("corpus.sqlite", 2, SqliteConfig::default())?;
	if let Err(error) = trainer.train_from_dir("./corpus", "*.txt", true) {
		println!("no corpus directory, skipping multi-file demo ({})", error);
		return Ok(());
	}
	println!("corpus: {}", trainer.chain().generate(None, 20)?);

	Ok(())
}
