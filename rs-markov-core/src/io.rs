use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Reads a whole text file into memory and returns its lines.
///
/// Both `\n` and `\r\n` line endings are accepted. Training consumes a
/// file line by line, so the split is done here once.
pub fn read_lines<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Lists all files in a directory whose name matches a `*`-wildcard pattern.
///
/// Returns full paths, sorted by path for a stable processing order.
/// Subdirectories are ignored.
///
/// Example patterns: `"*.txt"`, `"corpus_*"`, `"*"`.
pub fn list_files<P: AsRef<Path>>(dir: P, pattern: &str) -> io::Result<Vec<PathBuf>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();

		if path.is_file() {
			let name = entry.file_name().to_string_lossy().to_string();
			if matches_pattern(&name, pattern) {
				files.push(path);
			}
		}
	}

	files.sort();
	Ok(files)
}

/// Matches a file name against a glob-like pattern where `*` stands for
/// any (possibly empty) run of characters. All other characters match
/// literally.
fn matches_pattern(name: &str, pattern: &str) -> bool {
	let mut parts = pattern.split('*');

	// No wildcard at all: exact comparison
	if !pattern.contains('*') {
		return name == pattern;
	}

	let mut rest = name;

	// First fragment is anchored at the start
	if let Some(first) = parts.next() {
		match rest.strip_prefix(first) {
			Some(stripped) => rest = stripped,
			None => return false,
		}
	}

	let fragments: Vec<&str> = parts.collect();
	for (index, fragment) in fragments.iter().enumerate() {
		if fragment.is_empty() {
			continue;
		}
		let last = index == fragments.len() - 1;
		if last && !pattern.ends_with('*') {
			// Last fragment is anchored at the end
			match rest.strip_suffix(fragment) {
				Some(stripped) => rest = stripped,
				None => return false,
			}
		} else {
			match rest.find(fragment) {
				Some(at) => rest = &rest[at + fragment.len()..],
				None => return false,
			}
		}
	}

	true
}

/// Returns the size of a file in bytes.
///
/// Used by callers for progress reporting; not required by the engine.
pub fn file_size<P: AsRef<Path>>(filename: P) -> io::Result<u64> {
	Ok(fs::metadata(filename)?.len())
}

/// Counts the number of lines in a file without loading it whole.
pub fn count_lines<P: AsRef<Path>>(filename: P) -> io::Result<u64> {
	let reader = BufReader::new(File::open(filename)?);
	let mut count = 0;
	for line in reader.lines() {
		line?;
		count += 1;
	}
	Ok(count)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pattern_matching() {
		assert!(matches_pattern("corpus.txt", "*.txt"));
		assert!(matches_pattern("corpus.txt", "corpus.*"));
		assert!(matches_pattern("corpus.txt", "*"));
		assert!(matches_pattern("corpus.txt", "corpus.txt"));
		assert!(matches_pattern("corpus_01.txt", "corpus_*.txt"));
		assert!(!matches_pattern("corpus.dat", "*.txt"));
		assert!(!matches_pattern("corpus.txt", "other.txt"));
		assert!(!matches_pattern("corpus.txt.bak", "*.txt"));
	}
}
