use std::sync::OnceLock;

use regex::Regex;

/// Extended token pattern, first matching alternative wins at each position:
/// email, URL, ISO date, time, decimal number, whole number, contraction,
/// hyphenated compound, then generic Unicode word run.
const TOKEN_PATTERN: &str = concat!(
	r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+",                // email address
	r"|https?://[^\s]+",                            // URL
	r"|\d{4}-\d{2}-\d{2}",                          // ISO date (YYYY-MM-DD)
	r"|\d{1,2}:\d{2}(?::\d{2})?",                   // time (HH:MM[:SS])
	r"|\d+\.\d+",                                   // decimal number
	r"|\d+",                                        // whole number
	r"|[\p{L}\p{M}_]+'[\p{L}\p{M}]+",               // contraction (word'word)
	r"|[\p{L}\p{M}_]+(?:-[\p{L}\p{M}_]+)+",         // hyphenated compound
	r"|[\p{L}\p{M}\p{N}_']+",                       // generic word run
);

/// A sentence ends on terminal punctuation only when it closes a token:
/// the run of `.`, `!`, `?` must be followed by whitespace or end of
/// input. Interior dots and question marks (decimals, URLs, emails)
/// are left for the token pattern to consume.
const SENTENCE_BOUNDARY_PATTERN: &str = r"[.!?]+(?:\s+|$)";

/// Compiled extended pattern, built once per process.
fn token_regex() -> &'static Regex {
	static REGEX: OnceLock<Regex> = OnceLock::new();
	// The pattern is a compile-time constant, so unwrap cannot fire at runtime
	REGEX.get_or_init(|| Regex::new(TOKEN_PATTERN).unwrap())
}

/// Compiled sentence boundary pattern, built once per process.
fn boundary_regex() -> &'static Regex {
	static REGEX: OnceLock<Regex> = OnceLock::new();
	REGEX.get_or_init(|| Regex::new(SENTENCE_BOUNDARY_PATTERN).unwrap())
}

/// Splits text into words using the basic policy.
///
/// A word is a maximal run of letters, digits or underscores; every other
/// character is a delimiter and is discarded. Case is preserved.
///
/// # Notes
/// - Empty or all-delimiter input yields an empty vector.
/// - Never fails: malformed input degrades to fewer (or no) tokens.
pub fn tokenize(text: &str) -> Vec<String> {
	let mut words = Vec::new();
	let mut current = String::new();

	for c in text.chars() {
		if c.is_alphanumeric() || c == '_' {
			current.push(c);
		} else if !current.is_empty() {
			words.push(std::mem::take(&mut current));
		}
	}
	if !current.is_empty() {
		words.push(current);
	}

	words
}

/// Splits text into words using the extended, pattern-based policy.
///
/// Matches (in priority order) email addresses, URLs, ISO dates, times,
/// decimal numbers, whole numbers, contractions, hyphenated compounds and
/// generic Unicode word runs. Characters matched by no alternative are
/// skipped.
///
/// # Parameters
/// - `text`: Raw input text.
/// - `fold_case`: If true, the whole input is lower-cased *before* pattern
///   matching (so email/URL tokens come out lower-cased too). Folding
///   before rather than after matching is an explicit configuration
///   choice, not an accident.
pub fn tokenize_extended(text: &str, fold_case: bool) -> Vec<String> {
	if fold_case {
		let lowered = text.to_lowercase();
		token_regex().find_iter(&lowered).map(|m| m.as_str().to_owned()).collect()
	} else {
		token_regex().find_iter(text).map(|m| m.as_str().to_owned()).collect()
	}
}

/// Returns a lazy, finite, restartable iterator of per-sentence token groups.
///
/// Sentences are delimited by terminal punctuation (`.`, `!`, `?`) that
/// closes a token; punctuation inside a token (`3.14`, a URL, an email
/// address) does not end a sentence. Each group is tokenized with the
/// extended policy. Groups with no tokens are dropped. Calling this
/// function again restarts the traversal from the beginning of `text`.
pub fn sentence_iter(text: &str, fold_case: bool) -> impl Iterator<Item = Vec<String>> + '_ {
	boundary_regex()
		.split(text)
		.map(move |sentence| tokenize_extended(sentence, fold_case))
		.filter(|tokens| !tokens.is_empty())
}

/// Collects `sentence_iter` into a vector of sentence token groups.
pub fn sentences(text: &str, fold_case: bool) -> Vec<Vec<String>> {
	sentence_iter(text, fold_case).collect()
}
