//! Text format for automata.
//!
//! ```text
//! # comment
//! states: q0 q1 q2 q3
//! alphabet: a b
//! initial: q0
//! accepting: q3
//! q0: a q0, a q1
//! q1: b q1, a q2
//! q2: b q3, a q0
//! ```
//!
//! The `states`, `alphabet` and `initial` declarations are required,
//! `accepting` is optional. Every other line lists the transitions of a
//! state as comma separated `<symbol> <target>` pairs. The `ε` (or `eps`)
//! symbol denotes an epsilon transition. Symbols and state names use the
//! escapes of [`DisplayChar`](crate::alphabet::DisplayChar) (`\s` for a
//! space, `\,` for a comma, `\e` for the `ε` symbol, etc.).
//!
//! States referenced by transitions or by the `accepting` declaration that
//! are not listed in `states` are loaded as is: it is up to
//! [`Automaton::validate`] to report them.
use std::{fmt, io, path::Path, str::FromStr};

use crate::{
	alphabet::{parse_char, unescape, DisplayChar},
	Alphabet, Automaton,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
	#[error("line {line}: expected `<name>: <values>`")]
	MissingColon { line: usize },

	#[error("line {line}: duplicate `{key}` declaration")]
	Duplicate { line: usize, key: &'static str },

	#[error("missing `{0}` declaration")]
	Missing(&'static str),

	#[error("line {line}: invalid symbol `{symbol}`")]
	InvalidSymbol { line: usize, symbol: String },

	#[error("line {line}: invalid state name `{name}`")]
	InvalidName { line: usize, name: String },

	#[error("line {line}: expected exactly one initial state")]
	InvalidInitialState { line: usize },

	#[error("line {line}: initial state `{name}` is not declared")]
	UndeclaredInitialState { line: usize, name: String },

	#[error("line {line}: invalid transition `{entry}`")]
	InvalidTransition { line: usize, entry: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
	#[error(transparent)]
	IO(#[from] io::Error),

	#[error(transparent)]
	Load(#[from] LoadError),
}

const STATES: &str = "states";
const ALPHABET: &str = "alphabet";
const INITIAL: &str = "initial";
const ACCEPTING: &str = "accepting";

const KEYS: [&str; 4] = [STATES, ALPHABET, INITIAL, ACCEPTING];

/// Printable form of a state name.
///
/// Every character is escaped like a symbol. The first character of a name
/// equal to a declaration key is escaped too, so that its transition line is
/// not read as a declaration.
pub struct DisplayName<'a>(pub &'a str);

impl<'a> fmt::Display for DisplayName<'a> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let mut chars = self.0.chars();

		if KEYS.contains(&self.0) {
			if let Some(c) = chars.next() {
				write!(f, "\\x{:02x}", c as u32)?;
			}
		}

		for c in chars {
			DisplayChar(c).fmt(f)?;
		}

		Ok(())
	}
}

/// Parses a state name printed with [`DisplayName`].
pub fn parse_name(s: &str) -> Option<String> {
	let mut chars = s.chars();
	let mut name = String::with_capacity(s.len());

	while let Some(c) = chars.next() {
		match c {
			'\\' => name.push(unescape(&mut chars)?),
			c => name.push(c),
		}
	}

	Some(name)
}

struct Line<'a> {
	number: usize,
	key: &'a str,
	value: &'a str,
}

#[derive(Default)]
struct Headers<'a> {
	states: Option<Line<'a>>,
	alphabet: Option<Line<'a>>,
	initial: Option<Line<'a>>,
	accepting: Option<Line<'a>>,
}

impl<'a> Headers<'a> {
	fn slot(&mut self, key: &str) -> Option<(&'static str, &mut Option<Line<'a>>)> {
		match key {
			STATES => Some((STATES, &mut self.states)),
			ALPHABET => Some((ALPHABET, &mut self.alphabet)),
			INITIAL => Some((INITIAL, &mut self.initial)),
			ACCEPTING => Some((ACCEPTING, &mut self.accepting)),
			_ => None,
		}
	}
}

/// Loads an automaton from its text representation.
pub fn load(input: &str) -> Result<Automaton, LoadError> {
	let mut headers = Headers::default();
	let mut transition_lines = Vec::new();

	for (i, raw) in input.lines().enumerate() {
		let number = i + 1;
		let content = strip_comment(raw).trim();
		if content.is_empty() {
			continue;
		}

		let colon = find_unescaped(content, ':').ok_or(LoadError::MissingColon { line: number })?;
		let line = Line {
			number,
			key: content[..colon].trim(),
			value: content[colon + 1..].trim(),
		};

		match headers.slot(line.key) {
			Some((key, slot)) => {
				if slot.is_some() {
					return Err(LoadError::Duplicate { line: number, key });
				}

				*slot = Some(line)
			}
			None => transition_lines.push(line),
		}
	}

	let states = headers.states.ok_or(LoadError::Missing(STATES))?;
	let alphabet = headers.alphabet.ok_or(LoadError::Missing(ALPHABET))?;
	let initial = headers.initial.ok_or(LoadError::Missing(INITIAL))?;

	let alphabet = alphabet
		.value
		.split_whitespace()
		.map(|s| {
			parse_char(s).ok_or_else(|| LoadError::InvalidSymbol {
				line: alphabet.number,
				symbol: s.to_owned(),
			})
		})
		.collect::<Result<Alphabet, _>>()?;

	let state_names = names(&states)?;

	let initial_name = match names(&initial)?.as_slice() {
		[name] => name.clone(),
		_ => return Err(LoadError::InvalidInitialState { line: initial.number }),
	};

	if !state_names.contains(&initial_name) {
		return Err(LoadError::UndeclaredInitialState {
			line: initial.number,
			name: initial_name,
		});
	}

	let mut automaton = Automaton::new(alphabet, initial_name);
	for name in state_names {
		automaton.add_state(name);
	}

	if let Some(accepting) = headers.accepting {
		for name in names(&accepting)? {
			let q = automaton.intern(name);
			automaton.add_final_state(q);
		}
	}

	for line in transition_lines {
		let source = automaton.intern(name(line.number, line.key)?);

		for entry in split_entries(line.value) {
			let entry = entry.trim();
			if entry.is_empty() && line.value.is_empty() {
				continue;
			}

			let invalid = || LoadError::InvalidTransition {
				line: line.number,
				entry: entry.to_owned(),
			};

			let mut tokens = entry.split_whitespace();
			let (symbol, target) = match (tokens.next(), tokens.next(), tokens.next()) {
				(Some(symbol), Some(target), None) => (symbol, target),
				_ => return Err(invalid()),
			};

			let label = match symbol {
				"ε" | "eps" => None,
				_ => Some(parse_char(symbol).ok_or_else(|| LoadError::InvalidSymbol {
					line: line.number,
					symbol: symbol.to_owned(),
				})?),
			};

			let target = automaton.intern(name(line.number, target)?);
			automaton.add(source, label, target);
		}
	}

	Ok(automaton)
}

/// Loads an automaton from a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Automaton, FileError> {
	let input = std::fs::read_to_string(path)?;
	Ok(load(&input)?)
}

impl FromStr for Automaton {
	type Err = LoadError;

	fn from_str(s: &str) -> Result<Self, LoadError> {
		load(s)
	}
}

fn name(line: usize, s: &str) -> Result<String, LoadError> {
	parse_name(s).ok_or_else(|| LoadError::InvalidName {
		line,
		name: s.to_owned(),
	})
}

/// State names listed by a declaration.
fn names(line: &Line) -> Result<Vec<String>, LoadError> {
	line.value
		.split_whitespace()
		.map(|s| name(line.number, s))
		.collect()
}

/// Removes the comment starting at the first `#` beginning a word.
fn strip_comment(line: &str) -> &str {
	let mut previous = None;
	for (i, c) in line.char_indices() {
		if c == '#' && previous.map_or(true, char::is_whitespace) {
			return &line[..i];
		}

		previous = Some(c)
	}

	line
}

/// Byte index of the first occurrence of `separator` that is not escaped.
fn find_unescaped(value: &str, separator: char) -> Option<usize> {
	let mut escaped = false;

	for (i, c) in value.char_indices() {
		match c {
			_ if escaped => escaped = false,
			'\\' => escaped = true,
			_ if c == separator => return Some(i),
			_ => (),
		}
	}

	None
}

/// Splits on commas that are not escaped.
fn split_entries(mut value: &str) -> Vec<&str> {
	let mut entries = Vec::new();

	while let Some(i) = find_unescaped(value, ',') {
		entries.push(&value[..i]);
		value = &value[i + 1..]
	}

	entries.push(value);
	entries
}
