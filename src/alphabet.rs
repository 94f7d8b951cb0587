use btree_range_map::{AnyRange, RangeSet};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive, str::Chars};

/// Printable form of a symbol.
///
/// Whitespace, control characters and the characters reserved by the text
/// format are escaped so that symbols survive a round trip through it. `ε` is
/// printed `\e` since a bare `ε` denotes an epsilon transition.
pub struct DisplayChar(pub char);

impl fmt::Display for DisplayChar {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let c = self.0;
		match c {
			'\\' => write!(f, "\\\\"),
			'\r' => write!(f, "\\r"),
			'\n' => write!(f, "\\n"),
			' ' => write!(f, "\\s"),
			'\t' => write!(f, "\\t"),
			',' => write!(f, "\\,"),
			'#' => write!(f, "\\#"),
			':' => write!(f, "\\:"),
			'ε' => write!(f, "\\e"),
			_ if c.is_control() || c.is_whitespace() => {
				let d = c as u32;
				if d <= 0xff {
					write!(f, "\\x{:02x}", d)
				} else if d <= 0xffff {
					write!(f, "\\u{:04x}", d)
				} else {
					write!(f, "\\U{:08x}", d)
				}
			}
			_ => c.fmt(f),
		}
	}
}

/// Parses a symbol printed with [`DisplayChar`].
pub fn parse_char(s: &str) -> Option<char> {
	let mut chars = s.chars();
	let c = match chars.next()? {
		'\\' => unescape(&mut chars)?,
		c => c,
	};

	match chars.next() {
		Some(_) => None,
		None => Some(c),
	}
}

/// Decodes the escape sequence following a `\`.
pub(crate) fn unescape(chars: &mut Chars) -> Option<char> {
	let len = match chars.next()? {
		'\\' => return Some('\\'),
		'r' => return Some('\r'),
		'n' => return Some('\n'),
		's' => return Some(' '),
		't' => return Some('\t'),
		',' => return Some(','),
		'#' => return Some('#'),
		':' => return Some(':'),
		'e' => return Some('ε'),
		'x' => 2,
		'u' => 4,
		'U' => 8,
		_ => return None,
	};

	let rest = chars.as_str();
	let digits = rest.get(..len)?;
	if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
		return None;
	}

	*chars = rest[len..].chars();
	u32::from_str_radix(digits, 16)
		.ok()
		.and_then(char::from_u32)
}

/// Input alphabet of an automaton.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Alphabet(RangeSet<char>);

impl Alphabet {
	pub fn new() -> Self {
		Self(RangeSet::new())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Number of symbols.
	pub fn len(&self) -> u64 {
		self.0.len()
	}

	pub fn insert(&mut self, c: char) {
		self.0.insert(c)
	}

	pub fn from_ranges(ranges: impl IntoIterator<Item = RangeInclusive<char>>) -> Self {
		let mut set = RangeSet::new();

		for range in ranges {
			set.insert(range)
		}

		Self(set)
	}

	pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
		let mut set = RangeSet::new();

		for c in chars {
			set.insert(c)
		}

		Self(set)
	}

	pub fn contains(&self, c: char) -> bool {
		self.0.contains(c)
	}

	/// Iterates over the symbols in ascending order.
	pub fn symbols(&self) -> Symbols {
		Symbols {
			ranges: self.0.iter(),
			current: None,
		}
	}
}

fn range_bounds(range: &AnyRange<char>) -> Option<(char, char)> {
	Some((range.first()?, range.last()?))
}

pub struct Symbols<'a> {
	ranges: btree_range_map::generic::set::Iter<'a, char, btree_range_map::DefaultSetContainer<char>>,
	current: Option<RangeInclusive<char>>,
}

impl<'a> Iterator for Symbols<'a> {
	type Item = char;

	fn next(&mut self) -> Option<char> {
		loop {
			if let Some(c) = self.current.as_mut().and_then(Iterator::next) {
				break Some(c);
			}

			let range = self.ranges.next()?;
			self.current = range_bounds(range).map(|(first, last)| first..=last)
		}
	}
}

impl From<char> for Alphabet {
	fn from(value: char) -> Self {
		Self::from_chars([value])
	}
}

impl<const N: usize> From<[char; N]> for Alphabet {
	fn from(value: [char; N]) -> Self {
		Self::from_chars(value)
	}
}

impl<const N: usize> From<[RangeInclusive<char>; N]> for Alphabet {
	fn from(value: [RangeInclusive<char>; N]) -> Self {
		Self::from_ranges(value)
	}
}

impl FromIterator<char> for Alphabet {
	fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
		Self::from_chars(iter)
	}
}

impl fmt::Display for Alphabet {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (i, c) in self.symbols().enumerate() {
			if i > 0 {
				write!(f, " ")?;
			}

			DisplayChar(c).fmt(f)?;
		}

		Ok(())
	}
}

impl fmt::Debug for Alphabet {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Alphabet({})", self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn symbols_are_sorted_and_deduplicated() {
		let alphabet = Alphabet::from(['b', 'a', 'c', 'a']);
		assert_eq!(alphabet.symbols().collect::<Vec<_>>(), vec!['a', 'b', 'c']);
		assert_eq!(alphabet.len(), 3);
	}

	#[test]
	fn ranges_expand_to_symbols() {
		let alphabet = Alphabet::from(['0'..='2', 'x'..='y']);
		assert_eq!(
			alphabet.symbols().collect::<String>(),
			"012xy".to_string()
		);
		assert!(alphabet.contains('1'));
		assert!(!alphabet.contains('3'));
	}

	#[test]
	fn escaped_symbols_parse_back() {
		for c in ['a', ' ', ',', '#', ':', 'ε', '\\', '\n', '\u{1}', '\u{a0}', 'é'] {
			let printed = DisplayChar(c).to_string();
			assert_eq!(parse_char(&printed), Some(c), "{printed}");
		}

		assert_eq!(parse_char("ab"), None);
		assert_eq!(parse_char("\\q"), None);
		assert_eq!(parse_char("\\x4"), None);
		assert_eq!(parse_char("\\x+1"), None);
		assert_eq!(DisplayChar('ε').to_string(), "\\e");
	}
}
