use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::{Alphabet, Automaton};

/// Name of the final state introduced for terminal-only productions.
const FINAL_NON_TERMINAL: &str = "F";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
	#[error("undefined non-terminal `{0}`")]
	UndefinedNonTerminal(String),

	#[error("redefined non-terminal `{0}`")]
	RedefinedNonTerminal(String),

	#[error("production `{production}` of `{non_terminal}` is not right-linear")]
	NonRegular {
		non_terminal: String,
		production: String,
	},
}

/// Right-linear grammar.
///
/// Each production of a non-terminal is a string made of a terminal followed
/// by a non-terminal (`"aB"`), a single terminal (`"a"`), a single
/// non-terminal (`"B"`), or the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
	non_terminals: Vec<String>,
	terminals: Alphabet,
	productions: BTreeMap<String, Vec<String>>,
	start: String,
}

impl Grammar {
	/// Creates a grammar without productions, whose only non-terminal is
	/// `start`.
	pub fn new(terminals: Alphabet, start: impl Into<String>) -> Self {
		let start = start.into();
		let mut productions = BTreeMap::new();
		productions.insert(start.clone(), Vec::new());

		Self {
			non_terminals: vec![start.clone()],
			terminals,
			productions,
			start,
		}
	}

	/// Builds the grammar mirroring the given automaton.
	///
	/// Every state becomes a non-terminal, every transition `q -s-> r` a
	/// production `q -> sr`, and every final state gets an empty production.
	pub fn from_automaton(automaton: &Automaton) -> Self {
		let start = automaton.display_state(automaton.initial_state());
		let mut result = Self::new(automaton.alphabet().clone(), start);

		for q in automaton.states() {
			let name = automaton.display_state(q);
			if !result.productions.contains_key(&name) {
				result.non_terminals.push(name.clone());
			}

			let productions = result.productions.entry(name).or_default();

			if let Some(transitions) = automaton.transitions().get(&q) {
				for (label, targets) in transitions {
					for target in targets {
						let target = automaton.display_state(target);
						match label {
							Some(c) => productions.push(format!("{c}{target}")),
							None => productions.push(target),
						}
					}
				}
			}

			if automaton.is_final_state(q) {
				productions.push(String::new())
			}
		}

		result
	}

	pub fn non_terminals(&self) -> &[String] {
		&self.non_terminals
	}

	pub fn terminals(&self) -> &Alphabet {
		&self.terminals
	}

	pub fn start(&self) -> &str {
		&self.start
	}

	pub fn productions(&self) -> &BTreeMap<String, Vec<String>> {
		&self.productions
	}

	pub fn productions_of(&self, non_terminal: &str) -> &[String] {
		self.productions
			.get(non_terminal)
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	pub fn production_count(&self) -> usize {
		self.productions.values().map(Vec::len).sum()
	}

	pub fn add_non_terminal(&mut self, name: impl Into<String>) -> Result<(), GrammarError> {
		let name = name.into();
		if self.productions.contains_key(&name) {
			return Err(GrammarError::RedefinedNonTerminal(name));
		}

		self.productions.insert(name.clone(), Vec::new());
		self.non_terminals.push(name);
		Ok(())
	}

	pub fn add_production(
		&mut self,
		non_terminal: &str,
		production: impl Into<String>,
	) -> Result<(), GrammarError> {
		match self.productions.get_mut(non_terminal) {
			Some(productions) => {
				productions.push(production.into());
				Ok(())
			}
			None => Err(GrammarError::UndefinedNonTerminal(non_terminal.to_owned())),
		}
	}

	/// Builds the automaton recognizing the language of this grammar.
	///
	/// Terminal-only productions lead to a single fresh final state.
	/// Unit productions become epsilon transitions.
	pub fn to_automaton(&self) -> Result<Automaton, GrammarError> {
		let mut result = Automaton::new(self.terminals.clone(), self.start.as_str());
		for name in &self.non_terminals {
			result.add_state(name.as_str());
		}

		let mut final_state = None;

		for (name, productions) in &self.productions {
			let source = result
				.state(name)
				.ok_or_else(|| GrammarError::UndefinedNonTerminal(name.clone()))?;

			for production in productions {
				if self.productions.contains_key(production.as_str()) {
					let target = result.add_state(production.as_str());
					result.add(source, None, target);
					continue;
				}

				let mut chars = production.chars();
				match chars.next() {
					None => {
						result.add_final_state(source);
					}
					Some(c) if self.terminals.contains(c) => {
						let rest = chars.as_str();
						let target = if rest.is_empty() {
							*final_state.get_or_insert_with(|| {
								let mut name = FINAL_NON_TERMINAL.to_owned();
								while result.state(&name).is_some() {
									name.push('\'')
								}

								let q = result.add_state(name);
								result.add_final_state(q);
								q
							})
						} else if self.productions.contains_key(rest) {
							result.add_state(rest)
						} else {
							return Err(GrammarError::UndefinedNonTerminal(rest.to_owned()));
						};

						result.add(source, Some(c), target);
					}
					Some(_) => {
						return Err(GrammarError::NonRegular {
							non_terminal: name.clone(),
							production: production.clone(),
						})
					}
				}
			}
		}

		Ok(result)
	}
}

impl Automaton {
	/// See [`Grammar::from_automaton`].
	pub fn to_grammar(&self) -> Grammar {
		Grammar::from_automaton(self)
	}
}

impl fmt::Display for Grammar {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for name in &self.non_terminals {
			let productions = self.productions_of(name);
			if productions.is_empty() {
				continue;
			}

			write!(f, "{name} ->")?;
			for (i, production) in productions.iter().enumerate() {
				if i > 0 {
					write!(f, " |")?;
				}

				if production.is_empty() {
					write!(f, " ε")?;
				} else {
					write!(f, " {production}")?;
				}
			}
			writeln!(f)?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::determinize;

	fn lab_nfa() -> Automaton {
		let mut nfa = Automaton::new(Alphabet::from(['a', 'b']), "q0");
		let q0 = nfa.initial_state();
		let q1 = nfa.add_state("q1");
		let q2 = nfa.add_state("q2");
		let q3 = nfa.add_state("q3");
		nfa.add_final_state(q3);
		nfa.add(q0, Some('a'), q0);
		nfa.add(q0, Some('a'), q1);
		nfa.add(q1, Some('b'), q1);
		nfa.add(q1, Some('a'), q2);
		nfa.add(q2, Some('b'), q3);
		nfa.add(q2, Some('a'), q0);
		nfa
	}

	#[test]
	fn productions_mirror_transitions() {
		let nfa = lab_nfa();
		let grammar = nfa.to_grammar();

		assert_eq!(grammar.start(), "q0");
		assert_eq!(grammar.non_terminals(), ["q0", "q1", "q2", "q3"]);
		assert_eq!(grammar.productions_of("q0"), ["aq0", "aq1"]);
		assert_eq!(grammar.productions_of("q2"), ["aq0", "bq3"]);
		assert_eq!(grammar.productions_of("q3"), [""]);
		assert_eq!(grammar.production_count(), 7);
	}

	#[test]
	fn production_count_of_determinized() {
		let dfa = determinize(&lab_nfa()).unwrap();
		let grammar = dfa.to_grammar();
		assert_eq!(
			grammar.production_count(),
			dfa.transition_count() + dfa.final_states().len()
		);
		assert_eq!(grammar.production_count(), 13);
		assert_eq!(grammar.productions_of("q1q3"), ["aq2", "bq1", ""]);
	}

	#[test]
	fn round_trip() {
		let dfa = determinize(&lab_nfa()).unwrap();
		assert_eq!(dfa.to_grammar().to_automaton().unwrap(), dfa);
	}

	#[test]
	fn terminal_productions() {
		// S -> dA, A -> aB | bA, B -> bC | aB | d, C -> cB
		let mut grammar = Grammar::new(Alphabet::from(['a', 'b', 'c', 'd']), "S");
		for name in ["A", "B", "C"] {
			grammar.add_non_terminal(name).unwrap();
		}
		grammar.add_production("S", "dA").unwrap();
		grammar.add_production("A", "aB").unwrap();
		grammar.add_production("A", "bA").unwrap();
		grammar.add_production("B", "bC").unwrap();
		grammar.add_production("B", "aB").unwrap();
		grammar.add_production("B", "d").unwrap();
		grammar.add_production("C", "cB").unwrap();

		let automaton = grammar.to_automaton().unwrap();
		let f = automaton.state("F").unwrap();
		assert!(automaton.is_final_state(f));
		assert_eq!(automaton.len(), 5);

		for word in ["dad", "dbad", "dabcd", "daabcd"] {
			assert!(automaton.accepts(word.chars()), "{word}");
		}

		for word in ["dd", "dab", "dbc", "aaa", "dacd"] {
			assert!(!automaton.accepts(word.chars()), "{word}");
		}
	}

	#[test]
	fn invalid_productions() {
		let mut grammar = Grammar::new(Alphabet::from('a'), "S");
		assert_eq!(
			grammar.add_production("T", "a"),
			Err(GrammarError::UndefinedNonTerminal("T".to_owned()))
		);
		assert_eq!(
			grammar.add_non_terminal("S"),
			Err(GrammarError::RedefinedNonTerminal("S".to_owned()))
		);

		grammar.add_production("S", "aT").unwrap();
		assert_eq!(
			grammar.to_automaton(),
			Err(GrammarError::UndefinedNonTerminal("T".to_owned()))
		);

		let mut grammar = Grammar::new(Alphabet::from('a'), "S");
		grammar.add_production("S", "bS").unwrap();
		assert!(matches!(
			grammar.to_automaton(),
			Err(GrammarError::NonRegular { .. })
		));
	}

	#[test]
	fn unit_production_starting_with_a_terminal() {
		let mut nfa = Automaton::new(Alphabet::from(['a', 'q']), "p");
		let p = nfa.initial_state();
		let q0 = nfa.add_state("q0");
		nfa.add_final_state(q0);
		nfa.add(p, None, q0);
		nfa.add(q0, Some('q'), q0);

		let grammar = nfa.to_grammar();
		assert_eq!(grammar.productions_of("p"), ["q0"]);
		assert_eq!(grammar.productions_of("q0"), ["qq0", ""]);
		assert_eq!(grammar.to_automaton().unwrap(), nfa);
	}

	#[test]
	fn display() {
		let mut grammar = Grammar::new(Alphabet::from('a'), "S");
		grammar.add_production("S", "aS").unwrap();
		grammar.add_production("S", "").unwrap();
		assert_eq!(grammar.to_string(), "S -> aS | ε\n");
	}
}
