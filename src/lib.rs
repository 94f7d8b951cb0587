//! This library turns non deterministic finite automata into deterministic
//! ones using the subset construction, and maps automata to the equivalent
//! right-linear grammars (and back).
//!
//! # Basic Usage
//!
//! ```
//! use regular_automaton::{determinize, Alphabet, Automaton};
//!
//! let mut nfa = Automaton::new(Alphabet::from(['a', 'b']), "q0");
//! let q0 = nfa.initial_state();
//! let q1 = nfa.add_state("q1");
//! nfa.add_final_state(q1);
//! nfa.add(q0, Some('a'), q0);
//! nfa.add(q0, Some('a'), q1);
//! nfa.add(q1, Some('b'), q1);
//!
//! assert!(!nfa.is_deterministic());
//!
//! let dfa = determinize(&nfa).unwrap();
//! assert!(dfa.is_deterministic());
//! assert!(dfa.accepts("aabb".chars()));
//!
//! let grammar = dfa.to_grammar();
//! assert_eq!(grammar.start(), "q0");
//! ```
//!
//! Composite states are named by concatenating the names of the original
//! states they contain, in declaration order (`q0q1` above).
//!
//! # Text format
//!
//! Automata can be loaded from (and displayed as) a small text format, see
//! the [`loader`] module.
//!
//! # Caching
//!
//! Determinization is exponential in the worst case. The [`cache`] module
//! stores determinized automata on disk, keyed by a hash of the input
//! automaton, so that the work is only done once.
pub mod alphabet;
pub mod automaton;
pub mod cache;
pub mod determinize;
pub mod grammar;
pub mod loader;
pub mod options;
pub mod state;

pub use alphabet::Alphabet;
pub use automaton::{Automaton, Malformed};
pub use determinize::{determinize, Determinized, Determinizer};
pub use grammar::{Grammar, GrammarError};
pub use options::DeterminizeOptions;
pub use state::{StateId, StateSet};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("malformed automaton: {0}")]
	MalformedAutomaton(#[from] Malformed),

	#[error("unsupported epsilon transition from state `{0}`")]
	UnsupportedEpsilonTransition(String),

	#[error("determinization limit exceeded: more than {limit} states")]
	DeterminizationLimitExceeded { limit: usize },
}
