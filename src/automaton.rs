use serde::{Deserialize, Serialize};
use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	fmt,
};

use crate::{
	alphabet::DisplayChar,
	loader::DisplayName,
	state::{StateId, StateSet},
	Alphabet, Error,
};

/// Outgoing transitions of a state.
///
/// The `None` label is an epsilon transition.
pub type Transitions = BTreeMap<Option<char>, StateSet>;

/// Structural invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
	#[error("undeclared initial state `{0}`")]
	UndeclaredInitialState(String),

	#[error("undeclared accepting state `{0}`")]
	UndeclaredAcceptingState(String),

	#[error("transition from undeclared state `{0}`")]
	UndeclaredSource(String),

	#[error("transition from `{state}` to undeclared state `{target}`")]
	UndeclaredTarget { state: String, target: String },

	#[error("transition from `{state}` on symbol `{}` outside of the alphabet", DisplayChar(*symbol))]
	UnknownSymbol { state: String, symbol: char },
}

/// Finite automaton.
///
/// Transitions may be non deterministic: a state can have several
/// destinations for the same symbol. State names are stored in a table
/// indexed by [`StateId`]; only the states added with
/// [`Automaton::add_state`] are declared states of the automaton, other
/// interned names are dangling references reported by
/// [`Automaton::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawAutomaton")]
pub struct Automaton {
	names: Vec<String>,

	#[serde(skip)]
	ids: HashMap<String, StateId>,

	alphabet: Alphabet,
	states: BTreeSet<StateId>,
	initial_state: StateId,
	final_states: BTreeSet<StateId>,
	transitions: BTreeMap<StateId, Transitions>,
}

impl Automaton {
	/// Creates a new automaton with a single (initial) state.
	pub fn new(alphabet: Alphabet, initial_state: impl Into<String>) -> Self {
		let mut result = Self {
			names: Vec::new(),
			ids: HashMap::new(),
			alphabet,
			states: BTreeSet::new(),
			initial_state: StateId::new(0),
			final_states: BTreeSet::new(),
			transitions: BTreeMap::new(),
		};

		result.initial_state = result.add_state(initial_state);
		result
	}

	pub fn alphabet(&self) -> &Alphabet {
		&self.alphabet
	}

	pub fn initial_state(&self) -> StateId {
		self.initial_state
	}

	pub fn set_initial_state(&mut self, q: StateId) {
		self.initial_state = q
	}

	/// Declared states, in handle order.
	pub fn states(&self) -> impl '_ + Iterator<Item = StateId> {
		self.states.iter().copied()
	}

	/// Number of declared states.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn final_states(&self) -> &BTreeSet<StateId> {
		&self.final_states
	}

	pub fn is_final_state(&self, q: StateId) -> bool {
		self.final_states.contains(&q)
	}

	pub fn transitions(&self) -> &BTreeMap<StateId, Transitions> {
		&self.transitions
	}

	/// Finds a state (declared or not) by name.
	pub fn state(&self, name: &str) -> Option<StateId> {
		self.ids.get(name).copied()
	}

	pub fn state_name(&self, q: StateId) -> Option<&str> {
		self.names.get(q.index()).map(String::as_str)
	}

	pub fn is_declared(&self, q: StateId) -> bool {
		self.states.contains(&q)
	}

	/// Returns the handle of the given name, allocating one if necessary,
	/// without declaring the state.
	pub fn intern(&mut self, name: impl Into<String>) -> StateId {
		let name = name.into();
		match self.ids.get(&name) {
			Some(q) => *q,
			None => {
				let q = StateId::new(self.names.len());
				self.ids.insert(name.clone(), q);
				self.names.push(name);
				q
			}
		}
	}

	/// Declares a state, returning its handle.
	///
	/// Declaring an already declared name returns the existing handle.
	pub fn add_state(&mut self, name: impl Into<String>) -> StateId {
		let q = self.intern(name);
		self.states.insert(q);
		q
	}

	pub fn add_final_state(&mut self, q: StateId) -> bool {
		self.final_states.insert(q)
	}

	/// Adds a transition. Nothing is checked until [`Self::validate`].
	pub fn add(&mut self, source: StateId, label: Option<char>, target: StateId) -> bool {
		self.transitions
			.entry(source)
			.or_default()
			.entry(label)
			.or_default()
			.insert(target)
	}

	/// Destinations of `q` on `symbol`.
	pub fn successors(&self, q: StateId, symbol: char) -> Option<&StateSet> {
		self.transitions
			.get(&q)
			.and_then(|transitions| transitions.get(&Some(symbol)))
	}

	/// Number of `(source, label, target)` triples.
	pub fn transition_count(&self) -> usize {
		self.transitions
			.values()
			.flat_map(|transitions| transitions.values())
			.map(StateSet::len)
			.sum()
	}

	pub(crate) fn display_state(&self, q: StateId) -> String {
		match self.state_name(q) {
			Some(name) => name.to_owned(),
			None => q.to_string(),
		}
	}

	/// Checks the structural invariants of the automaton.
	pub fn validate(&self) -> Result<(), Error> {
		if !self.is_declared(self.initial_state) {
			return Err(
				Malformed::UndeclaredInitialState(self.display_state(self.initial_state)).into(),
			);
		}

		if let Some(q) = self.final_states.iter().find(|q| !self.is_declared(**q)) {
			return Err(Malformed::UndeclaredAcceptingState(self.display_state(*q)).into());
		}

		for (source, transitions) in &self.transitions {
			if !self.is_declared(*source) {
				return Err(Malformed::UndeclaredSource(self.display_state(*source)).into());
			}

			for (label, targets) in transitions {
				match label {
					None => {
						return Err(Error::UnsupportedEpsilonTransition(
							self.display_state(*source),
						))
					}
					Some(c) => {
						if !self.alphabet.contains(*c) {
							return Err(Malformed::UnknownSymbol {
								state: self.display_state(*source),
								symbol: *c,
							}
							.into());
						}
					}
				}

				if let Some(target) = targets.iter().find(|q| !self.is_declared(*q)) {
					return Err(Malformed::UndeclaredTarget {
						state: self.display_state(*source),
						target: self.display_state(target),
					}
					.into());
				}
			}
		}

		Ok(())
	}

	/// Checks that every state has at most one destination per symbol, and no
	/// epsilon transition.
	pub fn is_deterministic(&self) -> bool {
		self.transitions.values().all(|transitions| {
			transitions
				.iter()
				.all(|(label, targets)| label.is_some() && targets.len() == 1)
		})
	}

	/// Checks that the automaton recognizes the given word.
	///
	/// Runs on sets of states so it works on non deterministic automata.
	/// Epsilon transitions are not followed.
	pub fn accepts(&self, word: impl IntoIterator<Item = char>) -> bool {
		let mut current = StateSet::singleton(self.initial_state);

		for c in word {
			if !self.alphabet.contains(c) {
				return false;
			}

			let mut next = StateSet::new();
			for q in &current {
				if let Some(targets) = self.successors(q, c) {
					next.union_with(targets)
				}
			}

			if next.is_empty() {
				return false;
			}

			current = next
		}

		let accepted = current.iter().any(|q| self.is_final_state(q));
		accepted
	}
}

/// Serialized form of an [`Automaton`], without the name index.
#[derive(Deserialize)]
struct RawAutomaton {
	names: Vec<String>,
	alphabet: Alphabet,
	states: BTreeSet<StateId>,
	initial_state: StateId,
	final_states: BTreeSet<StateId>,
	transitions: BTreeMap<StateId, Transitions>,
}

impl From<RawAutomaton> for Automaton {
	fn from(raw: RawAutomaton) -> Self {
		let ids = raw
			.names
			.iter()
			.enumerate()
			.map(|(i, name)| (name.clone(), StateId::new(i)))
			.collect();

		Self {
			names: raw.names,
			ids,
			alphabet: raw.alphabet,
			states: raw.states,
			initial_state: raw.initial_state,
			final_states: raw.final_states,
			transitions: raw.transitions,
		}
	}
}

impl PartialEq for Automaton {
	fn eq(&self, other: &Self) -> bool {
		self.names == other.names
			&& self.alphabet == other.alphabet
			&& self.states == other.states
			&& self.initial_state == other.initial_state
			&& self.final_states == other.final_states
			&& self.transitions == other.transitions
	}
}

impl Eq for Automaton {}

/// Displays the automaton in the text format read by [`crate::loader`].
impl fmt::Display for Automaton {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "states:")?;
		for q in self.states() {
			write!(f, " {}", DisplayName(&self.display_state(q)))?;
		}
		writeln!(f)?;

		if self.alphabet.is_empty() {
			writeln!(f, "alphabet:")?;
		} else {
			writeln!(f, "alphabet: {}", self.alphabet)?;
		}

		writeln!(f, "initial: {}", DisplayName(&self.display_state(self.initial_state)))?;

		write!(f, "accepting:")?;
		for q in &self.final_states {
			write!(f, " {}", DisplayName(&self.display_state(*q)))?;
		}
		writeln!(f)?;

		for (source, transitions) in &self.transitions {
			write!(f, "{}:", DisplayName(&self.display_state(*source)))?;
			let mut first = true;
			for (label, targets) in transitions {
				for target in targets {
					if !first {
						write!(f, ",")?;
					}
					first = false;

					let target = self.display_state(target);
					match label {
						Some(c) => write!(f, " {} {}", DisplayChar(*c), DisplayName(&target))?,
						None => write!(f, " ε {}", DisplayName(&target))?,
					}
				}
			}
			writeln!(f)?;
		}

		Ok(())
	}
}
