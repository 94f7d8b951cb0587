//! Subset construction.
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::{
	state::{StateId, StateSet},
	Automaton, DeterminizeOptions, Error,
};

/// Determinizes the given automaton with the default options.
///
/// See [`Determinizer::run`].
pub fn determinize(nfa: &Automaton) -> Result<Automaton, Error> {
	Determinizer::default()
		.run(nfa)
		.map(Determinized::into_automaton)
}

/// Result of a determinization.
#[derive(Debug, Clone)]
pub struct Determinized {
	automaton: Automaton,

	/// Original states of each new state.
	composites: BTreeMap<StateId, StateSet>,
}

impl Determinized {
	pub fn automaton(&self) -> &Automaton {
		&self.automaton
	}

	pub fn into_automaton(self) -> Automaton {
		self.automaton
	}

	/// Returns the original states represented by the new state `q`.
	pub fn composite(&self, q: StateId) -> Option<&StateSet> {
		self.composites.get(&q)
	}

	pub fn composites(&self) -> &BTreeMap<StateId, StateSet> {
		&self.composites
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Determinizer {
	options: DeterminizeOptions,
}

impl Determinizer {
	pub fn new(options: DeterminizeOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &DeterminizeOptions {
		&self.options
	}

	/// Computes a deterministic automaton recognizing the same language as
	/// `nfa`.
	///
	/// The input is validated first. An already deterministic automaton is
	/// returned unchanged. Otherwise each state of the result is a set of
	/// states of `nfa` reachable from its initial state, and is final when
	/// it contains a final state of `nfa`.
	pub fn run(&self, nfa: &Automaton) -> Result<Determinized, Error> {
		nfa.validate()?;

		if nfa.is_deterministic() {
			debug!("automaton is already deterministic");
			return Ok(Determinized {
				automaton: nfa.clone(),
				composites: nfa.states().map(|q| (q, StateSet::singleton(q))).collect(),
			});
		}

		debug!(
			"determinizing automaton with {} states and {} transitions",
			nfa.len(),
			nfa.transition_count()
		);

		let result = Construction::new(nfa, self.options.max_states)?.run()?;

		debug!(
			"determinized automaton has {} states and {} transitions",
			result.automaton.len(),
			result.automaton.transition_count()
		);

		Ok(result)
	}
}

/// Worklist state of a subset construction.
struct Construction<'a> {
	nfa: &'a Automaton,
	max_states: usize,
	result: Automaton,
	ids: HashMap<StateSet, StateId>,
	composites: BTreeMap<StateId, StateSet>,
	worklist: VecDeque<StateSet>,
	finished: HashSet<StateId>,
}

impl<'a> Construction<'a> {
	fn new(nfa: &'a Automaton, max_states: usize) -> Result<Self, Error> {
		if max_states == 0 {
			return Err(Error::DeterminizationLimitExceeded { limit: max_states });
		}

		let initial_state = StateSet::singleton(nfa.initial_state());
		let result = Automaton::new(nfa.alphabet().clone(), composite_name(nfa, &initial_state));
		let q = result.initial_state();

		let mut ids = HashMap::new();
		ids.insert(initial_state.clone(), q);

		let mut composites = BTreeMap::new();
		composites.insert(q, initial_state.clone());

		Ok(Self {
			nfa,
			max_states,
			result,
			ids,
			composites,
			worklist: VecDeque::from([initial_state]),
			finished: HashSet::new(),
		})
	}

	fn run(mut self) -> Result<Determinized, Error> {
		while let Some(det_q) = self.worklist.pop_front() {
			let source = self.ids[&det_q];
			if !self.finished.insert(source) {
				continue;
			}

			if det_q.iter().any(|q| self.nfa.is_final_state(q)) {
				self.result.add_final_state(source);
			}

			for (symbol, targets) in self.determinize_transitions_for(&det_q) {
				let target = self.get_or_insert(targets)?;
				self.result.add(source, Some(symbol), target);
			}
		}

		Ok(Determinized {
			automaton: self.result,
			composites: self.composites,
		})
	}

	/// Merges the transitions of every member of `det_q`, by symbol.
	///
	/// Targets sharing a symbol are fused into a single set.
	fn determinize_transitions_for(&self, det_q: &StateSet) -> BTreeMap<char, StateSet> {
		let mut map: BTreeMap<char, StateSet> = BTreeMap::new();

		for q in det_q {
			if let Some(transitions) = self.nfa.transitions().get(&q) {
				for (label, targets) in transitions {
					if let Some(symbol) = label {
						map.entry(*symbol).or_default().union_with(targets)
					}
				}
			}
		}

		map
	}

	fn get_or_insert(&mut self, det_q: StateSet) -> Result<StateId, Error> {
		if let Some(q) = self.ids.get(&det_q) {
			return Ok(*q);
		}

		if self.ids.len() >= self.max_states {
			return Err(Error::DeterminizationLimitExceeded {
				limit: self.max_states,
			});
		}

		let name = self.fresh_name(&det_q);
		trace!("new composite state `{name}`");
		let q = self.result.add_state(name);

		self.ids.insert(det_q.clone(), q);
		self.composites.insert(q, det_q.clone());
		self.worklist.push_back(det_q);

		Ok(q)
	}

	/// Canonical name of a composite state.
	///
	/// When the concatenated name is already taken, the members are listed
	/// between braces (`{q1,q12}`), followed by `'` marks if needed.
	fn fresh_name(&self, det_q: &StateSet) -> String {
		let mut name = composite_name(self.nfa, det_q);

		if self.result.state(&name).is_some() {
			name = format!(
				"{{{}}}",
				det_q
					.iter()
					.map(|q| self.nfa.display_state(q))
					.collect::<Vec<_>>()
					.join(",")
			);

			while self.result.state(&name).is_some() {
				name.push('\'')
			}
		}

		name
	}
}

/// Concatenation of the member names, in handle order.
fn composite_name(nfa: &Automaton, det_q: &StateSet) -> String {
	det_q.iter().map(|q| nfa.display_state(q)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Alphabet, Malformed};

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

	fn target<'a>(dfa: &'a Automaton, source: &str, symbol: char) -> Option<&'a str> {
		let q = dfa.state(source)?;
		let targets = dfa.successors(q, symbol)?;
		dfa.state_name(targets.as_singleton()?)
	}

	#[test]
	fn lab_scenario() {
		let nfa = lab_nfa();
		assert!(!nfa.is_deterministic());

		let result = Determinizer::default().run(&nfa).unwrap();
		let dfa = result.automaton();
		assert!(dfa.is_deterministic());
		assert_eq!(dfa.state_name(dfa.initial_state()), Some("q0"));

		let mut names: Vec<_> = dfa.states().filter_map(|q| dfa.state_name(q)).collect();
		names.sort_unstable();
		assert_eq!(
			names,
			vec!["q0", "q0q1", "q0q1q2", "q1", "q1q3", "q2", "q3"]
		);

		assert_eq!(target(dfa, "q0", 'a'), Some("q0q1"));
		assert_eq!(target(dfa, "q0", 'b'), None);
		assert_eq!(target(dfa, "q0q1", 'a'), Some("q0q1q2"));
		assert_eq!(target(dfa, "q0q1", 'b'), Some("q1"));
		assert_eq!(target(dfa, "q0q1q2", 'a'), Some("q0q1q2"));
		assert_eq!(target(dfa, "q0q1q2", 'b'), Some("q1q3"));
		assert_eq!(target(dfa, "q1q3", 'a'), Some("q2"));
		assert_eq!(target(dfa, "q2", 'a'), Some("q0"));
		assert_eq!(target(dfa, "q2", 'b'), Some("q3"));

		let accepting: Vec<_> = dfa
			.final_states()
			.iter()
			.filter_map(|q| dfa.state_name(*q))
			.collect();
		assert_eq!(accepting, vec!["q1q3", "q3"]);
		assert_eq!(dfa.transition_count(), 11);

		let q1q3 = dfa.state("q1q3").unwrap();
		let members: Vec<_> = result
			.composite(q1q3)
			.unwrap()
			.iter()
			.filter_map(|q| nfa.state_name(q))
			.collect();
		assert_eq!(members, vec!["q1", "q3"]);
	}

	#[test]
	fn input_is_not_modified() {
		let nfa = lab_nfa();
		let copy = nfa.clone();
		determinize(&nfa).unwrap();
		assert_eq!(nfa, copy);
	}

	#[test]
	fn deterministic_input_is_returned_unchanged() {
		let dfa = determinize(&lab_nfa()).unwrap();
		let again = Determinizer::default().run(&dfa).unwrap();
		assert_eq!(again.automaton(), &dfa);

		for q in dfa.states() {
			assert_eq!(again.composite(q), Some(&StateSet::singleton(q)))
		}
	}

	#[test]
	fn merged_branch_acceptance() {
		let mut nfa = Automaton::new(Alphabet::from(['a', 'b']), "p");
		let p = nfa.initial_state();
		let r1 = nfa.add_state("r1");
		let r2 = nfa.add_state("r2");
		let r3 = nfa.add_state("r3");
		nfa.add_final_state(r2);
		nfa.add(p, Some('a'), r1);
		nfa.add(p, Some('a'), r2);
		nfa.add(p, Some('b'), r1);
		nfa.add(p, Some('b'), r3);

		let dfa = determinize(&nfa).unwrap();
		let r1r2 = dfa.state("r1r2").unwrap();
		let r1r3 = dfa.state("r1r3").unwrap();
		assert!(dfa.is_final_state(r1r2));
		assert!(!dfa.is_final_state(r1r3));
		assert!(!dfa.is_final_state(dfa.initial_state()));
	}

	#[test]
	fn colliding_names_are_disambiguated() {
		let mut nfa = Automaton::new(Alphabet::from(['a', 'b']), "s");
		let s = nfa.initial_state();
		let x = nfa.add_state("x");
		let xy = nfa.add_state("xy");
		let xx = nfa.add_state("xx");
		let y = nfa.add_state("y");
		nfa.add(s, Some('a'), x);
		nfa.add(s, Some('a'), xy);
		nfa.add(s, Some('b'), xx);
		nfa.add(s, Some('b'), y);

		let dfa = determinize(&nfa).unwrap();
		assert_eq!(dfa.len(), 3);
		assert_eq!(target(&dfa, "s", 'a'), Some("xxy"));
		assert_eq!(target(&dfa, "s", 'b'), Some("{xx,y}"));

		let reloaded = crate::loader::load(&dfa.to_string()).unwrap();
		assert_eq!(reloaded, dfa);
	}

	/// NFA of the words whose `n`-th symbol from the end is `a`.
	fn nth_from_end(n: u32) -> Automaton {
		let mut nfa = Automaton::new(Alphabet::from(['a', 'b']), "s0");
		let mut previous = nfa.initial_state();
		nfa.add(previous, Some('a'), previous);
		nfa.add(previous, Some('b'), previous);

		for i in 1..=n {
			let q = nfa.add_state(format!("s{i}"));
			nfa.add(previous, Some('a'), q);
			if i > 1 {
				nfa.add(previous, Some('b'), q);
			}
			previous = q
		}

		nfa.add_final_state(previous);
		nfa
	}

	#[test]
	fn state_limit() {
		let nfa = nth_from_end(3);

		let dfa = Determinizer::new(DeterminizeOptions::with_max_states(8))
			.run(&nfa)
			.unwrap();
		assert_eq!(dfa.automaton().len(), 8);

		assert!(matches!(
			Determinizer::new(DeterminizeOptions::with_max_states(7)).run(&nfa),
			Err(Error::DeterminizationLimitExceeded { limit: 7 })
		));
	}

	#[test]
	fn malformed_input_is_rejected() {
		let mut nfa = lab_nfa();
		let q0 = nfa.initial_state();
		let ghost = nfa.intern("q4");
		nfa.add(q0, Some('b'), ghost);

		assert!(matches!(
			determinize(&nfa),
			Err(Error::MalformedAutomaton(Malformed::UndeclaredTarget { .. }))
		));

		let mut nfa = lab_nfa();
		nfa.add(q0, None, q0);
		assert!(matches!(
			determinize(&nfa),
			Err(Error::UnsupportedEpsilonTransition(_))
		));
	}
}
