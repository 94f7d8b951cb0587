use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

/// State handle.
///
/// Index of the state in the state table of its automaton.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StateId(usize);

impl StateId {
	pub const fn new(index: usize) -> Self {
		Self(index)
	}

	pub fn index(&self) -> usize {
		self.0
	}
}

impl fmt::Display for StateId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Canonical set of states.
///
/// Used both as the destination set of a transition and as the identity of a
/// composite state produced by determinization. Two sets with the same members
/// are equal, whatever the insertion order.
#[derive(
	Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StateSet(BTreeSet<StateId>);

impl StateSet {
	pub fn new() -> Self {
		Self(BTreeSet::new())
	}

	pub fn singleton(q: StateId) -> Self {
		let mut set = Self::new();
		set.insert(q);
		set
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn insert(&mut self, q: StateId) -> bool {
		self.0.insert(q)
	}

	pub fn contains(&self, q: StateId) -> bool {
		self.0.contains(&q)
	}

	/// Adds every member of `other` to this set.
	pub fn union_with(&mut self, other: &Self) {
		self.0.extend(other.iter())
	}

	/// Returns the only member of the set, if it is a singleton.
	pub fn as_singleton(&self) -> Option<StateId> {
		if self.0.len() == 1 {
			self.0.first().copied()
		} else {
			None
		}
	}

	pub fn iter(&self) -> impl '_ + DoubleEndedIterator<Item = StateId> {
		self.0.iter().copied()
	}
}

impl FromIterator<StateId> for StateSet {
	fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl Extend<StateId> for StateSet {
	fn extend<I: IntoIterator<Item = StateId>>(&mut self, iter: I) {
		self.0.extend(iter)
	}
}

impl<'a> IntoIterator for &'a StateSet {
	type Item = StateId;
	type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, StateId>>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter().copied()
	}
}
