//! On-disk cache of determinized automata.
//!
//! A cache file holds a determinized automaton in CBOR, along with the
//! SHA-256 hash of the automaton it was computed from. The cached result is
//! only used when the hash matches.
use hex_fmt::HexFmt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{Automaton, DeterminizeOptions, Determinizer, Error};

pub type Fingerprint = [u8; 32];

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
	#[error(transparent)]
	IO(#[from] std::io::Error),

	#[error(transparent)]
	Serialization(#[from] ciborium::ser::Error<std::io::Error>),

	#[error(transparent)]
	Deserialization(#[from] ciborium::de::Error<std::io::Error>),
}

#[derive(Deserialize)]
struct CachedAutomaton {
	hash: Fingerprint,
	automaton: Automaton,
}

#[derive(Serialize)]
struct CachedAutomatonRef<'a> {
	hash: Fingerprint,
	automaton: &'a Automaton,
}

/// Hash of the CBOR encoding of the automaton.
pub fn fingerprint(automaton: &Automaton) -> Result<Fingerprint, CacheError> {
	let mut bytes = Vec::new();
	ciborium::into_writer(automaton, &mut bytes)?;
	Ok(Sha256::digest(&bytes).into())
}

/// Loads the cached automaton stored in `filename` if it was computed from an
/// automaton with the given hash.
pub fn load(filename: &Path, hash: &Fingerprint) -> Result<Option<Automaton>, CacheError> {
	match std::fs::File::open(filename) {
		Ok(file) => {
			let input = std::io::BufReader::new(file);
			let cached: CachedAutomaton = ciborium::from_reader(input)?;

			if cached.hash == *hash {
				Ok(Some(cached.automaton))
			} else {
				Ok(None)
			}
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e.into()),
	}
}

pub fn save(filename: &Path, hash: Fingerprint, automaton: &Automaton) -> Result<(), CacheError> {
	if let Some(parent) = filename.parent() {
		std::fs::create_dir_all(parent)?;
	}

	let file = std::fs::File::create(filename)?;
	let output = std::io::BufWriter::new(file);
	Ok(ciborium::into_writer(
		&CachedAutomatonRef { hash, automaton },
		output,
	)?)
}

/// Determinizes `nfa`, reusing the result cached in `filename` when possible.
///
/// Cache failures are logged and otherwise ignored.
pub fn determinize_cached(
	nfa: &Automaton,
	filename: &Path,
	options: DeterminizeOptions,
) -> Result<Automaton, Error> {
	nfa.validate()?;

	let hash = match fingerprint(nfa) {
		Ok(hash) => Some(hash),
		Err(e) => {
			warn!("could not hash automaton: {e}");
			None
		}
	};

	if let Some(hash) = &hash {
		match load(filename, hash) {
			Ok(Some(automaton)) => {
				debug!(
					"using cached automaton {} from {}",
					HexFmt(hash),
					filename.display()
				);
				return Ok(automaton);
			}
			Ok(None) => (),
			Err(e) => warn!("could not load cached automaton: {e}"),
		}
	}

	let automaton = Determinizer::new(options).run(nfa)?.into_automaton();

	if let Some(hash) = hash {
		match save(filename, hash, &automaton) {
			Ok(()) => debug!("cached automaton {} in {}", HexFmt(&hash), filename.display()),
			Err(e) => warn!("unable to cache determinized automaton: {e}"),
		}
	}

	Ok(automaton)
}
