use std::{borrow::Cow, path::PathBuf};

/// Default ceiling on the number of states of a determinized automaton.
pub const DEFAULT_MAX_STATES: usize = 1 << 16;

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_VAR: &str = "REGULAR_AUTOMATON_CACHE_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeterminizeOptions {
	/// Maximum number of composite states created before giving up.
	pub max_states: usize,
}

impl DeterminizeOptions {
	pub fn with_max_states(max_states: usize) -> Self {
		Self { max_states }
	}
}

impl Default for DeterminizeOptions {
	fn default() -> Self {
		Self {
			max_states: DEFAULT_MAX_STATES,
		}
	}
}

fn find_target_dir() -> Result<Cow<'static, str>, std::env::VarError> {
	match std::env::var(CACHE_DIR_VAR) {
		Ok(dir) => Ok(Cow::Owned(dir)),
		Err(std::env::VarError::NotPresent) => match std::env::var("CARGO_TARGET_DIR") {
			Ok(dir) => Ok(Cow::Owned(dir)),
			Err(std::env::VarError::NotPresent) => Ok(Cow::Borrowed("target")),
			Err(e) => Err(e),
		},
		Err(e) => Err(e),
	}
}

/// Default location of the cached determinization of the automaton `name`.
pub fn default_cache_path(name: &str) -> Result<PathBuf, std::env::VarError> {
	let target = find_target_dir()?;
	Ok(format!("{target}/regular-automaton/{name}.automaton.cbor").into())
}
