use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use regular_automaton::{
	cache, loader, options::default_cache_path, Automaton, DeterminizeOptions, Determinizer,
};

/// Finite automata determinization tool
#[derive(Parser, Debug)]
#[command(name = "regular-automaton")]
#[command(about = "Determinizes finite automata and prints their right-linear grammar", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Checks that the automaton is deterministic
	Check {
		#[arg(value_name = "FILE")]
		file: PathBuf,
	},

	/// Prints the deterministic automaton
	Determinize {
		#[arg(value_name = "FILE")]
		file: PathBuf,

		#[command(flatten)]
		options: Options,
	},

	/// Prints the right-linear grammar of the automaton
	Grammar {
		#[arg(value_name = "FILE")]
		file: PathBuf,

		/// Determinize the automaton first
		#[arg(short, long)]
		determinize: bool,

		#[command(flatten)]
		options: Options,
	},

	/// Checks which words are recognized by the automaton
	Accepts {
		#[arg(value_name = "FILE")]
		file: PathBuf,

		#[arg(value_name = "WORD")]
		words: Vec<String>,
	},
}

#[derive(clap::Args, Debug)]
struct Options {
	/// Maximum number of states of the deterministic automaton [default: 65536]
	#[arg(long, value_name = "N")]
	max_states: Option<usize>,

	/// Cache the deterministic automaton (in the target directory by default)
	#[arg(
		long,
		value_name = "PATH",
		num_args = 0..=1,
		require_equals = true,
		default_missing_value = ""
	)]
	cache: Option<PathBuf>,
}

impl Options {
	fn is_set(&self) -> bool {
		self.max_states.is_some() || self.cache.is_some()
	}
}

fn load(file: &Path) -> Result<Automaton> {
	loader::load_file(file).with_context(|| format!("unable to load `{}`", file.display()))
}

fn determinize(file: &Path, nfa: &Automaton, options: &Options) -> Result<Automaton> {
	let determinize_options = options
		.max_states
		.map(DeterminizeOptions::with_max_states)
		.unwrap_or_default();

	let dfa = match &options.cache {
		Some(path) => {
			let path = if path.as_os_str().is_empty() {
				let name = file
					.file_stem()
					.map(|stem| stem.to_string_lossy().into_owned())
					.unwrap_or_else(|| "automaton".to_owned());
				default_cache_path(&name).context("unable to find the cache directory")?
			} else {
				path.clone()
			};

			cache::determinize_cached(nfa, &path, determinize_options)?
		}
		None => Determinizer::new(determinize_options)
			.run(nfa)?
			.into_automaton(),
	};

	Ok(dfa)
}

fn main() -> Result<()> {
	env_logger::init();

	let cli = Cli::parse();

	match cli.command {
		Command::Check { file } => {
			let automaton = load(&file)?;
			automaton.validate()?;
			if automaton.is_deterministic() {
				println!("deterministic")
			} else {
				println!("non deterministic")
			}
		}
		Command::Determinize { file, options } => {
			let nfa = load(&file)?;
			let dfa = determinize(&file, &nfa, &options)?;
			print!("{dfa}")
		}
		Command::Grammar {
			file,
			determinize: det,
			options,
		} => {
			if !det && options.is_set() {
				bail!("`--max-states` and `--cache` require `--determinize`")
			}

			let mut automaton = load(&file)?;
			if det {
				automaton = determinize(&file, &automaton, &options)?;
			}

			print!("{}", automaton.to_grammar())
		}
		Command::Accepts { file, words } => {
			let automaton = load(&file)?;
			automaton.validate()?;
			for word in words {
				if automaton.accepts(word.chars()) {
					println!("{word}: accepted")
				} else {
					println!("{word}: rejected")
				}
			}
		}
	}

	Ok(())
}
