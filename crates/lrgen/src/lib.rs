//! An LR(1)/LALR(1) parser generator with a table-driven recognizer.

pub mod dfa;
pub mod engine;
pub mod export;
pub mod first_follow;
pub mod grammar;
pub mod lalr;
pub mod table;

mod types;
mod util;

pub use crate::{
    engine::{Engine, ParseFailure, ParseOutcome},
    grammar::{Grammar, GrammarError},
    table::{Action, ConflictResolution},
};

use crate::{
    dfa::DFA,
    first_follow::{FirstSets, FollowSets},
    lalr::MergeError,
    table::{ParseTable, TableError},
};

/// Which automaton drives the parse table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// The canonical LR(1) construction.
    #[default]
    Canonical,
    /// The canonical construction followed by merging states with equal
    /// item cores.
    Lalr,
}

/// Configuration used in automaton and table generation.
#[derive(Debug, Clone, Default)]
pub struct Config {
    algorithm: Algorithm,
    resolution: ConflictResolution,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the canonical LR(1) automaton.
    pub fn use_canonical(&mut self) -> &mut Self {
        self.algorithm = Algorithm::Canonical;
        self
    }

    /// Merge same-core states before building the table.
    pub fn use_lalr(&mut self) -> &mut Self {
        self.algorithm = Algorithm::Lalr;
        self
    }

    /// Choose how conflicting table cells are handled.
    pub fn conflict_resolution(&mut self, resolution: ConflictResolution) -> &mut Self {
        self.resolution = resolution;
        self
    }
}

/// Every artifact of one generation run.
#[derive(Debug)]
#[non_exhaustive]
pub struct Build {
    pub grammar: Grammar,
    pub first_sets: FirstSets,
    pub follow_sets: FollowSets,
    pub dfa: DFA,
    pub table: ParseTable,
}

impl Build {
    /// A recognizer over the generated table.
    pub fn engine(&self) -> Engine<'_> {
        Engine::new(&self.grammar, &self.table)
    }

    pub fn summary(&self) -> export::BuildSummary {
        export::BuildSummary::new(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Generate every artifact for the grammar under the default
/// configuration: canonical LR(1) automaton, strict conflict handling.
pub fn build(grammar: Grammar) -> Result<Build, BuildError> {
    build_with_config(grammar, &Config::new())
}

/// Generate every artifact for the grammar.
#[tracing::instrument(level = "debug", skip_all, fields(algorithm = ?config.algorithm))]
pub fn build_with_config(grammar: Grammar, config: &Config) -> Result<Build, BuildError> {
    let first_sets = FirstSets::new(&grammar);
    let follow_sets = FollowSets::new(&grammar, &first_sets);

    let mut dfa = DFA::generate(&grammar, &first_sets);
    if config.algorithm == Algorithm::Lalr {
        dfa = lalr::merge(&grammar, &dfa)?;
    }

    let table = ParseTable::generate(&grammar, &dfa, config.resolution)?;

    Ok(Build {
        grammar,
        first_sets,
        follow_sets,
        dfa,
        table,
    })
}
