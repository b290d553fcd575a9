//! ACTION/GOTO table construction.

use crate::{
    dfa::{StateID, DFA},
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// A resolved ACTION table cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateID),
    Reduce(ProductionID),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(next) => write!(f, "s{}", next),
            Self::Reduce(production) => write!(f, "r{}", production.into_raw()),
            Self::Accept => f.write_str("acc"),
        }
    }
}

/// How conflicting table cells are handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ConflictResolution {
    /// Reject the grammar on the first conflicting cell.
    #[default]
    Strict,
    /// Resolve every cell: accept wins over shift, shift wins over reduce,
    /// and the lowest-numbered production wins among reduces. Each decision
    /// is recorded on the table.
    PreferShift,
}

/// A conflicting cell resolved under [`ConflictResolution::PreferShift`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Conflict {
    pub state: StateID,
    pub symbol: TerminalID,
    pub chosen: Action,
    pub rejected: Vec<Action>,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

/// The ACTION/GOTO table driving the parser engine.
#[derive(Debug)]
pub struct ParseTable {
    rows: Map<StateID, ParseTableRow>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn generate(
        grammar: &Grammar,
        dfa: &DFA,
        resolution: ConflictResolution,
    ) -> Result<Self, TableError> {
        let mut rows: Map<StateID, ParseTableRow> = Map::default();
        let mut conflicts = vec![];

        for (id, state) in dfa.states() {
            let mut pending: Map<TerminalID, PendingAction> = Map::default();
            let mut gotos: Map<NonterminalID, StateID> = Map::default();

            for (symbol, target) in &state.edges {
                match symbol {
                    SymbolID::T(t) => {
                        pending.entry(*t).or_default().shift = Some(*target);
                    }
                    SymbolID::N(n) => {
                        gotos.insert(*n, *target);
                    }
                }
            }

            for (core, lookaheads) in &state.item_set {
                if core.next_symbol(grammar).is_some() {
                    continue;
                }
                for lookahead in lookaheads.iter() {
                    let cell = pending.entry(lookahead).or_default();
                    if core.production == ProductionID::ACCEPT {
                        cell.accept = true;
                    } else {
                        cell.reduces.push(core.production);
                    }
                }
            }

            let mut actions: Map<TerminalID, Action> = Map::default();
            for (terminal, cell) in pending {
                let action = resolve(grammar, resolution, id, terminal, cell, &mut conflicts)?;
                actions.insert(terminal, action);
            }

            rows.insert(id, ParseTableRow { actions, gotos });
        }

        tracing::debug!(
            rows = rows.len(),
            conflicts = conflicts.len(),
            "generated parse table"
        );
        Ok(Self { rows, conflicts })
    }

    pub fn rows(&self) -> impl Iterator<Item = (StateID, &ParseTableRow)> + '_ {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn row(&self, id: StateID) -> &ParseTableRow {
        &self.rows[&id]
    }

    pub fn action(&self, state: StateID, terminal: TerminalID) -> Option<Action> {
        self.rows[&state].actions.get(&terminal).copied()
    }

    pub fn goto(&self, state: StateID, nonterminal: NonterminalID) -> Option<StateID> {
        self.rows[&state].gotos.get(&nonterminal).copied()
    }

    /// The conflicts resolved during construction, in the order they were
    /// encountered. Always empty under [`ConflictResolution::Strict`].
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn display<'g>(&'g self, grammar: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, row) in self.rows() {
                write!(f, "- state {}:", id)?;
                for (terminal, action) in &row.actions {
                    write!(f, " {} => {},", grammar.terminal(*terminal), action)?;
                }
                for (nonterminal, next) in &row.gotos {
                    write!(f, " {} => {},", grammar.nonterminal(*nonterminal), next)?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

// Everything derived for one ACTION cell before conflict resolution.
#[derive(Debug, Default)]
struct PendingAction {
    shift: Option<StateID>,
    reduces: Vec<ProductionID>,
    accept: bool,
}

fn resolve(
    grammar: &Grammar,
    resolution: ConflictResolution,
    state: StateID,
    terminal: TerminalID,
    cell: PendingAction,
    conflicts: &mut Vec<Conflict>,
) -> Result<Action, TableError> {
    let PendingAction {
        shift,
        mut reduces,
        accept,
    } = cell;
    reduces.sort_unstable();

    // Built in precedence order, so the head is the winner whenever
    // several candidates compete.
    let mut candidates = vec![];
    if accept {
        candidates.push(Action::Accept);
    }
    if let Some(next) = shift {
        candidates.push(Action::Shift(next));
    }
    candidates.extend(reduces.iter().copied().map(Action::Reduce));

    match candidates.as_slice() {
        [] => unreachable!("a pending cell always holds at least one action"),
        [single] => return Ok(*single),
        _ => {}
    }

    match resolution {
        ConflictResolution::Strict => {
            let symbol = grammar.terminal(terminal).name().to_owned();
            Err(match (accept, shift) {
                (true, _) => TableError::AcceptReduceConflict { state, symbol },
                (_, Some(..)) => TableError::ShiftReduceConflict { state, symbol },
                _ => TableError::ReduceReduceConflict { state, symbol },
            })
        }
        ConflictResolution::PreferShift => {
            let chosen = candidates[0];
            conflicts.push(Conflict {
                state,
                symbol: terminal,
                chosen,
                rejected: candidates[1..].to_vec(),
            });
            Ok(chosen)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("detected shift/reduce conflict in state {} on `{}'", state, symbol)]
    ShiftReduceConflict { state: StateID, symbol: String },

    #[error("detected reduce/reduce conflict in state {} on `{}'", state, symbol)]
    ReduceReduceConflict { state: StateID, symbol: String },

    #[error("detected accept/reduce conflict in state {} on `{}'", state, symbol)]
    AcceptReduceConflict { state: StateID, symbol: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{Engine, ParseFailure},
        first_follow::FirstSets,
    };

    fn table(source: &str, resolution: ConflictResolution) -> Result<ParseTable, TableError> {
        let grammar = Grammar::from_str(source).unwrap();
        let first_sets = FirstSets::new(&grammar);
        let dfa = DFA::generate(&grammar, &first_sets);
        ParseTable::generate(&grammar, &dfa, resolution)
    }

    #[test]
    fn unambiguous_grammar_builds_without_conflicts() {
        let grammar = Grammar::from_str(
            "\
E -> E + T | T
T -> T * F | F
F -> ( E ) | id
",
        )
        .unwrap();
        let first_sets = FirstSets::new(&grammar);
        let dfa = DFA::generate(&grammar, &first_sets);
        let table = ParseTable::generate(&grammar, &dfa, ConflictResolution::Strict).unwrap();

        assert!(table.conflicts().is_empty());

        let initial = table.row(StateID::INITIAL);
        let id = grammar.lookup_terminal("id").unwrap();
        let open = grammar.lookup_terminal("(").unwrap();
        assert!(matches!(initial.actions.get(&id), Some(Action::Shift(..))));
        assert!(matches!(initial.actions.get(&open), Some(Action::Shift(..))));
        assert_eq!(initial.gotos.len(), 3);

        // exactly one accepting cell, at the end marker
        let accepts: Vec<_> = table
            .rows()
            .flat_map(|(_, row)| row.actions.iter())
            .filter(|(_, action)| matches!(action, Action::Accept))
            .collect();
        assert_eq!(accepts.len(), 1);
        assert_eq!(*accepts[0].0, TerminalID::EOI);

        eprintln!("{}", table.display(&grammar));
    }

    #[test]
    fn strict_rejects_shift_reduce_ambiguity() {
        let err = table("E -> E + E | id", ConflictResolution::Strict).unwrap_err();
        assert!(matches!(err, TableError::ShiftReduceConflict { .. }));
    }

    #[test]
    fn prefer_shift_resolves_and_records() {
        let table = table("E -> E + E | id", ConflictResolution::PreferShift).unwrap();
        assert!(!table.conflicts().is_empty());
        for conflict in table.conflicts() {
            assert!(matches!(conflict.chosen, Action::Shift(..)));
            assert!(!conflict.rejected.is_empty());
        }
    }

    #[test]
    fn reduce_reduce_prefers_the_lower_production() {
        let source = "S -> A | B\nA -> x\nB -> x";

        let err = table(source, ConflictResolution::Strict).unwrap_err();
        assert!(matches!(err, TableError::ReduceReduceConflict { .. }));

        let grammar = Grammar::from_str(source).unwrap();
        let a_to_x = grammar
            .productions
            .values()
            .find(|p| p.display(&grammar).to_string() == "A -> x")
            .map(|p| p.id())
            .unwrap();

        let table = table(source, ConflictResolution::PreferShift).unwrap();
        let conflict = &table.conflicts()[0];
        assert_eq!(conflict.chosen, Action::Reduce(a_to_x));
    }

    #[test]
    fn action_rendering() {
        let table = table("S -> a", ConflictResolution::Strict).unwrap();
        let grammar = Grammar::from_str("S -> a").unwrap();
        let a = grammar.lookup_terminal("a").unwrap();

        let shift = table.action(StateID::INITIAL, a).unwrap();
        assert_eq!(shift.to_string(), "s2");
        let accept = table.action(StateID::new(1), TerminalID::EOI).unwrap();
        assert_eq!(accept.to_string(), "acc");
        let reduce = table.action(StateID::new(2), TerminalID::EOI).unwrap();
        assert_eq!(reduce.to_string(), "r1");
    }

    #[test]
    fn missing_goto_is_reported_as_an_inconsistent_table() {
        let grammar = Grammar::from_str("S -> a").unwrap();
        let mut table = table("S -> a", ConflictResolution::Strict).unwrap();
        // no generated table has a dangling GOTO, so break one by hand
        table.rows[&StateID::INITIAL].gotos.clear();

        let engine = Engine::new(&grammar, &table);
        let outcome = engine.parse_str("a");

        assert!(!outcome.accepted());
        assert_eq!(
            outcome.failure,
            Some(ParseFailure::MissingGoto {
                state: StateID::INITIAL,
                symbol: "S".to_owned(),
            })
        );
        // the shift and the reduce both executed and stay on the trace
        assert_eq!(outcome.trace.len(), 2);
    }
}
