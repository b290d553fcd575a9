//! LALR(1) reduction of the canonical automaton.

use crate::{
    dfa::{ItemCore, ItemSet, State, StateID, DFA},
    grammar::{Grammar, SymbolID},
    types::Map,
};
use indexmap::map::Entry;
use std::collections::BTreeSet;

/// Collapse the automaton by merging states that share their item cores,
/// unioning the lookaheads per core.
///
/// Groups are numbered by the first appearance of their core set, so the
/// initial state keeps its number. Transition targets of merged members
/// always agree after renumbering for automata produced by
/// [`DFA::generate`]; a disagreement is reported rather than silently
/// producing a broken automaton.
#[tracing::instrument(level = "debug", skip_all)]
pub fn merge(grammar: &Grammar, dfa: &DFA) -> Result<DFA, MergeError> {
    let mut groups: Map<BTreeSet<ItemCore>, Vec<StateID>> = Map::default();
    for (id, state) in dfa.states() {
        let cores = state.item_set.keys().copied().collect();
        groups.entry(cores).or_default().push(id);
    }

    let mut remap: Map<StateID, StateID> = Map::default();
    for (index, members) in groups.values().enumerate() {
        for &id in members {
            remap.insert(id, StateID::new(index as u64));
        }
    }

    let mut states: Map<StateID, State> = Map::default();
    for (index, members) in groups.values().enumerate() {
        let merged_id = StateID::new(index as u64);

        let mut item_set = ItemSet::new();
        let mut edges: Map<SymbolID, StateID> = Map::default();
        for &member in members {
            let state = dfa.state(member);

            for (core, lookaheads) in &state.item_set {
                item_set
                    .entry(*core)
                    .and_modify(|la| la.union_with(lookaheads))
                    .or_insert_with(|| lookaheads.clone());
            }

            for (symbol, target) in &state.edges {
                let mapped = remap[target];
                match edges.entry(*symbol) {
                    Entry::Occupied(entry) => {
                        if *entry.get() != mapped {
                            return Err(MergeError::InconsistentTransitions {
                                state: merged_id,
                                symbol: grammar.symbol_name(*symbol).to_owned(),
                                left: *entry.get(),
                                right: mapped,
                            });
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(mapped);
                    }
                }
            }
        }

        states.insert(merged_id, State { item_set, edges });
    }

    tracing::debug!(states = states.len(), "merged into LALR(1) automaton");
    Ok(DFA::from_parts(states))
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("state {} has conflicting transitions on `{}' ({} vs {})", state, symbol, left, right)]
    InconsistentTransitions {
        state: StateID,
        symbol: String,
        left: StateID,
        right: StateID,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::first_follow::FirstSets;
    use crate::grammar::TerminalIDSet;

    fn automata(source: &str) -> (Grammar, DFA, DFA) {
        let grammar = Grammar::from_str(source).unwrap();
        let first_sets = FirstSets::new(&grammar);
        let canonical = DFA::generate(&grammar, &first_sets);
        let merged = merge(&grammar, &canonical).unwrap();
        (grammar, canonical, merged)
    }

    fn lookahead_names(grammar: &Grammar, set: &TerminalIDSet) -> Vec<String> {
        let mut names: Vec<_> = set
            .iter()
            .map(|t| grammar.terminal(t).name().to_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn merging_shrinks_the_textbook_grammar() {
        // Canonical LR(1) needs ten states here, three pairs of which
        // differ only in lookaheads.
        let (_, canonical, merged) = automata("S -> C C\nC -> c C | d");
        assert_eq!(canonical.states().count(), 10);
        assert_eq!(merged.states().count(), 7);
    }

    #[test]
    fn initial_state_keeps_its_number() {
        let (_, canonical, merged) = automata("S -> C C\nC -> c C | d");

        let canonical_cores: Vec<_> = canonical
            .state(StateID::INITIAL)
            .item_set
            .keys()
            .copied()
            .collect();
        let merged_cores: Vec<_> = merged
            .state(StateID::INITIAL)
            .item_set
            .keys()
            .copied()
            .collect();
        assert_eq!(canonical_cores, merged_cores);
    }

    #[test]
    fn merged_lookaheads_are_unions() {
        let (grammar, _, merged) = automata("S -> C C\nC -> c C | d");

        let c_to_d = grammar
            .productions
            .values()
            .find(|p| p.display(&grammar).to_string() == "C -> d")
            .map(|p| p.id())
            .unwrap();

        // `C -> d •` occurs twice in the canonical automaton, once with
        // {c, d} and once with {$}; the merged state carries all three.
        let state = merged
            .states()
            .find(|(_, state)| {
                state.item_set.len() == 1
                    && state.item_set.contains_key(&ItemCore {
                        production: c_to_d,
                        dot: 1,
                    })
            })
            .map(|(_, state)| state)
            .unwrap();

        let lookaheads = &state.item_set[&ItemCore {
            production: c_to_d,
            dot: 1,
        }];
        assert_eq!(lookahead_names(&grammar, lookaheads), ["$", "c", "d"]);
    }

    #[test]
    fn merging_is_identity_without_shared_cores() {
        let (grammar, canonical, merged) = automata("S -> a");
        assert_eq!(canonical.states().count(), merged.states().count());
        assert_eq!(
            canonical.display(&grammar).to_string(),
            merged.display(&grammar).to_string()
        );
    }
}
