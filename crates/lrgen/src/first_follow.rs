//! Nullability and FIRST/FOLLOW set computation.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalIDSet},
    types::{Map, Set},
};

/// Nullability and FIRST sets for every grammar symbol, solved to a fixed
/// point over the production rules.
#[derive(Debug)]
pub struct FirstSets {
    nullables: Set<NonterminalID>,
    map: Map<SymbolID, TerminalIDSet>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let nullables = nullables_set(grammar);

        let mut map: Map<SymbolID, TerminalIDSet> = Map::default();
        for terminal in grammar.terminals.values() {
            let singleton = [terminal.id()].into_iter().collect();
            map.insert(SymbolID::T(terminal.id()), singleton);
        }
        for nonterminal in grammar.nonterminals.values() {
            map.insert(SymbolID::N(nonterminal.id()), TerminalIDSet::default());
        }

        // FIRST(A) accumulates FIRST of every right-hand side prefix whose
        // preceding symbols are all nullable.
        let mut changed = true;
        while changed {
            changed = false;
            for production in grammar.productions.values() {
                let mut addition = TerminalIDSet::default();
                for symbol in production.right() {
                    addition.union_with(&map[symbol]);
                    if !symbol_nullable(&nullables, *symbol) {
                        break;
                    }
                }

                let entry = &mut map[&SymbolID::N(production.left())];
                let before = entry.len();
                entry.union_with(&addition);
                if entry.len() != before {
                    changed = true;
                }
            }
        }

        Self { nullables, map }
    }

    pub fn is_nullable(&self, id: NonterminalID) -> bool {
        self.nullables.contains(&id)
    }

    pub fn first(&self, symbol: SymbolID) -> &TerminalIDSet {
        &self.map[&symbol]
    }

    /// FIRST of the sequence `symbols` followed by the terminals in `tail`.
    ///
    /// The tail participates only when every symbol in the sequence can
    /// derive the empty string.
    pub fn first_of(&self, symbols: &[SymbolID], tail: &TerminalIDSet) -> TerminalIDSet {
        let mut acc = TerminalIDSet::default();
        if self.extend_with_first(&mut acc, symbols) {
            acc.union_with(tail);
        }
        acc
    }

    // Returns true if the whole sequence is nullable.
    fn extend_with_first(&self, acc: &mut TerminalIDSet, symbols: &[SymbolID]) -> bool {
        for symbol in symbols {
            acc.union_with(&self.map[symbol]);
            match symbol {
                SymbolID::N(n) if self.is_nullable(*n) => continue,
                _ => return false,
            }
        }
        true
    }
}

fn nullables_set(grammar: &Grammar) -> Set<NonterminalID> {
    let mut nullables: Set<NonterminalID> = Set::default();
    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions.values() {
            if nullables.contains(&production.left()) {
                continue;
            }
            let all_nullable = production
                .right()
                .iter()
                .all(|s| symbol_nullable(&nullables, *s));
            if all_nullable {
                nullables.insert(production.left());
                changed = true;
            }
        }
    }
    nullables
}

fn symbol_nullable(nullables: &Set<NonterminalID>, symbol: SymbolID) -> bool {
    match symbol {
        SymbolID::N(n) => nullables.contains(&n),
        SymbolID::T(..) => false,
    }
}

/// FOLLOW sets for every nonterminal, derived from the FIRST sets.
#[derive(Debug)]
pub struct FollowSets {
    map: Map<NonterminalID, TerminalIDSet>,
}

impl FollowSets {
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let mut map: Map<NonterminalID, TerminalIDSet> = Map::default();
        for nonterminal in grammar.nonterminals.values() {
            map.insert(nonterminal.id(), TerminalIDSet::default());
        }
        map[&NonterminalID::START].insert(TerminalID::EOI);

        let mut changed = true;
        while changed {
            changed = false;
            for production in grammar.productions.values() {
                for (i, symbol) in production.right().iter().enumerate() {
                    let SymbolID::N(n) = *symbol else { continue };
                    let rest = &production.right()[i + 1..];

                    let mut addition = TerminalIDSet::default();
                    if first_sets.extend_with_first(&mut addition, rest) {
                        addition.union_with(&map[&production.left()]);
                    }

                    let entry = &mut map[&n];
                    let before = entry.len();
                    entry.union_with(&addition);
                    if entry.len() != before {
                        changed = true;
                    }
                }
            }
        }

        Self { map }
    }

    pub fn follow(&self, id: NonterminalID) -> &TerminalIDSet {
        &self.map[&id]
    }
}
