//! The LR(1) item-set automaton.

use crate::{
    first_follow::FirstSets,
    grammar::{Grammar, ProductionID, SymbolID, TerminalID, TerminalIDSet},
    types::Map,
    util::display_fn,
};
use std::{
    collections::{btree_map, BTreeMap, BTreeSet, VecDeque},
    fmt,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u64,
}
impl StateID {
    /// The automaton's entry state. Always numbered zero.
    pub const INITIAL: Self = Self::new(0);

    #[inline]
    pub(crate) const fn new(raw: u64) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u64 {
        self.raw
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// An LR(1) item stripped of its lookaheads: a production and a position
/// of the dot within its right-hand side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemCore {
    pub production: ProductionID,
    pub dot: u16,
}

impl ItemCore {
    /// The symbol immediately after the dot, or `None` for a completed item.
    pub fn next_symbol(&self, grammar: &Grammar) -> Option<SymbolID> {
        grammar
            .production(self.production)
            .right()
            .get(usize::from(self.dot))
            .copied()
    }

    fn advance(&self) -> Self {
        Self {
            production: self.production,
            dot: self.dot + 1,
        }
    }

    // `"E -> E • + T, {+, $}"`
    pub fn display<'g>(
        &self,
        grammar: &'g Grammar,
        lookaheads: &'g TerminalIDSet,
    ) -> impl fmt::Display + 'g {
        let production = grammar.production(self.production);
        let dot = usize::from(self.dot);
        display_fn(move |f| {
            write!(f, "{} ->", grammar.nonterminal(production.left()))?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == dot {
                    f.write_str(" •")?;
                }
                write!(f, " {}", grammar.symbol_name(*symbol))?;
            }
            if dot == production.right().len() {
                f.write_str(" •")?;
            }

            let mut names: Vec<_> = lookaheads
                .iter()
                .map(|t| grammar.terminal(t).name())
                .collect();
            names.sort_unstable();

            f.write_str(", {")?;
            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
            }
            f.write_str("}")
        })
    }
}

/// The items of one state, grouped by core: each core maps to the set of
/// lookahead terminals attached to it.
///
/// A `BTreeMap` keeps iteration order and equality independent of how the
/// items were discovered, so two states are compared item for item,
/// lookaheads included.
pub type ItemSet = BTreeMap<ItemCore, TerminalIDSet>;

#[derive(Debug)]
#[non_exhaustive]
pub struct State {
    pub item_set: ItemSet,
    pub edges: Map<SymbolID, StateID>,
}

/// The item-set automaton derived from a grammar.
#[derive(Debug)]
pub struct DFA {
    states: Map<StateID, State>,
}

impl DFA {
    /// Generate the canonical LR(1) automaton.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn generate(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let generator = DFAGenerator {
            grammar,
            first_sets,
            item_sets: Map::default(),
            edges: Map::default(),
            pending: VecDeque::new(),
            same_cores: Map::default(),
            next_state_id: 0,
        };
        let dfa = generator.generate();
        tracing::debug!(states = dfa.states.len(), "generated LR(1) automaton");
        dfa
    }

    pub(crate) fn from_parts(states: Map<StateID, State>) -> Self {
        Self { states }
    }

    /// Iterate the states in discovery order, which is also ascending ID
    /// order.
    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[&id]
    }

    pub fn display<'g>(&'g self, grammar: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, state) in self.states() {
                writeln!(f, "- id: {}", id)?;
                writeln!(f, "  items:")?;
                for (core, lookaheads) in &state.item_set {
                    writeln!(f, "  - {}", core.display(grammar, lookaheads))?;
                }
                writeln!(f, "  edges:")?;
                for (symbol, next) in &state.edges {
                    writeln!(f, "  - {} => {}", grammar.symbol_name(*symbol), next)?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
struct DFAGenerator<'g> {
    grammar: &'g Grammar,
    first_sets: &'g FirstSets,
    item_sets: Map<StateID, ItemSet>,
    edges: Map<StateID, Map<SymbolID, StateID>>,
    pending: VecDeque<StateID>,
    same_cores: Map<BTreeSet<ItemCore>, Vec<StateID>>,
    next_state_id: u64,
}

impl DFAGenerator<'_> {
    fn generate(mut self) -> DFA {
        let mut initial = ItemSet::new();
        initial.insert(
            ItemCore {
                production: ProductionID::ACCEPT,
                dot: 0,
            },
            [TerminalID::EOI].into_iter().collect(),
        );
        self.expand_closure(&mut initial);
        self.intern(initial);

        while let Some(id) = self.pending.pop_front() {
            let targets = self.transition_targets(id);
            let mut edges = Map::default();
            for (symbol, mut item_set) in targets {
                self.expand_closure(&mut item_set);
                let next = self.intern(item_set);
                edges.insert(symbol, next);
            }
            self.edges.insert(id, edges);
        }

        let DFAGenerator {
            item_sets,
            mut edges,
            ..
        } = self;
        let mut states = Map::default();
        for (id, item_set) in item_sets {
            let edges = edges.swap_remove(&id).unwrap_or_default();
            states.insert(id, State { item_set, edges });
        }
        DFA::from_parts(states)
    }

    /// Return the ID of the state holding exactly this item set, enqueueing
    /// a fresh state if none exists yet. States that share their cores are
    /// bucketed so the full comparison only runs within a bucket.
    fn intern(&mut self, item_set: ItemSet) -> StateID {
        let cores: BTreeSet<ItemCore> = item_set.keys().copied().collect();
        if let Some(ids) = self.same_cores.get(&cores) {
            for &id in ids {
                if self.item_sets[&id] == item_set {
                    return id;
                }
            }
        }

        let id = StateID::new(self.next_state_id);
        self.next_state_id += 1;
        self.same_cores.entry(cores).or_default().push(id);
        self.item_sets.insert(id, item_set);
        self.pending.push_back(id);
        id
    }

    // Group the kernel items of successor states by transition symbol.
    fn transition_targets(&self, id: StateID) -> Map<SymbolID, ItemSet> {
        let mut targets: Map<SymbolID, ItemSet> = Map::default();
        for (core, lookaheads) in &self.item_sets[&id] {
            let Some(symbol) = core.next_symbol(self.grammar) else {
                continue;
            };
            targets
                .entry(symbol)
                .or_default()
                .insert(core.advance(), lookaheads.clone());
        }
        targets
    }

    /// Close the item set: for every item `A -> α • B β / L`, add an item
    /// `B -> • γ / FIRST(β L)` for each production `B -> γ`, until nothing
    /// changes. Nothing is added when `FIRST(β L)` turns out empty, which
    /// happens only for nonterminals without any production.
    fn expand_closure(&self, items: &mut ItemSet) {
        let mut changed = true;
        while changed {
            changed = false;

            let mut added = vec![];
            for (core, lookaheads) in items.iter() {
                let Some(SymbolID::N(n)) = core.next_symbol(self.grammar) else {
                    continue;
                };

                let production = self.grammar.production(core.production);
                let beta = &production.right()[usize::from(core.dot) + 1..];
                let first = self.first_sets.first_of(beta, lookaheads);
                if first.is_empty() {
                    continue;
                }

                for p in self.grammar.productions.values() {
                    if p.left() != n {
                        continue;
                    }
                    added.push((
                        ItemCore {
                            production: p.id(),
                            dot: 0,
                        },
                        first.clone(),
                    ));
                }
            }

            for (core, lookaheads) in added {
                match items.entry(core) {
                    btree_map::Entry::Occupied(mut entry) => {
                        let before = entry.get().len();
                        entry.get_mut().union_with(&lookaheads);
                        if entry.get().len() != before {
                            changed = true;
                        }
                    }
                    btree_map::Entry::Vacant(entry) => {
                        entry.insert(lookaheads);
                        changed = true;
                    }
                }
            }
        }
    }
}
