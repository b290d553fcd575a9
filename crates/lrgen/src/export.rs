//! Presentation-ready views of the generated artifacts.
//!
//! Everything here is derived data: plain structs with resolved names and
//! stable orderings, suitable for rendering or serializing without access
//! to the originating [`Grammar`].

use crate::{
    dfa::{ItemCore, StateID, DFA},
    first_follow::{FirstSets, FollowSets},
    grammar::{
        Grammar, Nonterminal, NonterminalID, ProductionID, SymbolID, TerminalID, TerminalIDSet,
    },
    table::{Action, Conflict, ParseTable},
    Build,
};
use std::fmt;

/// The automaton as a node/edge list for graph rendering.
#[derive(Debug)]
#[non_exhaustive]
pub struct AutomatonGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct GraphNode {
    pub id: StateID,
    /// `"I0"`, `"I1"`, ...
    pub label: String,
    /// The state's items, formatted with their lookaheads.
    pub items: Vec<String>,
    pub is_initial: bool,
    /// Whether the state holds the completed accept item.
    pub is_final: bool,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct GraphEdge {
    pub from: StateID,
    pub to: StateID,
    pub symbol: String,
}

impl AutomatonGraph {
    pub fn new(grammar: &Grammar, dfa: &DFA) -> Self {
        let accept_item = ItemCore {
            production: ProductionID::ACCEPT,
            dot: grammar.production(ProductionID::ACCEPT).right().len() as u16,
        };

        let mut nodes = vec![];
        let mut edges = vec![];
        for (id, state) in dfa.states() {
            nodes.push(GraphNode {
                id,
                label: format!("I{}", id),
                items: state
                    .item_set
                    .iter()
                    .map(|(core, lookaheads)| core.display(grammar, lookaheads).to_string())
                    .collect(),
                is_initial: id == StateID::INITIAL,
                is_final: state.item_set.contains_key(&accept_item),
            });
            for (symbol, to) in &state.edges {
                edges.push(GraphEdge {
                    from: id,
                    to: *to,
                    symbol: grammar.symbol_name(*symbol).to_owned(),
                });
            }
        }

        Self { nodes, edges }
    }
}

/// The ACTION/GOTO table with name-sorted columns, one row per state.
#[derive(Debug)]
#[non_exhaustive]
pub struct TableView {
    /// ACTION column headers, end marker included.
    pub terminals: Vec<String>,
    /// GOTO column headers. The augmented start symbol is omitted since
    /// its column would stay empty.
    pub nonterminals: Vec<String>,
    pub rows: Vec<TableViewRow>,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct TableViewRow {
    pub state: StateID,
    /// Aligned with [`TableView::terminals`].
    pub actions: Vec<Option<Action>>,
    /// Aligned with [`TableView::nonterminals`].
    pub gotos: Vec<Option<StateID>>,
}

impl TableView {
    pub fn new(grammar: &Grammar, table: &ParseTable) -> Self {
        let mut terminals: Vec<(&str, TerminalID)> = grammar
            .terminals
            .values()
            .map(|t| (t.name(), t.id()))
            .collect();
        terminals.sort_unstable_by_key(|(name, _)| *name);

        let mut nonterminals: Vec<(&str, NonterminalID)> = grammar
            .nonterminals
            .values()
            .filter(|n| n.id() != NonterminalID::START)
            .map(|n| (n.name(), n.id()))
            .collect();
        nonterminals.sort_unstable_by_key(|(name, _)| *name);

        let rows = table
            .rows()
            .map(|(state, _)| TableViewRow {
                state,
                actions: terminals
                    .iter()
                    .map(|(_, id)| table.action(state, *id))
                    .collect(),
                gotos: nonterminals
                    .iter()
                    .map(|(_, id)| table.goto(state, *id))
                    .collect(),
            })
            .collect();

        Self {
            terminals: terminals.into_iter().map(|(name, _)| name.to_owned()).collect(),
            nonterminals: nonterminals
                .into_iter()
                .map(|(name, _)| name.to_owned())
                .collect(),
            rows,
        }
    }
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut grid: Vec<Vec<String>> = vec![];

        let mut headers = vec!["state".to_owned()];
        headers.extend(self.terminals.iter().cloned());
        headers.extend(self.nonterminals.iter().cloned());
        grid.push(headers);

        for row in &self.rows {
            let mut cells = vec![row.state.to_string()];
            cells.extend(
                row.actions
                    .iter()
                    .map(|action| action.map(|a| a.to_string()).unwrap_or_default()),
            );
            cells.extend(
                row.gotos
                    .iter()
                    .map(|goto| goto.map(|g| g.to_string()).unwrap_or_default()),
            );
            grid.push(cells);
        }

        let mut widths = vec![0usize; grid[0].len()];
        for row in &grid {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        for row in &grid {
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str("  ")?;
                }
                write!(f, "{:<width$}", cell, width = widths[i])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// FIRST and FOLLOW sets with resolved names, one row per nonterminal
/// declared in the grammar. The augmented start symbol is omitted.
#[derive(Debug)]
#[non_exhaustive]
pub struct SymbolSetsView {
    pub first: Vec<FirstSetRow>,
    pub follow: Vec<FollowSetRow>,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct FirstSetRow {
    pub symbol: String,
    pub terminals: Vec<String>,
    pub nullable: bool,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct FollowSetRow {
    pub symbol: String,
    pub terminals: Vec<String>,
}

impl SymbolSetsView {
    pub fn new(grammar: &Grammar, first_sets: &FirstSets, follow_sets: &FollowSets) -> Self {
        let mut declared: Vec<&Nonterminal> = grammar
            .nonterminals
            .values()
            .filter(|n| n.id() != NonterminalID::START)
            .collect();
        declared.sort_unstable_by_key(|n| n.name());

        let first = declared
            .iter()
            .map(|n| FirstSetRow {
                symbol: n.name().to_owned(),
                terminals: sorted_names(grammar, first_sets.first(SymbolID::N(n.id()))),
                nullable: first_sets.is_nullable(n.id()),
            })
            .collect();

        let follow = declared
            .iter()
            .map(|n| FollowSetRow {
                symbol: n.name().to_owned(),
                terminals: sorted_names(grammar, follow_sets.follow(n.id())),
            })
            .collect();

        Self { first, follow }
    }
}

impl fmt::Display for SymbolSetsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.first {
            let mut terminals = row.terminals.clone();
            if row.nullable {
                terminals.push("ε".to_owned());
            }
            writeln!(f, "FIRST({}) = {{{}}}", row.symbol, terminals.join(", "))?;
        }
        for row in &self.follow {
            writeln!(f, "FOLLOW({}) = {{{}}}", row.symbol, row.terminals.join(", "))?;
        }
        Ok(())
    }
}

fn sorted_names(grammar: &Grammar, set: &TerminalIDSet) -> Vec<String> {
    let mut names: Vec<_> = set
        .iter()
        .map(|t| grammar.terminal(t).name().to_owned())
        .collect();
    names.sort_unstable();
    names
}

/// One production with its stable index, as displayed in reduce actions.
#[derive(Debug)]
#[non_exhaustive]
pub struct ProductionView {
    pub index: u16,
    pub text: String,
}

impl ProductionView {
    /// All productions in index order, the augmented one first.
    pub fn list(grammar: &Grammar) -> Vec<Self> {
        grammar
            .productions
            .values()
            .map(|p| Self {
                index: p.id().into_raw(),
                text: p.display(grammar).to_string(),
            })
            .collect()
    }
}

/// Everything a frontend needs to present one build.
#[derive(Debug)]
#[non_exhaustive]
pub struct BuildSummary {
    pub productions: Vec<ProductionView>,
    pub symbol_sets: SymbolSetsView,
    pub graph: AutomatonGraph,
    pub table: TableView,
    pub conflicts: Vec<Conflict>,
}

impl BuildSummary {
    pub fn new(build: &Build) -> Self {
        Self {
            productions: ProductionView::list(&build.grammar),
            symbol_sets: SymbolSetsView::new(&build.grammar, &build.first_sets, &build.follow_sets),
            graph: AutomatonGraph::new(&build.grammar, &build.dfa),
            table: TableView::new(&build.grammar, &build.table),
            conflicts: build.table.conflicts().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ConflictResolution;

    fn artifacts(source: &str) -> (Grammar, FirstSets, FollowSets, DFA, ParseTable) {
        let grammar = Grammar::from_str(source).unwrap();
        let first_sets = FirstSets::new(&grammar);
        let follow_sets = FollowSets::new(&grammar, &first_sets);
        let dfa = DFA::generate(&grammar, &first_sets);
        let table = ParseTable::generate(&grammar, &dfa, ConflictResolution::Strict).unwrap();
        (grammar, first_sets, follow_sets, dfa, table)
    }

    #[test]
    fn graph_marks_initial_and_final_states() {
        let (grammar, _, _, dfa, _) = artifacts("S -> a");
        let graph = AutomatonGraph::new(&grammar, &dfa);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);

        let initial: Vec<_> = graph.nodes.iter().filter(|n| n.is_initial).collect();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].label, "I0");

        let finals: Vec<_> = graph.nodes.iter().filter(|n| n.is_final).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].items, ["S' -> S •, {$}"]);
    }

    #[test]
    fn table_view_columns_are_sorted_and_aligned() {
        let (grammar, _, _, _, table) = artifacts(
            "\
E -> E + T | T
T -> T * F | F
F -> ( E ) | id
",
        );
        let view = TableView::new(&grammar, &table);

        assert_eq!(view.terminals, ["$", "(", ")", "*", "+", "id"]);
        assert_eq!(view.nonterminals, ["E", "F", "T"]);
        for row in &view.rows {
            assert_eq!(row.actions.len(), view.terminals.len());
            assert_eq!(row.gotos.len(), view.nonterminals.len());
        }

        eprintln!("{}", view);
    }

    #[test]
    fn symbol_sets_view_skips_the_augmented_symbol() {
        let (grammar, first_sets, follow_sets, _, _) = artifacts(
            "\
S -> q * A * B * C
A -> a | b * b * D
B -> a | ε
C -> b | ε
D -> C | ε
",
        );
        let view = SymbolSetsView::new(&grammar, &first_sets, &follow_sets);

        let symbols: Vec<_> = view.first.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, ["A", "B", "C", "D", "S"]);

        let b = view.first.iter().find(|r| r.symbol == "B").unwrap();
        assert!(b.nullable);
        assert_eq!(b.terminals, ["a"]);

        eprintln!("{}", view);
    }

    #[test]
    fn production_list_starts_with_the_augmented_rule() {
        let (grammar, ..) = artifacts("S -> a b | c");
        let list = ProductionView::list(&grammar);

        assert_eq!(list.len(), 3);
        assert_eq!(list[0].index, 0);
        assert_eq!(list[0].text, "S' -> S");
        assert_eq!(list[1].text, "S -> a b");
        assert_eq!(list[2].text, "S -> c");
    }
}
