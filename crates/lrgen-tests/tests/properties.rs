//! Structural invariants cross-checked between the automaton and the table.

use lrgen::{
    build, build_with_config,
    dfa::StateID,
    grammar::{ProductionID, SymbolID, TerminalID},
    Action, Build, Config, ConflictResolution,
};
use lrgen_tests::grammars;

fn checked_builds() -> Vec<Build> {
    vec![
        build(grammars::expression()).unwrap(),
        build(grammars::nullable_chain()).unwrap(),
        build(grammars::single()).unwrap(),
        build(grammars::textbook()).unwrap(),
        build_with_config(grammars::expression(), Config::new().use_lalr()).unwrap(),
        build_with_config(grammars::textbook(), Config::new().use_lalr()).unwrap(),
        build_with_config(
            grammars::parens(),
            Config::new()
                .use_lalr()
                .conflict_resolution(ConflictResolution::PreferShift),
        )
        .unwrap(),
    ]
}

#[test]
fn every_state_is_reachable() {
    for build in checked_builds() {
        let mut visited = vec![StateID::INITIAL];
        let mut queue = vec![StateID::INITIAL];
        while let Some(id) = queue.pop() {
            for next in build.dfa.state(id).edges.values() {
                if !visited.contains(next) {
                    visited.push(*next);
                    queue.push(*next);
                }
            }
        }
        assert_eq!(visited.len(), build.dfa.states().count());
    }
}

#[test]
fn table_cells_mirror_the_edges() {
    // Shift preference and strictness both guarantee that an outgoing edge
    // survives as its table cell.
    for build in checked_builds() {
        for (id, state) in build.dfa.states() {
            let row = build.table.row(id);
            for (symbol, target) in &state.edges {
                match symbol {
                    SymbolID::T(t) => {
                        assert_eq!(row.actions.get(t).copied(), Some(Action::Shift(*target)));
                    }
                    SymbolID::N(n) => {
                        assert_eq!(row.gotos.get(n), Some(target));
                    }
                }
            }
        }
    }
}

#[test]
fn reduce_actions_reference_declared_productions() {
    for build in checked_builds() {
        for (_, row) in build.table.rows() {
            for action in row.actions.values() {
                if let Action::Reduce(p) = action {
                    assert_ne!(*p, ProductionID::ACCEPT);
                    // the lookup itself panics on a dangling ID
                    let _ = build.grammar.production(*p);
                }
            }
        }
    }
}

#[test]
fn exactly_one_accepting_cell() {
    for build in checked_builds() {
        let accepts: Vec<_> = build
            .table
            .rows()
            .flat_map(|(_, row)| row.actions.iter())
            .filter(|(_, action)| matches!(action, Action::Accept))
            .map(|(terminal, _)| *terminal)
            .collect();
        assert_eq!(accepts, [TerminalID::EOI]);
    }
}

#[test]
fn end_marker_follows_the_start_symbol() {
    for build in checked_builds() {
        assert!(build
            .follow_sets
            .follow(build.grammar.start_symbol)
            .contains(TerminalID::EOI));
    }
}

#[test]
fn builds_are_reproducible() {
    let first = build(grammars::expression()).unwrap();
    let second = build(grammars::expression()).unwrap();

    assert_eq!(
        first.dfa.display(&first.grammar).to_string(),
        second.dfa.display(&second.grammar).to_string()
    );
    assert_eq!(
        first.table.display(&first.grammar).to_string(),
        second.table.display(&second.grammar).to_string()
    );
}
