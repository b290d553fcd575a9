//! Grammar definitions for integration tests.

use lrgen::Grammar;

/// Unambiguous arithmetic expressions. LR(1) without conflicts.
pub const EXPRESSION: &str = "\
E -> E + T | T
T -> T * F | F
F -> ( E ) | id
";

pub fn expression() -> Grammar {
    Grammar::from_str(EXPRESSION).unwrap()
}

/// Balanced parentheses, deliberately ambiguous: `S S` can split a string
/// in several ways. Builds only when conflicts are resolved.
pub const PARENS: &str = "\
S -> ( S ) | S S | ε
";

pub fn parens() -> Grammar {
    Grammar::from_str(PARENS).unwrap()
}

/// A chain of nullable nonterminals feeding each other's FIRST/FOLLOW sets.
pub const NULLABLE_CHAIN: &str = "\
S -> q * A * B * C
A -> a | b * b * D
B -> a | ε
C -> b | ε
D -> C | ε
";

pub fn nullable_chain() -> Grammar {
    Grammar::from_str(NULLABLE_CHAIN).unwrap()
}

/// The smallest useful grammar. Three automaton states.
pub const SINGLE: &str = "S -> a\n";

pub fn single() -> Grammar {
    Grammar::from_str(SINGLE).unwrap()
}

/// The classic grammar whose canonical automaton has three same-core state
/// pairs, so the LALR(1) form is strictly smaller.
pub const TEXTBOOK: &str = "\
S -> C C
C -> c C | d
";

pub fn textbook() -> Grammar {
    Grammar::from_str(TEXTBOOK).unwrap()
}
