//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{fmt, fs, io, path::Path};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved terminal that marks the end of input. Displayed as `$`.
    pub const EOI: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

/// A set of terminal IDs, backed by a bitset.
///
/// Lookahead sets and FIRST/FOLLOW sets are all of this type; iteration
/// yields IDs in ascending order, which keeps every derived structure
/// deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalIDSet {
    inner: bit_set::BitSet,
}

impl TerminalIDSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        // only ever populated from u16 IDs
        self.inner.iter().map(|raw| TerminalID::new(raw as u16))
    }
}

impl FromIterator<TerminalID> for TerminalIDSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// Reserved nonterminal for the augmented start symbol. Its name is
    /// synthesized from the user start symbol when the grammar is finished,
    /// e.g. `S'` for a grammar starting at `S`.
    pub const START: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// Reserved index of the augmented production `S' -> S`. A completed
    /// item of this production is the accept condition.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

/// A single production rule. The ID doubles as the production's stable
/// index in the augmented grammar and as the identity of reduce actions.
#[derive(Debug)]
pub struct Production {
    id: ProductionID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    pub fn left(&self) -> NonterminalID {
        self.left
    }

    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"E -> E + T"`, or `"A -> ε"` for an empty right-hand side.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} ->", g.nonterminals[&self.left()])?;
            if self.right().is_empty() {
                return write!(f, " ε");
            }
            for symbol in self.right() {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in self.productions.values() {
            writeln!(
                f,
                "{:>3}: {}",
                production.id().into_raw(),
                production.display(self)
            )?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::IO)?;
        Self::from_str(&source)
    }

    /// Parse a grammar from its textual form.
    ///
    /// One rule per line, `LHS -> RHS`, with `|`-separated alternatives and
    /// `ε`/`epsilon` (or an empty alternative) for the empty production.
    /// A symbol is a nonterminal iff its first character is uppercase.
    /// Blank lines and lines starting with `#` are skipped; the first rule's
    /// left-hand side is the start symbol.
    pub fn from_str(source: &str) -> Result<Grammar, GrammarError> {
        Grammar::define(|g| define_grammar_from_text(g, source))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_production_id: ProductionID::OFFSET,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: "$".to_owned(),
            },
        );

        // The name is filled in by `end` once the start symbol is known.
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: String::new(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn terminal(&self, id: TerminalID) -> &Terminal {
        &self.terminals[&id]
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    pub fn lookup_terminal(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name() == name)
            .map(|t| t.id())
    }
}

fn define_grammar_from_text(g: &mut GrammarDef, source: &str) -> Result<(), GrammarError> {
    let mut symbols: Map<String, SymbolID> = Map::default();
    let mut start_defined = false;

    for (lineno, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((left, right)) = line.split_once("->") else {
            return Err(GrammarError::MalformedRule {
                line: lineno + 1,
                text: line.to_owned(),
            });
        };

        let left = left.trim();
        if !is_nonterminal_name(left) {
            return Err(GrammarError::TerminalOnLeft {
                line: lineno + 1,
                symbol: left.to_owned(),
            });
        }

        let left_id = match intern_symbol(g, &mut symbols, left)? {
            SymbolID::N(n) => n,
            SymbolID::T(..) => unreachable!("uppercase symbols intern as nonterminals"),
        };

        if !start_defined {
            g.start_symbol(left_id)?;
            start_defined = true;
        }

        for alternative in right.split('|') {
            let alternative = alternative.trim();

            let right_symbols = if alternative.is_empty()
                || alternative == "ε"
                || alternative == "epsilon"
            {
                vec![]
            } else {
                let mut right_symbols = vec![];
                for name in alternative.split_whitespace() {
                    right_symbols.push(intern_symbol(g, &mut symbols, name)?);
                }
                right_symbols
            };

            g.rule(left_id, right_symbols)?;
        }
    }

    Ok(())
}

fn intern_symbol(
    g: &mut GrammarDef,
    symbols: &mut Map<String, SymbolID>,
    name: &str,
) -> Result<SymbolID, GrammarError> {
    if let Some(id) = symbols.get(name) {
        return Ok(*id);
    }
    let id = if is_nonterminal_name(name) {
        SymbolID::N(g.nonterminal(name)?)
    } else {
        SymbolID::T(g.terminal(name)?)
    };
    symbols.insert(name.to_owned(), id);
    Ok(id)
}

fn is_nonterminal_name(s: &str) -> bool {
    s.chars().next().map_or(false, char::is_uppercase)
}

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Map<ProductionID, Production>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_production_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        self.verify_fresh_name(name)?;

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id += 1;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        self.verify_fresh_name(name)?;

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Specify a production rule into this grammar.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if left == NonterminalID::START {
            return Err("the augmented start symbol cannot be a left-hand side".into());
        }

        let right_: Vec<_> = right.into_iter().collect();
        if right_.contains(&SymbolID::N(NonterminalID::START)) {
            return Err("the augmented start symbol cannot occur in a right-hand side".into());
        }
        if right_.contains(&SymbolID::T(TerminalID::EOI)) {
            return Err("the end marker cannot occur in a right-hand side".into());
        }

        for production in self.productions.values() {
            if production.left == left && production.right == right_ {
                return Err("duplicate production rule detected".into());
            }
        }

        let id = ProductionID::new(self.next_production_id);
        self.next_production_id += 1;
        self.productions.insert(
            id,
            Production {
                id,
                left,
                right: right_,
            },
        );

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarError> {
        self.start.replace(symbol);
        Ok(())
    }

    fn verify_fresh_name(&self, name: &str) -> Result<(), GrammarError> {
        if !verify_symbol_name(name) {
            return Err(format!("invalid symbol name: `{}'", name).into());
        }
        let taken = self.terminals.values().any(|t| t.name() == name)
            || self.nonterminals.values().any(|n| n.name() == name);
        if taken {
            return Err(format!("the symbol `{}' has already been declared", name).into());
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        if self.productions.is_empty() {
            return Err(GrammarError::Empty);
        }

        // Fall back to the first declared nonterminal when no start symbol
        // was specified explicitly.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarError::Empty)?,
        };

        let start_name = self.nonterminals[&start].name().to_owned();
        self.nonterminals[&NonterminalID::START].name = format!("{}'", start_name);

        self.productions.insert(
            ProductionID::ACCEPT,
            Production {
                id: ProductionID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            start_symbol: start,
        })
    }
}

// Symbol names share the line with the rule syntax, so anything that the
// rule splitter would eat is rejected up front.
fn verify_symbol_name(s: &str) -> bool {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    !matches!(s, "$" | "ε" | "epsilon" | "->" | "|")
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("malformed rule at line {}: missing `->' in `{}'", line, text)]
    MalformedRule { line: usize, text: String },

    #[error("line {}: left-hand side `{}' is not a nonterminal", line, symbol)]
    TerminalOnLeft { line: usize, symbol: String },

    #[error("empty grammar: no production rules defined")]
    Empty,

    #[error("grammar error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}
