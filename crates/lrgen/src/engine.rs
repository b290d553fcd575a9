//! The table-driven shift-reduce recognizer.

use crate::{
    dfa::StateID,
    grammar::{Grammar, TerminalID},
    table::{Action, ParseTable},
    types::Map,
};
use std::fmt;

/// Default budget of recognition steps before a run is abandoned.
pub const DEFAULT_STEP_LIMIT: usize = 1000;

/// A recognizer for a fixed grammar and parse table.
#[derive(Debug)]
pub struct Engine<'g> {
    grammar: &'g Grammar,
    table: &'g ParseTable,
    terminal_ids: Map<&'g str, TerminalID>,
    step_limit: usize,
}

impl<'g> Engine<'g> {
    pub fn new(grammar: &'g Grammar, table: &'g ParseTable) -> Self {
        let terminal_ids = grammar
            .terminals
            .values()
            .map(|t| (t.name(), t.id()))
            .collect();
        Self {
            grammar,
            table,
            terminal_ids,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Override the step budget. Runs exceeding it fail with
    /// [`ParseFailure::StepLimit`].
    pub fn step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Recognize a whitespace-separated token string.
    pub fn parse_str(&self, input: &str) -> ParseOutcome {
        self.parse(input.split_whitespace())
    }

    /// Recognize a token sequence. The end marker is appended internally.
    pub fn parse<I, S>(&self, tokens: I) -> ParseOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        tokens.push("$".to_owned());
        self.run(tokens)
    }

    fn run(&self, tokens: Vec<String>) -> ParseOutcome {
        let mut stack = vec![StateID::INITIAL];
        let mut cursor = 0;
        let mut trace: Vec<TraceStep> = vec![];

        let failure = loop {
            if trace.len() >= self.step_limit {
                break Some(ParseFailure::StepLimit {
                    limit: self.step_limit,
                });
            }

            let state = top(&stack);
            let token = &tokens[cursor];

            let action = self
                .terminal_ids
                .get(token.as_str())
                .and_then(|&terminal| self.table.action(state, terminal));
            let Some(action) = action else {
                break Some(ParseFailure::UnexpectedSymbol {
                    symbol: token.clone(),
                    position: cursor,
                });
            };

            trace.push(TraceStep {
                stack: stack.clone(),
                cursor,
                action,
            });

            match action {
                Action::Shift(next) => {
                    stack.push(next);
                    cursor += 1;
                }
                Action::Reduce(production) => {
                    let production = self.grammar.production(production);
                    // the bottom state is never popped; an underflowing
                    // reduce surfaces below as a missing goto
                    let pop = production.right().len().min(stack.len() - 1);
                    stack.truncate(stack.len() - pop);

                    let uncovered = top(&stack);
                    match self.table.goto(uncovered, production.left()) {
                        Some(next) => stack.push(next),
                        None => {
                            break Some(ParseFailure::MissingGoto {
                                state: uncovered,
                                symbol: self.grammar.nonterminal(production.left()).name().to_owned(),
                            })
                        }
                    }
                }
                Action::Accept => break None,
            }
        };

        ParseOutcome {
            tokens,
            trace,
            failure,
        }
    }
}

fn top(stack: &[StateID]) -> StateID {
    match stack.last() {
        Some(&top) => top,
        None => unreachable!("the bottom state is never popped"),
    }
}

/// One executed step of a recognition run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct TraceStep {
    /// The state stack before the action, bottom first.
    pub stack: Vec<StateID>,
    /// Index of the current lookahead into [`ParseOutcome::tokens`].
    pub cursor: usize,
    pub action: Action,
}

/// Why a recognition run stopped without accepting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("unexpected symbol `{}' at position {}", symbol, position)]
    UnexpectedSymbol { symbol: String, position: usize },

    #[error("inconsistent table: no goto from state {} on `{}'", state, symbol)]
    MissingGoto { state: StateID, symbol: String },

    #[error("step limit of {} exceeded", limit)]
    StepLimit { limit: usize },
}

/// The result of a recognition run: the full trace plus the verdict. The
/// trace holds every executed step even when the run fails.
#[derive(Debug)]
#[non_exhaustive]
pub struct ParseOutcome {
    /// The recognized tokens, with the end marker appended.
    pub tokens: Vec<String>,
    pub trace: Vec<TraceStep>,
    pub failure: Option<ParseFailure>,
}

impl ParseOutcome {
    pub fn accepted(&self) -> bool {
        self.failure.is_none()
    }
}

impl fmt::Display for ParseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.trace {
            let stack = step
                .stack
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            let input = self.tokens[step.cursor..].join(" ");
            writeln!(f, "{:<24} | {:<24} | {}", stack, input, step.action)?;
        }
        match &self.failure {
            Some(failure) => writeln!(f, "=> {}", failure),
            None => writeln!(f, "=> accepted"),
        }
    }
}
