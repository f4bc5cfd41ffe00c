//! Recognition of `<` / `>` redirections in a token sequence.

use crate::lexer::Token;
use std::ops::Range;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    /// The direction an operator token stands for; `None` for words.
    pub fn of(token: &Token) -> Option<Self> {
        match token {
            Token::RedirectLeft => Some(Direction::Input),
            Token::RedirectRight => Some(Direction::Output),
            Token::Word(_) => None,
        }
    }

    /// How the operator is written on the command line.
    pub fn operator(self) -> &'static str {
        match self {
            Direction::Input => "<",
            Direction::Output => ">",
        }
    }
}

/// One redirection found on a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSpec {
    pub direction: Direction,
    /// Path of the file to open.
    pub target: String,
    /// Token indices (operator and filename) excluded from the argument vector.
    pub strip: Range<usize>,
}

/// Index of the filename following the first `<`, if there is one.
pub fn find_input_index(tokens: &[Token]) -> Option<usize> {
    find_target_index(tokens, Direction::Input)
}

/// Index of the filename following the first `>`, if there is one.
pub fn find_output_index(tokens: &[Token]) -> Option<usize> {
    find_target_index(tokens, Direction::Output)
}

/// Operators may appear anywhere, so the whole sequence is scanned. Only operator
/// tokens count; a quoted `>` is a word. An operator in last position, or one
/// followed by another operator, has no filename and is not a redirection.
fn find_target_index(tokens: &[Token], direction: Direction) -> Option<usize> {
    let at = tokens
        .iter()
        .position(|token| Direction::of(token) == Some(direction))?;
    let target = at + 1;
    tokens.get(target)?.as_word().map(|_| target)
}

/// Redirections of one command plus the argument vector left once they are removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirections {
    pub input: Option<RedirectSpec>,
    pub output: Option<RedirectSpec>,
    pub argv: Vec<String>,
}

impl Redirections {
    /// Extract at most one input and one output redirection from `tokens`.
    ///
    /// The first occurrence of each operator wins. Every operator token and the
    /// filename after it are left out of `argv`, including repeated operators and
    /// an operator that has no filename.
    pub fn parse(tokens: &[Token]) -> Self {
        let input = find_input_index(tokens).map(|at| spec(tokens, Direction::Input, at));
        let output = find_output_index(tokens).map(|at| spec(tokens, Direction::Output, at));

        let mut argv = Vec::new();
        let mut iter = tokens.iter().peekable();
        while let Some(token) = iter.next() {
            match Direction::of(token) {
                None => argv.extend(token.as_word().map(str::to_owned)),
                Some(direction) => {
                    if iter.next_if(|next| next.as_word().is_some()).is_none() {
                        warn!(
                            operator = direction.operator(),
                            "redirection without a filename ignored"
                        );
                    }
                }
            }
        }

        debug!(?input, ?output, ?argv, "parsed redirections");
        Self {
            input,
            output,
            argv,
        }
    }
}

fn spec(tokens: &[Token], direction: Direction, target: usize) -> RedirectSpec {
    RedirectSpec {
        direction,
        target: tokens[target].as_word().unwrap_or_default().to_owned(),
        strip: target - 1..target + 1,
    }
}
