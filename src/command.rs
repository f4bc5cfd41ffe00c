//! Types shared by every stage of running one command line.

use crate::lexer::Token;
use crate::redirect::{RedirectSpec, Redirections};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// What running one line asks of the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Carry on with the next line; the value is the line's status.
    Continue(ExitCode),
    /// Terminate the whole shell with the given status.
    Exit(ExitCode),
}

impl Outcome {
    /// The status carried by either variant.
    pub fn code(self) -> ExitCode {
        match self {
            Outcome::Continue(code) | Outcome::Exit(code) => code,
        }
    }
}

/// A command line with its redirections separated from its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    /// Command name followed by its arguments, redirections removed.
    pub argv: Vec<String>,
    pub input: Option<RedirectSpec>,
    pub output: Option<RedirectSpec>,
}

impl SimpleCommand {
    /// Split a token sequence into argument vector and redirections.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let Redirections {
            input,
            output,
            argv,
        } = Redirections::parse(tokens);
        Self {
            argv,
            input,
            output,
        }
    }

    /// The command name, if the line names one.
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn input_target(&self) -> Option<&str> {
        self.input.as_ref().map(|spec| spec.target.as_str())
    }

    pub fn output_target(&self) -> Option<&str> {
        self.output.as_ref().map(|spec| spec.target.as_str())
    }
}
