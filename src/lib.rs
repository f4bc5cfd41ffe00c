//! A small line-oriented command shell.
//!
//! Every input line is split into words, its `<` / `>` redirections are taken
//! out, and the remaining words either name a built-in (`help`, `exit`, `pwd`,
//! `cd`) that runs inside the shell, or an external program that is located on
//! the search path and run in a child process with the redirections applied.
//!
//! The main entry point is [`Interpreter`]; [`ShellContext`] and [`LineReader`]
//! provide the terminal setup and line input used by the interactive loop.

pub mod builtin;
pub mod command;
pub mod context;
pub mod exec;
pub mod input;
pub mod interpreter;
pub mod lexer;
pub mod redirect;
pub mod resolve;
#[cfg(test)]
mod test_support;

pub use builtin::{BuiltinContext, BuiltinDescriptor, Registry};
pub use command::{ExitCode, Outcome};
pub use context::{ShellConfig, ShellContext};
pub use input::LineReader;
pub use interpreter::Interpreter;
