use crate::builtin::{BuiltinContext, BuiltinDescriptor, Registry};
use crate::command::{ExitCode, Outcome, SimpleCommand};
use crate::context::ShellContext;
use crate::exec::{self, Launch};
use crate::input::LineReader;
use crate::lexer::{self, Token};
use std::fs::{File, OpenOptions, Permissions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use tracing::debug;

/// Status of a line that could not be tokenized.
pub const SYNTAX_ERROR: ExitCode = 2;

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// Each line is tokenized, stripped of its redirections and then either handed to
/// a built-in from the [`Registry`] or run as an external program in a child
/// process. Errors never escape a line: they are reported on standard error and
/// become that line's status.
///
/// Example
/// ```
/// use minishell::{Interpreter, Outcome};
/// let sh = Interpreter::default();
/// assert_eq!(sh.run_line("pwd"), Outcome::Continue(0));
/// assert_eq!(sh.run_line("exit"), Outcome::Exit(0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    registry: Registry,
}

impl Interpreter {
    /// Tokenize and run one input line.
    pub fn run_line(&self, line: &str) -> Outcome {
        match lexer::split_into_tokens(line) {
            Ok(tokens) => self.run_tokens(&tokens),
            Err(e) => {
                eprintln!("syntax error: {e}");
                Outcome::Continue(SYNTAX_ERROR)
            }
        }
    }

    /// Run one already tokenized line.
    pub fn run_tokens(&self, tokens: &[Token]) -> Outcome {
        if tokens.is_empty() {
            return Outcome::Continue(0);
        }
        let command = SimpleCommand::from_tokens(tokens);
        let Some(name) = command.name() else {
            eprintln!("syntax error: missing command name");
            return Outcome::Continue(SYNTAX_ERROR);
        };

        match self.registry.lookup(Some(name)).and_then(|i| self.registry.get(i)) {
            Some(builtin) => {
                debug!(command = name, "running built-in");
                run_builtin(builtin, &command, &self.registry)
            }
            None => {
                debug!(command = name, "running external command");
                run_external(&command)
            }
        }
    }

    /// Read and run lines until end of input or `exit`.
    ///
    /// Returns the status the shell should terminate with.
    pub fn repl(&self, ctx: &ShellContext, reader: &mut LineReader) -> ExitCode {
        let mut line_number: usize = 0;
        loop {
            let prompt = if ctx.is_interactive() {
                format!("{line_number}: ")
            } else {
                String::new()
            };

            match reader.read_line(&prompt) {
                Ok(Some(line)) => match self.run_line(&line) {
                    Outcome::Exit(code) => return code,
                    Outcome::Continue(status) => debug!(line_number, status, "line finished"),
                },
                Ok(None) => return 0,
                Err(e) if e.is_recoverable() => eprintln!("{e}"),
                Err(e) => {
                    eprintln!("{e}");
                    return 1;
                }
            }
            line_number += 1;
        }
    }
}

fn run_builtin(builtin: &BuiltinDescriptor, command: &SimpleCommand, registry: &Registry) -> Outcome {
    // Built-ins read nothing, but a bad input file still fails the command.
    if let Some(path) = command.input_target() {
        if let Err(e) = File::open(path) {
            eprintln!("cannot open input file {path}: {e}");
            return Outcome::Continue(exec::REDIRECT_FAILURE);
        }
    }
    let mut stdout: Box<dyn Write> = match command.output_target() {
        Some(path) => match open_output(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                eprintln!("cannot open output file {path}: {e}");
                return Outcome::Continue(exec::REDIRECT_FAILURE);
            }
        },
        None => Box::new(io::stdout()),
    };
    let mut stderr = io::stderr();

    let args: Vec<&str> = command.argv[1..].iter().map(String::as_str).collect();
    let outcome = builtin.run(
        &args,
        &mut BuiltinContext {
            stdout: &mut stdout,
            stderr: &mut stderr,
            registry,
        },
    );
    if let Err(e) = stdout.flush() {
        eprintln!("{}: {e}", builtin.name());
    }
    outcome
}

fn run_external(command: &SimpleCommand) -> Outcome {
    match Launch::from_command(command).and_then(|launch| exec::execute(&launch)) {
        Ok(code) => Outcome::Continue(code),
        Err(e) => {
            eprintln!("{}: {e}", command.name().unwrap_or_default());
            Outcome::Continue(1)
        }
    }
}

/// Open a built-in's output target: truncated if it exists, created with
/// owner/group read-write permissions otherwise.
fn open_output(path: &str) -> io::Result<File> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => {
            file.set_permissions(Permissions::from_mode(0o660))?;
            Ok(file)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            OpenOptions::new().write(true).truncate(true).open(path)
        }
        Err(e) => Err(e),
    }
}
