use crate::command::{ExitCode, Outcome};
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;

/// Streams and shell facts a built-in runs with.
///
/// Output goes to `stdout` (the terminal or a redirection target); diagnostics go
/// to `stderr`. The shell's own descriptors are never rewired for a built-in.
pub struct BuiltinContext<'a> {
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
    pub registry: &'a Registry,
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "pwd" or "cd".
    fn name() -> &'static str;

    /// One-line description shown by `help`.
    fn doc() -> &'static str;

    /// Executes the command.
    ///
    /// An `Err` is reported on the context's `stderr` as `name: error` and turns
    /// into status 1.
    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<Outcome>;
}

type BuiltinFn = fn(&[&str], &mut BuiltinContext<'_>) -> Outcome;

/// Entry of the built-in table.
#[derive(Clone, Copy)]
pub struct BuiltinDescriptor {
    name: &'static str,
    doc: &'static str,
    run: BuiltinFn,
}

impl BuiltinDescriptor {
    fn of<T: BuiltinCommand>() -> Self {
        Self {
            name: T::name(),
            doc: T::doc(),
            run: dispatch::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn doc(&self) -> &'static str {
        self.doc
    }

    /// Run the built-in with the words following its name.
    pub fn run(&self, args: &[&str], ctx: &mut BuiltinContext<'_>) -> Outcome {
        (self.run)(args, ctx)
    }
}

impl std::fmt::Debug for BuiltinDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinDescriptor")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish()
    }
}

fn dispatch<T: BuiltinCommand>(args: &[&str], ctx: &mut BuiltinContext<'_>) -> Outcome {
    let name = T::name();
    match T::from_args(&[name], args) {
        Ok(cmd) => match cmd.execute(ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = writeln!(ctx.stderr, "{name}: {e:#}");
                Outcome::Continue(1)
            }
        },
        Err(EarlyExit { output, status }) => {
            if status.is_err() {
                let _ = writeln!(ctx.stderr, "{}", output.trim_end());
                Outcome::Continue(1)
            } else {
                let _ = writeln!(ctx.stdout, "{}", output.trim_end());
                Outcome::Continue(0)
            }
        }
    }
}

/// The fixed table of built-ins, consulted before any external program.
///
/// Built once when the shell starts and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<BuiltinDescriptor>,
}

impl Default for Registry {
    /// The standard built-ins: `help`, `exit`, `pwd` and `cd`.
    fn default() -> Self {
        Self {
            entries: vec![
                BuiltinDescriptor::of::<Help>(),
                BuiltinDescriptor::of::<Exit>(),
                BuiltinDescriptor::of::<Pwd>(),
                BuiltinDescriptor::of::<Cd>(),
            ],
        }
    }
}

impl Registry {
    /// Index of the built-in called exactly `name`.
    ///
    /// An absent name (empty line) never matches.
    pub fn lookup(&self, name: Option<&str>) -> Option<usize> {
        let name = name?;
        self.entries.iter().position(|entry| entry.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&BuiltinDescriptor> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuiltinDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(FromArgs)]
/// List the built-in commands.
pub struct Help {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn doc() -> &'static str {
        "show this help menu"
    }

    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<Outcome> {
        for entry in ctx.registry.iter() {
            writeln!(ctx.stdout, "{} - {}", entry.name(), entry.doc())?;
        }
        Ok(Outcome::Continue(0))
    }
}

#[derive(FromArgs)]
/// Exit shell process
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0.
    pub _args: Vec<String>,
}

/// Status the shell terminates with on `exit`.
pub const EXIT_STATUS: ExitCode = 0;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn doc() -> &'static str {
        "exit the command shell"
    }

    fn execute(self, _ctx: &mut BuiltinContext<'_>) -> Result<Outcome> {
        Ok(Outcome::Exit(EXIT_STATUS))
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn doc() -> &'static str {
        "print current working directory"
    }

    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<Outcome> {
        let cwd = env::current_dir().context("cannot determine current directory")?;
        writeln!(ctx.stdout, "{}", cwd.display())?;
        Ok(Outcome::Continue(0))
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory.
    /// Operands after the first are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn doc() -> &'static str {
        "changes current working directory to the directory passed as an argument"
    }

    fn execute(self, _ctx: &mut BuiltinContext<'_>) -> Result<Outcome> {
        let target = self
            .args
            .into_iter()
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("missing directory operand"))?;
        env::set_current_dir(&target).with_context(|| format!("can't chdir to {target}"))?;
        Ok(Outcome::Continue(0))
    }
}
