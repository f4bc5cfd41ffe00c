use anyhow::Context;
use argh::FromArgs;
use minishell::context::DEFAULT_MAX_LINE_LENGTH;
use minishell::{ExitCode, Interpreter, LineReader, ShellConfig, ShellContext};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `MINISHELL_LOG=debug`.
const LOG_ENV: &str = "MINISHELL_LOG";

#[derive(FromArgs)]
/// A small interactive command shell.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status.
    command: Option<String>,

    #[argh(option, default = "DEFAULT_MAX_LINE_LENGTH")]
    /// longest accepted input line in bytes; longer lines are skipped.
    max_line_length: usize,
}

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Args = argh::from_env();
    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("minishell: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let interpreter = Interpreter::default();
    if let Some(line) = args.command {
        return Ok(interpreter.run_line(&line).code());
    }

    let config = ShellConfig {
        max_line_length: args.max_line_length,
    };
    let context = ShellContext::init(config).context("cannot set up the terminal")?;
    let mut reader = LineReader::for_context(&context);
    Ok(interpreter.repl(&context, &mut reader))
}
