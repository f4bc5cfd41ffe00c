//! Shell-wide state established once at startup.

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::sys::termios::{SetArg, Termios, tcgetattr, tcsetattr};
use nix::unistd::{getpgrp, getpid, tcgetpgrp, tcsetpgrp};
use std::io::{self, IsTerminal};
use thiserror::Error;
use tracing::{debug, warn};

/// Longest input line accepted by default, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// User-tunable settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Lines longer than this are rejected and skipped.
    pub max_line_length: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("cannot query terminal foreground group: {0}")]
    ForegroundGroup(#[source] Errno),
    #[error("cannot wait for the terminal: {0}")]
    Suspend(#[source] Errno),
    #[error("cannot read terminal modes: {0}")]
    Modes(#[source] Errno),
}

/// Facts about the running shell, read-only once constructed.
///
/// For an interactive session the shell waits until it is in the terminal's
/// foreground, takes control of the terminal and saves its modes; they are
/// restored when the context is dropped.
pub struct ShellContext {
    config: ShellConfig,
    interactive: bool,
    saved_modes: Option<Termios>,
}

impl ShellContext {
    pub fn init(config: ShellConfig) -> Result<Self, ContextError> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Ok(Self::detached(config));
        }

        // Stop ourselves until the job-control shell that started us moves us
        // to the foreground; we get SIGCONT then.
        loop {
            let group = getpgrp();
            if tcgetpgrp(&stdin).map_err(ContextError::ForegroundGroup)? == group {
                break;
            }
            debug!(%group, "not in the foreground, stopping");
            killpg(group, Signal::SIGTTIN).map_err(ContextError::Suspend)?;
        }

        let pgid = getpid();
        match tcsetpgrp(&stdin, pgid) {
            Ok(()) => debug!(%pgid, "took control of the terminal"),
            Err(errno) => warn!(%errno, "cannot take control of the terminal"),
        }
        let saved_modes = tcgetattr(&stdin).map_err(ContextError::Modes)?;

        Ok(Self {
            config,
            interactive: true,
            saved_modes: Some(saved_modes),
        })
    }

    /// Context of a session whose input is not a terminal.
    pub fn detached(config: ShellConfig) -> Self {
        Self {
            config,
            interactive: false,
            saved_modes: None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }
}

impl Drop for ShellContext {
    fn drop(&mut self) {
        if let Some(modes) = &self.saved_modes {
            if let Err(errno) = tcsetattr(io::stdin(), SetArg::TCSADRAIN, modes) {
                debug!(%errno, "cannot restore terminal modes");
            }
        }
    }
}
