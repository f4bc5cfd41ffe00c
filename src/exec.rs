//! Running an external program as a child process.
//!
//! [`execute`] forks, sets up the child's standard streams from the command's
//! redirections, replaces the child's program image and waits for it. The
//! shell's own descriptors are never touched: every `dup2` happens in the child.

use crate::command::{ExitCode, SimpleCommand};
use crate::resolve::SearchPlan;
use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::libc;
use nix::sys::stat::{Mode, umask};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, close, dup2, execv, fork};
use std::convert::Infallible;
use std::ffi::{CStr, CString, NulError};
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, RawFd};
use thiserror::Error;
use tracing::{debug, trace};

/// Status of a child whose redirection could not be set up.
pub const REDIRECT_FAILURE: ExitCode = 1;
/// Status of a child whose program could not be executed.
pub const EXEC_FAILURE: ExitCode = 126;
/// Status of a child whose program could not be found.
pub const NOT_FOUND: ExitCode = 127;

/// Failures seen by the shell itself while launching a command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("missing command name")]
    MissingCommand,
    #[error("argument contains a NUL byte")]
    Nul(#[from] NulError),
    #[error("cannot set up diagnostics for child: {0}")]
    Diagnostics(#[source] io::Error),
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),
    #[error("wait failed: {0}")]
    Wait(#[source] Errno),
}

/// Everything a child needs, prepared before the fork.
#[derive(Debug, Clone)]
pub struct Launch {
    argv: Vec<CString>,
    plan: SearchPlan,
    input: Option<CString>,
    output: Option<CString>,
}

impl Launch {
    pub fn new(
        argv: &[String],
        input: Option<&str>,
        output: Option<&str>,
        plan: SearchPlan,
    ) -> Result<Self, ExecError> {
        if argv.is_empty() {
            return Err(ExecError::MissingCommand);
        }
        let argv = argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            argv,
            plan,
            input: input.map(CString::new).transpose()?,
            output: output.map(CString::new).transpose()?,
        })
    }

    /// Launch for `command`, resolved against the current search path.
    pub fn from_command(command: &SimpleCommand) -> Result<Self, ExecError> {
        let name = command.name().ok_or(ExecError::MissingCommand)?;
        let plan = SearchPlan::from_env(name.as_ref())?;
        Self::new(
            &command.argv,
            command.input_target(),
            command.output_target(),
            plan,
        )
    }

    fn name(&self) -> &CStr {
        &self.argv[0]
    }
}

/// Why a child gave up before its program image was replaced.
#[derive(Debug, Error)]
enum ChildError<'a> {
    #[error("cannot open input file {}: {errno}", .path.to_string_lossy())]
    OpenInput { path: &'a CStr, errno: Errno },
    #[error("{}: the file doesn't exist", .name.to_string_lossy())]
    NotFound { name: &'a CStr },
    #[error("cannot open output file {}: {errno}", .path.to_string_lossy())]
    OpenOutput { path: &'a CStr, errno: Errno },
    #[error("cannot redirect standard stream: {0}")]
    Redirect(Errno),
    #[error("{}: cannot execute: {errno}", .path.to_string_lossy())]
    Exec { path: &'a CStr, errno: Errno },
}

impl ChildError<'_> {
    fn exit_code(&self) -> ExitCode {
        match self {
            ChildError::NotFound { .. } => NOT_FOUND,
            ChildError::Exec { .. } => EXEC_FAILURE,
            ChildError::OpenInput { .. }
            | ChildError::OpenOutput { .. }
            | ChildError::Redirect(_) => REDIRECT_FAILURE,
        }
    }
}

/// Run `launch` in a child process and wait for it.
///
/// Returns the child's exit code, or `128 + signal` if it was killed by a signal.
/// Problems inside the child (missing program, unopenable redirection) are
/// reported by the child on standard error and show up as its exit code; only
/// failures of the shell itself are returned as errors.
pub fn execute(launch: &Launch) -> Result<ExitCode, ExecError> {
    let diagnostics = io::stderr()
        .as_fd()
        .try_clone_to_owned()
        .map(File::from)
        .map_err(ExecError::Diagnostics)?;
    // Buffered output would otherwise be duplicated into the child.
    let _ = io::stdout().flush();

    debug!(command = ?launch.name(), "forking");
    // SAFETY: the child only makes system calls and writes to an unlocked file
    // before it either replaces its image or exits with `_exit`.
    match unsafe { fork() }.map_err(ExecError::Fork)? {
        ForkResult::Parent { child } => wait_for(child),
        ForkResult::Child => {
            let code = match run_child(launch) {
                Ok(never) => match never {},
                Err(err) => {
                    let mut out = &diagnostics;
                    let _ = writeln!(out, "{err}");
                    err.exit_code()
                }
            };
            // SAFETY: leaves the forked child without running the parent's exit handlers.
            unsafe { libc::_exit(code) }
        }
    }
}

/// The child's side of [`execute`]. Only returns on failure.
fn run_child(launch: &Launch) -> Result<Infallible, ChildError<'_>> {
    if let Some(path) = launch.input.as_deref() {
        let fd = open(path, OFlag::O_RDONLY, Mode::empty())
            .map_err(|errno| ChildError::OpenInput { path, errno })?;
        replace_descriptor(fd, libc::STDIN_FILENO)?;
    }

    let program = launch
        .plan
        .first_match()
        .ok_or(ChildError::NotFound { name: launch.name() })?;

    if let Some(path) = launch.output.as_deref() {
        // New files get exactly owner/group read-write, whatever the umask.
        let previous = umask(Mode::empty());
        let opened = open(
            path,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP,
        );
        umask(previous);
        let fd = opened.map_err(|errno| ChildError::OpenOutput { path, errno })?;
        replace_descriptor(fd, libc::STDOUT_FILENO)?;
    }

    execv(program, &launch.argv).map_err(|errno| ChildError::Exec {
        path: program,
        errno,
    })
}

fn replace_descriptor<'a>(fd: RawFd, target: RawFd) -> Result<(), ChildError<'a>> {
    if fd != target {
        dup2(fd, target).map_err(ChildError::Redirect)?;
        close(fd).map_err(ChildError::Redirect)?;
    }
    Ok(())
}

fn wait_for(child: Pid) -> Result<ExitCode, ExecError> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                debug!(%child, code, "child exited");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!(%child, ?signal, "child killed by signal");
                return Ok(128 + signal as ExitCode);
            }
            Ok(status) => trace!(?status, "child still running"),
            Err(Errno::EINTR) => {}
            Err(errno) => return Err(ExecError::Wait(errno)),
        }
    }
}
