//! Where the read loop gets its lines from.

use crate::context::ShellContext;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReadError {
    /// The line was consumed but is longer than allowed; reading can go on.
    #[error("input line too long ({length} bytes, limit is {limit})")]
    LineTooLong { length: usize, limit: usize },
    /// The line is not valid UTF-8; it is skipped rather than altered.
    #[error("input line is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidUtf8 { offset: usize },
    #[error("cannot read input: {0}")]
    Io(#[from] io::Error),
    #[error("line editor failed: {0}")]
    Editor(#[from] ReadlineError),
}

impl ReadError {
    /// Whether the offending line was consumed and the next one can be read.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReadError::LineTooLong { .. } | ReadError::InvalidUtf8 { .. }
        )
    }
}

enum Source {
    Editor(DefaultEditor),
    Stream(Box<dyn BufRead>),
}

/// Reads one line at a time, rejecting lines over a length limit.
pub struct LineReader {
    source: Source,
    max_line_length: usize,
}

impl LineReader {
    /// Line editor with history for a terminal session.
    pub fn editor(max_line_length: usize) -> Result<Self, ReadError> {
        Ok(Self {
            source: Source::Editor(DefaultEditor::new()?),
            max_line_length,
        })
    }

    /// Plain reader over any buffered input.
    pub fn stream(reader: impl BufRead + 'static, max_line_length: usize) -> Self {
        Self {
            source: Source::Stream(Box::new(reader)),
            max_line_length,
        }
    }

    /// The editor for interactive sessions, standard input otherwise.
    pub fn for_context(ctx: &ShellContext) -> Self {
        let limit = ctx.config().max_line_length;
        if ctx.is_interactive() {
            match Self::editor(limit) {
                Ok(reader) => return reader,
                Err(e) => warn!(error = %e, "line editor unavailable, reading plain input"),
            }
        }
        Self::stream(io::stdin().lock(), limit)
    }

    /// Next line without its terminator, or `None` at end of input.
    ///
    /// `prompt` is shown before reading when it is not empty.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReadError> {
        let line = match &mut self.source {
            Source::Editor(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        editor.add_history_entry(line.as_str())?;
                    }
                    line
                }
                Err(ReadlineError::Eof) => return Ok(None),
                // Ctrl-C drops the line being typed.
                Err(ReadlineError::Interrupted) => String::new(),
                Err(e) => return Err(e.into()),
            },
            Source::Stream(reader) => {
                if !prompt.is_empty() {
                    let mut stdout = io::stdout();
                    write!(stdout, "{prompt}")?;
                    stdout.flush()?;
                }
                let mut buf = Vec::new();
                if reader.read_until(b'\n', &mut buf)? == 0 {
                    return Ok(None);
                }
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                String::from_utf8(buf).map_err(|e| ReadError::InvalidUtf8 {
                    offset: e.utf8_error().valid_up_to(),
                })?
            }
        };

        if line.len() > self.max_line_length {
            return Err(ReadError::LineTooLong {
                length: line.len(),
                limit: self.max_line_length,
            });
        }
        Ok(Some(line))
    }
}
