//! Lexical analysis (tokenization) of a single input line.
//!
//! A line is split on unquoted blanks into words. Single and double quotes group
//! characters into one word, a backslash outside single quotes escapes the next
//! character, and unquoted `<` / `>` always form a token of their own so that
//! `cat<in.txt` and `cat < in.txt` tokenize the same way. A quoted or escaped
//! `<` / `>` stays an ordinary word.

use thiserror::Error;

/// A lexical unit of the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word with its quoting already removed.
    Word(String),
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// Output redirection symbol, `>`.
    RedirectRight,
}

impl Token {
    /// Shorthand for building a word token.
    pub fn word(text: impl Into<String>) -> Self {
        Token::Word(text.into())
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated quote")]
    UnfinishedQuote,
    /// The line ended right after a backslash.
    #[error("dangling escape at end of line")]
    DanglingEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    /// Set once the current word has started, so that `""` yields an empty word.
    in_word: bool,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            in_word: false,
        }
    }

    /// Runs the machine over the whole input and returns the words in order.
    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start | LexingState::ReadingWord => self.handle_word(ch, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                return Err(LexingError::UnfinishedQuote);
            }
            _ => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) -> Result<(), LexingError> {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '<' | '>' => {
                self.finish_word(out);
                out.push(if ch == '<' {
                    Token::RedirectLeft
                } else {
                    Token::RedirectRight
                });
                self.state = LexingState::Start;
            }
            '\'' => self.begin(LexingState::ReadingSingleQuote),
            '"' => self.begin(LexingState::ReadingDoubleQuote),
            '\\' => {
                let escaped = self.read_char().ok_or(LexingError::DanglingEscape)?;
                self.buffer.push(escaped);
                self.begin(LexingState::ReadingWord);
            }
            c => {
                self.buffer.push(c);
                self.begin(LexingState::ReadingWord);
            }
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.read_char() {
                Some(c @ ('"' | '\\' | '$' | '`')) => self.buffer.push(c),
                Some(c) => {
                    self.buffer.push('\\');
                    self.buffer.push(c);
                }
                None => return Err(LexingError::UnfinishedQuote),
            },
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn begin(&mut self, state: LexingState) {
        self.in_word = true;
        self.state = state;
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if self.in_word {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
            self.in_word = false;
        }
    }
}

/// Split one input line into its ordered sequence of tokens.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).make_tokens()
}
