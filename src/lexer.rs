//! Lexical analysis of console input lines.
//!
//! A line is split into whitespace-separated words. A double-quoted span is kept
//! as part of one word with the quotes stripped, so `give "Red Potion" 5` yields
//! three tokens. A separate splitter cuts a line into chained command segments
//! on an unescaped separator character that is not inside quotes.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    // A word may be empty but still present, e.g. `""`.
    word_started: bool,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            word_started: false,
        }
    }

    /// Runs the state machine over the whole input.
    ///
    /// An unterminated quote is not an error: the quoted span simply runs to the
    /// end of the line.
    fn make_tokens(&mut self) -> Vec<String> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        self.finish_word(&mut out);
        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => {}
            '"' => {
                self.word_started = true;
                self.state = LexingState::ReadingDoubleQuote;
            }
            c => {
                self.word_started = true;
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            c if c.is_whitespace() => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '"' => self.state = LexingState::ReadingDoubleQuote,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn finish_word(&mut self, out: &mut Vec<String>) {
        if self.word_started {
            out.push(std::mem::take(&mut self.buffer));
            self.word_started = false;
        }
    }
}

/// Splits a line into word tokens.
///
/// Runs of whitespace separate tokens, double quotes group a phrase into a
/// single token and are removed. Empty input yields no tokens.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    LexingFSM::new(line).make_tokens()
}

/// Splits a line on every occurrence of `separator` that is neither inside
/// double quotes nor escaped with a backslash.
///
/// Quotes are preserved in the returned segments so each one can be tokenized
/// again later. An escaped separator outside quotes is emitted without its
/// backslash; quoted text is left untouched. Segments
/// are trimmed; empty ones are dropped unless `keep_empty` is set.
pub fn split_on_separator(line: &str, separator: char, keep_empty: bool) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if !in_quote && chars.peek() == Some(&separator) => {
                current.push(separator);
                chars.next();
            }
            '"' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            c if c == separator && !in_quote => {
                segments.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .map(|segment| segment.trim().to_string())
        .filter(|segment| keep_empty || !segment.is_empty())
        .collect()
}

/// Trims a line and collapses every internal whitespace run into one space.
pub fn simplify(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Joins tokens back into a line, quoting the ones that would not survive
/// another pass through [`split_into_tokens`] on their own.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|token| {
            let token = token.as_ref();
            if token.is_empty() || token.chars().any(char::is_whitespace) {
                format!("\"{}\"", token)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
