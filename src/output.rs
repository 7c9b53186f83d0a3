use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Result as IoResult, Write};
use std::rc::Rc;

#[derive(Debug, Default)]
struct Lines {
    complete: VecDeque<String>,
    // Text written without a trailing newline yet.
    pending: String,
}

/// Line queue command handlers print into.
///
/// The queue is shared: the interpreter hands one clone to handlers, the
/// embedding application keeps another and drains it on its own schedule
/// (e.g. once per rendered frame). Implements [`Write`] so handlers can use
/// `writeln!`.
#[derive(Debug, Clone, Default)]
pub struct OutputQueue {
    lines: Rc<RefCell<Lines>>,
}

impl OutputQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one complete line.
    pub fn push(&self, line: impl Into<String>) {
        self.lines.borrow_mut().complete.push_back(line.into());
    }

    /// Remove and return every complete line, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.lines.borrow_mut().complete.drain(..).collect()
    }

    /// Moves any unterminated text into the queue as its own line.
    pub fn flush_pending(&self) {
        let mut lines = self.lines.borrow_mut();
        if !lines.pending.is_empty() {
            let line = std::mem::take(&mut lines.pending);
            lines.complete.push_back(line);
        }
    }

    /// Number of complete lines waiting.
    pub fn len(&self) -> usize {
        self.lines.borrow().complete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for OutputQueue {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        let mut lines = self.lines.borrow_mut();
        lines.pending.push_str(&String::from_utf8_lossy(data));
        while let Some(end) = lines.pending.find('\n') {
            let line: String = lines.pending.drain(..=end).collect();
            lines.complete.push_back(line.trim_end_matches(['\n', '\r']).to_string());
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        self.flush_pending();
        Ok(())
    }
}
