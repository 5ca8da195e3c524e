//! Test double for the process runner

use devsync_core::process::{CommandRunner, Exit, Invocation, ProcessError};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Records every invocation and replays scripted exits.
///
/// Calls beyond the scripted exits succeed.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Invocation>>,
    exits: RefCell<VecDeque<Exit>>,
    output: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exits(self, exits: impl IntoIterator<Item = Exit>) -> Self {
        self.exits.borrow_mut().extend(exits);
        self
    }

    /// Lines produced by every streamed command
    pub fn with_output<S: Into<String>>(mut self, lines: impl IntoIterator<Item = S>) -> Self {
        self.output = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    fn next_exit(&self, invocation: &Invocation) -> Exit {
        self.calls.borrow_mut().push(invocation.clone());
        self.exits.borrow_mut().pop_front().unwrap_or(Exit::Success)
    }
}

impl CommandRunner for RecordingRunner {
    fn status(&self, invocation: &Invocation) -> Result<Exit, ProcessError> {
        Ok(self.next_exit(invocation))
    }

    fn stream_lines(
        &self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Exit, ProcessError> {
        for line in &self.output {
            on_line(line);
        }
        Ok(self.next_exit(invocation))
    }
}
