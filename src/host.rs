//! # Host capabilities
//!
//! Everything the guest program can observe outside memory and the value
//! stack goes through [`Host`]: Glk I/O dispatch, undo, and text output.
//! The interpreter never formats or buffers output itself.

use crate::Result;
use std::cell::RefCell;
use std::rc::Rc;

/// Services provided by the embedding application
pub trait Host {
    /// Glk dispatch: `selector` names the Glk function, `args` are its arguments
    fn glk(&mut self, selector: u32, args: &[u32]) -> Result<u32>;

    /// Restores the most recent undo state
    fn restore_undo(&mut self) -> Result<()>;

    /// Prints one character (Unicode code point)
    fn stream_char(&mut self, ch: u32);

    /// Prints a signed decimal number
    fn stream_number(&mut self, value: i32);

    /// Prints a decoded string
    fn stream_string(&mut self, text: &str);
}

/// Host that discards all output; every Glk call returns 0
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn glk(&mut self, _selector: u32, _args: &[u32]) -> Result<u32> {
        Ok(0)
    }

    fn restore_undo(&mut self) -> Result<()> {
        Ok(())
    }

    fn stream_char(&mut self, _ch: u32) {}

    fn stream_number(&mut self, _value: i32) {}

    fn stream_string(&mut self, _text: &str) {}
}

/// Everything a [`RecordingHost`] has seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostLog {
    /// Concatenated text output
    pub output: String,
    /// Glk calls as (selector, arguments)
    pub glk_calls: Vec<(u32, Vec<u32>)>,
    /// Number of undo restores requested
    pub undo_requests: usize,
}

/// Host that records output and Glk calls.
///
/// Clones share one log, so keep a clone to inspect it after handing the
/// host to a machine.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    log: Rc<RefCell<HostLog>>,
    glk_result: u32,
}

impl RecordingHost {
    /// Creates a host whose Glk calls return 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value returned from every Glk call
    pub fn with_glk_result(mut self, value: u32) -> Self {
        self.glk_result = value;
        self
    }

    /// Text printed so far
    pub fn output(&self) -> String {
        self.log.borrow().output.clone()
    }

    /// Glk calls made so far
    pub fn glk_calls(&self) -> Vec<(u32, Vec<u32>)> {
        self.log.borrow().glk_calls.clone()
    }

    /// Snapshot of the whole log
    pub fn log(&self) -> HostLog {
        self.log.borrow().clone()
    }
}

impl Host for RecordingHost {
    fn glk(&mut self, selector: u32, args: &[u32]) -> Result<u32> {
        self.log
            .borrow_mut()
            .glk_calls
            .push((selector, args.to_vec()));
        Ok(self.glk_result)
    }

    fn restore_undo(&mut self) -> Result<()> {
        self.log.borrow_mut().undo_requests += 1;
        Ok(())
    }

    fn stream_char(&mut self, ch: u32) {
        let ch = char::from_u32(ch).unwrap_or(char::REPLACEMENT_CHARACTER);
        self.log.borrow_mut().output.push(ch);
    }

    fn stream_number(&mut self, value: i32) {
        self.log.borrow_mut().output.push_str(&value.to_string());
    }

    fn stream_string(&mut self, text: &str) {
        self.log.borrow_mut().output.push_str(text);
    }
}
