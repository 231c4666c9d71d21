//! Diagnostic sinks.
//!
//! Every static or runtime diagnostic is funnelled through a [`Reporter`].
//! Embedders pick where the messages go; the interpreter core never prints
//! errors on its own.

use crate::error::LoxError;
use log::debug;

/// Receives every diagnostic produced during a run.  Each report carries the
/// source line, a location context (`at end`, `at 'x'`) and a message, all
/// reachable through the [`LoxError`] accessors.
pub trait Reporter {
    fn report(&mut self, error: &LoxError);
}

/// Default reporter: one line (or two, for runtime errors) on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, error: &LoxError) {
        debug!("Reporting diagnostic on line {}", error.line());

        eprintln!("{}", error);
    }
}

/// Keeps rendered diagnostics in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    pub messages: Vec<String>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, error: &LoxError) {
        self.messages.push(error.to_string());
    }
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn report(&mut self, error: &LoxError) {
        (**self).report(error)
    }
}

impl<R: Reporter + ?Sized> Reporter for std::rc::Rc<std::cell::RefCell<R>> {
    fn report(&mut self, error: &LoxError) {
        self.borrow_mut().report(error)
    }
}
