//! `rox`: a tree‑walking interpreter for the Lox language.
//!
//! The pipeline is strictly sequential:
//! [`scanner`] → [`parser`] → [`resolver`] → [`interpreter`].
//! [`Lox`] drives it and stops as soon as a phase reports a diagnostic.

pub mod ast;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

use std::io::{self, Write};

use log::{info, warn};

use crate::ast::Stmt;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::report::{Reporter, StderrReporter};
use crate::resolver::{Bindings, Resolver};

pub use crate::error::Result;
pub use crate::value::Value;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// Scan, parse or resolution diagnostics; nothing was executed.
    StaticError,
    /// Execution stopped at a runtime error.
    RuntimeError,
}

impl Status {
    /// Conventional process exit code: 0, 65 or 70.
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::StaticError => 65,
            Status::RuntimeError => 70,
        }
    }
}

/// An interpreter session.  Globals persist across [`Lox::run`] calls.
pub struct Lox {
    interpreter: Interpreter,
    reporter: Box<dyn Reporter>,
    next_expr_id: usize,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Session printing to stdout and reporting to stderr.
    pub fn new() -> Self {
        Self::with_io(Box::new(io::stdout()), Box::new(StderrReporter))
    }

    pub fn with_io(output: Box<dyn Write>, reporter: Box<dyn Reporter>) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
            reporter,
            next_expr_id: 0,
            had_error: false,
            had_runtime_error: false,
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn reset_errors(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Scan, parse, resolve and execute `source`.
    pub fn run(&mut self, source: &str) -> Status {
        info!("Running {} byte(s) of source", source.len());

        // Parsing still runs after lexical errors so syntax errors in the
        // rest of the file surface in the same pass.
        let scanned = scanner::scan_tokens(source);
        self.report_all(&scanned.errors);

        let mut parser = Parser::with_first_id(&scanned.value, self.next_expr_id);
        let parsed = parser.parse();
        self.next_expr_id = parser.next_id();
        self.report_all(&parsed.errors);

        if !scanned.is_clean() || !parsed.is_clean() {
            warn!("Static errors before resolution; not running");
            return Status::StaticError;
        }

        let statements: Vec<Stmt> = parsed.value;
        let resolved = Resolver::new().resolve(&statements);
        self.report_all(&resolved.errors);

        if !resolved.is_clean() {
            warn!("Resolution failed; not running");
            return Status::StaticError;
        }

        self.run_resolved(&statements, resolved.value)
    }

    /// Execute a program that has already been parsed and resolved.
    pub fn run_resolved(&mut self, statements: &[Stmt], bindings: Bindings) -> Status {
        self.interpreter.add_bindings(bindings);

        match self.interpreter.interpret(statements) {
            Ok(()) => Status::Ok,
            Err(e) => {
                self.reporter.report(&e);
                self.had_runtime_error = true;
                Status::RuntimeError
            }
        }
    }

    fn report_all(&mut self, errors: &[LoxError]) {
        for error in errors {
            self.reporter.report(error);
            self.had_error = true;
        }
    }
}
