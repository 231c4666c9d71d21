//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime) convert their internal
//! failure modes into one of the variants defined here.  Static phases do not
//! unwind on a diagnostic; they hand back a [`PhaseOutput`] carrying both the
//! best‑effort value and every error seen, so the caller decides whether the
//! next phase may run.
//!
//! The module **does not** print diagnostics itself; see [`crate::report`].

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error {location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// `at end` or `at '<lexeme>'`.
        location: String,
    },

    /// Static‑analysis failure (scope misuse, invalid `return`/`this`/`super`).
    #[error("[line {line}] Error {location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error.  Always aborts the current run.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Raised when the output
    /// sink refuses a write.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse {
            message,
            line,
            location,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve {
            message,
            line,
            location,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Source line the diagnostic points at (`0` for I/O failures).
    pub fn line(&self) -> usize {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => *line,
            LoxError::Io(_) => 0,
        }
    }

    /// Contextual location (`at end`, `at 'x'`); empty when not applicable.
    pub fn location(&self) -> &str {
        match self {
            LoxError::Parse { location, .. } | LoxError::Resolve { location, .. } => location,
            _ => "",
        }
    }

    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. }
            | LoxError::Runtime { message, .. } => message.clone(),
            LoxError::Io(e) => e.to_string(),
        }
    }

    /// Runtime and I/O errors abort interpretation; everything else is static.
    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime { .. } | LoxError::Io(_))
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Result of a static phase: the best‑effort product plus every diagnostic
/// raised while producing it.
#[derive(Debug)]
pub struct PhaseOutput<T> {
    pub value: T,
    pub errors: Vec<LoxError>,
}

impl<T> PhaseOutput<T> {
    pub fn new(value: T, errors: Vec<LoxError>) -> Self {
        Self { value, errors }
    }

    /// `true` when the phase finished without a single diagnostic.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Collapse into a `Result`, discarding the partial value on failure.
    pub fn into_result(self) -> std::result::Result<T, Vec<LoxError>> {
        if self.errors.is_empty() {
            Ok(self.value)
        } else {
            Err(self.errors)
        }
    }
}
