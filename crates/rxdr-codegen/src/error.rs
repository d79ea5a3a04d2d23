//! Diagnostics and errors of the XDR compiler.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// A problem in an input file, reported as `file:line: message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Lexical or syntax errors; nothing is emitted.
    #[error("{}", render(.0))]
    Parse(Vec<Diagnostic>),

    /// The symbol table cannot be turned into Rust (unresolved names,
    /// illegal discriminants, ...).
    #[error("{0}")]
    Emit(String),

    #[error("invalid import {0:?}")]
    Import(String),

    #[error("generated code does not parse: {0}")]
    Syntax(#[from] syn::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, CodegenError>;
