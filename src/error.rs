use std::path::PathBuf;
use std::result;

use thiserror::Error;

/// Every error is fatal: the first one aborts the compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Error on line {line}: {message}")]
    Lexical { line: usize, message: String },

    #[error("Parse error on line {line}: unexpected token '{found}', expected {expected}")]
    Syntax {
        line: usize,
        found: String,
        expected: String,
    },

    #[error("Error on line {line}, symbol {name} already declared at this scope")]
    Redeclaration { line: usize, name: String },

    #[error("Error on line {line}: END {found} does not close block {expected}")]
    BlockMismatch {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("Error on line {line}: END {found} has no open block")]
    UnmatchedEnd { line: usize, found: String },

    #[error("Error on line {line}: use of undeclared identifier {name}")]
    Undeclared { line: usize, name: String },

    #[error("Error on line {line}: {message}")]
    Type { line: usize, message: String },

    #[error("Error on line {line}: {message} in call to '{procedure}'")]
    Arity {
        line: usize,
        procedure: String,
        message: String,
    },

    #[error("Error on line {line}: '{name}' cannot be passed by reference")]
    Reference { line: usize, name: String },

    #[error("Error on line {line}: expression nested too deeply")]
    NestingTooDeep { line: usize },

    #[error("output {} would overwrite the input file", .path.display())]
    OutputOverwritesInput { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn type_error(line: usize, message: impl Into<String>) -> CompileError {
        CompileError::Type {
            line,
            message: message.into(),
        }
    }

    /// Source line the error was raised on, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Lexical { line, .. }
            | CompileError::Syntax { line, .. }
            | CompileError::Redeclaration { line, .. }
            | CompileError::BlockMismatch { line, .. }
            | CompileError::UnmatchedEnd { line, .. }
            | CompileError::Undeclared { line, .. }
            | CompileError::Type { line, .. }
            | CompileError::Arity { line, .. }
            | CompileError::Reference { line, .. }
            | CompileError::NestingTooDeep { line } => Some(*line),
            CompileError::OutputOverwritesInput { .. } | CompileError::Io(_) => None,
        }
    }
}

pub type Result<T> = result::Result<T, CompileError>;
