//! Error types raised while reading statements and assembling the file graph

use std::fmt;

/// Failure to recognise the structure of a statement or to tokenize a file
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// A fixed grammar position held something other than the expected symbol
    #[error("expected {expected} but got {got}:\n{context}")]
    UnexpectedToken {
        expected: String,
        got: String,
        /// Text of the remaining tokens, starting at the offending one
        context: String,
    },

    #[error("failed to tokenize SQL: {0}")]
    Tokenize(String),
}

impl From<sqlparser::tokenizer::TokenizerError> for ParseError {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        ParseError::Tokenize(err.to_string())
    }
}

/// A table claimed as a target more than once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateTarget {
    pub table: String,
    /// Every file defining the table, once per definition
    pub files: Vec<String>,
}

impl fmt::Display for DuplicateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.table, self.files.join(", "))
    }
}

/// Corpus-wide problems that stop the build plan from being written
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate target table(s): {}", format_duplicates(.0))]
    DuplicateTarget(Vec<DuplicateTarget>),

    #[error("circular dependencies between files: {}", format_cycles(.0))]
    CircularDependency(Vec<Vec<String>>),
}

impl GraphError {
    /// Names of the tables behind a duplicate target error
    pub fn duplicate_tables(&self) -> Vec<&str> {
        match self {
            GraphError::DuplicateTarget(dups) => dups.iter().map(|d| d.table.as_str()).collect(),
            GraphError::CircularDependency(_) => Vec::new(),
        }
    }
}

fn format_duplicates(dups: &[DuplicateTarget]) -> String {
    dups.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| format!("[{}]", cycle.join(" → ")))
        .collect::<Vec<_>>()
        .join(", ")
}
