//! Per-file dependency records
use anyhow::{Context, Result};
use sqlparser::dialect::Dialect;
use std::fs;
use std::path::Path;

use super::error::ParseError;
use super::extractors::{extract_statement, Extraction};
use super::normalizer::normalize;
use super::tokenizer::tokenize_statements;

/// Tables a single script produces and reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Tables defined by the file, one per create statement
    pub targets: Vec<String>,
    /// Tables read by the file in order of first occurrence, duplicates kept
    pub sources: Vec<String>,
    /// File identifier, relative to the scanned directory
    pub file: String,
}

/// Outcome of reading one script
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub dependency: Dependency,
    /// Statements whose structure was not recognised; they contribute nothing
    pub rejected: Vec<ParseError>,
}

impl Dependency {
    pub fn new(file: impl Into<String>, targets: Vec<String>, sources: Vec<String>) -> Self {
        Self {
            targets,
            sources,
            file: file.into(),
        }
    }

    /// Read and analyse the script at `path`, identified relative to `root`
    pub fn from_path(path: &Path, root: &Path, dialect: &dyn Dialect) -> Result<FileAnalysis> {
        let sql = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file: {}", path.display()))?;
        let file = file_identifier(path, root);

        analyze_file(&file, &sql, dialect)
            .with_context(|| format!("Failed to analyse SQL file: {}", path.display()))
    }
}

/// Classify every statement of `sql` and fold the results into one record
pub fn analyze_file(file: &str, sql: &str, dialect: &dyn Dialect) -> Result<FileAnalysis, ParseError> {
    let mut tables = Extraction::default();
    let mut rejected = Vec::new();

    for tree in tokenize_statements(sql, dialect)? {
        let tokens = normalize(&tree);
        match extract_statement(&tokens) {
            Ok(extraction) => {
                tracing::debug!(
                    file,
                    targets = ?extraction.targets,
                    sources = ?extraction.sources,
                    "classified statement"
                );
                tables.extend(extraction);
            }
            Err(err) => rejected.push(err),
        }
    }

    Ok(FileAnalysis {
        dependency: Dependency::new(file, tables.targets, tables.sources),
        rejected,
    })
}

/// Path of `path` below `root` with forward slashes, falling back to the file name
pub fn file_identifier(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    if parts.is_empty() {
        path.to_string_lossy().to_string()
    } else {
        parts.join("/")
    }
}
