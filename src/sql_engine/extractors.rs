//! Table and dependency extraction utilities for SQL
//!
//! A statement is read as a flat run of normalized tokens. Statements opening
//! with a create marker go through a small recursive-descent recognizer
//! (`CREATE [OR REPLACE] TABLE <name> AS ...`); every other statement only has
//! its sources gathered. Each grammar step returns the number of tokens it
//! consumed.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::ParseError;
use super::tokenizer::{Token, TokenKind};

static CREATE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^create(\s+or\s+replace)?$").expect("valid create pattern"));

static BACKTICK_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid backtick pattern"));

/// Tables produced and read by one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub targets: Vec<String>,
    pub sources: Vec<String>,
}

impl Extraction {
    /// Append another statement's tables after this one's
    pub fn extend(&mut self, other: Extraction) {
        self.targets.extend(other.targets);
        self.sources.extend(other.sources);
    }
}

/// Classify a normalized statement and extract its target and source tables
pub fn extract_statement(tokens: &[Token]) -> Result<Extraction, ParseError> {
    match tokens.first() {
        None => Ok(Extraction::default()),
        Some(first) if is_create_marker(first) => create_sentence(tokens),
        Some(_) => Ok(Extraction {
            targets: Vec::new(),
            sources: gather_sources(tokens),
        }),
    }
}

/// Whether a statement opening with `token` materializes a table
pub fn is_create_marker(token: &Token) -> bool {
    CREATE_MARKER.is_match(&token.value)
}

/// `CREATE [OR REPLACE] TABLE <identifier> AS <anything>`
fn create_sentence(tokens: &[Token]) -> Result<Extraction, ParseError> {
    let mut pos = create_marker(tokens)?;
    pos += word("TABLE", TokenKind::Keyword, &tokens[pos..])?;
    let (consumed, target) = table_identifier(&tokens[pos..])?;
    pos += consumed;
    pos += word("AS", TokenKind::Keyword, &tokens[pos..])?;

    Ok(Extraction {
        targets: vec![target],
        sources: gather_sources(&tokens[pos..]),
    })
}

fn create_marker(tokens: &[Token]) -> Result<usize, ParseError> {
    let token = expect_token("CREATE", tokens)?;
    if token.kind == TokenKind::Ddl && is_create_marker(token) {
        Ok(1)
    } else {
        Err(unexpected("CREATE", tokens))
    }
}

/// A single token of the given kind whose text matches `val` case-insensitively
fn word(val: &str, kind: TokenKind, tokens: &[Token]) -> Result<usize, ParseError> {
    let token = expect_token(val, tokens)?;
    if token.kind == kind && token.value.eq_ignore_ascii_case(val) {
        Ok(1)
    } else {
        Err(unexpected(val, tokens))
    }
}

fn table_identifier(tokens: &[Token]) -> Result<(usize, String), ParseError> {
    let token = expect_token("<Name>", tokens)?;
    if token.kind != TokenKind::Name {
        return Err(unexpected("<Name>", tokens));
    }
    Ok((1, strip_backticks(&token.value).to_string()))
}

/// Every backtick-quoted name anywhere in `tokens`, in order of appearance
pub fn gather_sources(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .flat_map(|token| {
            BACKTICK_NAME
                .captures_iter(&token.value)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn strip_backticks(name: &str) -> &str {
    name.strip_prefix('`')
        .and_then(|inner| inner.strip_suffix('`'))
        .unwrap_or(name)
}

fn expect_token<'a>(expected: &str, tokens: &'a [Token]) -> Result<&'a Token, ParseError> {
    tokens.first().ok_or_else(|| ParseError::UnexpectedToken {
        expected: expected.to_string(),
        got: "<end of statement>".to_string(),
        context: String::new(),
    })
}

fn unexpected(expected: &str, tokens: &[Token]) -> ParseError {
    ParseError::UnexpectedToken {
        expected: expected.to_string(),
        got: tokens
            .first()
            .map(|t| t.value.clone())
            .unwrap_or_else(|| "<end of statement>".to_string()),
        context: tokens
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    }
}
