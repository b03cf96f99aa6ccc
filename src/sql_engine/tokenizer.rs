//! Adapter from the `sqlparser` tokenizer to per-statement token trees
//!
//! `sqlparser` produces a flat stream. Statements are split on top-level
//! semicolons and parenthesised runs become nested groups, so that callers see
//! one tree per statement with every lexical token (whitespace and comments
//! included) kept in source order.

use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token as SqlToken, Tokenizer, Whitespace};

use super::error::ParseError;
use super::normalizer::is_negligible;

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    /// Data definition keywords, including the combined `CREATE OR REPLACE`
    Ddl,
    Name,
    Punctuation,
    Literal,
    Other,
    Whitespace,
    Newline,
    Comment,
    /// Dialect marker such as `#standardSQL`
    Pragma,
}

/// A leaf lexical unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}

/// A statement as produced by the tokenizer: leaves and parenthesised groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenTree {
    Leaf(Token),
    Group(Vec<TokenTree>),
}

const PRAGMAS: [&str; 2] = ["standardsql", "legacysql"];

/// Tokenize `sql` and split it into one token tree per statement
pub fn tokenize_statements(sql: &str, dialect: &dyn Dialect) -> Result<Vec<TokenTree>, ParseError> {
    let raw = Tokenizer::new(dialect, sql).tokenize()?;
    let tokens = merge_create_or_replace(&raw);

    let mut statements = Vec::new();
    // Innermost group last; the bottom entry is the statement itself
    let mut stack: Vec<Vec<TokenTree>> = vec![Vec::new()];

    for token in tokens {
        let symbol = match token.kind {
            TokenKind::Punctuation => token.value.chars().next(),
            _ => None,
        };
        match symbol {
            Some('(') => {
                stack.push(vec![TokenTree::Leaf(token)]);
            }
            Some(')') if stack.len() > 1 => {
                let mut group = stack.pop().unwrap_or_default();
                group.push(TokenTree::Leaf(token));
                push_tree(&mut stack, TokenTree::Group(group));
            }
            Some(';') if stack.len() == 1 => {
                push_tree(&mut stack, TokenTree::Leaf(token));
                statements.push(TokenTree::Group(std::mem::take(&mut stack[0])));
            }
            _ => push_tree(&mut stack, TokenTree::Leaf(token)),
        }
    }

    // Unbalanced parentheses: fold any open groups back into the statement
    while stack.len() > 1 {
        let group = stack.pop().unwrap_or_default();
        push_tree(&mut stack, TokenTree::Group(group));
    }
    if !stack[0].is_empty() {
        statements.push(TokenTree::Group(std::mem::take(&mut stack[0])));
    }

    Ok(statements)
}

fn push_tree(stack: &mut [Vec<TokenTree>], tree: TokenTree) {
    if let Some(top) = stack.last_mut() {
        top.push(tree);
    }
}

/// Classify raw tokens, collapsing `CREATE OR REPLACE` into a single DDL token
fn merge_create_or_replace(raw: &[SqlToken]) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if keyword_of(&raw[i]) == Some(Keyword::CREATE) {
            if let Some(end) = match_or_replace(raw, i + 1) {
                tokens.push(Token::new("CREATE OR REPLACE", TokenKind::Ddl));
                i = end;
                continue;
            }
        }
        if raw[i] != SqlToken::EOF {
            tokens.push(classify(&raw[i]));
        }
        i += 1;
    }

    tokens
}

/// Index just past `OR REPLACE` when it follows position `start`
fn match_or_replace(raw: &[SqlToken], start: usize) -> Option<usize> {
    let mut pos = start;
    for expected in [Keyword::OR, Keyword::REPLACE] {
        pos = skip_blank(raw, pos);
        if keyword_of(raw.get(pos)?) != Some(expected) {
            return None;
        }
        pos += 1;
    }
    Some(pos)
}

fn skip_blank(raw: &[SqlToken], mut pos: usize) -> usize {
    while let Some(SqlToken::Whitespace(Whitespace::Space | Whitespace::Tab | Whitespace::Newline)) =
        raw.get(pos)
    {
        pos += 1;
    }
    pos
}

fn keyword_of(token: &SqlToken) -> Option<Keyword> {
    match token {
        SqlToken::Word(word) if word.quote_style.is_none() => Some(word.keyword),
        _ => None,
    }
}

fn classify(token: &SqlToken) -> Token {
    let kind = match token {
        SqlToken::Word(word) if word.quote_style.is_some() => TokenKind::Name,
        SqlToken::Word(word) => match word.keyword {
            Keyword::NoKeyword => TokenKind::Name,
            Keyword::CREATE | Keyword::DROP | Keyword::ALTER | Keyword::TRUNCATE => TokenKind::Ddl,
            _ => TokenKind::Keyword,
        },
        SqlToken::Whitespace(Whitespace::Newline) => TokenKind::Newline,
        SqlToken::Whitespace(Whitespace::Space | Whitespace::Tab) => TokenKind::Whitespace,
        SqlToken::Whitespace(Whitespace::SingleLineComment { comment, prefix })
            if prefix == "#" && is_pragma(comment) =>
        {
            TokenKind::Pragma
        }
        SqlToken::Whitespace(_) => TokenKind::Comment,
        SqlToken::Number(..)
        | SqlToken::SingleQuotedString(_)
        | SqlToken::DoubleQuotedString(_)
        | SqlToken::NationalStringLiteral(_)
        | SqlToken::HexStringLiteral(_) => TokenKind::Literal,
        SqlToken::Comma
        | SqlToken::SemiColon
        | SqlToken::Period
        | SqlToken::Colon
        | SqlToken::LParen
        | SqlToken::RParen
        | SqlToken::LBracket
        | SqlToken::RBracket => TokenKind::Punctuation,
        _ => TokenKind::Other,
    };

    Token::new(token.to_string(), kind)
}

fn is_pragma(comment: &str) -> bool {
    let marker = comment.trim().to_ascii_lowercase();
    PRAGMAS.contains(&marker.as_str())
}

/// One line per meaningful leaf, indented three spaces per nesting level
pub fn render_tree(tree: &TokenTree) -> String {
    let mut out = String::new();
    render_level(tree, 0, &mut out);
    out
}

fn render_level(tree: &TokenTree, depth: usize, out: &mut String) {
    match tree {
        TokenTree::Leaf(token) if is_negligible(token) => {}
        TokenTree::Leaf(token) => {
            out.push_str(&format!(
                "{}{:<24} {:?}\n",
                "   ".repeat(depth),
                token.value,
                token.kind
            ));
        }
        TokenTree::Group(children) => {
            for child in children {
                let child_depth = match child {
                    TokenTree::Group(_) => depth + 1,
                    TokenTree::Leaf(_) => depth,
                };
                render_level(child, child_depth, out);
            }
        }
    }
}
