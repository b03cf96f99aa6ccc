//! Flattening of statement token trees into the leaf sequence the grammar reads

use super::tokenizer::{Token, TokenKind, TokenTree};

/// Whether a token carries no grammatical meaning
pub fn is_negligible(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment | TokenKind::Pragma
    )
}

/// Depth-first flattening of `tree`, dropping whitespace, comments and pragmas
pub fn normalize(tree: &TokenTree) -> Vec<Token> {
    let mut tokens = Vec::new();
    collect_leaves(tree, &mut tokens);
    tokens
}

fn collect_leaves(tree: &TokenTree, out: &mut Vec<Token>) {
    match tree {
        TokenTree::Leaf(token) if is_negligible(token) => {}
        TokenTree::Leaf(token) => out.push(token.clone()),
        TokenTree::Group(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
    }
}
