//! SQL engine: statement classification and file dependency graph assembly

pub mod dependency;
pub mod error;
pub mod extractors;
pub mod graph;
pub mod makefile;
pub mod normalizer;
pub mod tokenizer;

#[cfg(test)]
mod tests;
