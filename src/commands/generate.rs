use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::config::SqlMakeConfig;
use crate::sql_engine::dependency::Dependency;
use crate::sql_engine::graph::DependencyGraph;
use crate::sql_engine::makefile::render_makefile;

/// A resolved corpus and what was noticed while reading it
#[derive(Debug)]
pub struct Corpus {
    pub graph: DependencyGraph,
    /// Dependencies before external sources were dropped
    pub raw: Vec<Dependency>,
    pub rejected_statements: usize,
    pub cycles: Vec<Vec<String>>,
}

/// Summary of a generate run
#[derive(Debug)]
pub struct GenerateReport {
    pub output: PathBuf,
    pub file_count: usize,
    pub rejected_statements: usize,
    pub cycles: Vec<Vec<String>>,
}

/// Read every script, build the graph and write the Makefile.
/// Nothing is written when any step fails.
pub fn generate_command(config: &SqlMakeConfig) -> Result<GenerateReport> {
    let corpus = load_corpus(config)?;
    let makefile = render_makefile(&corpus.graph, &config.makefile_options());

    fs::write(&config.output, makefile).map_err(|err| {
        tracing::error!(output = %config.output.display(), "failed to write build file: {}", err);
        anyhow::anyhow!("Failed to write {}: {}", config.output.display(), err)
    })?;
    tracing::info!(
        output = %config.output.display(),
        rules = corpus.graph.dependencies().len(),
        "wrote build file"
    );

    Ok(GenerateReport {
        output: config.output.clone(),
        file_count: corpus.graph.dependencies().len(),
        rejected_statements: corpus.rejected_statements,
        cycles: corpus.cycles,
    })
}

/// Discover, classify and resolve every script under the configured directory
pub fn load_corpus(config: &SqlMakeConfig) -> Result<Corpus> {
    let dialect = config.sql_dialect()?;
    let root = config.models_path.as_path();
    let sql_files = find_sql_files(root, config.recursive)?;
    tracing::info!(dir = %root.display(), count = sql_files.len(), "discovered SQL files");

    let mut raw = Vec::with_capacity(sql_files.len());
    let mut rejected_statements = 0;

    for path in &sql_files {
        let analysis = Dependency::from_path(path, root, dialect.as_ref()).map_err(|err| {
            tracing::error!(file = %path.display(), "{:#}", err);
            err
        })?;

        for err in &analysis.rejected {
            tracing::warn!(file = %analysis.dependency.file, "skipping statement: {}", err);
        }
        rejected_statements += analysis.rejected.len();

        tracing::info!(
            file = %analysis.dependency.file,
            targets = ?analysis.dependency.targets,
            sources = analysis.dependency.sources.len(),
            "analysed file"
        );
        raw.push(analysis.dependency);
    }

    let graph = DependencyGraph::build(raw.clone()).map_err(|err| {
        tracing::error!("{}", err);
        err
    })?;

    let cycles = graph.detect_cycles();
    if !cycles.is_empty() {
        for cycle in &cycles {
            tracing::warn!(files = ?cycle, "circular dependency between files");
        }
        if config.strict {
            graph.ensure_acyclic()?;
        }
    }

    Ok(Corpus {
        graph,
        raw,
        rejected_statements,
        cycles,
    })
}

/// Find all .sql files in `dir`, sorted by path
pub fn find_sql_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("SQL directory not found: {}", dir.display());
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut sql_files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file() && e.path().extension().is_some_and(|ext| ext == "sql"))
        .map(|e| e.path().to_path_buf())
        .collect();

    sql_files.sort();
    Ok(sql_files)
}
