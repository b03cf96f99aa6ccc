use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::time::Instant;

use super::config::SqlMakeConfig;
use super::generate::{find_sql_files, load_corpus, Corpus};
use crate::sql_engine::dependency::file_identifier;
use crate::sql_engine::tokenizer::{render_tree, tokenize_statements};

/// Run the parse command: analyse the corpus and print it without writing a Makefile
pub fn parse_command(config: &SqlMakeConfig, format: &str) -> Result<()> {
    let start_time = Instant::now();

    println!(
        "{}",
        format!("Parsing SQL files in: {}", config.models_path.display()).green()
    );

    if format == "tokens" {
        return output_token_format(config);
    }

    let corpus = load_corpus(config)?;
    println!(
        "Parsed {} SQL files in {:.2?}",
        corpus.raw.len(),
        start_time.elapsed()
    );

    if !corpus.cycles.is_empty() {
        println!("\n--- {} ---", "Circular Dependencies Detected".red());
        for (i, cycle) in corpus.cycles.iter().enumerate() {
            println!("Cycle {}: {}", i + 1, cycle.join(" → "));
        }
    }

    match format {
        "text" => output_text_format(&corpus),
        "dot" => println!("{}", corpus.graph.to_dot_graph()),
        "json" => println!("{}", json_report(&corpus)?),
        _ => {
            println!(
                "Unsupported output format: {}. Using text format instead.",
                format
            );
            output_text_format(&corpus);
        }
    }

    Ok(())
}

/// Output the corpus in text format, one block per file in execution order
fn output_text_format(corpus: &Corpus) {
    println!("\n--- {} ---", "File Dependencies".green());

    let ordered = match corpus.graph.execution_order() {
        Ok(order) => order,
        Err(err) => {
            println!("Error determining execution order: {}", err);
            corpus.graph.dependencies().iter().collect()
        }
    };

    for dep in ordered {
        println!("\nFile: {}", dep.file.bold());

        if !dep.targets.is_empty() {
            println!("  Defines:");
            for table in &dep.targets {
                println!("    • {}", table);
            }
        }

        let external = external_sources(corpus, &dep.file);
        if !external.is_empty() {
            println!("  Reads external tables:");
            for table in external {
                println!("    • {}", table);
            }
        }

        let prerequisites = corpus.graph.prerequisites(dep);
        if !prerequisites.is_empty() {
            println!("  Depends on files:");
            for file in prerequisites {
                println!("    • {}", file);
            }
        }
    }
}

/// Dump every statement's token tree, file by file
fn output_token_format(config: &SqlMakeConfig) -> Result<()> {
    print!("{}", token_report(config)?);
    Ok(())
}

pub fn token_report(config: &SqlMakeConfig) -> Result<String> {
    let dialect = config.sql_dialect()?;
    let root = config.models_path.as_path();
    let mut report = String::new();

    for path in find_sql_files(root, config.recursive)? {
        let sql = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read SQL file: {}", path.display()))?;
        report.push_str(&format!("\n--- {} ---\n", file_identifier(&path, root)));
        for tree in tokenize_statements(&sql, dialect.as_ref())? {
            let rendered = render_tree(&tree);
            if rendered.is_empty() {
                continue;
            }
            report.push_str(&rendered);
            report.push_str("==========\n");
        }
    }

    Ok(report)
}

#[derive(Serialize)]
struct JsonOutput {
    files: BTreeMap<String, JsonFile>,
    owners: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct JsonFile {
    targets: Vec<String>,
    sources: Vec<String>,
    external_sources: Vec<String>,
    depends_on: Vec<String>,
}

/// Render the corpus as pretty-printed JSON with sorted keys
pub fn json_report(corpus: &Corpus) -> Result<String> {
    let files = corpus
        .graph
        .dependencies()
        .iter()
        .map(|dep| {
            (
                dep.file.clone(),
                JsonFile {
                    targets: dep.targets.clone(),
                    sources: dep.sources.clone(),
                    external_sources: external_sources(corpus, &dep.file),
                    depends_on: corpus
                        .graph
                        .prerequisites(dep)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                },
            )
        })
        .collect();

    let output = JsonOutput {
        files,
        owners: corpus.graph.owner_map().clone(),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Sources of `file` that no script in the corpus produces, sorted and deduplicated
fn external_sources(corpus: &Corpus, file: &str) -> Vec<String> {
    let mut external: Vec<String> = corpus
        .raw
        .iter()
        .filter(|dep| dep.file == file)
        .flat_map(|dep| dep.sources.iter())
        .filter(|source| corpus.graph.owner_of(source).is_none())
        .cloned()
        .collect();
    external.sort();
    external.dedup();
    external
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_json_report_lists_owners_and_external_sources() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(
            root.join("a.sql"),
            "CREATE TABLE `t1` AS SELECT * FROM `raw.base`;",
        )
        .unwrap();
        fs::write(root.join("b.sql"), "CREATE TABLE `t2` AS SELECT * FROM `t1`;").unwrap();

        let config = SqlMakeConfig {
            models_path: root.to_path_buf(),
            ..SqlMakeConfig::default()
        };
        let corpus = load_corpus(&config).unwrap();
        let json: serde_json::Value = serde_json::from_str(&json_report(&corpus).unwrap()).unwrap();

        assert_eq!(json["owners"]["t1"], "a.sql");
        assert_eq!(json["files"]["a.sql"]["external_sources"][0], "raw.base");
        assert_eq!(json["files"]["a.sql"]["sources"].as_array().unwrap().len(), 0);
        assert_eq!(json["files"]["b.sql"]["depends_on"][0], "a.sql");
    }

    #[test]
    fn test_token_report_separates_statements() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.sql"), "SELECT (1);\nSELECT 2;\n").unwrap();

        let config = SqlMakeConfig {
            models_path: root.to_path_buf(),
            ..SqlMakeConfig::default()
        };
        let report = token_report(&config).unwrap();

        assert!(report.starts_with("\n--- a.sql ---\n"));
        assert_eq!(report.matches("==========\n").count(), 2);
        assert!(report.contains(&format!("   {:<24} Literal\n", "1")));
        assert!(report.contains(&format!("{:<24} Literal\n", "2")));
    }
}
