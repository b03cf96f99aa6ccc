use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process;

use sqlmake::commands::config::{read_config, Overrides, SqlMakeConfig};
use sqlmake::commands::{generate, parse};
use sqlmake::logging::init_logging;

/// sqlmake CLI - build a Makefile from SQL table dependencies
#[derive(Parser)]
#[clap(name = "sqlmake", about = "Order SQL scripts by the tables they create and read", version)]
struct Cli {
    /// Path to the project configuration file (defaults to ./sqlmake.yaml)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the SQL scripts
    #[clap(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Path of the generated Makefile
    #[clap(short, long, global = true)]
    output: Option<PathBuf>,

    /// Path of the diagnostic log file
    #[clap(long, global = true)]
    log_file: Option<PathBuf>,

    /// SQL dialect used to tokenize scripts
    #[clap(long, global = true)]
    dialect: Option<String>,

    /// Command each rule runs against its script
    #[clap(long, global = true)]
    run_command: Option<String>,

    /// Fail when scripts depend on each other in a loop
    #[clap(long, global = true)]
    strict: bool,

    /// Log debug details for every statement
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse the SQL scripts and write the Makefile (default)
    Generate,

    /// Analyse the SQL scripts and print their dependencies
    Parse {
        /// Output format (text, json, dot, tokens)
        #[clap(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Some(Command::Version) = cli.command {
        println!("sqlmake version {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(1);
        }
    };

    if let Err(err) = init_logging(&config.log_file, cli.verbose) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }

    let result = match cli.command {
        Some(Command::Parse { ref format }) => parse::parse_command(&config, format),
        _ => generate::generate_command(&config).map(|report| {
            println!(
                "{}",
                format!(
                    "Wrote {} with {} rules",
                    report.output.display(),
                    report.file_count
                )
                .green()
            );
            if report.rejected_statements > 0 {
                println!(
                    "{}",
                    format!(
                        "Skipped {} unrecognised statements (see {})",
                        report.rejected_statements,
                        config.log_file.display()
                    )
                    .yellow()
                );
            }
            for cycle in &report.cycles {
                println!("{} {}", "Circular dependency:".red(), cycle.join(" → "));
            }
        }),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SqlMakeConfig> {
    let mut config = read_config(cli.config.as_deref())?;
    config.apply_overrides(Overrides {
        models_path: cli.dir.clone(),
        output: cli.output.clone(),
        log_file: cli.log_file.clone(),
        dialect: cli.dialect.clone(),
        run_command: cli.run_command.clone(),
        strict: cli.strict,
    });
    Ok(config)
}
