//! qchain — render fluent query chains from the shell
//!
//! # Usage
//!
//! ```bash
//! # Render a chain
//! qchain "Person.select(id, age).filter(name='Bill').order_by(name)"
//!
//! # Show how the chain is grouped
//! qchain explain "Person.filter(age=18).select(id)"
//!
//! # Refuse to fall back to SELECT *
//! qchain "Person.filter(age=18)" --strict
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use qchain::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qchain")]
#[command(version)]
#[command(about = "Render deferred query chains to SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    qchain \"Person.select(id, age).filter(name='Bill').order_by(name)\"
    qchain \"new('Person').filter(age=18).select(id)\" --format json
    qchain explain \"Person.select(id).filter(x=1).filter(x=2)\"")]
struct Cli {
    /// The chain to render
    query: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Fail instead of rendering SELECT * when no columns are selected
    #[arg(long)]
    strict: bool,

    /// Config file (defaults to ./qchain.toml, then the user config dir)
    #[arg(short, long, env = "QCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the chain, its clause groups and the generated SQL
    Explain {
        /// The chain to explain
        query: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::discover()?,
    };
    init_tracing(&config, cli.verbose);

    let mut options = config.render_options();
    if cli.strict {
        options.empty_select = EmptySelectPolicy::Reject;
    }

    match &cli.command {
        Some(Commands::Explain { query }) => explain_query(query, &options),
        None => match &cli.query {
            Some(query) => render_query(query, &options, &cli.format),
            None => {
                println!("{}", "qchain — deferred query builder".cyan().bold());
                println!();
                println!("Usage: qchain <CHAIN> [OPTIONS]");
                println!();
                println!("Try: qchain --help");
                Ok(())
            }
        },
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render_query(input: &str, options: &RenderOptions, format: &OutputFormat) -> anyhow::Result<()> {
    let query = qchain::parse(input)?;
    let sql = query.build_with(options)?;

    match format {
        OutputFormat::Text => println!("{}", sql),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "sql": sql,
                "nodes": query.calls(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn explain_query(input: &str, options: &RenderOptions) -> anyhow::Result<()> {
    println!("{}", "qchain Query Explanation".cyan().bold());
    println!();
    println!("{} {}", "Chain:".dimmed(), input.yellow());
    println!();

    let query = qchain::parse(input)?;

    println!("{}", "Calls (in order):".green().bold());
    for (i, node) in query.calls().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, node.to_string().white());
    }
    println!();

    match Groups::collect(&query) {
        Ok(groups) => {
            println!("{}", "Clause groups (canonical order):".green().bold());
            for (kind, nodes) in groups.iter() {
                if nodes.is_empty() {
                    println!("  {} {}", format!("{:9}", kind.to_string()).dimmed(), "(none)".dimmed());
                } else {
                    let calls: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
                    println!("  {} {}", format!("{:9}", kind.to_string()).cyan(), calls.join(" + "));
                }
            }
        }
        Err(e) => println!("  {} {}", "Grouping failed:".red(), e),
    }
    println!();

    println!("{}", "Generated SQL:".green().bold());
    match query.build_with(options) {
        Ok(sql) => println!("  {}", sql.white()),
        Err(e) => println!("  {} {}", "✗".red(), e),
    }
    Ok(())
}
