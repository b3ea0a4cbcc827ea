//! querysql — compile query-builder filters from the command line
//!
//! # Usage
//!
//! ```bash
//! # Compile a filter
//! querysql '{"field": "age", "condition": {"type": "greater", "filter": 18}}'
//!
//! # From a file, restricted to known columns
//! querysql --file filter.json --whitelist name,age
//!
//! # Show the decoded tree next to the SQL
//! querysql explain < filter.json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use querysql::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "querysql")]
#[command(version)]
#[command(about = "Compile query-builder filter trees into parameterized SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    querysql '{\"field\":\"age\",\"condition\":{\"type\":\"between\",\"filter\":[18,null]}}'
    querysql --file filter.json --whitelist name,age --format json
    cat filter.json | querysql explain")]
struct Cli {
    /// Filter JSON; reads stdin when omitted or '-'
    filter: Option<String>,

    /// Read the filter from a file
    #[arg(short = 'i', long, global = true)]
    file: Option<PathBuf>,

    /// Allowed field names, merged with the config file whitelist
    #[arg(short, long, value_delimiter = ',', global = true)]
    whitelist: Vec<String>,

    /// Config file (defaults to ./querysql.toml, then the user config dir)
    #[arg(short, long, env = "QUERYSQL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
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
    /// Show the decoded filter tree and the SQL it compiles to
    Explain {
        /// Filter JSON; reads stdin when omitted or '-'
        filter: Option<String>,
    },
    /// List built-in and configured operators
    Operators,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Explain { filter }) => explain_filter(filter.as_deref(), &cli),
        Some(Commands::Operators) => show_operators(&cli),
        None => compile_filter(cli.filter.as_deref(), &cli),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "querysql=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => FileConfig::discover()?.unwrap_or_default(),
    };

    if !cli.whitelist.is_empty() {
        config
            .whitelist
            .get_or_insert_with(Vec::new)
            .extend(cli.whitelist.iter().cloned());
    }

    Ok(config)
}

fn read_filter(filter: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    match filter {
        Some(text) if text != "-" => Ok(text.to_string()),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read filter from stdin")?;
            Ok(text)
        }
    }
}

/// Decode, bound and compile the filter named on the command line.
fn prepare(filter: Option<&str>, cli: &Cli) -> Result<(FilterNode, Clause)> {
    let file_config = load_config(cli)?;
    let text = read_filter(filter, cli.file.as_deref())?;

    if cli.verbose {
        eprintln!("{} {}", "Input:".dimmed(), text.trim().yellow());
    }

    let node = querysql::from_json(&text)?;
    file_config.check_depth(&node)?;

    let config = file_config.into_sql_config()?;
    let clause = querysql::compile(&node, &config)?;
    Ok((node, clause))
}

fn compile_filter(filter: Option<&str>, cli: &Cli) -> Result<()> {
    let (_, clause) = prepare(filter, cli)?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&clause)?);
        }
        OutputFormat::Text => print_clause(&clause),
    }

    Ok(())
}

fn print_clause(clause: &Clause) {
    println!("{}", "Generated SQL:".green().bold());
    if clause.is_empty() {
        println!("  {}", "(no filter)".dimmed());
    } else {
        println!("  {}", clause.sql.white());
    }

    if !clause.params.is_empty() {
        println!();
        println!("{}", "Parameters:".cyan());
        for (i, value) in clause.params.iter().enumerate() {
            println!("  {} = {}", (i + 1).to_string().dimmed(), value.to_string().yellow());
        }
    }
}

fn explain_filter(filter: Option<&str>, cli: &Cli) -> Result<()> {
    let (node, clause) = prepare(filter, cli)?;

    if let OutputFormat::Json = cli.format {
        let out = serde_json::json!({ "filter": node, "clause": clause });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", "Filter Tree:".green().bold());
    print_node(&node, 1);
    println!();
    print_clause(&clause);
    Ok(())
}

fn print_node(node: &FilterNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        FilterNode::Group { glue, rules } => {
            println!("{}{} ({} rules)", indent, glue.to_string().cyan(), rules.len());
            for rule in rules {
                print_node(rule, depth + 1);
            }
        }
        FilterNode::Leaf(leaf) if leaf.is_degenerate() => {
            println!("{}{}", indent, "(empty)".dimmed());
        }
        FilterNode::Leaf(leaf) if !leaf.includes.is_empty() => {
            let values: Vec<String> = leaf.includes.iter().map(|v| v.to_string()).collect();
            println!(
                "{}{} {} [{}]",
                indent,
                leaf.field.white(),
                "in".cyan(),
                values.join(", ").yellow()
            );
        }
        FilterNode::Leaf(leaf) => {
            println!(
                "{}{} {} {}",
                indent,
                leaf.field.white(),
                leaf.condition.operator.cyan(),
                leaf.condition.operand.to_string().yellow()
            );
        }
    }
}

fn show_operators(cli: &Cli) -> Result<()> {
    let file_config = load_config(cli)?;
    let templates = file_config.operations.clone();
    let config = file_config.into_sql_config()?;

    println!("{}", "Built-in Operators".cyan().bold());
    println!();
    println!("{:16} {}", "Keyword".white().bold(), "SQL".white().bold());
    println!("{}", "─".repeat(56).dimmed());
    for op in Builtin::ALL {
        let note = if op.is_range() { "  (null bound drops its half)" } else { "" };
        println!("{:16} {}{}", op.keyword().cyan(), op.template().dimmed(), note.dimmed());
    }

    if !templates.is_empty() {
        println!();
        println!("{}", "Configured Operators".cyan().bold());
        println!();
        for (keyword, template) in &templates {
            println!("{:16} {}", keyword.yellow(), template.dimmed());
        }
    }

    println!();
    match config.whitelist() {
        Some(fields) => {
            let mut fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            fields.sort_unstable();
            println!("{} {}", "Whitelist:".cyan(), fields.join(", ").white());
        }
        None => println!("{} {}", "Whitelist:".cyan(), "(unrestricted)".dimmed()),
    }

    Ok(())
}
