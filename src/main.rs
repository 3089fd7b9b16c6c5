//! ChainJoin - join order optimizer for foreign-key chain joins.
//!
//! This is the main entry point for the command-line interface.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chainjoin::catalog::{load_graph_from_path, load_graph_from_str, JoinGraph};
use chainjoin::{JoinOrderOptimizer, JoinPlan, OptimizerConfig};

/// How the chosen plan is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Tree,
    Json,
    Expr,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "tree" => Some(OutputFormat::Tree),
            "json" => Some(OutputFormat::Json),
            "expr" => Some(OutputFormat::Expr),
            _ => None,
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    // Parse simple command line args.
    let mut input: Option<PathBuf> = None;
    let mut format = OutputFormat::Tree;
    let mut config = OptimizerConfig::default();
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-f" | "--format" => {
                i += 1;
                match args.get(i).and_then(|v| OutputFormat::parse(v)) {
                    Some(f) => format = f,
                    None => {
                        eprintln!("Expected one of tree, json, expr after --format");
                        return ExitCode::FAILURE;
                    }
                }
            }
            "-m" | "--max-relations" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(limit) => config = config.max_relations(limit),
                    None => {
                        eprintln!("Expected a number after --max-relations");
                        return ExitCode::FAILURE;
                    }
                }
            }
            "-v" | "--verbose" => {
                verbose = true;
            }
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            "--version" => {
                println!("chainjoin v{}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            "-" => {
                input = Some(PathBuf::from("-"));
            }
            arg => {
                if !arg.starts_with('-') {
                    input = Some(PathBuf::from(arg));
                } else {
                    eprintln!("Unknown option: {}", arg);
                    return ExitCode::FAILURE;
                }
            }
        }
        i += 1;
    }

    init_logging(verbose);

    let Some(input) = input else {
        print_help();
        return ExitCode::FAILURE;
    };

    match run(&input, format, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn print_help() {
    println!("ChainJoin - join order optimizer for foreign-key chain joins");
    println!();
    println!("Usage: chainjoin [OPTIONS] <INPUT>");
    println!();
    println!("INPUT is a three-line description, or '-' to read standard input:");
    println!("  <n>                   relation count");
    println!("  <c0>,<c1>,...         relation cardinalities");
    println!("  <fk0>,<fk1>,...       relation holding the foreign key of each edge");
    println!();
    println!("Options:");
    println!("  -f, --format FORMAT    Output format: tree, json, expr (default: tree)");
    println!("  -m, --max-relations N  Refuse graphs with more than N relations");
    println!("  -v, --verbose          Enable verbose logging");
    println!("  -h, --help             Show this help message");
    println!("  --version              Show version");
    println!();
    println!("Examples:");
    println!("  chainjoin query.txt                 Print the best join tree");
    println!("  chainjoin -f json query.txt         Print the plan as JSON");
    println!("  printf '2\\n100,5\\nR1\\n' | chainjoin -");
}

fn run(
    input: &Path,
    format: OutputFormat,
    config: OptimizerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let graph = read_graph(input)?;
    let plan = JoinOrderOptimizer::new(config).optimize(&graph)?;
    print_plan(&plan, format)?;
    Ok(())
}

fn read_graph(input: &Path) -> Result<JoinGraph, Box<dyn std::error::Error>> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(load_graph_from_str(&text)?)
    } else {
        Ok(load_graph_from_path(input)?)
    }
}

fn print_plan(plan: &JoinPlan, format: OutputFormat) -> serde_json::Result<()> {
    match format {
        OutputFormat::Tree => print!("{}", plan),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
        OutputFormat::Expr => println!("{}", plan.expression()),
    }
    Ok(())
}
