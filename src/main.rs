use clap::Parser;
use colored::*;
use std::path::PathBuf;

use null_contract_analyzer::analysis::emitter::{self, NeverCancelled};
use null_contract_analyzer::cache::AnalysisCache;
use null_contract_analyzer::diagnostics::{Diagnostic, Severity};
use null_contract_analyzer::error::{AnalyzerError, Result};
use null_contract_analyzer::model::Compilation;
use null_contract_analyzer::semantic::InMemorySemanticModel;

#[derive(clap::Parser, Debug)]
#[command(name = "null-contract-checker")]
#[command(about = "A flow-sensitive static analyzer for null-contract annotations")]
#[command(version)]
struct Args {
    /// Pre-resolved program file to analyze, as JSON (a serialized `Compilation`)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

fn main() {
    let args = Args::parse();

    println!("{}", "Null-Contract Checker".bold().blue());
    println!("Analyzing: {}", args.input.display());

    match analyze_file(&args.input) {
        Ok(diagnostics) => {
            if args.format == "json" {
                print_json(&diagnostics);
            } else {
                print_text(&diagnostics, &args.input);
            }
            if diagnostics.iter().any(|d| d.severity() == Severity::Error) {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn analyze_file(path: &PathBuf) -> Result<Vec<Diagnostic>> {
    let content = std::fs::read_to_string(path).map_err(|source| AnalyzerError::Io { path: path.display().to_string(), source })?;
    let compilation: Compilation = serde_json::from_str(&content)?;
    let model = InMemorySemanticModel::build(compilation);
    let cache = AnalysisCache::new();
    Ok(emitter::analyze_compilation(&model, &cache, &NeverCancelled))
}

fn print_text(diagnostics: &[Diagnostic], path: &PathBuf) {
    if diagnostics.is_empty() {
        println!("{}", "✓ null-contract-checker: no violations found!".green());
        return;
    }
    println!("{}", format!("✗ Found {} diagnostic(s) in {}:", diagnostics.len(), path.display()).red());
    for diag in diagnostics {
        let label = match diag.severity() {
            Severity::Error => diag.kind.code().red(),
            Severity::Warning => diag.kind.code().yellow(),
            Severity::Hint => diag.kind.code().cyan(),
        };
        println!("  [{}] {}:{} - {}", label, diag.location.line, diag.location.column, diag.message_context);
    }
}

fn print_json(diagnostics: &[Diagnostic]) {
    match serde_json::to_string_pretty(diagnostics) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("{}: {}", "Error".red().bold(), e),
    }
}
