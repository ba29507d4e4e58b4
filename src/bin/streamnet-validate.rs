//! streamnet-validate - Pre-load validation tool for graph documents
//!
//! # Usage
//!
//! ```bash
//! # Validate all .json graphs in a directory (load rules only)
//! streamnet-validate path/to/graphs
//!
//! # Also check for dangling pins and dead elements
//! streamnet-validate --deep path/to/graphs
//!
//! # Verbose output with element/connection counts
//! streamnet-validate -v path/to/graphs
//! ```
//!
//! # Exit Codes
//!
//! - 0: All files validated successfully
//! - 1: One or more files failed validation (load errors or error-level diagnostics)
//! - 2: Invalid arguments or IO error

use std::path::Path;
use std::process::ExitCode;
use streamnet::validate::{
    validate_directory_with, validate_file_with, DiagnosticLevel, ValidationResult,
    ValidationSummary,
};

fn main() -> ExitCode {
    let mut verbose = false;
    let mut deep = false;
    let mut paths = Vec::new();

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "-d" | "--deep" => deep = true,
            "-dv" | "-vd" => {
                deep = true;
                verbose = true;
            }
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown option: {}\n", arg);
                print_help();
                return ExitCode::from(2);
            }
            _ => paths.push(arg),
        }
    }

    if paths.is_empty() {
        eprintln!("Error: No path specified\n");
        print_help();
        return ExitCode::from(2);
    }

    let mut all_results = Vec::new();

    for path_str in &paths {
        let path = Path::new(path_str);

        if !path.exists() {
            eprintln!("Error: Path does not exist: {}", path.display());
            return ExitCode::from(2);
        }

        if path.is_file() {
            let result = validate_file_with(path, deep);
            print_result(&result, verbose);
            all_results.push(result);
        } else if path.is_dir() {
            match validate_directory_with(path, deep) {
                Ok(results) => {
                    for result in &results {
                        print_result(result, verbose);
                    }
                    all_results.extend(results);
                }
                Err(e) => {
                    eprintln!("Error reading directory {}: {}", path.display(), e);
                    return ExitCode::from(2);
                }
            }
        }
    }

    let summary = ValidationSummary::from_results(&all_results);
    eprintln!();
    summary.print_report();

    if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_result(result: &ValidationResult, verbose: bool) {
    match result {
        ValidationResult::Ok { path, graph, diagnostics } => {
            let marker = if result.has_errors() { "!" } else { "+" };

            if verbose {
                let connections: usize = graph.indegrees().values().map(|s| s.len()).sum();
                println!(
                    "{} {} ({} in, {} out, {} elements, {} connections)",
                    marker,
                    path.display(),
                    graph.inport_names().len(),
                    graph.outport_names().len(),
                    graph.elements().len(),
                    connections
                );
            } else {
                println!("{} {}", marker, path.display());
            }

            for d in diagnostics {
                let level_str = match d.level {
                    DiagnosticLevel::Error => "ERROR",
                    DiagnosticLevel::Warning => "WARN ",
                    DiagnosticLevel::Info => "INFO ",
                };
                eprintln!("    {} [{}]: {}", level_str, d.name, d.message);
            }
        }
        ValidationResult::Err { path, error } => {
            eprintln!("x {}", path.display());
            if let Some(line) = error.line {
                eprintln!("  line {}: {}", line, error.message);
            } else {
                eprintln!("  {}", error.message);
            }
            if let Some(snippet) = &error.snippet {
                eprintln!("  | {}", snippet);
            }
        }
    }
}

fn print_help() {
    eprintln!("streamnet-validate - Validate streamnet graph documents");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    streamnet-validate [OPTIONS] <PATH>...");
    eprintln!();
    eprintln!("ARGS:");
    eprintln!("    <PATH>    .json file or directory to validate (recursive for directories)");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -v, --verbose    Show element and connection counts");
    eprintln!("    -d, --deep       Also report dangling pins and dead elements");
    eprintln!("    -h, --help       Print this help message");
    eprintln!();
    eprintln!("EXIT CODES:");
    eprintln!("    0    All files validated successfully");
    eprintln!("    1    One or more files failed validation");
    eprintln!("    2    Invalid arguments or IO error");
}
