//! Validation utilities for graph documents
//!
//! Batch validation with detailed error reporting. Two levels:
//! - Load validation (always runs): JSON syntax, document shape, naming and
//!   pin rules enforced by the loader
//! - Wiring checks (with `--deep`): pins the loader accepts but that would
//!   fail or do nothing once instantiated
//!
//! # Example
//!
//! ```ignore
//! use streamnet::validate::{validate_directory, ValidationResult};
//!
//! let results = validate_directory("graphs")?;
//! for result in &results {
//!     match result {
//!         ValidationResult::Ok { path, graph, .. } => {
//!             println!("+ {}: {} elements", path.display(), graph.elements().len());
//!         }
//!         ValidationResult::Err { path, error } => {
//!             eprintln!("x {}: {}", path.display(), error);
//!         }
//!     }
//! }
//! ```

use crate::error::StreamNetError;
use crate::loader::{load_string, StreamGraph};
use std::path::{Path, PathBuf};

/// Severity of a wiring diagnostic
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Instantiation would fail
    Error,
    /// Part of the graph can never affect an output
    Warning,
    Info,
}

/// Finding from the wiring checks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// Offending element or port
    pub name: String,
    pub message: String,
}

/// Result of validating a single graph file
#[derive(Debug)]
pub enum ValidationResult {
    /// File loaded (and optionally passed wiring checks)
    Ok {
        path: PathBuf,
        graph: StreamGraph,
        /// Empty unless wiring checks ran
        diagnostics: Vec<Diagnostic>,
    },
    /// File failed to load
    Err { path: PathBuf, error: ValidationError },
}

impl ValidationResult {
    /// True if the file loaded with no error-level diagnostics
    pub fn is_ok(&self) -> bool {
        !self.has_errors()
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Ok { path, .. } | Self::Err { path, .. } => path,
        }
    }

    /// Diagnostics (empty for `Err`)
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Ok { diagnostics, .. } => diagnostics,
            Self::Err { .. } => &[],
        }
    }

    pub fn has_errors(&self) -> bool {
        match self {
            Self::Ok { diagnostics, .. } => {
                diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error)
            }
            Self::Err { .. } => true,
        }
    }
}

/// Load failure with context
#[derive(Clone, Debug)]
pub struct ValidationError {
    /// Line number for JSON syntax errors
    pub line: Option<usize>,
    pub message: String,
    /// Offending source line
    pub snippet: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: {}", line, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(snippet) = &self.snippet {
            write!(f, "\n  | {}", snippet)?;
        }
        Ok(())
    }
}

impl From<StreamNetError> for ValidationError {
    fn from(e: StreamNetError) -> Self {
        let line = match &e {
            StreamNetError::Json(json) if json.line() > 0 => Some(json.line()),
            _ => None,
        };
        Self {
            line,
            message: e.to_string(),
            snippet: None,
        }
    }
}

impl From<std::io::Error> for ValidationError {
    fn from(e: std::io::Error) -> Self {
        Self {
            line: None,
            message: e.to_string(),
            snippet: None,
        }
    }
}

/// Validate a single graph file (load only)
pub fn validate_file<P: AsRef<Path>>(path: P) -> ValidationResult {
    validate_file_with(path, false)
}

/// Validate a single graph file, optionally running the wiring checks
pub fn validate_file_with<P: AsRef<Path>>(path: P, deep: bool) -> ValidationResult {
    let path = path.as_ref().to_path_buf();

    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            return ValidationResult::Err {
                path,
                error: e.into(),
            };
        }
    };

    match load_string(&source) {
        Ok(graph) => {
            let diagnostics = if deep { check_wiring(&graph) } else { Vec::new() };
            ValidationResult::Ok {
                path,
                graph,
                diagnostics,
            }
        }
        Err(e) => {
            let mut error = ValidationError::from(e);
            error.snippet = error
                .line
                .and_then(|line| source.lines().nth(line.saturating_sub(1)))
                .map(|s| s.trim().to_string());
            log::debug!("{} failed to load: {}", path.display(), error.message);
            ValidationResult::Err { path, error }
        }
    }
}

/// Pins a loaded graph leaves dangling
pub fn check_wiring(graph: &StreamGraph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for el in graph.elements() {
        let [n_in, n_out] = el.ports;
        for pin in 1..=n_in {
            if graph.source_of(&el.name, pin).is_none() {
                diagnostics.push(Diagnostic {
                    level: DiagnosticLevel::Error,
                    name: el.name.clone(),
                    message: format!("in pin {} of element {} is not connected", pin, el.name),
                });
            }
        }
        let consumed = (1..=n_out).any(|pin| {
            graph
                .outdegrees()
                .get(&(el.name.clone(), pin))
                .map_or(false, |sinks| !sinks.is_empty())
        });
        if !consumed {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Warning,
                name: el.name.clone(),
                message: format!("element {} has no consumers", el.name),
            });
        }
        if n_out == 0 {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Error,
                name: el.name.clone(),
                message: format!("element {} declares no outputs", el.name),
            });
        }
    }

    for name in graph.outport_names() {
        if graph.source_of(name, 1).is_none() {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Error,
                name: name.clone(),
                message: format!("output port {} has no source", name),
            });
        }
    }

    for name in graph.inport_names() {
        let read = graph
            .outdegrees()
            .get(&(name.clone(), 1))
            .map_or(false, |sinks| !sinks.is_empty());
        if !read {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Info,
                name: name.clone(),
                message: format!("input port {} is never read", name),
            });
        }
    }

    diagnostics
}

/// Validate all .json files under a directory (recursive, load only)
pub fn validate_directory<P: AsRef<Path>>(dir: P) -> std::io::Result<Vec<ValidationResult>> {
    validate_directory_with(dir, false)
}

/// Validate all .json files under a directory, optionally with wiring checks
pub fn validate_directory_with<P: AsRef<Path>>(
    dir: P,
    deep: bool,
) -> std::io::Result<Vec<ValidationResult>> {
    let mut results = Vec::new();
    validate_directory_recursive(dir.as_ref(), deep, &mut results)?;

    // Sort by path for consistent output
    results.sort_by(|a, b| a.path().cmp(b.path()));

    Ok(results)
}

fn validate_directory_recursive(
    dir: &Path,
    deep: bool,
    results: &mut Vec<ValidationResult>,
) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            validate_directory_recursive(&path, deep, results)?;
        } else if path.extension().map_or(false, |e| e == "json") {
            results.push(validate_file_with(&path, deep));
        }
    }

    Ok(())
}

/// Summary of validation results
#[derive(Debug, Default)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: Vec<(PathBuf, ValidationError)>,
    pub diag_errors: usize,
    pub diag_warnings: usize,
    pub diag_info: usize,
}

impl ValidationSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };

        for result in results {
            if result.has_errors() {
                summary.failed += 1;
            } else {
                summary.passed += 1;
            }
            match result {
                ValidationResult::Ok { diagnostics, .. } => {
                    for d in diagnostics {
                        match d.level {
                            DiagnosticLevel::Error => summary.diag_errors += 1,
                            DiagnosticLevel::Warning => summary.diag_warnings += 1,
                            DiagnosticLevel::Info => summary.diag_info += 1,
                        }
                    }
                }
                ValidationResult::Err { path, error } => {
                    summary.errors.push((path.clone(), error.clone()));
                }
            }
        }

        summary
    }

    /// Print summary to stderr
    pub fn print_report(&self) {
        if !self.errors.is_empty() {
            eprintln!("\n{} LOAD ERRORS:", self.errors.len());
            for (path, error) in &self.errors {
                eprintln!("\n  {}", path.display());
                if let Some(line) = error.line {
                    eprintln!("    line {}: {}", line, error.message);
                } else {
                    eprintln!("    {}", error.message);
                }
                if let Some(snippet) = &error.snippet {
                    eprintln!("    | {}", snippet);
                }
            }
            eprintln!();
        }

        eprintln!(
            "Validated {} files: {} passed, {} failed",
            self.total, self.passed, self.failed
        );

        if self.diag_errors + self.diag_warnings + self.diag_info > 0 {
            eprintln!(
                "Diagnostics: {} errors, {} warnings, {} info",
                self.diag_errors, self.diag_warnings, self.diag_info
            );
        }
    }
}
