//! Output formatting for diagnostics.

use crate::cli::OutputFormat;
use crate::orchestrator::RunResult;
use repl_preview::ResolutionWarning;
use repl_store::{Diagnostic, File};

/// Formatter for diagnostic output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn print_diagnostic(&self, diagnostic: &Diagnostic) {
        let line = match self.format {
            OutputFormat::Human => format_diagnostic_human(diagnostic),
            OutputFormat::Json => format_diagnostic_json(diagnostic),
            OutputFormat::Machine => format_diagnostic_machine(diagnostic),
        };
        println!("{line}");
    }

    pub fn print_warning(&self, warning: &ResolutionWarning) {
        match self.format {
            OutputFormat::Human => {
                println!("{}: \x1b[33mwarning\x1b[0m: {warning}", warning.importer);
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "resolution",
                    "file": warning.importer,
                    "severity": "warning",
                    "specifier": warning.specifier,
                    "message": warning.to_string(),
                });
                println!("{json}");
            }
            OutputFormat::Machine => {
                println!(
                    "{}:0:0:warning:resolution:{}",
                    warning.importer,
                    escape(&warning.to_string())
                );
            }
        }
    }

    /// Files changed since the last saved snapshot.
    pub fn print_modified(&self, files: &[File]) {
        if files.is_empty() {
            return;
        }
        match self.format {
            OutputFormat::Human => {
                for file in files {
                    println!("\x1b[34mmodified\x1b[0m {}", file.filename);
                }
            }
            OutputFormat::Json => {
                let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
                println!("{}", serde_json::json!({ "type": "modified", "files": names }));
            }
            OutputFormat::Machine => {}
        }
    }

    pub fn print_share(&self, state: &str) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "type": "share", "state": state }));
            }
            OutputFormat::Human | OutputFormat::Machine => println!("{state}"),
        }
    }

    pub fn print_summary(&self, result: &RunResult) {
        match self.format {
            OutputFormat::Human => print_summary_human(result),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "summary",
                    "files": result.file_count,
                    "modules": result.module_count,
                    "errors": result.error_count,
                    "warnings": result.warning_count,
                    "duration_ms": result.duration_ms
                });
                println!("{json}");
            }
            OutputFormat::Machine => {
                // No summary for machine format
            }
        }
    }
}

fn escape(message: &str) -> String {
    message.replace(':', "\\:").replace('\n', " ")
}

fn format_diagnostic_human(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::Message(text) => format!("\x1b[31merror\x1b[0m: {text}"),
        Diagnostic::Compile { filename, error } => {
            let location = error
                .location
                .map(|l| format!("{filename}:{}:{}", l.line, l.column))
                .unwrap_or_else(|| filename.clone());
            format!(
                "{location}: \x1b[31merror\x1b[0m[{}]: {}",
                error.kind, error.message
            )
        }
    }
}

fn format_diagnostic_json(diagnostic: &Diagnostic) -> String {
    let json = match diagnostic {
        Diagnostic::Message(text) => serde_json::json!({
            "type": "store",
            "severity": "error",
            "message": text,
        }),
        Diagnostic::Compile { filename, error } => serde_json::json!({
            "type": "compile",
            "file": filename,
            "severity": "error",
            "kind": error.kind.as_str(),
            "message": error.message,
            "line": error.location.map(|l| l.line),
            "column": error.location.map(|l| l.column),
        }),
    };
    json.to_string()
}

fn format_diagnostic_machine(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::Message(text) => format!("-:0:0:error:store:{}", escape(text)),
        Diagnostic::Compile { filename, error } => {
            let (line, column) = error.location.map_or((0, 0), |l| (l.line, l.column));
            format!(
                "{filename}:{line}:{column}:error:{}:{}",
                error.kind,
                escape(&error.message)
            )
        }
    }
}

fn print_summary_human(result: &RunResult) {
    println!();
    if result.error_count == 0 && result.warning_count == 0 {
        println!(
            "\x1b[32m✓\x1b[0m Bundled {} modules from {} files ({}ms)",
            result.module_count, result.file_count, result.duration_ms
        );
    } else {
        if result.error_count > 0 {
            println!(
                "\x1b[31m✗\x1b[0m Found {} error{} in {} files",
                result.error_count,
                if result.error_count == 1 { "" } else { "s" },
                result.file_count
            );
        }
        if result.warning_count > 0 {
            println!(
                "\x1b[33m⚠\x1b[0m Found {} warning{}",
                result.warning_count,
                if result.warning_count == 1 { "" } else { "s" }
            );
        }
        println!("Time: {}ms", result.duration_ms);
    }
}
