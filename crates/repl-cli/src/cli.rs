//! Command-line argument parsing.

use clap::Parser;
use repl_store::OutputMode;
use std::path::PathBuf;

/// Compile a Vue 2.7 single-file component project into a preview bundle
#[derive(Parser, Debug, Clone)]
#[command(name = "sfc-repl")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Project directory (defaults to the current directory)
    pub workspace: Option<PathBuf>,

    /// Main component, relative to `src/`
    #[arg(short, long)]
    pub main: Option<String>,

    /// Load the project from a share state (`#...`) instead of a directory
    #[arg(long, value_name = "STATE")]
    pub open: Option<String>,

    /// Print a share state for the project
    #[arg(long)]
    pub share: bool,

    /// Write the preview bundle as an `eval` message to this file (`-` for stdout)
    #[arg(long, value_name = "PATH")]
    pub bundle: Option<PathBuf>,

    /// Print the compiled output of the main file
    #[arg(long, value_name = "MODE")]
    pub print: Option<PrintMode>,

    /// Run in watch mode
    #[arg(short, long)]
    pub watch: bool,

    /// Output format
    #[arg(long, default_value = "human")]
    pub output: OutputFormat,

    /// Report files changed since the previous run (watch mode)
    #[arg(long)]
    pub track_changes: bool,

    /// Fail on warnings
    #[arg(long)]
    pub fail_on_warning: bool,

    /// Show timing information
    #[arg(long)]
    pub timings: bool,

    /// Maximum number of errors to show
    #[arg(long)]
    pub max_errors: Option<usize>,

    /// Ignore patterns (glob)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Preserve watch output (don't clear screen)
    #[arg(long)]
    pub preserve_watch_output: bool,
}

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON lines
    Json,
    /// Machine-readable output
    Machine,
}

/// Compiled output to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PrintMode {
    /// JavaScript of the main file
    Js,
    /// CSS of the whole bundle
    Css,
}

impl From<PrintMode> for OutputMode {
    fn from(mode: PrintMode) -> Self {
        match mode {
            PrintMode::Js => OutputMode::Js,
            PrintMode::Css => OutputMode::Css,
        }
    }
}

impl Args {
    /// Whether output should be verbose.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}
