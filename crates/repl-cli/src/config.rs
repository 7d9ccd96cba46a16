//! Configuration loading and management.

use crate::cli::Args;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use repl_store::{DEFAULT_MAIN_FILE, IMPORT_MAP_FILE};
use std::path::Path;

/// Extensions loaded into the store.
pub const PROJECT_EXTENSIONS: &[&str] = &["vue", "js", "jsx", "ts", "tsx", "css", "json"];

const DEFAULT_IGNORES: &[&str] = &["**/node_modules/**", "**/dist/**", "**/.git/**"];

/// Configuration for sfc-repl.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory.
    pub workspace: Utf8PathBuf,
    /// Whether the project keeps its sources under `src/`. Only `src/` and
    /// the import map are loaded then.
    pub has_src_dir: bool,
    /// Main file in store form (`src/...`).
    pub main_file: String,
    /// Compiled ignore patterns.
    pub ignore: GlobSet,
    /// Ignore patterns as given.
    pub ignore_patterns: Vec<String>,
}

impl Config {
    /// Load configuration from CLI arguments and the project directory.
    pub fn load(workspace: &Path, args: &Args) -> Result<Self> {
        let workspace = workspace
            .canonicalize()
            .into_diagnostic()
            .wrap_err_with(|| format!("Project directory not found: {}", workspace.display()))?;
        let workspace = Utf8PathBuf::from_path_buf(workspace)
            .map_err(|path| miette!("Project path is not valid UTF-8: {}", path.display()))?;

        let mut ignore_patterns: Vec<String> =
            DEFAULT_IGNORES.iter().map(|p| p.to_string()).collect();
        ignore_patterns.extend(args.ignore.iter().cloned());

        let mut builder = GlobSetBuilder::new();
        for pattern in &ignore_patterns {
            let glob = Glob::new(pattern)
                .into_diagnostic()
                .wrap_err_with(|| format!("Invalid ignore pattern `{pattern}`"))?;
            builder.add(glob);
        }
        let ignore = builder.build().into_diagnostic()?;

        let main_file = args
            .main
            .as_deref()
            .map(repl_store::add_src_prefix)
            .unwrap_or_else(|| DEFAULT_MAIN_FILE.to_string());

        Ok(Self {
            has_src_dir: workspace.join("src").is_dir(),
            workspace,
            main_file,
            ignore,
            ignore_patterns,
        })
    }

    /// Whether a path relative to the workspace belongs to the project.
    pub fn should_process(&self, relative: &Utf8Path) -> bool {
        if relative.as_str() == IMPORT_MAP_FILE {
            return true;
        }
        let Some(ext) = relative.extension() else {
            return false;
        };
        if !PROJECT_EXTENSIONS.contains(&ext) || self.ignore.is_match(relative) {
            return false;
        }
        let in_src = relative.starts_with("src");
        if self.has_src_dir {
            in_src
        } else {
            // Root-level manifests such as package.json are not modules.
            ext != "json"
        }
    }

    /// Path relative to the workspace, if the path is inside it.
    pub fn relative<'a>(&self, path: &'a Utf8Path) -> Option<&'a Utf8Path> {
        path.strip_prefix(&self.workspace).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn load(dir: &Path, extra: &[&str]) -> Config {
        let mut argv = vec!["sfc-repl"];
        argv.extend_from_slice(extra);
        Config::load(dir, &Args::parse_from(argv)).unwrap()
    }

    #[test]
    fn test_src_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let config = load(dir.path(), &["--main", "Main.vue"]);

        assert!(config.has_src_dir);
        assert_eq!(config.main_file, "src/Main.vue");
        assert!(config.should_process(Utf8Path::new("src/App.vue")));
        assert!(config.should_process(Utf8Path::new("src/data.json")));
        assert!(config.should_process(Utf8Path::new(IMPORT_MAP_FILE)));
        assert!(!config.should_process(Utf8Path::new("vite.config.ts")));
        assert!(!config.should_process(Utf8Path::new("src/notes.md")));
        assert!(!config.should_process(Utf8Path::new("src/node_modules/x/index.js")));
    }

    #[test]
    fn test_flat_layout_and_custom_ignores() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path(), &["--ignore", "**/legacy/**"]);

        assert!(!config.has_src_dir);
        assert_eq!(config.main_file, DEFAULT_MAIN_FILE);
        assert!(config.should_process(Utf8Path::new("App.vue")));
        assert!(!config.should_process(Utf8Path::new("package.json")));
        assert!(!config.should_process(Utf8Path::new("legacy/Old.vue")));
        assert_eq!(config.ignore_patterns.len(), 4);
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::parse_from(["sfc-repl", "--ignore", "a/{b"]);
        assert!(Config::load(dir.path(), &args).is_err());
    }
}
