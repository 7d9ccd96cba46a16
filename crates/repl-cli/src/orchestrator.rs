//! Orchestrator for loading, compiling and bundling a project.

use crate::cli::Args;
use crate::config::Config;
use crate::output::OutputFormatter;
use camino::Utf8Path;
use indexmap::IndexMap;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use repl_preview::{
    compile_store, ChannelError, CompiledModules, ExecutionContext, PreviewChannel,
    PreviewMessage, DEFAULT_READY_TIMEOUT,
};
use repl_store::{strip_src_prefix, OutputMode, Store, StoreOptions, IMPORT_MAP_FILE};
use sfc_compiler::Compiler;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Quiet period after a change before the project is reloaded.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Result of one run.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Number of project files loaded.
    pub file_count: usize,
    /// Number of modules in the bundle.
    pub module_count: usize,
    /// Number of errors.
    pub error_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Time taken.
    pub duration_ms: u64,
}

/// Preview context that writes every `eval` message as JSON to a file, or
/// to stdout for `-`.
struct BundleSink {
    target: PathBuf,
}

impl ExecutionContext for BundleSink {
    fn post(&self, message: PreviewMessage) -> Result<(), ChannelError> {
        let json = serde_json::to_string_pretty(&message)?;
        if self.target.as_os_str() == "-" {
            println!("{json}");
            return Ok(());
        }
        std::fs::write(&self.target, json + "\n")
            .map_err(|err| ChannelError::Delivery(format!("{}: {err}", self.target.display())))
    }
}

/// Orchestrator for running sfc-repl.
pub struct Orchestrator {
    config: Config,
    args: Args,
    formatter: OutputFormatter,
    store: Store,
    channel: PreviewChannel,
    runs: usize,
}

impl Orchestrator {
    pub fn new(workspace: PathBuf, args: Args) -> Result<Self> {
        let config = Config::load(&workspace, &args)?;
        let formatter = OutputFormatter::new(args.output);

        if let Some(state) = &args.open {
            repl_store::share::decode(state)
                .into_diagnostic()
                .wrap_err("Invalid share state")?;
        }
        let options = StoreOptions {
            main_file: config.main_file.clone(),
            track_file_changes: args.track_changes,
            show_output: args.print.is_some(),
            output_mode: args.print.map(OutputMode::from).unwrap_or_default(),
            ..StoreOptions::default()
        };
        let store = Store::new(Compiler::builtin(), options, args.open.as_deref());

        let channel = PreviewChannel::new();
        if let Some(target) = args.bundle.clone() {
            // A file sink can take messages as soon as it exists.
            let port = channel.attach(Arc::new(BundleSink { target }));
            port.post(PreviewMessage::Ready).into_diagnostic()?;
        }

        Ok(Self {
            config,
            args,
            formatter,
            store,
            channel,
            runs: 0,
        })
    }

    #[cfg(test)]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Load, compile and bundle once.
    pub async fn run_once(&mut self) -> Result<RunResult> {
        let start = Instant::now();

        self.store.set_loading(true);
        if self.args.open.is_some() {
            self.store.init().await;
        } else {
            let files = self.load_project()?;
            if self.args.verbose {
                eprintln!("Found {} project files", files.len());
                eprintln!("Ignoring: {}", self.config.ignore_patterns.join(", "));
            }
            let main = self.resolve_main(&files)?;
            self.store.set_files(files, Some(main.as_str())).await;
        }
        self.store.set_loading(false);

        let diagnostics = self.store.diagnostics();
        let bundle = compile_store(&self.store);

        for diagnostic in diagnostics
            .iter()
            .take(self.args.max_errors.unwrap_or(usize::MAX))
        {
            self.formatter.print_diagnostic(diagnostic);
        }
        for warning in &bundle.warnings {
            self.formatter.print_warning(warning);
        }

        if self.store.track_file_changes() {
            if self.runs > 0 {
                self.formatter.print_modified(&self.store.modified_files());
            }
            self.store.mark_all_as_saved();
        }
        self.print_output(&bundle);
        if self.args.share {
            self.formatter.print_share(&self.store.serialize());
        }

        let result = RunResult {
            file_count: self
                .store
                .files()
                .keys()
                .filter(|name| *name != IMPORT_MAP_FILE)
                .count(),
            module_count: bundle.modules.len(),
            error_count: diagnostics.len(),
            warning_count: bundle.warnings.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if self.args.bundle.is_some() {
            self.channel
                .ensure_ready(DEFAULT_READY_TIMEOUT)
                .await
                .into_diagnostic()?;
            self.channel
                .eval(bundle)
                .into_diagnostic()
                .wrap_err("Failed to write the preview bundle")?;
        }

        if self.args.timings {
            eprintln!("\nTiming: {}ms", result.duration_ms);
        }
        self.formatter.print_summary(&result);
        self.runs += 1;

        Ok(result)
    }

    /// Run in watch mode.
    pub async fn run_watch_mode(&mut self) -> Result<()> {
        use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};

        if self.args.open.is_some() {
            return Err(miette!("Watch mode needs a project directory, not a share state"));
        }

        eprintln!("Starting watch mode...\n");
        if let Err(err) = self.run_once().await {
            eprintln!("{err:?}");
        }

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
        )
        .into_diagnostic()?;
        watcher
            .watch(self.config.workspace.as_std_path(), RecursiveMode::Recursive)
            .into_diagnostic()?;

        while let Some(event) = rx.recv().await {
            if !self.is_relevant(&event) {
                continue;
            }
            tokio::time::sleep(DEBOUNCE).await;
            while rx.try_recv().is_ok() {}

            if !self.args.preserve_watch_output {
                // Clear screen
                print!("\x1B[2J\x1B[1;1H");
            }
            eprintln!("File change detected. Rerunning...\n");
            if let Err(err) = self.run_once().await {
                eprintln!("{err:?}");
            }
        }

        Ok(())
    }

    fn is_relevant(&self, event: &notify::Event) -> bool {
        event.paths.iter().any(|path| {
            Utf8Path::from_path(path)
                .and_then(|path| self.config.relative(path))
                .is_some_and(|relative| self.config.should_process(relative))
        })
    }

    /// Read every project file, keyed by its path relative to the workspace.
    fn load_project(&self) -> Result<IndexMap<String, String>> {
        let mut files = IndexMap::new();

        for entry in walkdir::WalkDir::new(&self.config.workspace)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 path");
                continue;
            };
            let Some(relative) = self.config.relative(path) else {
                continue;
            };
            if !self.config.should_process(relative) {
                continue;
            }

            let code = std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read {path}"))?;
            files.insert(relative.as_str().replace('\\', "/"), code);
        }

        Ok(files)
    }

    /// The configured main file if the project has it. Without `--main`,
    /// a project lacking `App.vue` falls back to its first component.
    fn resolve_main(&self, files: &IndexMap<String, String>) -> Result<String> {
        let main = &self.config.main_file;
        let present = |name: &str| files.contains_key(name) || files.contains_key(strip_src_prefix(name));
        if present(main) {
            return Ok(main.clone());
        }
        if self.args.main.is_some() {
            return Err(miette!("Main file `{main}` not found in {}", self.config.workspace));
        }
        Ok(files
            .keys()
            .find(|name| name.ends_with(".vue"))
            .map(|name| repl_store::add_src_prefix(name))
            .unwrap_or_else(|| main.clone()))
    }

    fn print_output(&self, bundle: &CompiledModules) {
        if !self.store.show_output() {
            return;
        }
        match self.store.output_mode() {
            OutputMode::Js => {
                if let Some(file) = self.store.file(&self.store.main_filename()) {
                    println!("{}", file.compiled.js);
                }
            }
            OutputMode::Css => println!("{}", bundle.css),
            OutputMode::Preview => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn write(dir: &Path, name: &str, code: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, code).unwrap();
    }

    fn build(dir: &Path, extra: &[&str]) -> Result<Orchestrator> {
        let mut argv = vec!["sfc-repl", dir.to_str().unwrap()];
        argv.extend_from_slice(extra);
        Orchestrator::new(dir.to_path_buf(), Args::parse_from(argv))
    }

    #[tokio::test]
    async fn test_project_is_bundled() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/App.vue",
            "<script>\nimport Child from './Child.vue'\nexport default { components: { Child } }\n</script>\n<template><Child/></template>",
        );
        write(
            dir.path(),
            "src/Child.vue",
            "<template><b class=\"c\">child</b></template>\n<style scoped>\n.c { color: red }\n</style>",
        );
        write(dir.path(), "package.json", "{}");
        let bundle_path = dir.path().join("bundle.json");

        let mut orchestrator =
            build(dir.path(), &["--bundle", bundle_path.to_str().unwrap()]).unwrap();
        let result = orchestrator.run_once().await.unwrap();
        assert_eq!(result.file_count, 2);
        assert_eq!(result.module_count, 2);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.warning_count, 0);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(bundle_path).unwrap()).unwrap();
        assert_eq!(written["type"], "eval");
        assert_eq!(written["mainModule"], "App");
        assert!(written["modules"]["App"]
            .as_str()
            .unwrap()
            .contains("require(\"Child\")"));
        assert!(written["css"].as_str().unwrap().contains("red"));
        assert!(written["importMapCode"]
            .as_str()
            .unwrap()
            .starts_with("<script type=\"importmap\">"));
    }

    #[tokio::test]
    async fn test_errors_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/App.vue", "<template><p>ok</p></template>");
        write(dir.path(), "src/Broken.vue", "<script>\nexport default {\n</script>");
        write(dir.path(), "src/data.json", "{ \"a\": }");

        let mut orchestrator = build(dir.path(), &[]).unwrap();
        let result = orchestrator.run_once().await.unwrap();
        assert_eq!(result.file_count, 3);
        assert!(result.error_count >= 2);
        assert_eq!(result.module_count, 1);
    }

    #[tokio::test]
    async fn test_main_falls_back_to_first_component() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/Home.vue", "<template><p>home</p></template>");

        let mut orchestrator = build(dir.path(), &[]).unwrap();
        orchestrator.run_once().await.unwrap();
        assert_eq!(orchestrator.store().main_filename(), "src/Home.vue");

        let mut explicit = build(dir.path(), &["--main", "Missing.vue"]).unwrap();
        assert!(explicit.run_once().await.is_err());
    }

    #[tokio::test]
    async fn test_share_state_is_opened() {
        let dir = tempfile::tempdir().unwrap();
        let state = repl_store::share::encode(
            &[("App.vue".to_string(), "<template><p>shared</p></template>".to_string())]
                .into_iter()
                .collect(),
        );

        let mut orchestrator = build(dir.path(), &["--open", state.as_str()]).unwrap();
        let result = orchestrator.run_once().await.unwrap();
        assert_eq!(result.error_count, 0);
        assert_eq!(result.module_count, 1);
        assert_eq!(orchestrator.store().serialize(), state);

        assert!(build(dir.path(), &["--open", "#%%%"]).is_err());
    }
}
