//! The file store.
//!
//! All state sits behind one mutex that is only ever held for synchronous
//! sections. Compiles snapshot a file's code and revision, run unlocked, and
//! commit only when the revision still matches, so a slow compile can never
//! overwrite the output of a newer edit.

use crate::error::{Diagnostic, StoreError};
use crate::file::{add_src_prefix, strip_src_prefix, File, DEFAULT_MAIN_FILE, IMPORT_MAP_FILE};
use crate::import_map::ImportMap;
use crate::options::{ConfirmPrompt, OutputMode, StoreOptions, Templates};
use crate::share;
use indexmap::IndexMap;
use sfc_compiler::{CompileResult, CompiledCode, Compiler};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Active file identity and content, as seen by the recompiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCode {
    pub filename: String,
    pub code: String,
}

/// Result of compiling one stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The output was stored; carries the file's diagnostics.
    Committed(Vec<Diagnostic>),
    /// The file changed or was removed while compiling; nothing was stored.
    Stale,
    /// No such file.
    Missing,
}

impl CompileOutcome {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileOutcome::Committed(diagnostics) => diagnostics,
            CompileOutcome::Stale | CompileOutcome::Missing => &[],
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            CompileOutcome::Committed(diagnostics) => diagnostics,
            CompileOutcome::Stale | CompileOutcome::Missing => Vec::new(),
        }
    }
}

struct StoreState {
    files: IndexMap<String, File>,
    active_filename: String,
    main_filename: String,
    builtin_import_map: ImportMap,
    templates: Templates,
    diagnostics: Vec<Diagnostic>,
    show_output: bool,
    output_mode: OutputMode,
    loading: bool,
    track_file_changes: bool,
    saved: IndexMap<String, String>,
    last_revision: u64,
    version: u64,
}

impl StoreState {
    fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }

    fn insert(&mut self, mut file: File) {
        file.revision = self.next_revision();
        self.files.insert(file.filename.clone(), file);
    }

    fn seed_main(&mut self) {
        let main = File::new(self.main_filename.clone(), self.templates.welcome.clone());
        self.insert(main);
    }

    fn has_project_file(&self) -> bool {
        self.files.keys().any(|name| name != IMPORT_MAP_FILE)
    }

    /// Parse the reserved file. A syntax error replaces the diagnostics with
    /// a single message and yields an empty map.
    fn read_import_map(&mut self) -> ImportMap {
        let code = self
            .files
            .get(IMPORT_MAP_FILE)
            .map(|file| file.code.as_str())
            .unwrap_or_default();
        match ImportMap::parse(code) {
            Ok(map) => map,
            Err(err) => {
                self.diagnostics = vec![Diagnostic::Message(format!(
                    "Syntax error in {IMPORT_MAP_FILE}: {err}"
                ))];
                ImportMap::default()
            }
        }
    }

    fn write_import_map(&mut self, map: &ImportMap) {
        let code = map.to_pretty_json();
        let revision = self.next_revision();
        match self.files.get_mut(IMPORT_MAP_FILE) {
            Some(file) => {
                file.code = code;
                file.revision = revision;
            }
            None => self.insert(File::new(IMPORT_MAP_FILE, code)),
        }
    }

    fn apply_builtin_import_map(&mut self) {
        let current = self.read_import_map();
        let merged = self.builtin_import_map.merge(&current);
        self.write_import_map(&merged);
    }

    /// Restore the invariants: a project file exists, `main` and `active`
    /// name existing files and the import map is present.
    fn repair(&mut self) {
        if !self.has_project_file() {
            if self.main_filename == IMPORT_MAP_FILE {
                self.main_filename = DEFAULT_MAIN_FILE.to_string();
            }
            self.seed_main();
        }
        if !self.files.contains_key(&self.main_filename) || self.main_filename == IMPORT_MAP_FILE {
            self.main_filename = self
                .files
                .keys()
                .find(|name| *name != IMPORT_MAP_FILE)
                .cloned()
                .unwrap_or_else(|| DEFAULT_MAIN_FILE.to_string());
        }
        if !self.files.contains_key(IMPORT_MAP_FILE) {
            let map = self.builtin_import_map.clone();
            self.write_import_map(&map);
        }
        if !self.files.contains_key(&self.active_filename) {
            self.active_filename = self.main_filename.clone();
        }
    }

    fn deserialize(&mut self, serialized: &str) -> Result<(), share::ShareError> {
        match share::decode(serialized) {
            Ok(saved) => {
                for (filename, code) in saved {
                    self.insert(File::new(add_src_prefix(&filename), code));
                }
                self.apply_builtin_import_map();
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to restore share state");
                self.seed_main();
                Err(err)
            }
        }
    }

    fn active_code(&self) -> Option<ActiveCode> {
        self.files.get(&self.active_filename).map(|file| ActiveCode {
            filename: file.filename.clone(),
            code: file.code.clone(),
        })
    }
}

/// Store a compile result on the file and turn its errors into diagnostics.
fn apply_result(file: &mut File, result: CompileResult) -> Vec<Diagnostic> {
    match result {
        Ok(compiled) => {
            file.compiled = compiled;
            Vec::new()
        }
        Err(errors) => {
            file.compiled = CompiledCode::default();
            errors
                .into_iter()
                .map(|error| Diagnostic::Compile {
                    filename: file.filename.clone(),
                    error,
                })
                .collect()
        }
    }
}

struct Inner {
    compiler: Compiler,
    confirm: Arc<dyn ConfirmPrompt>,
    state: Mutex<StoreState>,
    active: watch::Sender<Option<ActiveCode>>,
    version: watch::Sender<u64>,
}

/// Reactive virtual file store. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Create a store from a share-state string, or from the welcome
    /// template when there is none. A broken share state is logged and
    /// replaced by the welcome template.
    pub fn new(compiler: Compiler, options: StoreOptions, serialized: Option<&str>) -> Self {
        let StoreOptions {
            main_file,
            templates,
            builtin_import_map,
            show_output,
            output_mode,
            track_file_changes,
            confirm,
        } = options;
        let main_filename = add_src_prefix(&main_file);

        let mut state = StoreState {
            files: IndexMap::new(),
            active_filename: main_filename.clone(),
            main_filename,
            builtin_import_map,
            templates,
            diagnostics: Vec::new(),
            show_output,
            output_mode,
            loading: false,
            track_file_changes,
            saved: IndexMap::new(),
            last_revision: 0,
            version: 0,
        };
        match serialized {
            Some(serialized) => {
                let _ = state.deserialize(serialized);
            }
            None => state.seed_main(),
        }
        state.repair();
        state.active_filename = state.main_filename.clone();
        state.apply_builtin_import_map();

        let (active, _) = watch::channel(state.active_code());
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                compiler,
                confirm,
                state: Mutex::new(state),
                active,
                version,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_active(&self, state: &StoreState) {
        let next = state.active_code();
        self.inner.active.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn bump_version(&self, state: &mut StoreState) {
        state.version += 1;
        self.inner.version.send_replace(state.version);
    }

    pub fn compiler(&self) -> &Compiler {
        &self.inner.compiler
    }

    /// Compile every file except the import map, accumulating diagnostics.
    pub async fn init(&self) {
        let filenames: Vec<String> = {
            let mut state = self.state();
            if !state.files.contains_key(IMPORT_MAP_FILE) {
                let map = state.builtin_import_map.clone();
                state.write_import_map(&map);
            }
            state.diagnostics.clear();
            state
                .files
                .keys()
                .filter(|name| *name != IMPORT_MAP_FILE)
                .cloned()
                .collect()
        };
        for filename in filenames {
            let diagnostics = self.compile_file(&filename).await.into_diagnostics();
            self.state().diagnostics.extend(diagnostics);
        }
    }

    fn snapshot(&self, filename: &str) -> Option<(String, u64)> {
        self.state()
            .files
            .get(filename)
            .map(|file| (file.code.clone(), file.revision))
    }

    /// Compile one file and store its output, unless the file was edited or
    /// removed in the meantime.
    pub async fn compile_file(&self, filename: &str) -> CompileOutcome {
        let Some((code, revision)) = self.snapshot(filename) else {
            return CompileOutcome::Missing;
        };
        let result = self.inner.compiler.compile_file(filename, &code).await;

        let mut state = self.state();
        let Some(file) = state
            .files
            .get_mut(filename)
            .filter(|file| file.revision == revision)
        else {
            tracing::warn!(filename, revision, "discarding stale compile result");
            return CompileOutcome::Stale;
        };
        let diagnostics = apply_result(file, result);
        self.bump_version(&mut state);
        CompileOutcome::Committed(diagnostics)
    }

    /// Recompile the active file once and make its diagnostics current.
    pub async fn recompile_active(&self) -> CompileOutcome {
        let filename = self.active_filename();
        let outcome = self.compile_file(&filename).await;
        if let CompileOutcome::Committed(diagnostics) = &outcome {
            self.state().diagnostics = diagnostics.clone();
        }
        outcome
    }

    /// Observe the active file. Every edit or switch publishes a new value.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveCode>> {
        self.inner.active.subscribe()
    }

    /// Observe the commit counter.
    pub fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    /// Run a task that recompiles the active file now and after each change
    /// to it. The task lives as long as the store; abort the handle to stop.
    pub fn spawn_recompiler(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut active = self.subscribe();
        active.mark_changed();
        tokio::spawn(async move {
            while active.changed().await.is_ok() {
                let current = active.borrow_and_update().clone();
                let Some(current) = current else {
                    continue;
                };
                let outcome = store.compile_file(&current.filename).await;
                if let CompileOutcome::Committed(diagnostics) = outcome {
                    store.state().diagnostics = diagnostics;
                }
            }
        })
    }

    pub fn set_active(&self, filename: &str) -> bool {
        let mut state = self.state();
        if !state.files.contains_key(filename) {
            return false;
        }
        state.active_filename = filename.to_string();
        self.notify_active(&state);
        true
    }

    pub fn active_file(&self) -> Option<File> {
        let state = self.state();
        state.files.get(&state.active_filename).cloned()
    }

    pub fn active_filename(&self) -> String {
        self.state().active_filename.clone()
    }

    pub fn main_filename(&self) -> String {
        self.state().main_filename.clone()
    }

    pub fn file(&self, filename: &str) -> Option<File> {
        self.state().files.get(filename).cloned()
    }

    /// Every file, in insertion order.
    pub fn files(&self) -> IndexMap<String, File> {
        self.state().files.clone()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.state().diagnostics.clone()
    }

    /// Number of compile results committed so far.
    pub fn version(&self) -> u64 {
        self.state().version
    }

    /// Replace a file's code. Returns `false` if there is no such file.
    pub fn update_code(&self, filename: &str, code: impl Into<String>) -> bool {
        let code = code.into();
        let mut state = self.state();
        let revision = state.next_revision();
        let Some(file) = state.files.get_mut(filename) else {
            return false;
        };
        if file.code == code {
            return true;
        }
        file.code = code;
        file.revision = revision;
        self.notify_active(&state);
        true
    }

    /// Insert a file, replacing one with the same name in place. Visible
    /// files become active.
    pub fn add_file(&self, file: File) {
        let mut state = self.state();
        let (filename, hidden) = (file.filename.clone(), file.hidden);
        state.insert(file);
        if !hidden {
            state.active_filename = filename;
        }
        self.notify_active(&state);
    }

    /// Add an empty file; `.vue` files start from the new-component template.
    pub fn add_new_file(&self, filename: &str) {
        let code = if filename.ends_with(".vue") {
            self.state().templates.new_sfc.clone()
        } else {
            String::new()
        };
        self.add_file(File::new(filename, code));
    }

    /// Delete a file after confirmation. Returns whether it was removed.
    pub fn delete_file(&self, filename: &str) -> bool {
        let message = format!(
            "Are you sure you want to delete {}?",
            strip_src_prefix(filename)
        );
        if !self.inner.confirm.confirm(&message) {
            return false;
        }

        let mut state = self.state();
        if state.files.shift_remove(filename).is_none() {
            return false;
        }
        state.saved.shift_remove(filename);
        let was_active = state.active_filename == filename;
        state.repair();
        if was_active {
            state.active_filename = state.main_filename.clone();
        }
        self.notify_active(&state);
        true
    }

    /// Rename a file in place. Failures are reported as the only diagnostic.
    /// A renamed background file is recompiled under its new name.
    pub async fn rename_file(&self, old: &str, new: &str) -> bool {
        let recompile = {
            let mut state = self.state();
            if !state.files.contains_key(old) {
                state.diagnostics = vec![Diagnostic::Message(format!(
                    "Could not rename \"{old}\", file not found"
                ))];
                return false;
            }
            if new.is_empty() || new == old {
                state.diagnostics = vec![Diagnostic::Message(format!(
                    "Cannot rename \"{old}\" to \"{new}\""
                ))];
                return false;
            }

            let revision = state.next_revision();
            let files = std::mem::take(&mut state.files);
            state.files = files
                .into_iter()
                .map(|(name, mut file)| {
                    if name == old {
                        file.filename = new.to_string();
                        file.revision = revision;
                        (new.to_string(), file)
                    } else {
                        (name, file)
                    }
                })
                .collect();
            if let Some(saved) = state.saved.shift_remove(old) {
                state.saved.insert(new.to_string(), saved);
            }
            if state.main_filename == old {
                state.main_filename = new.to_string();
            }
            let recompile = state.active_filename != old;
            if !recompile {
                state.active_filename = new.to_string();
            }
            self.notify_active(&state);
            recompile
        };

        if recompile {
            if let CompileOutcome::Committed(diagnostics) = self.compile_file(new).await {
                self.state().diagnostics = diagnostics;
            }
        }
        true
    }

    /// Replace the whole project. Files are compiled one after another and
    /// swapped in together; a failing file only contributes diagnostics.
    /// `main` defaults to the current main file.
    pub async fn set_files(&self, contents: IndexMap<String, String>, main: Option<&str>) {
        let (main, welcome) = {
            let state = self.state();
            let main = add_src_prefix(main.unwrap_or(&state.main_filename));
            (main, state.templates.welcome.clone())
        };

        let mut files = IndexMap::new();
        if !contents.contains_key(strip_src_prefix(&main)) && !contents.contains_key(&main) {
            files.insert(main.clone(), File::new(main.clone(), welcome));
        }
        for (filename, code) in contents {
            let filename = add_src_prefix(&filename);
            files.insert(filename.clone(), File::new(filename, code));
        }

        let mut diagnostics = Vec::new();
        for file in files.values_mut() {
            if file.is_import_map() {
                continue;
            }
            let result = self.inner.compiler.compile_file(&file.filename, &file.code).await;
            diagnostics.extend(apply_result(file, result));
        }

        let mut state = self.state();
        state.files.clear();
        for file in files.into_values() {
            state.insert(file);
        }
        state.main_filename = main;
        state.diagnostics = diagnostics;
        state.apply_builtin_import_map();
        state.repair();
        state.active_filename = state.main_filename.clone();
        self.bump_version(&mut state);
        self.notify_active(&state);
    }

    /// Encode the project as a share state. Builtin import map entries are
    /// left out, and so is the import map when nothing else remains.
    pub fn serialize(&self) -> String {
        let state = self.state();
        let mut exported = IndexMap::new();
        for (filename, file) in &state.files {
            if file.is_import_map() {
                match ImportMap::parse(&file.code) {
                    Ok(map) => {
                        let pruned = map.without_builtin(&state.builtin_import_map);
                        if !pruned.is_empty() {
                            exported.insert(filename.clone(), pruned.to_pretty_json());
                        }
                    }
                    Err(_) => {
                        exported.insert(filename.clone(), file.code.clone());
                    }
                }
            } else {
                exported.insert(strip_src_prefix(filename).to_string(), file.code.clone());
            }
        }
        share::encode(&exported)
    }

    /// Load files from a share state on top of the current ones. On failure
    /// the main file is reset to the welcome template.
    pub fn deserialize(&self, serialized: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        let result = state.deserialize(serialized);
        state.repair();
        self.notify_active(&state);
        result.map_err(StoreError::from)
    }

    /// Filename (without `src/`) → code.
    pub fn get_files(&self) -> IndexMap<String, String> {
        self.state()
            .files
            .iter()
            .map(|(filename, file)| (strip_src_prefix(filename).to_string(), file.code.clone()))
            .collect()
    }

    pub fn import_map(&self) -> ImportMap {
        self.state().read_import_map()
    }

    /// Write the import map, optionally merged over the current one.
    pub fn set_import_map(&self, map: &ImportMap, merge: bool) {
        let mut state = self.state();
        let map = if merge {
            state.read_import_map().merge(map)
        } else {
            map.clone()
        };
        state.write_import_map(&map);
        self.notify_active(&state);
    }

    pub fn track_file_changes(&self) -> bool {
        self.state().track_file_changes
    }

    pub fn set_track_file_changes(&self, enabled: bool) {
        self.state().track_file_changes = enabled;
    }

    /// Remember the current code of one file as saved.
    pub fn mark_as_saved(&self, filename: &str) {
        let mut state = self.state();
        if !state.track_file_changes {
            return;
        }
        if let Some(code) = state.files.get(filename).map(|file| file.code.clone()) {
            state.saved.insert(filename.to_string(), code);
        }
    }

    /// Remember the current code of every project file as saved.
    pub fn mark_all_as_saved(&self) {
        let mut state = self.state();
        if !state.track_file_changes {
            return;
        }
        let saved: IndexMap<String, String> = state
            .files
            .values()
            .filter(|file| !file.is_import_map())
            .map(|file| (file.filename.clone(), file.code.clone()))
            .collect();
        state.saved = saved;
    }

    /// Whether a file differs from its saved snapshot. Files never saved
    /// count as modified; nothing is modified while tracking is off.
    pub fn is_modified(&self, filename: &str) -> bool {
        let state = self.state();
        if !state.track_file_changes {
            return false;
        }
        match (state.files.get(filename), state.saved.get(filename)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(file), Some(saved)) => file.code != *saved,
        }
    }

    /// Project files whose code differs from the saved snapshot.
    pub fn modified_files(&self) -> Vec<File> {
        let state = self.state();
        if !state.track_file_changes {
            return Vec::new();
        }
        state
            .files
            .values()
            .filter(|file| !file.is_import_map())
            .filter(|file| state.saved.get(&file.filename) != Some(&file.code))
            .cloned()
            .collect()
    }

    pub fn clear_saved_state(&self) {
        self.state().saved.clear();
    }

    pub fn show_output(&self) -> bool {
        self.state().show_output
    }

    pub fn set_show_output(&self, show: bool) {
        self.state().show_output = show;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.state().output_mode
    }

    pub fn set_output_mode(&self, mode: OutputMode) {
        self.state().output_mode = mode;
    }

    pub fn loading(&self) -> bool {
        self.state().loading
    }

    pub fn set_loading(&self, loading: bool) {
        self.state().loading = loading;
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Compiler::default(), StoreOptions::default(), None)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Store")
            .field("files", &state.files.keys().collect::<Vec<_>>())
            .field("active_filename", &state.active_filename)
            .field("main_filename", &state.main_filename)
            .field("version", &state.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> Store {
        Store::default()
    }

    #[test]
    fn test_new_store_has_main_and_import_map() {
        let store = store();
        assert_eq!(store.main_filename(), DEFAULT_MAIN_FILE);
        assert_eq!(store.active_filename(), DEFAULT_MAIN_FILE);
        assert_eq!(
            store.files().keys().collect::<Vec<_>>(),
            [DEFAULT_MAIN_FILE, IMPORT_MAP_FILE]
        );
        assert_eq!(store.import_map(), ImportMap::builtin());
    }

    #[test]
    fn test_add_file_activates_visible_files() {
        let store = store();
        store.add_new_file("src/Comp.vue");
        assert_eq!(store.active_filename(), "src/Comp.vue");
        assert!(store.active_file().unwrap().code.contains("New component"));

        store.add_file(File::new("src/secret.js", "").hidden());
        assert_eq!(store.active_filename(), "src/Comp.vue");
        assert!(store.file("src/secret.js").is_some());
    }

    #[test]
    fn test_add_file_overwrites_in_place() {
        let store = store();
        store.add_file(File::new("src/a.js", "1"));
        store.add_file(File::new("src/b.js", "2"));
        store.add_file(File::new("src/a.js", "3"));
        assert_eq!(
            store.files().keys().collect::<Vec<_>>(),
            [DEFAULT_MAIN_FILE, IMPORT_MAP_FILE, "src/a.js", "src/b.js"]
        );
        assert_eq!(store.file("src/a.js").unwrap().code, "3");
    }

    #[test]
    fn test_delete_asks_for_confirmation() {
        let asked = Arc::new(Mutex::new(Vec::new()));
        let log = asked.clone();
        let options = StoreOptions {
            confirm: Arc::new(move |message: &str| {
                log.lock().unwrap().push(message.to_string());
                false
            }),
            ..StoreOptions::default()
        };
        let store = Store::new(Compiler::default(), options, None);
        store.add_file(File::new("src/a.js", ""));

        assert!(!store.delete_file("src/a.js"));
        assert!(store.file("src/a.js").is_some());
        assert_eq!(*asked.lock().unwrap(), ["Are you sure you want to delete a.js?"]);
    }

    #[test]
    fn test_delete_active_falls_back_to_main() {
        let store = store();
        store.add_file(File::new("src/a.js", ""));
        assert!(store.delete_file("src/a.js"));
        assert_eq!(store.active_filename(), DEFAULT_MAIN_FILE);

        assert!(store.delete_file(DEFAULT_MAIN_FILE));
        assert_eq!(store.main_filename(), DEFAULT_MAIN_FILE);
        assert!(store.file(DEFAULT_MAIN_FILE).is_some());
    }

    #[test]
    fn test_delete_main_picks_next_project_file() {
        let store = store();
        store.add_file(File::new("src/b.js", ""));
        store.set_active(DEFAULT_MAIN_FILE);
        assert!(store.delete_file(DEFAULT_MAIN_FILE));
        assert_eq!(store.main_filename(), "src/b.js");
        assert_eq!(store.active_filename(), "src/b.js");
    }

    #[tokio::test]
    async fn test_rename_errors() {
        let store = store();
        assert!(!store.rename_file("src/nope.vue", "src/x.vue").await);
        assert_eq!(
            store.diagnostics(),
            [Diagnostic::message("Could not rename \"src/nope.vue\", file not found")]
        );
        assert!(!store.rename_file(DEFAULT_MAIN_FILE, "").await);
        assert_eq!(
            store.diagnostics(),
            [Diagnostic::message("Cannot rename \"src/App.vue\" to \"\"")]
        );
    }

    #[tokio::test]
    async fn test_rename_keeps_position_and_pointers() {
        let store = store();
        store.add_file(File::new("src/b.js", "export const b = 1"));
        store.set_active(DEFAULT_MAIN_FILE);

        assert!(store.rename_file("src/b.js", "src/c.js").await);
        assert_eq!(
            store.files().keys().collect::<Vec<_>>(),
            [DEFAULT_MAIN_FILE, IMPORT_MAP_FILE, "src/c.js"]
        );
        assert!(store.file("src/c.js").unwrap().compiled.js.contains("exports.b"));

        assert!(store.rename_file(DEFAULT_MAIN_FILE, "src/Main.vue").await);
        assert_eq!(store.main_filename(), "src/Main.vue");
        assert_eq!(store.active_filename(), "src/Main.vue");
        assert_eq!(store.files().keys().next().map(String::as_str), Some("src/Main.vue"));
    }

    #[test]
    fn test_malformed_import_map_is_reported() {
        let store = store();
        store.update_code(IMPORT_MAP_FILE, "{ \"imports\": ");
        assert_eq!(store.import_map(), ImportMap::default());
        let diagnostics = store.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .to_string()
            .starts_with("Syntax error in import-map.json: "));
    }

    #[test]
    fn test_set_import_map_merge() {
        let store = store();
        let extra = ImportMap::parse(r#"{"imports":{"lodash":"https://x/lodash.js"}}"#).unwrap();
        store.set_import_map(&extra, true);
        assert_eq!(
            store.import_map().imports.keys().collect::<Vec<_>>(),
            ["vue", "lodash"]
        );
        store.set_import_map(&extra, false);
        assert_eq!(store.import_map(), extra);
    }

    #[test]
    fn test_modification_tracking() {
        let store = store();
        assert!(!store.is_modified(DEFAULT_MAIN_FILE));

        store.set_track_file_changes(true);
        assert!(store.is_modified(DEFAULT_MAIN_FILE));
        assert!(!store.is_modified("src/missing.vue"));

        store.mark_all_as_saved();
        assert!(!store.is_modified(DEFAULT_MAIN_FILE));
        assert!(store.modified_files().is_empty());

        store.update_code(DEFAULT_MAIN_FILE, "<template><p/></template>");
        assert!(store.is_modified(DEFAULT_MAIN_FILE));
        assert_eq!(store.modified_files().len(), 1);

        store.mark_as_saved(DEFAULT_MAIN_FILE);
        assert!(!store.is_modified(DEFAULT_MAIN_FILE));

        store.clear_saved_state();
        assert!(store.is_modified(DEFAULT_MAIN_FILE));
    }

    #[test]
    fn test_output_toggles() {
        let store = store();
        assert!(!store.show_output());
        store.set_show_output(true);
        store.set_output_mode(OutputMode::Css);
        store.set_loading(true);
        assert!(store.show_output());
        assert_eq!(store.output_mode(), OutputMode::Css);
        assert!(store.loading());
    }

    #[test]
    fn test_update_code_notifies_only_for_active_file() {
        let store = store();
        store.add_file(File::new("src/a.js", "1"));
        let mut rx = store.subscribe();

        assert!(store.update_code(DEFAULT_MAIN_FILE, "<template/>"));
        assert!(!rx.has_changed().unwrap());

        assert!(store.update_code("src/a.js", "2"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().clone(),
            Some(ActiveCode {
                filename: "src/a.js".to_string(),
                code: "2".to_string()
            })
        );
        assert!(!store.update_code("src/missing.js", ""));
    }

    #[tokio::test]
    async fn test_init_compiles_every_project_file() {
        let store = store();
        store.add_file(File::new("src/bad.json", "{"));
        store.init().await;

        assert!(!store.file(DEFAULT_MAIN_FILE).unwrap().compiled.js.is_empty());
        assert_eq!(store.file(IMPORT_MAP_FILE).unwrap().compiled, CompiledCode::default());
        let diagnostics = store.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].filename(), Some("src/bad.json"));
        assert_eq!(store.version(), 2);
    }
}
