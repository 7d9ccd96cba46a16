//! Reactive virtual file store for the sfc-repl pipeline.
//!
//! A [`Store`] owns the project files, the reserved `import-map.json`, the
//! current diagnostics and the active/main file pointers. It compiles files
//! through an [`sfc_compiler::Compiler`], publishes the active file on a
//! watch channel so a background task can recompile on every edit, and
//! round-trips the project through compact share-state strings.

pub mod error;
pub mod file;
pub mod import_map;
pub mod options;
pub mod share;
pub mod store;

pub use error::{Diagnostic, StoreError};
pub use file::{add_src_prefix, strip_src_prefix, File, DEFAULT_MAIN_FILE, IMPORT_MAP_FILE};
pub use import_map::ImportMap;
pub use options::{AlwaysConfirm, ConfirmPrompt, OutputMode, StoreOptions, Templates};
pub use share::ShareError;
pub use store::{ActiveCode, CompileOutcome, Store};

pub use sfc_compiler::CompiledCode;
