//! Virtual files and filename conventions.

use sfc_compiler::{CompiledCode, Language};

/// Reserved file holding the preview import map. Never prefixed with `src/`.
pub const IMPORT_MAP_FILE: &str = "import-map.json";

/// Main file used when nothing else is available.
pub const DEFAULT_MAIN_FILE: &str = "src/App.vue";

pub const SRC_PREFIX: &str = "src/";

/// `src/App.vue` → `App.vue`; other names are returned unchanged.
pub fn strip_src_prefix(filename: &str) -> &str {
    filename.strip_prefix(SRC_PREFIX).unwrap_or(filename)
}

/// `App.vue` → `src/App.vue`. The import map and already prefixed names are
/// left alone.
pub fn add_src_prefix(filename: &str) -> String {
    if filename == IMPORT_MAP_FILE || filename.starts_with(SRC_PREFIX) {
        filename.to_string()
    } else {
        format!("{SRC_PREFIX}{filename}")
    }
}

/// One editable file of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub filename: String,
    pub code: String,
    /// Hidden files are compiled and bundled but never become active.
    pub hidden: bool,
    /// Output of the last committed compile; empty until then.
    pub compiled: CompiledCode,
    /// Stamp of the last code change, assigned by the store.
    pub revision: u64,
}

impl File {
    pub fn new(filename: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            code: code.into(),
            hidden: false,
            compiled: CompiledCode::default(),
            revision: 0,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn language(&self) -> Language {
        Language::of(&self.filename)
    }

    pub fn is_import_map(&self) -> bool {
        self.filename == IMPORT_MAP_FILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_src_prefix() {
        assert_eq!(add_src_prefix("App.vue"), "src/App.vue");
        assert_eq!(add_src_prefix("src/App.vue"), "src/App.vue");
        assert_eq!(add_src_prefix(IMPORT_MAP_FILE), IMPORT_MAP_FILE);
        assert_eq!(strip_src_prefix("src/components/A.vue"), "components/A.vue");
        assert_eq!(strip_src_prefix(IMPORT_MAP_FILE), IMPORT_MAP_FILE);
    }

    #[test]
    fn test_new_file() {
        let file = File::new("src/util.ts", "export {}").hidden();
        assert!(file.hidden);
        assert_eq!(file.compiled, CompiledCode::default());
        assert_eq!(file.language(), Language::TypedScript);
        assert!(File::new(IMPORT_MAP_FILE, "{}").is_import_map());
    }
}
