//! Store configuration.

use crate::file::DEFAULT_MAIN_FILE;
use crate::import_map::ImportMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const WELCOME_TEMPLATE: &str = include_str!("../templates/welcome.vue");
const NEW_SFC_TEMPLATE: &str = include_str!("../templates/new-sfc.vue");

/// Asked before a destructive operation. Returning `false` cancels it.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Approves everything; used by non-interactive hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Starting contents for generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    /// Seeded into the main file of an empty project.
    pub welcome: String,
    /// Content of a new `.vue` file.
    pub new_sfc: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            welcome: WELCOME_TEMPLATE.to_string(),
            new_sfc: NEW_SFC_TEMPLATE.to_string(),
        }
    }
}

/// Which output pane the host shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    #[default]
    Preview,
    Js,
    Css,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Preview => "preview",
            OutputMode::Js => "js",
            OutputMode::Css => "css",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(OutputMode::Preview),
            "js" => Ok(OutputMode::Js),
            "css" => Ok(OutputMode::Css),
            other => Err(format!("unknown output mode `{other}`")),
        }
    }
}

/// Options for [`Store::new`](crate::Store::new).
#[derive(Clone)]
pub struct StoreOptions {
    /// Entry component, with or without the `src/` prefix.
    pub main_file: String,
    pub templates: Templates,
    /// Merged under the project's own `import-map.json`.
    pub builtin_import_map: ImportMap,
    pub show_output: bool,
    pub output_mode: OutputMode,
    /// Enables saved-state snapshots and [`Store::is_modified`](crate::Store::is_modified).
    pub track_file_changes: bool,
    pub confirm: Arc<dyn ConfirmPrompt>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            main_file: DEFAULT_MAIN_FILE.to_string(),
            templates: Templates::default(),
            builtin_import_map: ImportMap::builtin(),
            show_output: false,
            output_mode: OutputMode::default(),
            track_file_changes: false,
            confirm: Arc::new(AlwaysConfirm),
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("main_file", &self.main_file)
            .field("builtin_import_map", &self.builtin_import_map)
            .field("show_output", &self.show_output)
            .field("output_mode", &self.output_mode)
            .field("track_file_changes", &self.track_file_changes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_from_str() {
        assert_eq!("js".parse::<OutputMode>(), Ok(OutputMode::Js));
        assert_eq!(OutputMode::default().to_string(), "preview");
        assert!("html".parse::<OutputMode>().is_err());
    }

    #[test]
    fn test_closures_are_prompts() {
        let deny = |_: &str| false;
        assert!(!deny.confirm("delete?"));
        assert!(AlwaysConfirm.confirm("delete?"));
    }

    #[test]
    fn test_default_templates() {
        let templates = Templates::default();
        assert!(templates.welcome.contains("<template>"));
        assert!(templates.new_sfc.contains("<style scoped>"));
    }
}
