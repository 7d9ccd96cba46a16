//! Preview protocol messages. JSON objects tagged by `type`.

use crate::module_compiler::{import_map_script, CompiledModules};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A message between the host and the preview context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PreviewMessage {
    /// Context → host: bootstrapping finished.
    Ready,
    /// Host → context: run a bundle.
    Eval(EvalPayload),
    /// Context → host: an uncaught error.
    Error { value: PreviewError },
    /// Context → host: forwarded console output.
    Console(ConsoleMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalPayload {
    pub modules: IndexMap<String, String>,
    pub main_module: String,
    pub css: String,
    /// `<script type="importmap">` markup for the context's document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_map_code: Option<String>,
}

impl From<CompiledModules> for EvalPayload {
    fn from(bundle: CompiledModules) -> Self {
        Self {
            import_map_code: Some(import_map_script(&bundle.import_map)),
            modules: bundle.modules,
            main_module: bundle.main_module,
            css: bundle.css,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub args: Vec<String>,
}
