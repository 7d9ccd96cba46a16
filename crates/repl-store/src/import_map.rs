//! Browser import maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Runtime the preview loads when the project does not pin its own.
pub const VUE_RUNTIME_URL: &str =
    "https://cdn.jsdelivr.net/npm/vue@2.7.16/dist/vue.esm.browser.min.js";

/// A browser import map. Key order is kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMap {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub imports: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub scopes: IndexMap<String, IndexMap<String, String>>,
}

impl ImportMap {
    /// The map every project starts from.
    pub fn builtin() -> Self {
        let mut map = Self::default();
        map.imports.insert("vue".to_string(), VUE_RUNTIME_URL.to_string());
        map
    }

    /// Parse import map JSON. Empty input is an empty map.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }

    /// `self` overridden by `other`, key by key. Scopes are replaced whole.
    pub fn merge(&self, other: &ImportMap) -> ImportMap {
        let mut merged = self.clone();
        for (name, url) in &other.imports {
            merged.imports.insert(name.clone(), url.clone());
        }
        for (scope, entries) in &other.scopes {
            merged.scopes.insert(scope.clone(), entries.clone());
        }
        merged
    }

    /// Drop `imports` entries identical to the ones in `builtin`.
    pub fn without_builtin(&self, builtin: &ImportMap) -> ImportMap {
        let mut pruned = self.clone();
        pruned
            .imports
            .retain(|name, url| builtin.imports.get(name) != Some(url));
        pruned
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.scopes.is_empty()
    }

    /// Two-space indented JSON, the on-disk form of `import-map.json`.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
