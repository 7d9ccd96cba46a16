//! Assembles compiled files into a module registry the preview can load.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use repl_store::{strip_src_prefix, File, ImportMap, Store, IMPORT_MAP_FILE};
use serde::Serialize;
use std::fmt;

static REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"require\s*\(\s*["']([^"']+)["']\s*\)"#).expect("require regex")
});

static SCRIPT_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(vue|js|ts|jsx|tsx)$").expect("extension regex"));

/// Suffixes tried, in order, when resolving a relative specifier.
pub const RESOLVE_EXTENSIONS: &[&str] = &["", ".vue", ".js", ".ts", ".jsx", ".tsx", ".json"];

/// A relative `require` that matched no project file. It is left as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionWarning {
    /// File containing the `require`.
    pub importer: String,
    pub specifier: String,
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not resolve \"{}\" from {}",
            self.specifier, self.importer
        )
    }
}

/// The loadable bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledModules {
    /// Module key → CommonJS code, in file order.
    pub modules: IndexMap<String, String>,
    /// Key of the entry module.
    pub main_module: String,
    /// All stylesheets, in file order.
    pub css: String,
    pub import_map: ImportMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ResolutionWarning>,
}

/// `src/components/Child.vue` → `components/Child`. Only script and
/// component extensions are dropped, so `data.json` keeps its suffix.
pub fn module_key(filename: &str) -> String {
    SCRIPT_EXTENSION
        .replace(strip_src_prefix(filename), "")
        .into_owned()
}

/// Apply `specifier` to the importer's directory, folding `.` and `..`
/// segments. A leading `/` resolves from the project root.
fn join(importer: &str, specifier: &str) -> String {
    let mut parts: Vec<&str> = match (specifier.starts_with('/'), importer.rsplit_once('/')) {
        (false, Some((dir, _))) => dir.split('/').collect(),
        _ => Vec::new(),
    };
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            segment => parts.push(segment),
        }
    }
    parts.join("/")
}

/// Find the project file a relative or root-relative specifier points at.
/// Each candidate suffix is probed as written and under `src/`.
pub fn resolve(importer: &str, specifier: &str, files: &IndexMap<String, File>) -> Option<String> {
    let base = join(importer, specifier);
    RESOLVE_EXTENSIONS.iter().find_map(|ext| {
        let candidate = format!("{base}{ext}");
        if files.contains_key(&candidate) {
            return Some(candidate);
        }
        let prefixed = format!("src/{candidate}");
        files.contains_key(&prefixed).then_some(prefixed)
    })
}

fn rewrite_requires(
    code: &str,
    importer: &str,
    files: &IndexMap<String, File>,
    warnings: &mut Vec<ResolutionWarning>,
) -> String {
    REQUIRE
        .replace_all(code, |caps: &Captures<'_>| {
            let specifier = &caps[1];
            if !specifier.starts_with('.') && !specifier.starts_with('/') {
                return caps[0].to_string();
            }
            match resolve(importer, specifier, files) {
                Some(resolved) => {
                    let key = module_key(&resolved);
                    tracing::debug!(importer, specifier, key = %key, "resolved require");
                    format!("require(\"{key}\")")
                }
                None => {
                    tracing::warn!(importer, specifier, "could not resolve require");
                    warnings.push(ResolutionWarning {
                        importer: importer.to_string(),
                        specifier: specifier.to_string(),
                    });
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Build the bundle from compiled files. Files without compiled script
/// only contribute their CSS; the import map file is skipped.
pub fn compile_modules(
    files: &IndexMap<String, File>,
    main_file: &str,
    import_map: ImportMap,
) -> CompiledModules {
    let mut modules = IndexMap::new();
    let mut css = String::new();
    let mut warnings = Vec::new();

    for (filename, file) in files {
        if filename == IMPORT_MAP_FILE {
            continue;
        }
        if !file.compiled.css.is_empty() {
            css.push_str(&file.compiled.css);
            css.push('\n');
        }
        if file.compiled.js.is_empty() {
            continue;
        }
        let code = rewrite_requires(&file.compiled.js, filename, files, &mut warnings);
        modules.insert(module_key(filename), code);
    }

    CompiledModules {
        modules,
        main_module: module_key(main_file),
        css: css.trim().to_string(),
        import_map,
        warnings,
    }
}

/// Bundle the store's current compiled state.
pub fn compile_store(store: &Store) -> CompiledModules {
    compile_modules(&store.files(), &store.main_filename(), store.import_map())
}

/// The import map as a `<script type="importmap">` element.
pub fn import_map_script(import_map: &ImportMap) -> String {
    format!(
        "<script type=\"importmap\">{}</script>",
        import_map.to_pretty_json()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use repl_store::CompiledCode;

    fn compiled(filename: &str, js: &str, css: &str) -> (String, File) {
        let mut file = File::new(filename, "");
        file.compiled = CompiledCode {
            js: js.to_string(),
            css: css.to_string(),
        };
        (filename.to_string(), file)
    }

    fn project(entries: Vec<(String, File)>) -> IndexMap<String, File> {
        entries.into_iter().collect()
    }

    #[test]
    fn test_module_key() {
        assert_eq!(module_key("src/App.vue"), "App");
        assert_eq!(module_key("src/components/Child.tsx"), "components/Child");
        assert_eq!(module_key("src/data.json"), "data.json");
        assert_eq!(module_key("lib/util.js"), "lib/util");
    }

    #[test]
    fn test_relative_require_resolves_to_module_key() {
        let files = project(vec![
            compiled("src/App.vue", "var Child = require('./Child');", ""),
            compiled("src/Child.vue", "exports.default = {};", ""),
        ]);
        let bundle = compile_modules(&files, "src/App.vue", ImportMap::builtin());
        assert_eq!(bundle.modules["App"], "var Child = require(\"Child\");");
        assert_eq!(bundle.main_module, "App");
        assert!(bundle.warnings.is_empty());
    }

    #[test]
    fn test_parent_and_root_specifiers() {
        let files = project(vec![
            compiled(
                "src/components/A.vue",
                "require(\"../utils/fmt\"); require('/src/data.json'); require(\"./../components/./B.vue\")",
                "",
            ),
            compiled("src/components/B.vue", "1", ""),
            compiled("src/utils/fmt.ts", "2", ""),
            compiled("src/data.json", "3", ""),
        ]);
        let bundle = compile_modules(&files, "src/components/A.vue", ImportMap::default());
        assert_eq!(
            bundle.modules["components/A"],
            "require(\"utils/fmt\"); require(\"data.json\"); require(\"components/B\")"
        );
    }

    #[test]
    fn test_src_prefix_is_probed_for_root_specifiers() {
        let files = project(vec![
            compiled("src/main.js", "require('/util')", ""),
            compiled("src/util.js", "1", ""),
        ]);
        assert_eq!(resolve("src/main.js", "/util", &files), Some("src/util.js".to_string()));
        assert_eq!(
            compile_modules(&files, "src/main.js", ImportMap::default()).modules["main"],
            "require(\"util\")"
        );
    }

    #[test]
    fn test_bare_and_unresolved_specifiers_stay() {
        let files = project(vec![compiled(
            "src/App.vue",
            "var vue = require('vue'); var x = require('./missing');",
            "",
        )]);
        let bundle = compile_modules(&files, "src/App.vue", ImportMap::default());
        assert_eq!(
            bundle.modules["App"],
            "var vue = require('vue'); var x = require('./missing');"
        );
        assert_eq!(
            bundle.warnings,
            [ResolutionWarning {
                importer: "src/App.vue".to_string(),
                specifier: "./missing".to_string(),
            }]
        );
        assert_eq!(
            bundle.warnings[0].to_string(),
            "Could not resolve \"./missing\" from src/App.vue"
        );
    }

    #[test]
    fn test_css_order_and_script_less_files() {
        let files = project(vec![
            compiled("src/App.vue", "a", ".a{}"),
            compiled("src/base.css", "", "body{}"),
            compiled(IMPORT_MAP_FILE, "ignored", "ignored"),
            compiled("src/B.vue", "b", ""),
        ]);
        let bundle = compile_modules(&files, "src/App.vue", ImportMap::default());
        assert_eq!(bundle.css, ".a{}\nbody{}");
        assert_eq!(bundle.modules.keys().collect::<Vec<_>>(), ["App", "B"]);
    }

    #[test]
    fn test_main_module_without_compiled_code() {
        let files = project(vec![compiled("src/App.vue", "", "")]);
        let bundle = compile_modules(&files, "src/App.vue", ImportMap::default());
        assert!(bundle.modules.is_empty());
        assert_eq!(bundle.main_module, "App");
    }

    #[test]
    fn test_import_map_script() {
        insta::assert_snapshot!(import_map_script(&ImportMap::builtin()), @r#"
        <script type="importmap">{
          "imports": {
            "vue": "https://cdn.jsdelivr.net/npm/vue@2.7.16/dist/vue.esm.browser.min.js"
          }
        }</script>
        "#);
    }

    #[tokio::test]
    async fn test_compile_store() {
        let store = Store::default();
        store.add_file(File::new("src/Child.vue", "<template><b>child</b></template>"));
        store.update_code(
            "src/App.vue",
            "<script>\nimport Child from './Child.vue'\nexport default { components: { Child } }\n</script>\n<template><Child/></template>",
        );
        store.init().await;
        assert!(store.diagnostics().is_empty());

        let bundle = compile_store(&store);
        assert_eq!(bundle.main_module, "App");
        assert_eq!(bundle.modules.keys().collect::<Vec<_>>(), ["App", "Child"]);
        assert!(bundle.modules["App"].contains("require(\"Child\")"));
        assert_eq!(bundle.import_map, ImportMap::builtin());
    }
}
