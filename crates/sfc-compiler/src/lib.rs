//! Compiler for the sfc-repl preview pipeline.
//!
//! Turns one source file into CommonJS module code plus extracted CSS:
//!
//! - `.vue` components are parsed into blocks; the script is rewritten so
//!   the options object is bound to [`COMP_IDENTIFIER`], the template is
//!   attached as a runtime string and styles are preprocessed and scoped.
//! - `.js`/`.jsx`/`.ts`/`.tsx` files go through the [`ScriptTransformer`].
//! - `.css` passes through, `.json` becomes a module exporting its value.
//!
//! Soft problems (an unsupported preprocessor, a missing style engine) are
//! embedded in the generated code as `console.warn(...)` statements; fatal
//! ones are returned as [`CompileError`]s.

pub mod commonjs;
pub mod css;
pub mod ecma;
pub mod error;
pub mod hash;
pub mod language;
pub mod script_file;
pub mod setup;
mod sfc;
pub mod strip;
pub mod style;
pub mod transform;

pub use error::{CompileError, ErrorKind, TransformError, TransformErrorKind};
pub use hash::scope_id;
pub use language::Language;
pub use style::{StyleBridge, StyleEngine};
pub use transform::{BuiltinTransformer, MarkupTransform, ScriptTransformer, TransformPlugin};

use std::sync::Arc;

/// Identifier the generated code binds the component options to.
pub const COMP_IDENTIFIER: &str = "__sfc__";

/// Output of a successful compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledCode {
    pub js: String,
    pub css: String,
}

/// Either the compiled code or every fatal error found, never both.
pub type CompileResult = Result<CompiledCode, Vec<CompileError>>;

/// Compiles single files with an injected script transformer and style
/// engines.
#[derive(Clone)]
pub struct Compiler {
    transformer: Arc<dyn ScriptTransformer>,
    styles: StyleBridge,
}

impl Compiler {
    pub fn new(transformer: Arc<dyn ScriptTransformer>) -> Self {
        Self {
            transformer,
            styles: StyleBridge::default(),
        }
    }

    /// A compiler using [`BuiltinTransformer`] and no style engines.
    pub fn builtin() -> Self {
        Self::new(Arc::new(BuiltinTransformer::new()))
    }

    pub fn with_styles(mut self, styles: StyleBridge) -> Self {
        self.styles = styles;
        self
    }

    pub fn transformer(&self) -> &dyn ScriptTransformer {
        self.transformer.as_ref()
    }

    /// Compile one file. Whitespace-only code compiles to nothing.
    pub async fn compile_file(&self, filename: &str, code: &str) -> CompileResult {
        if code.trim().is_empty() {
            return Ok(CompiledCode::default());
        }
        tracing::debug!(filename, "compiling");

        let result = match language::extension(filename) {
            Some("css") => Ok(CompiledCode {
                js: String::new(),
                css: code.to_string(),
            }),
            Some("json") => script_file::compile_json(self.transformer(), filename, code),
            Some("vue") => {
                sfc::compile_sfc(self.transformer(), &self.styles, filename, code).await
            }
            Some("js" | "jsx" | "ts" | "tsx") => {
                script_file::compile_script_file(self.transformer(), filename, code)
            }
            Some(ext) => Err(vec![CompileError::new(
                ErrorKind::Unsupported,
                format!("Unsupported file type: .{ext}"),
            )]),
            None => Err(vec![CompileError::new(
                ErrorKind::Unsupported,
                format!("Unsupported file type: {filename}"),
            )]),
        };

        if let Err(errors) = &result {
            tracing::debug!(filename, errors = errors.len(), "compile failed");
        }
        result
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("styles", &self.styles)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCOPED: &str = "<template><div class=\"a\">x</div></template>\n<style scoped>\n.a { color: red }\n.a:hover > .b { color: blue }\n</style>";

    #[tokio::test]
    async fn test_empty_code_compiles_to_nothing() {
        let out = Compiler::builtin().compile_file("src/App.vue", "  \n").await;
        assert_eq!(out, Ok(CompiledCode::default()));
    }

    #[tokio::test]
    async fn test_css_passes_through() {
        let out = Compiler::builtin()
            .compile_file("src/a.css", "body { margin: 0 }")
            .await
            .unwrap();
        assert_eq!(out.js, "");
        assert_eq!(out.css, "body { margin: 0 }");
    }

    #[tokio::test]
    async fn test_unsupported_file_type() {
        let errors = Compiler::builtin()
            .compile_file("src/notes.md", "# hi")
            .await
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Unsupported);
        assert_eq!(errors[0].message, "Unsupported file type: .md");
    }

    #[tokio::test]
    async fn test_truncated_script_is_a_script_error() {
        let errors = Compiler::builtin()
            .compile_file("src/f.ts", "enum E { A")
            .await
            .unwrap_err();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].kind, ErrorKind::Script);
    }

    #[tokio::test]
    async fn test_compile_is_deterministic() {
        let compiler = Compiler::builtin();
        let first = compiler.compile_file("src/A.vue", SCOPED).await.unwrap();
        let second = compiler.compile_file("src/A.vue", SCOPED).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scoped_css_differs_only_in_scope_id() {
        let compiler = Compiler::builtin();
        let a = compiler.compile_file("src/A.vue", SCOPED).await.unwrap();
        let b = compiler.compile_file("src/B.vue", SCOPED).await.unwrap();
        let (id_a, id_b) = (scope_id("src/A.vue"), scope_id("src/B.vue"));
        assert_ne!(a.css, b.css);
        assert_eq!(a.css.replace(&id_a, "ID"), b.css.replace(&id_b, "ID"));
        insta::assert_snapshot!(a.css.replace(&id_a, "ID"), @r"
        .a[data-v-ID] { color: red }
        .a:hover > .b[data-v-ID] { color: blue }
        ");
    }

    #[tokio::test]
    async fn test_unterminated_component_is_a_parse_error() {
        let errors = Compiler::builtin()
            .compile_file("src/App.vue", "<template>\n  <div>")
            .await
            .unwrap_err();
        assert!(errors.iter().all(|e| e.kind == ErrorKind::Parse));
        assert!(!errors.is_empty());
    }

    #[tokio::test]
    async fn test_style_engines_are_used() {
        let compiler = Compiler::builtin().with_styles(
            StyleBridge::new().with_less(StyleEngine::immediate(|s| Ok(s.replace("@c", "red")))),
        );
        let out = compiler
            .compile_file(
                "src/L.vue",
                "<template><p/></template>\n<style lang=\"less\">\np { color: @c }\n</style>",
            )
            .await
            .unwrap();
        assert_eq!(out.css, "p { color: red }");
    }
}
