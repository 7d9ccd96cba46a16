//! Script transform backends.
//!
//! The compiler never transpiles by itself; it hands sources to a
//! [`ScriptTransformer`] together with the plugins to run. The virtual
//! filename tells the transformer which dialect it is looking at.

use crate::commonjs;
use crate::ecma::{self, Edits, Failure};
use crate::error::TransformError;
use crate::language;
use crate::strip;
use sfc_parser::ScriptLang;
use std::borrow::Cow;
use std::sync::Arc;
use swc_ecma_ast::{JSXElement, JSXFragment, Module};
use swc_ecma_visit::{Visit, VisitWith};

/// A transform step requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformPlugin {
    /// Strip TypeScript syntax.
    TypeScript,
    /// Lower embedded markup (JSX) to render-function calls.
    VueJsx,
    /// Convert ES module syntax to `require`/`exports`.
    CommonJs,
}

/// Transpiles script source.
pub trait ScriptTransformer: Send + Sync {
    fn transform(
        &self,
        source: &str,
        filename: &str,
        plugins: &[TransformPlugin],
    ) -> Result<String, TransformError>;
}

/// Lowers embedded markup (JSX) to plain JavaScript, leaving everything else
/// (TypeScript included) untouched.
pub trait MarkupTransform: Send + Sync {
    fn transform(&self, source: &str, filename: &str) -> Result<String, TransformError>;
}

/// The transformer the compiler uses unless another one is injected.
///
/// Parses with swc, erases TypeScript in place and rewrites module syntax.
/// JSX is delegated to a [`MarkupTransform`]; without one, sources that
/// contain markup fail with a "not configured" error.
#[derive(Clone, Default)]
pub struct BuiltinTransformer {
    markup: Option<Arc<dyn MarkupTransform>>,
}

impl BuiltinTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markup(mut self, markup: Arc<dyn MarkupTransform>) -> Self {
        self.markup = Some(markup);
        self
    }

    fn parse(source: &str, lang: ScriptLang) -> Result<Module, TransformError> {
        ecma::parse_module(source, lang).map_err(|failures| first_error(source, failures, false))
    }
}

impl std::fmt::Debug for BuiltinTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinTransformer")
            .field("markup", &self.markup.is_some())
            .finish()
    }
}

impl ScriptTransformer for BuiltinTransformer {
    fn transform(
        &self,
        source: &str,
        filename: &str,
        plugins: &[TransformPlugin],
    ) -> Result<String, TransformError> {
        let dialect = language::extension(filename)
            .and_then(language::script_lang)
            .unwrap_or_default();
        let typescript = dialect.is_typescript() || plugins.contains(&TransformPlugin::TypeScript);
        let lang = match (typescript, dialect.is_jsx()) {
            (true, true) => ScriptLang::Tsx,
            (true, false) => ScriptLang::Ts,
            (false, true) => ScriptLang::Jsx,
            (false, false) => ScriptLang::Js,
        };

        let mut source = Cow::Borrowed(source);
        if lang.is_jsx() && contains_markup(&Self::parse(&source, lang)?) {
            if !plugins.contains(&TransformPlugin::VueJsx) {
                return Err(TransformError::not_configured(format!(
                    "{filename} contains JSX but the JSX transform was not requested"
                )));
            }
            let markup = self.markup.as_ref().ok_or_else(|| {
                TransformError::not_configured(
                    "No JSX transform is configured; files with JSX markup cannot be compiled",
                )
            })?;
            source = Cow::Owned(markup.transform(&source, filename)?);
        }

        let module = Self::parse(&source, lang)?;
        let mut edits = Edits::new();
        if typescript {
            strip::erase_types(&source, &module, &mut edits)
                .map_err(|failures| first_error(&source, failures, true))?;
        }

        if plugins.contains(&TransformPlugin::CommonJs) {
            let prologue = commonjs::convert(&source, &module, &mut edits);
            let body = edits.apply(&source);
            Ok(format!("{}{}", prologue.render(), body))
        } else {
            Ok(edits.apply(&source))
        }
    }
}

fn first_error(source: &str, failures: Vec<Failure>, unsupported: bool) -> TransformError {
    let Some(first) = failures.into_iter().next() else {
        return TransformError::not_configured("transform failed without a diagnostic");
    };
    let location = first.location(source);
    if unsupported {
        TransformError::unsupported(first.message, location)
    } else {
        TransformError::syntax(first.message, location)
    }
}

fn contains_markup(module: &Module) -> bool {
    #[derive(Default)]
    struct Finder(bool);

    impl Visit for Finder {
        fn visit_jsx_element(&mut self, _: &JSXElement) {
            self.0 = true;
        }
        fn visit_jsx_fragment(&mut self, _: &JSXFragment) {
            self.0 = true;
        }
    }

    let mut finder = Finder::default();
    module.visit_with(&mut finder);
    finder.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformErrorKind;
    use pretty_assertions::assert_eq;

    struct Hyperscript;

    impl MarkupTransform for Hyperscript {
        fn transform(&self, source: &str, _filename: &str) -> Result<String, TransformError> {
            Ok(source.replace("<div>hi</div>", "h('div', 'hi')"))
        }
    }

    #[test]
    fn test_typescript_to_commonjs() {
        let out = BuiltinTransformer::new()
            .transform(
                "import { ref } from 'vue'\nexport const n: number = 1",
                "util.ts",
                &[TransformPlugin::TypeScript, TransformPlugin::CommonJs],
            )
            .unwrap();
        assert!(out.starts_with("\"use strict\";\n"));
        assert!(out.contains("var { ref } = require('vue');"));
        assert!(out.contains("const n         = 1; exports.n = n;"));
    }

    #[test]
    fn test_without_plugins_only_dialect_applies() {
        let out = BuiltinTransformer::new()
            .transform("export default {}", "Comp.js", &[])
            .unwrap();
        assert_eq!(out, "export default {}");
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = BuiltinTransformer::new()
            .transform("let a = ;", "a.js", &[TransformPlugin::CommonJs])
            .unwrap_err();
        assert_eq!(err.kind, TransformErrorKind::Syntax);
        assert_eq!(err.location.map(|l| l.line), Some(1));
    }

    #[test]
    fn test_jsx_requires_markup_transform() {
        let plugins = [TransformPlugin::VueJsx, TransformPlugin::CommonJs];
        let err = BuiltinTransformer::new()
            .transform("export default () => <div>hi</div>", "A.jsx", &plugins)
            .unwrap_err();
        assert_eq!(err.kind, TransformErrorKind::NotConfigured);

        let out = BuiltinTransformer::new()
            .with_markup(Arc::new(Hyperscript))
            .transform("export default () => <div>hi</div>", "A.jsx", &plugins)
            .unwrap();
        assert!(out.contains("exports.default = () => h('div', 'hi')"));
    }

    #[test]
    fn test_jsx_extension_without_markup_is_fine() {
        let out = BuiltinTransformer::new()
            .transform("export const x = 1", "plain.jsx", &[TransformPlugin::VueJsx])
            .unwrap();
        assert_eq!(out, "export const x = 1");
    }

    #[test]
    fn test_enum_is_unsupported() {
        let err = BuiltinTransformer::new()
            .transform("enum A { B }", "a.ts", &[TransformPlugin::TypeScript])
            .unwrap_err();
        assert_eq!(err.kind, TransformErrorKind::Unsupported);
    }
}
