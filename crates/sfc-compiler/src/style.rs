//! Style preprocessing and per-block style compilation.

use crate::css;
use crate::error::CompileError;
use futures::future::BoxFuture;
use sfc_parser::StyleBlock;
use source_pos::LineIndex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Style languages accepted in `<style lang>`.
pub const SUPPORTED_STYLE_LANGS: &[&str] = &["css", "less", "scss", "sass"];

type FutureFn = dyn Fn(String) -> BoxFuture<'static, Result<String, String>> + Send + Sync;
type Completion = Box<dyn FnOnce(Result<String, String>) + Send>;
type CallbackFn = dyn Fn(String, Completion) + Send + Sync;
type ImmediateFn = dyn Fn(&str) -> Result<String, String> + Send + Sync;

/// A preprocessor engine (less, sass...). Engines come in the shapes their
/// host libraries expose; [`StyleEngine::compile`] awaits all of them the
/// same way. Errors are human-readable messages.
#[derive(Clone)]
pub enum StyleEngine {
    /// Returns its result directly.
    Immediate(Arc<ImmediateFn>),
    /// Returns a future.
    Future(Arc<FutureFn>),
    /// Reports through a completion callback, possibly from another thread.
    Callback(Arc<CallbackFn>),
}

impl StyleEngine {
    pub fn immediate<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        StyleEngine::Immediate(Arc::new(f))
    }

    pub fn future<F>(f: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<String, String>> + Send + Sync + 'static,
    {
        StyleEngine::Future(Arc::new(f))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(String, Completion) + Send + Sync + 'static,
    {
        StyleEngine::Callback(Arc::new(f))
    }

    pub async fn compile(&self, source: &str) -> Result<String, String> {
        match self {
            StyleEngine::Immediate(f) => f(source),
            StyleEngine::Future(f) => f(source.to_string()).await,
            StyleEngine::Callback(f) => {
                let (tx, rx) = oneshot::channel();
                f(
                    source.to_string(),
                    Box::new(move |result| {
                        let _ = tx.send(result);
                    }),
                );
                rx.await
                    .unwrap_or_else(|_| Err("engine dropped its completion callback".to_string()))
            }
        }
    }
}

impl std::fmt::Debug for StyleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match self {
            StyleEngine::Immediate(_) => "Immediate",
            StyleEngine::Future(_) => "Future",
            StyleEngine::Callback(_) => "Callback",
        };
        write!(f, "StyleEngine::{shape}")
    }
}

/// Routes `less` and `scss`/`sass` sources to their engines. `css` passes
/// through untouched.
#[derive(Debug, Clone, Default)]
pub struct StyleBridge {
    less: Option<StyleEngine>,
    sass: Option<StyleEngine>,
}

/// Preprocessed CSS plus an optional warning for the preview console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub css: String,
    pub warning: Option<String>,
}

impl StyleBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_less(mut self, engine: StyleEngine) -> Self {
        self.less = Some(engine);
        self
    }

    /// Engine for both `scss` and `sass`.
    pub fn with_sass(mut self, engine: StyleEngine) -> Self {
        self.sass = Some(engine);
        self
    }

    pub async fn preprocess(&self, source: &str, lang: &str) -> Result<Preprocessed, String> {
        let (engine, label, missing) = match lang {
            "less" => (&self.less, "LESS", "No LESS engine is loaded. LESS styles will not be compiled."),
            "scss" | "sass" => (
                &self.sass,
                "SCSS",
                "No Sass engine is loaded. SCSS/SASS styles will not be compiled.",
            ),
            _ => {
                return Ok(Preprocessed {
                    css: source.to_string(),
                    warning: None,
                })
            }
        };

        match engine {
            Some(engine) => engine
                .compile(source)
                .await
                .map(|css| Preprocessed { css, warning: None })
                .map_err(|msg| format!("{label} compile error: {msg}")),
            None => {
                tracing::warn!(lang, "{missing}");
                Ok(Preprocessed {
                    css: source.to_string(),
                    warning: Some(missing.to_string()),
                })
            }
        }
    }
}

/// Compiled styles of one component.
#[derive(Debug, Default)]
pub struct CompiledStyles {
    pub css: String,
    pub warnings: Vec<String>,
}

/// Preprocess, validate and (for scoped blocks) scope every style block.
///
/// Every block is attempted; each failing block contributes one or more
/// errors.
pub async fn compile_styles(
    styles: &[StyleBlock],
    scope_id: &str,
    bridge: &StyleBridge,
    lines: &LineIndex,
) -> Result<CompiledStyles, Vec<CompileError>> {
    let attr = format!("data-v-{scope_id}");
    let mut compiled = CompiledStyles::default();
    let mut parts = Vec::new();
    let mut errors = Vec::new();

    for style in styles {
        let pre = match bridge.preprocess(&style.content, style.lang()).await {
            Ok(pre) => pre,
            Err(msg) => {
                errors.push(CompileError::style(msg));
                continue;
            }
        };
        if let Some(warning) = pre.warning {
            if !compiled.warnings.contains(&warning) {
                compiled.warnings.push(warning);
            }
        }

        let result = if style.scoped {
            css::scope_css(&pre.css, &attr)
        } else {
            css::validate(&pre.css).map(|_| pre.css)
        };
        match result {
            Ok(css) if css.trim().is_empty() => {}
            Ok(css) => parts.push(css.trim().to_string()),
            Err(css_errors) => {
                // Positions only map back to the file when no preprocessor
                // rewrote the source.
                let raw = style.lang() == "css";
                errors.extend(css_errors.into_iter().map(|e| {
                    let err = CompileError::style(e.message);
                    if raw {
                        err.at(lines.location(style.content_span.start + e.offset as u32))
                    } else {
                        err
                    }
                }));
            }
        }
    }

    if errors.is_empty() {
        compiled.css = parts.join("\n");
        Ok(compiled)
    } else {
        Err(errors)
    }
}
