//! Standalone script and data files.

use crate::error::{CompileError, ErrorKind};
use crate::language;
use crate::transform::{ScriptTransformer, TransformPlugin};
use crate::CompiledCode;
use once_cell::sync::Lazy;
use regex::Regex;
use source_pos::Location;

static STYLE_REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"require\s*\(\s*["'][^"']+\.(css|less|scss|sass|styl|stylus)["']\s*\)\s*;?"#)
        .expect("style require regex")
});

static USE_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"("use strict";)"#).expect("use strict regex"));

static VUE_EXTEND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:_vue\["default"\]|_vue\.default|\bVue)\.extend\(\{"#).expect("extend regex")
});

const MARKUP_FACTORY: &str = r#"var h = require("vue").h;"#;

/// Compatibility patch for transpiled `Vue.extend({ ... })` calls, which the
/// preview runtime cannot evaluate: the call is replaced by its bare object
/// literal. Only this exact call shape is rewritten.
pub fn fix_vue_extend(code: &str) -> String {
    VUE_EXTEND.replace_all(code, "({").into_owned()
}

/// Compile a `.js`/`.jsx`/`.ts`/`.tsx` file to a CommonJS module.
///
/// Stylesheet requires are dropped and files with markup get the `h`
/// factory binding.
pub fn compile_script_file(
    transformer: &dyn ScriptTransformer,
    filename: &str,
    code: &str,
) -> Result<CompiledCode, Vec<CompileError>> {
    let lang = language::extension(filename)
        .and_then(language::script_lang)
        .unwrap_or_default();

    let mut plugins = Vec::with_capacity(3);
    if lang.is_typescript() {
        plugins.push(TransformPlugin::TypeScript);
    }
    if lang.is_jsx() {
        plugins.push(TransformPlugin::VueJsx);
    }
    plugins.push(TransformPlugin::CommonJs);

    let js = transformer
        .transform(code, filename, &plugins)
        .map_err(|err| vec![CompileError::from(err)])?;

    let mut js = STYLE_REQUIRE
        .replace_all(&js, "/* css import removed */")
        .into_owned();
    if lang.is_jsx() {
        js = if USE_STRICT.is_match(&js) {
            USE_STRICT
                .replace(&js, format!("$1\n{MARKUP_FACTORY}").as_str())
                .into_owned()
        } else {
            format!("{MARKUP_FACTORY}\n{js}")
        };
    }

    Ok(CompiledCode {
        js: fix_vue_extend(&js),
        css: String::new(),
    })
}

/// Compile a `.json` file to a CommonJS module whose default export is the
/// parsed value.
pub fn compile_json(
    transformer: &dyn ScriptTransformer,
    filename: &str,
    code: &str,
) -> Result<CompiledCode, Vec<CompileError>> {
    let value: serde_json::Value = serde_json::from_str(code).map_err(|err| {
        let mut error = CompileError::new(ErrorKind::Data, err.to_string());
        if err.line() > 0 {
            error = error.at(Location::new(err.line() as u32, err.column() as u32));
        }
        vec![error]
    })?;

    let stem = language::split_extension(filename)
        .map(|(stem, _)| stem)
        .unwrap_or("data");
    let js = transformer
        .transform(
            &format!("export default {value}"),
            &format!("{stem}.js"),
            &[TransformPlugin::CommonJs],
        )
        .map_err(|err| vec![CompileError::from(err)])?;

    Ok(CompiledCode {
        js,
        css: String::new(),
    })
}
