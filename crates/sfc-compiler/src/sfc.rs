//! Single-file component compilation.

use crate::error::CompileError;
use crate::hash::scope_id;
use crate::language;
use crate::script_file::fix_vue_extend;
use crate::setup::{self, CompiledScript};
use crate::style::{compile_styles, StyleBridge, SUPPORTED_STYLE_LANGS};
use crate::transform::{ScriptTransformer, TransformPlugin};
use crate::{CompileResult, CompiledCode, COMP_IDENTIFIER};
use sfc_parser::{parse_sfc, SfcDescriptor};
use source_pos::LineIndex;

const TEMPLATE_PREPROCESSOR: &str = "Custom preprocessors for <template> are not supported.";
const STYLE_PREPROCESSOR: &str = "Unsupported style preprocessor. Supported: css, scss, sass, less.";
const STYLE_MODULE: &str = "<style module> is not supported in the Playground.";
const EXTERNAL_SRC: &str = "External `src` blocks are not loaded; inline their content instead.";

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn warn_statement(message: &str) -> String {
    format!("\nconsole.warn({})", json_string(message))
}

pub(crate) async fn compile_sfc(
    transformer: &dyn ScriptTransformer,
    styles: &StyleBridge,
    filename: &str,
    source: &str,
) -> CompileResult {
    let descriptor = parse_sfc(source)
        .map_err(|errors| errors.into_iter().map(CompileError::from).collect::<Vec<_>>())?;
    let lines = LineIndex::new(source);
    let id = scope_id(filename);

    let mut js = String::new();
    let mut skip_styles = false;
    let has_external_src = descriptor.template.iter().any(|b| b.src.is_some())
        || descriptor.script.iter().any(|b| b.src.is_some())
        || descriptor.script_setup.iter().any(|b| b.src.is_some())
        || descriptor.styles.iter().any(|b| b.src.is_some());
    if has_external_src {
        js.push_str(&warn_statement(EXTERNAL_SRC));
    }
    if descriptor.template.as_ref().is_some_and(|t| t.lang().is_some()) {
        js.push_str(&warn_statement(TEMPLATE_PREPROCESSOR));
    }
    if descriptor
        .styles
        .iter()
        .any(|s| !SUPPORTED_STYLE_LANGS.contains(&s.lang()))
    {
        skip_styles = true;
        js.push_str(&warn_statement(STYLE_PREPROCESSOR));
    }
    if descriptor.styles.iter().any(|s| s.module.is_some()) {
        skip_styles = true;
        js.push_str(&warn_statement(STYLE_MODULE));
    }

    js.push('\n');
    js.push_str(&component_script(transformer, filename, &descriptor, &lines, &id)?);

    let mut css = String::new();
    if !skip_styles && !descriptor.styles.is_empty() {
        let compiled = compile_styles(&descriptor.styles, &id, styles, &lines).await?;
        for warning in &compiled.warnings {
            js.push_str(&warn_statement(warning));
        }
        css = compiled.css;
    }

    if !css.is_empty() {
        js.push_str(&format!("\n{COMP_IDENTIFIER}.__css__ = {};", json_string(&css)));
    }
    js.push_str(&format!("\n{COMP_IDENTIFIER}.__id__ = \"{id}\";"));
    js.push_str(&format!("\nexport default {COMP_IDENTIFIER};"));

    let stem = language::split_extension(filename)
        .map(|(stem, _)| stem)
        .unwrap_or("component");
    let module = transformer
        .transform(&js, &format!("{stem}.js"), &[TransformPlugin::CommonJs])
        .map_err(|err| {
            let mut error = CompileError::from(err);
            error.location = None;
            vec![error]
        })?;

    Ok(CompiledCode {
        js: fix_vue_extend(&module),
        css,
    })
}

/// Script section, component registration, template string and scope id.
fn component_script(
    transformer: &dyn ScriptTransformer,
    filename: &str,
    descriptor: &SfcDescriptor,
    lines: &LineIndex,
    id: &str,
) -> Result<String, Vec<CompileError>> {
    let CompiledScript {
        content,
        line_offset,
    } = setup::compile_script(descriptor, lines, COMP_IDENTIFIER)?;

    let mut code = if descriptor.has_script() {
        let lang = descriptor.script_lang();
        let stem = language::split_extension(filename)
            .map(|(stem, _)| stem)
            .unwrap_or("component");
        let mut plugins = Vec::new();
        if lang.is_typescript() {
            plugins.push(TransformPlugin::TypeScript);
        }
        if lang.is_jsx() {
            plugins.push(TransformPlugin::VueJsx);
        }

        let mut code = transformer
            .transform(&content, &format!("{stem}.{}", lang.as_str()), &plugins)
            .map_err(|err| {
                let mut error = CompileError::from(err);
                error.location = match (error.location, line_offset) {
                    (Some(location), Some(offset)) => Some(location.offset_lines(offset)),
                    _ => None,
                };
                vec![error]
            })?;

        if let Some(setup_block) = &descriptor.script_setup {
            let names = setup::registered_components(&setup_block.content);
            if let Some(registration) = setup::registration(COMP_IDENTIFIER, &names) {
                code.push('\n');
                code.push_str(&registration);
            }
        }
        code
    } else {
        content
    };

    if let Some(template) = &descriptor.template {
        if !template.content.is_empty() {
            code.push_str(&format!(
                "\n{COMP_IDENTIFIER}.template = {};",
                json_string(&template.content)
            ));
        }
    }
    if descriptor.has_scoped_style() {
        code.push_str(&format!("\n{COMP_IDENTIFIER}._scopeId = \"data-v-{id}\";"));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transform::BuiltinTransformer;
    use pretty_assertions::assert_eq;

    async fn compile(filename: &str, source: &str) -> CompileResult {
        compile_sfc(&BuiltinTransformer::new(), &StyleBridge::new(), filename, source).await
    }

    #[tokio::test]
    async fn test_options_component() {
        let out = compile(
            "src/App.vue",
            "<template>\n  <div>{{ msg }}</div>\n</template>\n<script>\nexport default { data() { return { msg: 'hi' } } }\n</script>",
        )
        .await
        .unwrap();
        assert!(out.js.starts_with("\"use strict\";\n"));
        assert!(out.js.contains("const __sfc__ = { data() { return { msg: 'hi' } } }"));
        assert!(out.js.contains("__sfc__.template = \"\\n  <div>{{ msg }}</div>\\n\";"));
        assert!(out
            .js
            .contains(&format!("__sfc__.__id__ = \"{}\";", scope_id("src/App.vue"))));
        assert!(out.js.ends_with("exports.default = __sfc__;"));
        assert!(!out.js.contains("_scopeId"));
        assert_eq!(out.css, "");
    }

    #[tokio::test]
    async fn test_template_only_component() {
        let out = compile("src/T.vue", "<template><p>x</p></template>").await.unwrap();
        assert!(out.js.contains("const __sfc__ = {};"));
        assert!(out.js.contains("__sfc__.template = \"<p>x</p>\";"));
    }

    #[tokio::test]
    async fn test_scoped_style_attaches_css_and_scope_id() {
        let out = compile(
            "src/A.vue",
            "<template><div class=\"a\">x</div></template>\n<style scoped>\n.a { color: red }\n</style>",
        )
        .await
        .unwrap();
        let id = scope_id("src/A.vue");
        assert_eq!(out.css, format!(".a[data-v-{id}] {{ color: red }}"));
        assert!(out.js.contains(&format!("__sfc__._scopeId = \"data-v-{id}\";")));
        assert!(out.js.contains(&format!(
            "__sfc__.__css__ = \".a[data-v-{id}] {{ color: red }}\";"
        )));
    }

    #[tokio::test]
    async fn test_unsupported_styles_are_skipped_with_warning() {
        let out = compile(
            "src/S.vue",
            "<template><p/></template>\n<style lang=\"stylus\">\n.a\n  color red\n</style>\n<style module>\n.b {}\n</style>",
        )
        .await
        .unwrap();
        assert_eq!(out.css, "");
        assert!(out.js.contains(
            "console.warn(\"Unsupported style preprocessor. Supported: css, scss, sass, less.\")"
        ));
        assert!(out
            .js
            .contains("console.warn(\"<style module> is not supported in the Playground.\")"));
    }

    #[tokio::test]
    async fn test_template_preprocessor_warns() {
        let out = compile("src/P.vue", "<template lang=\"pug\">\np hi\n</template>").await.unwrap();
        assert!(out
            .js
            .contains("console.warn(\"Custom preprocessors for <template> are not supported.\")"));
        assert!(out.js.contains("__sfc__.template = \"\\np hi\\n\";"));
    }

    #[tokio::test]
    async fn test_setup_registers_imported_components() {
        let out = compile(
            "src/App.vue",
            "<script setup>\nimport Child from './Child.vue'\n</script>\n<template><Child/></template>",
        )
        .await
        .unwrap();
        assert!(out
            .js
            .contains("var Child = __interopDefault(require('./Child.vue'));"));
        assert!(out.js.contains("__sfc__.components = { \"Child\": Child };"));
        assert!(out.js.contains("return { Child };"));
    }

    #[tokio::test]
    async fn test_typescript_component() {
        let out = compile(
            "src/Ts.vue",
            "<script lang=\"ts\">\nimport { defineComponent } from 'vue'\nconst n: number = 1\nexport default defineComponent({ data: () => ({ n }) })\n</script>",
        )
        .await
        .unwrap();
        assert!(out.js.contains("var { defineComponent } = require('vue');"));
        assert!(out.js.contains("const __sfc__ = defineComponent({ data: () => ({ n }) })"));
        assert!(!out.js.contains(": number"));
    }

    #[tokio::test]
    async fn test_external_src_warns() {
        let out = compile(
            "src/E.vue",
            "<template><p>x</p></template>\n<style src=\"./e.css\"></style>",
        )
        .await
        .unwrap();
        assert!(out.js.contains("External `src` blocks are not loaded"));
        assert!(out.css.is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_short_circuits() {
        let errors = compile("src/Bad.vue", "<template><div>").await.unwrap_err();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].kind, ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_script_error_maps_to_file_line() {
        let errors = compile(
            "src/Bad.vue",
            "<template><p/></template>\n<script lang=\"ts\">\nenum Color { Red }\nexport default {}\n</script>",
        )
        .await
        .unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Unsupported);
        assert_eq!(errors[0].location.map(|l| l.line), Some(3));
    }

    #[tokio::test]
    async fn test_style_errors_fail_the_compile() {
        let errors = compile("src/C.vue", "<template><p/></template>\n<style>\n.a {\n</style>")
            .await
            .unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Style);
    }
}
