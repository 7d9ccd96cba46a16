//! Single-file component descriptor parser.
//!
//! Splits a `.vue` source into its top-level `<template>`, `<script>`,
//! `<script setup>`, `<style>` and custom blocks. Block contents are kept
//! raw; compiling them is the job of `sfc-compiler`.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use error::{ErrorCode, ParseError};
pub use parser::parse_sfc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_sfc() {
        let source = r#"<template>
  <div>Hello {{ name }}</div>
</template>

<script>
export default {
  data: () => ({ name: 'World' })
}
</script>

<style scoped>
div { color: red; }
</style>
"#;
        let sfc = parse_sfc(source).unwrap();
        assert!(sfc.template.is_some());
        assert!(sfc.script.is_some());
        assert!(sfc.script_setup.is_none());
        assert_eq!(sfc.script_lang(), ScriptLang::Js);
        assert_eq!(sfc.styles.len(), 1);
        assert!(sfc.styles[0].scoped);
    }

    #[test]
    fn test_script_and_setup_share_lang() {
        let source = r#"<script lang="ts">
export interface Props { msg: string }
</script>

<script setup lang="ts">
const props = defineProps<Props>()
</script>"#;
        let sfc = parse_sfc(source).unwrap();
        assert_eq!(sfc.script_lang(), ScriptLang::Ts);
        assert!(sfc.script_lang().is_typescript());
    }
}
