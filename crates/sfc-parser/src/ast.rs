//! Descriptor types for a parsed single-file component.

use smol_str::SmolStr;
use source_pos::Span;

/// A parsed single-file component: its top-level blocks in source order,
/// with raw (unprocessed) contents.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SfcDescriptor {
    pub source: String,
    pub template: Option<TemplateBlock>,
    pub script: Option<ScriptBlock>,
    pub script_setup: Option<ScriptBlock>,
    pub styles: Vec<StyleBlock>,
    /// Blocks other than template/script/style (`<docs>`, `<i18n>`...).
    pub custom_blocks: Vec<CustomBlock>,
    pub comments: Vec<Comment>,
}

impl SfcDescriptor {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Whether the component has any script block at all.
    pub fn has_script(&self) -> bool {
        self.script.is_some() || self.script_setup.is_some()
    }

    /// The language shared by the script blocks, `<script setup>` first.
    ///
    /// The parser guarantees both blocks agree when both are present.
    pub fn script_lang(&self) -> ScriptLang {
        self.script_setup
            .as_ref()
            .or(self.script.as_ref())
            .map(|s| s.lang)
            .unwrap_or_default()
    }

    pub fn has_scoped_style(&self) -> bool {
        self.styles.iter().any(|s| s.scoped)
    }
}

/// Properties shared by every block.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// Span of the block including its tags.
    pub span: Span,
    /// Span of the content between the tags.
    pub content_span: Span,
    pub content: String,
    pub attrs: Vec<BlockAttr>,
    /// `src="..."`, recorded but never fetched.
    pub src: Option<String>,
}

impl Block {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .and_then(|a| a.value.as_deref())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// The `lang` attribute, if any.
    pub fn lang(&self) -> Option<&str> {
        self.attr("lang")
    }
}

/// An attribute on a block's opening tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockAttr {
    pub name: SmolStr,
    /// `None` for boolean attributes such as `scoped`.
    pub value: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateBlock {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub block: Block,
    /// `<template functional>`.
    pub functional: bool,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScriptBlock {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub block: Block,
    pub lang: ScriptLang,
    pub setup: bool,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyleBlock {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub block: Block,
    pub scoped: bool,
    /// CSS module binding name; `$style` for a bare `module` attribute.
    pub module: Option<String>,
}

impl StyleBlock {
    /// The style language, defaulting to `css`.
    pub fn lang(&self) -> &str {
        self.block.lang().unwrap_or("css")
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomBlock {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub block: Block,
    pub tag: SmolStr,
}

macro_rules! deref_block {
    ($($ty:ty),*) => {$(
        impl std::ops::Deref for $ty {
            type Target = Block;
            fn deref(&self) -> &Block {
                &self.block
            }
        }
    )*};
}

deref_block!(TemplateBlock, ScriptBlock, StyleBlock, CustomBlock);

/// A root-level `<!-- -->` comment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comment {
    pub content: String,
    pub span: Span,
}

/// Script language variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScriptLang {
    #[default]
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl ScriptLang {
    /// Parse from a `lang` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" => Some(Self::Js),
            "jsx" => Some(Self::Jsx),
            "ts" | "typescript" => Some(Self::Ts),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Jsx => "jsx",
            Self::Ts => "ts",
            Self::Tsx => "tsx",
        }
    }

    pub fn is_typescript(&self) -> bool {
        matches!(self, Self::Ts | Self::Tsx)
    }

    pub fn is_jsx(&self) -> bool {
        matches!(self, Self::Jsx | Self::Tsx)
    }
}
