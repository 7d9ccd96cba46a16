//! Descriptor parse errors.

use source_pos::{Location, Span};
use std::fmt;

/// An error found while splitting a component into blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// 1-based position of `span.start`.
    pub location: Location,
    pub code: ErrorCode,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span, location: Location, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            span,
            location,
            code,
        }
    }
}

/// Error codes for categorizing parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A block or opening tag runs to the end of input.
    UnclosedTag,
    /// A second `<template>`, `<script>` or `<script setup>`.
    DuplicateBlock,
    /// `<script>` and `<script setup>` declare different languages.
    ScriptLangMismatch,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnclosedTag => "unclosed-tag",
            ErrorCode::DuplicateBlock => "duplicate-block",
            ErrorCode::ScriptLangMismatch => "script-lang-mismatch",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
