//! Block-level parser for single-file components.

use crate::ast::*;
use crate::error::{ErrorCode, ParseError};
use crate::lexer::BlockLexer;
use source_pos::{LineIndex, Span};

/// Parse a component into its descriptor.
///
/// Recoverable problems (duplicate blocks, mismatched script languages) are
/// collected and reported together; an unclosed block ends parsing.
pub fn parse_sfc(source: &str) -> Result<SfcDescriptor, Vec<ParseError>> {
    SfcParser::new(source).parse()
}

struct SfcParser<'a> {
    lexer: BlockLexer<'a>,
    source: &'a str,
    lines: LineIndex,
    errors: Vec<ParseError>,
}

/// An opening tag, read up to and including its `>`.
struct OpenTag {
    name: String,
    attrs: Vec<BlockAttr>,
    self_closing: bool,
}

impl<'a> SfcParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lexer: BlockLexer::new(source),
            source,
            lines: LineIndex::new(source),
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<SfcDescriptor, Vec<ParseError>> {
        let mut sfc = SfcDescriptor::new(self.source);

        loop {
            self.lexer.skip_whitespace();
            if self.lexer.is_eof() {
                break;
            }

            if self.lexer.starts_with("<!--") {
                let start = self.lexer.pos();
                if let Some(content) = self.lexer.read_comment() {
                    sfc.comments.push(Comment {
                        content: content.to_string(),
                        span: self.lexer.span_from(start),
                    });
                }
                continue;
            }

            if self.lexer.starts_with("<") && !self.lexer.starts_with("</") {
                if !self.parse_block(&mut sfc) {
                    break;
                }
                continue;
            }

            // Stray root-level text is ignored.
            self.lexer.next_char();
        }

        self.check_script_langs(&sfc);

        if self.errors.is_empty() {
            Ok(sfc)
        } else {
            Err(self.errors)
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Span, code: ErrorCode) {
        let location = self.lines.location(span.start);
        self.errors.push(ParseError::new(message, span, location, code));
    }

    /// Parse one block. Returns `false` when input ended inside it.
    fn parse_block(&mut self, sfc: &mut SfcDescriptor) -> bool {
        let start = self.lexer.pos();
        let Some(tag) = self.read_open_tag() else {
            return true;
        };

        let content_start = self.lexer.pos();
        let (content, content_span) = if tag.self_closing {
            (String::new(), Span::empty(content_start as u32))
        } else {
            match self.lexer.read_block_content(&tag.name) {
                Some(content) => {
                    let span = self.lexer.span_from(content_start);
                    self.lexer.consume_closing_tag(&tag.name);
                    (content.to_string(), span)
                }
                None => {
                    let span = self.lexer.span_from(start);
                    self.error("Element is missing end tag.", span, ErrorCode::UnclosedTag);
                    return false;
                }
            }
        };

        let span = self.lexer.span_from(start);
        let src = tag
            .attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case("src"))
            .and_then(|a| a.value.clone());
        let block = Block {
            span,
            content_span,
            content,
            attrs: tag.attrs,
            src,
        };

        match tag.name.as_str() {
            "template" => {
                if sfc.template.is_some() {
                    self.error(
                        "Single file component can contain only one <template> element",
                        span,
                        ErrorCode::DuplicateBlock,
                    );
                } else {
                    let functional = block.has_attr("functional");
                    sfc.template = Some(TemplateBlock { block, functional });
                }
            }
            "script" => {
                let setup = block.has_attr("setup");
                let lang = block.lang().and_then(ScriptLang::parse).unwrap_or_default();
                let slot = if setup {
                    &mut sfc.script_setup
                } else {
                    &mut sfc.script
                };
                if slot.is_some() {
                    let which = if setup { "<script setup>" } else { "<script>" };
                    self.error(
                        format!("Single file component can contain only one {which} element"),
                        span,
                        ErrorCode::DuplicateBlock,
                    );
                } else {
                    *slot = Some(ScriptBlock { block, lang, setup });
                }
            }
            "style" => {
                let scoped = block.has_attr("scoped");
                let module = block
                    .has_attr("module")
                    .then(|| block.attr("module").unwrap_or("$style").to_string());
                sfc.styles.push(StyleBlock {
                    block,
                    scoped,
                    module,
                });
            }
            _ => sfc.custom_blocks.push(CustomBlock {
                block,
                tag: tag.name.as_str().into(),
            }),
        }
        true
    }

    /// Read `<name attrs...>` or `<name attrs.../>`.
    fn read_open_tag(&mut self) -> Option<OpenTag> {
        let start = self.lexer.pos();
        self.lexer.consume("<");
        let Some(name) = self.lexer.read_tag_name() else {
            // `<` followed by something that is not a tag name.
            self.lexer.next_char();
            return None;
        };
        let name = name.to_ascii_lowercase();
        let attrs = self.parse_attributes();

        self.lexer.skip_whitespace();
        if self.lexer.consume("/>") {
            return Some(OpenTag {
                name,
                attrs,
                self_closing: true,
            });
        }
        if self.lexer.consume(">") {
            return Some(OpenTag {
                name,
                attrs,
                self_closing: false,
            });
        }

        let span = self.lexer.span_from(start);
        self.error(
            format!("Unclosed tag: <{name}>"),
            span,
            ErrorCode::UnclosedTag,
        );
        None
    }

    fn parse_attributes(&mut self) -> Vec<BlockAttr> {
        let mut attrs = Vec::new();

        loop {
            self.lexer.skip_whitespace();
            if self.lexer.is_eof() || self.lexer.starts_with(">") || self.lexer.starts_with("/>") {
                break;
            }

            let attr_start = self.lexer.pos();
            let Some(name) = self.lexer.read_attr_name() else {
                self.lexer.next_char();
                continue;
            };

            self.lexer.skip_whitespace();
            let value = if self.lexer.consume("=") {
                self.lexer.skip_whitespace();
                match self.lexer.read_quoted_value() {
                    Some((value, _closed)) => Some(value.to_string()),
                    None => Some(self.lexer.read_unquoted_value().to_string()),
                }
            } else {
                None
            };

            attrs.push(BlockAttr {
                name: name.into(),
                value,
                span: self.lexer.span_from(attr_start),
            });
        }

        attrs
    }

    fn check_script_langs(&mut self, sfc: &SfcDescriptor) {
        if let (Some(script), Some(setup)) = (&sfc.script, &sfc.script_setup) {
            if script.lang != setup.lang {
                self.error(
                    "<script> and <script setup> must have the same language type.",
                    setup.span,
                    ErrorCode::ScriptLangMismatch,
                );
            }
        }
    }
}
