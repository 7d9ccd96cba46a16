//! Thin layer over swc: parsing a script into a module, converting swc spans
//! into byte ranges of the original text, and splicing text edits.

use sfc_parser::ScriptLang;
use source_pos::{LineIndex, Location};
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use swc_common::{BytePos, Span, Spanned};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};

/// Positions handed to swc start here; zero is its dummy position.
const BASE: u32 = 1;

const INCOMPLETE_SOURCE: &str = "Unexpected end of input: the script is incomplete";

/// A syntax or support error at a byte offset of the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub offset: usize,
    pub message: String,
}

impl Failure {
    pub fn location(&self, source: &str) -> Location {
        LineIndex::new(source).location(self.offset as u32)
    }
}

fn syntax_for(lang: ScriptLang) -> Syntax {
    match lang {
        ScriptLang::Js | ScriptLang::Jsx => Syntax::Es(EsSyntax {
            jsx: lang.is_jsx(),
            ..Default::default()
        }),
        ScriptLang::Ts | ScriptLang::Tsx => Syntax::Typescript(TsSyntax {
            tsx: lang.is_jsx(),
            ..Default::default()
        }),
    }
}

/// Parse `source` as an ES module in the given dialect.
///
/// Recoverable errors swc collects along the way count as failures too.
pub fn parse_module(source: &str, lang: ScriptLang) -> Result<Module, Vec<Failure>> {
    let input = StringInput::new(
        source,
        BytePos(BASE),
        BytePos(BASE + source.len() as u32),
    );
    let lexer = Lexer::new(syntax_for(lang), EsVersion::EsNext, input, None);
    let mut parser = Parser::new_from(lexer);

    // swc can panic on some truncated input instead of reporting an error.
    let result = match panic::catch_unwind(AssertUnwindSafe(|| parser.parse_module())) {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!("swc parser panicked, reporting a syntax error");
            return Err(vec![Failure {
                offset: 0,
                message: INCOMPLETE_SOURCE.to_string(),
            }]);
        }
    };
    let mut failures: Vec<Failure> = parser
        .take_errors()
        .into_iter()
        .map(|err| Failure {
            offset: offset(err.span().lo),
            message: err.kind().msg().to_string(),
        })
        .collect();

    match result {
        Ok(module) if failures.is_empty() => Ok(module),
        Ok(_) => Err(failures),
        Err(err) => {
            failures.insert(
                0,
                Failure {
                    offset: offset(err.span().lo),
                    message: err.kind().msg().to_string(),
                },
            );
            Err(failures)
        }
    }
}

/// Byte offset of a swc position in the parsed text.
pub fn offset(pos: BytePos) -> usize {
    pos.0.saturating_sub(BASE) as usize
}

/// Byte range of a node in the parsed text.
pub fn range(node: &impl Spanned) -> Range<usize> {
    span_range(node.span())
}

pub fn span_range(span: Span) -> Range<usize> {
    offset(span.lo)..offset(span.hi)
}

/// Source text of a node.
pub fn text<'a>(source: &'a str, node: &impl Spanned) -> &'a str {
    source.get(range(node)).unwrap_or_default()
}

/// The unquoted value of a string literal node, read from source.
pub fn string_value<'a>(source: &'a str, node: &impl Spanned) -> &'a str {
    let raw = text(source, node);
    if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// A set of non-overlapping text replacements over one source string.
#[derive(Debug, Default)]
pub struct Edits {
    edits: Vec<(Range<usize>, String)>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.edits.push((range, text.into()));
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.edits.push((at..at, text.into()));
    }

    pub fn remove(&mut self, range: Range<usize>) {
        self.edits.push((range, String::new()));
    }

    /// Replace the range with spaces, keeping line breaks, so positions of
    /// everything else stay put.
    pub fn blank(&mut self, source: &str, range: Range<usize>) {
        let Some(original) = source.get(range.clone()) else {
            return;
        };
        let blanked: String = original
            .chars()
            .map(|c| if c == '\n' || c == '\r' { c } else { ' ' })
            .collect();
        self.edits.push((range, blanked));
    }

    /// Apply all edits. An edit that overlaps one already applied (for
    /// example erasing a type inside a statement that is being replaced
    /// whole) is dropped. Insertions go before a replacement starting at the
    /// same offset and keep their relative order.
    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by(|(a, _), (b, _)| {
            a.start
                .cmp(&b.start)
                .then((a.end > a.start).cmp(&(b.end > b.start)))
                .then(b.end.cmp(&a.end))
        });

        let mut out = String::with_capacity(source.len() + 64);
        let mut cursor = 0;
        for (range, text) in self.edits {
            if range.start < cursor || range.end > source.len() {
                continue;
            }
            out.push_str(&source[cursor..range.start]);
            out.push_str(&text);
            cursor = range.end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}
