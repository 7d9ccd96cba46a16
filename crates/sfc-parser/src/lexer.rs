//! Cursor over the top level of a single-file component.
//!
//! The lexer only understands what the descriptor parser needs: block tags,
//! their attributes, comments, and where a block's raw content ends. Block
//! bodies are never tokenized.

use source_pos::Span;

/// A byte cursor over SFC source text.
pub struct BlockLexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> BlockLexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a str {
        &self.source[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.next_char();
        }
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    /// Consume `s` if the remaining source starts with it.
    pub fn consume(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if pred(c)) {
            self.next_char();
        }
        &self.source[start..self.pos]
    }

    /// Read a tag name. Tag names start with a letter or underscore.
    pub fn read_tag_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek_char() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.next_char();
            }
            _ => return None,
        }
        self.consume_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
        Some(&self.source[start..self.pos])
    }

    /// Read an attribute name, including directive prefixes (`:`, `@`, `#`).
    pub fn read_attr_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek_char() {
            Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | ':' | '@' | '#') => {
                self.next_char();
            }
            _ => return None,
        }
        self.consume_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '[' | ']'));
        Some(&self.source[start..self.pos])
    }

    /// Read a quoted attribute value. Returns the value and whether the
    /// closing quote was found.
    pub fn read_quoted_value(&mut self) -> Option<(&'a str, bool)> {
        let quote = self.peek_char().filter(|q| *q == '"' || *q == '\'')?;
        self.next_char();
        let start = self.pos;
        while let Some(c) = self.next_char() {
            if c == quote {
                return Some((&self.source[start..self.pos - 1], true));
            }
        }
        Some((&self.source[start..self.pos], false))
    }

    /// Read an unquoted attribute value.
    pub fn read_unquoted_value(&mut self) -> &'a str {
        self.consume_while(|c| !c.is_whitespace() && !matches!(c, '>' | '/' | '='))
    }

    /// Read a comment body. Returns `None` when the cursor is not on `<!--`;
    /// an unterminated comment runs to the end of input.
    pub fn read_comment(&mut self) -> Option<&'a str> {
        if !self.consume("<!--") {
            return None;
        }
        let start = self.pos;
        match self.remaining().find("-->") {
            Some(rel) => {
                self.pos += rel + 3;
                Some(&self.source[start..start + rel])
            }
            None => {
                self.pos = self.source.len();
                Some(&self.source[start..])
            }
        }
    }

    /// Read a block's raw content up to (not including) its closing tag.
    ///
    /// Nested `<template>` tags are balanced, so a template block may
    /// contain `<template v-if>` children. Other blocks end at the first
    /// closing tag. Returns `None` and moves to the end of input when no
    /// closing tag exists.
    pub fn read_block_content(&mut self, tag: &str) -> Option<&'a str> {
        let start = self.pos;
        let open = format!("<{}", tag);
        let close = format!("</{}", tag);
        let nests = tag.eq_ignore_ascii_case("template");
        let mut depth = 0usize;

        while !self.is_eof() {
            if self.at_tag_boundary(&close) {
                if depth == 0 {
                    return Some(&self.source[start..self.pos]);
                }
                depth -= 1;
                self.pos += close.len();
                continue;
            }
            if nests && self.at_tag_boundary(&open) && !self.opens_self_closing(open.len()) {
                depth += 1;
                self.pos += open.len();
                continue;
            }
            self.next_char();
        }
        None
    }

    /// Consume the rest of a closing tag (`</name ... >`).
    pub fn consume_closing_tag(&mut self, tag: &str) -> bool {
        if !self.at_tag_boundary(&format!("</{}", tag)) {
            return false;
        }
        self.pos += tag.len() + 2;
        match self.remaining().find('>') {
            Some(rel) => {
                self.pos += rel + 1;
                true
            }
            None => {
                self.pos = self.source.len();
                false
            }
        }
    }

    /// Case-insensitive match of `pattern` at the cursor, followed by the
    /// end of a tag name.
    fn at_tag_boundary(&self, pattern: &str) -> bool {
        let rest = self.remaining();
        if rest.len() < pattern.len() || !rest.is_char_boundary(pattern.len()) {
            return false;
        }
        if !rest[..pattern.len()].eq_ignore_ascii_case(pattern) {
            return false;
        }
        matches!(
            rest[pattern.len()..].chars().next(),
            None | Some('>' | '/' | ' ' | '\t' | '\n' | '\r')
        )
    }

    /// Whether the tag opened at the cursor closes itself (`<template ... />`).
    fn opens_self_closing(&self, name_len: usize) -> bool {
        let rest = &self.remaining()[name_len..];
        match rest.find('>') {
            Some(end) => rest[..end].trim_end().ends_with('/'),
            None => false,
        }
    }

    pub fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_tag_name() {
        let mut lexer = BlockLexer::new("template>");
        assert_eq!(lexer.read_tag_name(), Some("template"));
    }

    #[test]
    fn test_read_quoted_value() {
        let mut lexer = BlockLexer::new("\"hello world\"");
        assert_eq!(lexer.read_quoted_value(), Some(("hello world", true)));

        let mut lexer = BlockLexer::new("'open");
        assert_eq!(lexer.read_quoted_value(), Some(("open", false)));
    }

    #[test]
    fn test_read_comment() {
        let mut lexer = BlockLexer::new("<!-- this is a comment -->");
        assert_eq!(lexer.read_comment(), Some(" this is a comment "));
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_nested_template_content() {
        let source = "<div><template v-if=\"ok\">a</template></div></template>";
        let mut lexer = BlockLexer::new(source);
        assert_eq!(
            lexer.read_block_content("template"),
            Some("<div><template v-if=\"ok\">a</template></div>")
        );
        assert!(lexer.consume_closing_tag("template"));
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_self_closing_nested_tag_is_not_counted() {
        let mut lexer = BlockLexer::new("<template /></template>");
        assert_eq!(lexer.read_block_content("template"), Some("<template />"));
    }

    #[test]
    fn test_missing_closing_tag() {
        let mut lexer = BlockLexer::new("<div>never closed");
        assert_eq!(lexer.read_block_content("template"), None);
        assert!(lexer.is_eof());
    }
}
