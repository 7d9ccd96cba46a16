//! Stylesheet structure checks and scoped-selector rewriting.
//!
//! The stylesheet is split into rules, at-rules and comments; declaration
//! bodies are kept verbatim. Selectors of scoped styles get the
//! `[data-v-<id>]` attribute on their last compound selector.

use std::fmt::Write;

/// A structural error in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssError {
    pub message: String,
    /// Byte offset in the stylesheet.
    pub offset: usize,
}

impl CssError {
    fn new(message: &str, offset: usize) -> Self {
        Self {
            message: message.to_string(),
            offset,
        }
    }
}

/// At-rules whose blocks contain further rules.
const NESTING_AT_RULES: &[&str] = &["media", "supports", "container", "layer", "document"];

#[derive(Debug)]
enum Item<'a> {
    /// Whitespace and comments between items, verbatim.
    Raw(&'a str),
    Rule {
        selector: &'a str,
        /// Everything between the braces.
        body: &'a str,
    },
    /// `@media ... { rules }`
    Group {
        prelude: &'a str,
        items: Vec<Item<'a>>,
    },
    /// `@import ...;`, `@keyframes ... { ... }` and friends, verbatim.
    AtRaw(&'a str),
}

struct Parser<'a> {
    css: &'a str,
    bytes: &'a [u8],
    pos: usize,
    errors: Vec<CssError>,
}

impl<'a> Parser<'a> {
    fn new(css: &'a str) -> Self {
        Self {
            css,
            bytes: css.as_bytes(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at(&self, s: &str) -> bool {
        self.css[self.pos..].starts_with(s)
    }

    /// Skip a comment starting at the cursor. Returns false at end of input.
    fn skip_comment(&mut self) -> bool {
        let start = self.pos;
        match self.css[self.pos + 2..].find("*/") {
            Some(rel) => {
                self.pos += 2 + rel + 2;
                true
            }
            None => {
                self.errors.push(CssError::new("Unclosed comment", start));
                self.pos = self.css.len();
                false
            }
        }
    }

    /// Skip a quoted string starting at the cursor.
    fn skip_string(&mut self) -> bool {
        let start = self.pos;
        let Some(quote) = self.peek() else {
            return false;
        };
        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == b'\\' {
                self.pos += 1;
            } else if c == quote {
                return true;
            }
        }
        self.errors.push(CssError::new("Unclosed string", start));
        self.pos = self.css.len();
        false
    }

    /// Advance to the first top-level byte in `stops`, stepping over strings,
    /// comments and parenthesised groups.
    fn scan_to(&mut self, stops: &[u8]) -> Option<u8> {
        let mut parens = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'"' | b'\'' => {
                    if !self.skip_string() {
                        return None;
                    }
                    continue;
                }
                b'/' if self.at("/*") => {
                    if !self.skip_comment() {
                        return None;
                    }
                    continue;
                }
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                _ if parens == 0 && stops.contains(&c) => return Some(c),
                _ => {}
            }
            self.pos += 1;
        }
        None
    }

    /// Read a `{ ... }` body with balanced braces; the cursor is on `{`.
    /// Returns the inner text.
    fn read_body(&mut self) -> Option<&'a str> {
        let open = self.pos;
        self.pos += 1;
        let mut depth = 0usize;
        loop {
            match self.scan_to(b"{}") {
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(_) if depth > 0 => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(_) => {
                    let body = &self.css[open + 1..self.pos];
                    self.pos += 1;
                    return Some(body);
                }
                None => {
                    if self.errors.is_empty() {
                        self.errors.push(CssError::new("Unclosed block", open));
                    }
                    return None;
                }
            }
        }
    }

    fn parse_items(&mut self, open: Option<usize>) -> Vec<Item<'a>> {
        let mut items = Vec::new();
        loop {
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) || self.at("/*") {
                if self.at("/*") {
                    if !self.skip_comment() {
                        return items;
                    }
                } else {
                    self.pos += 1;
                }
            }
            if self.pos > start {
                items.push(Item::Raw(&self.css[start..self.pos]));
            }

            match self.peek() {
                None => {
                    if let Some(open) = open {
                        self.errors.push(CssError::new("Unclosed block", open));
                    }
                    return items;
                }
                Some(b'}') => {
                    if open.is_some() {
                        return items;
                    }
                    self.errors.push(CssError::new("Unexpected }", self.pos));
                    self.pos += 1;
                }
                Some(b'@') => {
                    if !self.parse_at_rule(&mut items) {
                        return items;
                    }
                }
                Some(_) => {
                    if !self.parse_rule(&mut items) {
                        return items;
                    }
                }
            }
        }
    }

    fn parse_at_rule(&mut self, items: &mut Vec<Item<'a>>) -> bool {
        let start = self.pos;
        let name: String = self.css[start + 1..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match self.scan_to(b"{;}") {
            Some(b';') => {
                self.pos += 1;
                items.push(Item::AtRaw(&self.css[start..self.pos]));
                true
            }
            Some(b'{') if NESTING_AT_RULES.contains(&name.as_str()) => {
                let prelude = self.css[start..self.pos].trim_end();
                let open = self.pos;
                self.pos += 1;
                let children = self.parse_items(Some(open));
                if self.peek() != Some(b'}') {
                    return false;
                }
                self.pos += 1;
                items.push(Item::Group {
                    prelude,
                    items: children,
                });
                true
            }
            Some(b'{') => {
                if self.read_body().is_none() {
                    return false;
                }
                items.push(Item::AtRaw(&self.css[start..self.pos]));
                true
            }
            Some(_) => {
                // `@charset "x"}`: statement cut short by a closing brace.
                items.push(Item::AtRaw(&self.css[start..self.pos]));
                true
            }
            None => {
                if self.errors.is_empty() {
                    self.errors.push(CssError::new("Unknown word", start));
                }
                false
            }
        }
    }

    fn parse_rule(&mut self, items: &mut Vec<Item<'a>>) -> bool {
        let start = self.pos;
        match self.scan_to(b"{;}") {
            Some(b'{') => {
                let selector = self.css[start..self.pos].trim_end();
                match self.read_body() {
                    Some(body) => {
                        items.push(Item::Rule { selector, body });
                        true
                    }
                    None => false,
                }
            }
            Some(_) => {
                self.errors.push(CssError::new("Unknown word", start));
                if self.peek() == Some(b';') {
                    self.pos += 1;
                }
                true
            }
            None => {
                if self.errors.is_empty() {
                    self.errors.push(CssError::new("Unknown word", start));
                }
                false
            }
        }
    }
}

fn parse(css: &str) -> Result<Vec<Item<'_>>, Vec<CssError>> {
    let mut parser = Parser::new(css);
    let items = parser.parse_items(None);
    if parser.errors.is_empty() {
        Ok(items)
    } else {
        Err(parser.errors)
    }
}

/// Check that a stylesheet is structurally well formed.
pub fn validate(css: &str) -> Result<(), Vec<CssError>> {
    parse(css).map(|_| ())
}

/// Validate a stylesheet and add `[<attr>]` to every selector.
pub fn scope_css(css: &str, attr: &str) -> Result<String, Vec<CssError>> {
    let items = parse(css)?;
    let attr_selector = format!("[{attr}]");
    let mut out = String::with_capacity(css.len() + css.len() / 4);
    render(&items, &attr_selector, &mut out);
    Ok(out)
}

fn render(items: &[Item<'_>], attr: &str, out: &mut String) {
    for item in items {
        match item {
            Item::Raw(text) | Item::AtRaw(text) => out.push_str(text),
            Item::Rule { selector, body } => {
                let _ = write!(out, "{} {{{}}}", scope_selector(selector, attr), body);
            }
            Item::Group { prelude, items } => {
                let _ = write!(out, "{prelude} {{");
                render(items, attr, out);
                out.push('}');
            }
        }
    }
}

/// Split on top-level occurrences of `sep`, outside parens and brackets.
fn split_top_level(selector: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

/// Scope a selector list.
pub fn scope_selector(selector: &str, attr: &str) -> String {
    split_top_level(selector, ',')
        .into_iter()
        .map(|s| scope_complex(s.trim(), attr))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deep-selector spellings. Functional ones take their argument in parens.
const DEEP: &[(&str, bool)] = &[
    (":deep(", true),
    ("::v-deep(", true),
    ("::v-deep", false),
    (">>>", false),
    ("/deep/", false),
];

fn scope_complex(selector: &str, attr: &str) -> String {
    if selector.is_empty() {
        return String::new();
    }

    if let Some(unwrapped) = unwrap_global(selector) {
        return unwrapped;
    }

    let deep = DEEP
        .iter()
        .filter_map(|(token, functional)| selector.find(token).map(|p| (p, *token, *functional)))
        .min_by_key(|(p, token, _)| (*p, std::cmp::Reverse(token.len())));
    if let Some((pos, token, functional)) = deep {
        let before = selector[..pos].trim_end();
        let after = &selector[pos + token.len()..];
        let inner = if functional {
            match matching_paren(after) {
                Some(end) => format!("{}{}", after[..end].trim(), &after[end + 1..]),
                None => after.to_string(),
            }
        } else {
            after.trim_start().to_string()
        };
        let scoped_before = if before.is_empty() {
            attr.to_string()
        } else {
            scope_last_compound(before, attr)
        };
        return if inner.is_empty() {
            scoped_before
        } else {
            format!("{scoped_before} {inner}")
        };
    }

    scope_last_compound(selector, attr)
}

/// `:global(.a) .b` is left unscoped as `.a .b`.
fn unwrap_global(selector: &str) -> Option<String> {
    let pos = selector.find(":global(")?;
    let after = &selector[pos + ":global(".len()..];
    let end = matching_paren(after)?;
    Some(format!("{}{}{}", &selector[..pos], &after[..end], &after[end + 1..]))
}

/// Index of the `)` closing an already-opened paren.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Insert the attribute into the last compound selector, before its
/// pseudo-classes and pseudo-elements.
fn scope_last_compound(selector: &str, attr: &str) -> String {
    let mut depth = 0usize;
    let mut compound_start = 0;
    let mut prev = '\0';
    for (i, c) in selector.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ' ' | '\t' | '\n' | '>' | '+' | '~' if depth == 0 && prev != '\\' => {
                compound_start = i + c.len_utf8();
            }
            _ => {}
        }
        prev = c;
    }

    let compound = &selector[compound_start..];
    let mut depth = 0usize;
    let mut prev = '\0';
    let mut insert_at = compound.len();
    for (i, c) in compound.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && prev != '\\' => {
                insert_at = i;
                break;
            }
            _ => {}
        }
        prev = c;
    }

    let at = compound_start + insert_at;
    format!("{}{}{}", &selector[..at], attr, &selector[at..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ATTR: &str = "[data-v-1]";

    #[test]
    fn test_scope_simple_selectors() {
        assert_eq!(scope_selector(".foo", ATTR), ".foo[data-v-1]");
        assert_eq!(scope_selector(".foo .bar", ATTR), ".foo .bar[data-v-1]");
        assert_eq!(scope_selector("ul > li", ATTR), "ul > li[data-v-1]");
        assert_eq!(
            scope_selector(".a, .b", ATTR),
            ".a[data-v-1], .b[data-v-1]"
        );
    }

    #[test]
    fn test_scope_pseudo() {
        assert_eq!(scope_selector("a:hover", ATTR), "a[data-v-1]:hover");
        assert_eq!(scope_selector("p::before", ATTR), "p[data-v-1]::before");
        assert_eq!(
            scope_selector("li:not(.a, .b)", ATTR),
            "li[data-v-1]:not(.a, .b)"
        );
        assert_eq!(scope_selector(".md\\:flex", ATTR), ".md\\:flex[data-v-1]");
    }

    #[test]
    fn test_deep_selectors() {
        assert_eq!(scope_selector(".a >>> .b", ATTR), ".a[data-v-1] .b");
        assert_eq!(scope_selector(".a /deep/ .b", ATTR), ".a[data-v-1] .b");
        assert_eq!(scope_selector(".a ::v-deep .b", ATTR), ".a[data-v-1] .b");
        assert_eq!(scope_selector("::v-deep .b", ATTR), "[data-v-1] .b");
        assert_eq!(scope_selector(".a :deep(.b)", ATTR), ".a[data-v-1] .b");
        assert_eq!(scope_selector(":deep(.b) span", ATTR), "[data-v-1] .b span");
    }

    #[test]
    fn test_global_is_unscoped() {
        assert_eq!(scope_selector(":global(.x) .y", ATTR), ".x .y");
    }

    #[test]
    fn test_scope_stylesheet() {
        let css = "/* c */\n.foo { color: red; }\n@media (max-width: 600px) {\n  .bar:hover { color: blue }\n}\n@keyframes spin { from { opacity: 0 } to { opacity: 1 } }\n@import url(\"x.css\");";
        assert_eq!(
            scope_css(css, "data-v-1").unwrap(),
            "/* c */\n.foo[data-v-1] { color: red; }\n@media (max-width: 600px) {\n  .bar[data-v-1]:hover { color: blue }\n}\n@keyframes spin { from { opacity: 0 } to { opacity: 1 } }\n@import url(\"x.css\");"
        );
    }

    #[test]
    fn test_structural_errors() {
        let errors = validate(".a { color: red;").unwrap_err();
        assert_eq!(errors, vec![CssError::new("Unclosed block", 3)]);

        let errors = validate(".a {}\n}").unwrap_err();
        assert_eq!(errors, vec![CssError::new("Unexpected }", 6)]);

        let errors = validate("/* open").unwrap_err();
        assert_eq!(errors[0].message, "Unclosed comment");

        let errors = validate(".a { content: \"x }").unwrap_err();
        assert_eq!(errors[0].message, "Unclosed string");

        let errors = validate("@media screen { .a { } ").unwrap_err();
        assert_eq!(errors[0].message, "Unclosed block");
    }

    #[test]
    fn test_braces_inside_strings_and_comments() {
        let css = ".a::after { content: \"}\"; /* { */ }";
        assert_eq!(
            scope_css(css, "data-v-1").unwrap(),
            ".a[data-v-1]::after { content: \"}\"; /* { */ }"
        );
    }
}
