//! File classification by extension.

use sfc_parser::ScriptLang;

/// What kind of source a file holds, derived from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// `.vue`
    Component,
    /// `.html`
    Markup,
    /// `.css`
    Stylesheet,
    /// `.ts` / `.tsx`
    TypedScript,
    /// `.json`
    Data,
    /// Anything else, `.js` and `.jsx` included.
    Script,
}

impl Language {
    pub fn of(filename: &str) -> Self {
        match extension(filename) {
            Some("vue") => Language::Component,
            Some("html") => Language::Markup,
            Some("css") => Language::Stylesheet,
            Some("ts" | "tsx") => Language::TypedScript,
            Some("json") => Language::Data,
            _ => Language::Script,
        }
    }
}

/// Split `dir/name.ext` into (`dir/name`, `ext`).
///
/// Requires at least one character before the final dot, so dotfiles and
/// extensionless names yield `None`.
pub fn split_extension(filename: &str) -> Option<(&str, &str)> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() || stem.is_empty() || stem.ends_with('/') || stem.ends_with('.') {
        return None;
    }
    Some((stem, ext))
}

/// The final extension of a filename, without the dot.
pub fn extension(filename: &str) -> Option<&str> {
    split_extension(filename).map(|(_, ext)| ext)
}

/// Script dialect for a script file extension.
pub fn script_lang(ext: &str) -> Option<ScriptLang> {
    match ext {
        "js" => Some(ScriptLang::Js),
        "jsx" => Some(ScriptLang::Jsx),
        "ts" => Some(ScriptLang::Ts),
        "tsx" => Some(ScriptLang::Tsx),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_of() {
        assert_eq!(Language::of("src/App.vue"), Language::Component);
        assert_eq!(Language::of("index.html"), Language::Markup);
        assert_eq!(Language::of("src/a.css"), Language::Stylesheet);
        assert_eq!(Language::of("src/util.tsx"), Language::TypedScript);
        assert_eq!(Language::of("import-map.json"), Language::Data);
        assert_eq!(Language::of("src/main.js"), Language::Script);
        assert_eq!(Language::of("README"), Language::Script);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("src/App.vue"), Some(("src/App", "vue")));
        assert_eq!(split_extension("a.d.ts"), Some(("a.d", "ts")));
        assert_eq!(split_extension("src/.env"), None);
        assert_eq!(split_extension("Makefile"), None);
    }
}
