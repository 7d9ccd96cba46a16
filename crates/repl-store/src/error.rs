//! Store errors and user-facing diagnostics.

use crate::share::ShareError;
use sfc_compiler::CompileError;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid share state")]
    InvalidShareState(#[from] ShareError),
}

/// A problem shown next to the editor. Replaced or accumulated by store
/// operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Store-level message, such as a failed rename.
    Message(String),
    /// A compile failure of one file.
    Compile { filename: String, error: CompileError },
}

impl Diagnostic {
    pub fn message(text: impl Into<String>) -> Self {
        Diagnostic::Message(text.into())
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Diagnostic::Message(_) => None,
            Diagnostic::Compile { filename, .. } => Some(filename),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Message(text) => f.write_str(text),
            Diagnostic::Compile { filename, error } => match error.location {
                Some(location) => write!(f, "{filename}:{location}: {}", error.message),
                None => write!(f, "{filename}: {}", error.message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfc_compiler::ErrorKind;

    #[test]
    fn test_display() {
        let error = CompileError::new(ErrorKind::Script, "Unexpected token");
        let diagnostic = Diagnostic::Compile {
            filename: "src/App.vue".to_string(),
            error,
        };
        assert_eq!(diagnostic.to_string(), "src/App.vue: Unexpected token");
        assert_eq!(diagnostic.filename(), Some("src/App.vue"));
        assert_eq!(Diagnostic::message("nope").to_string(), "nope");
    }
}
