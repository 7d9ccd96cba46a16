//! Error types for component and script compilation.

use source_pos::Location;
use std::fmt;

/// Broad category of a compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed component markup; script and style stages never ran.
    Parse,
    /// Script could not be parsed, bound or transformed.
    Script,
    /// A style block failed to preprocess or is structurally malformed.
    Style,
    /// A data file is not valid JSON.
    Data,
    /// The file type or a language feature is not supported.
    Unsupported,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Script => "script",
            ErrorKind::Style => "style",
            ErrorKind::Data => "data",
            ErrorKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal error for one file's compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    /// Position in the compiled file, when known.
    pub location: Option<Location>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Script, message)
    }

    pub fn style(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Style, message)
    }
}

impl From<sfc_parser::ParseError> for CompileError {
    fn from(err: sfc_parser::ParseError) -> Self {
        Self::new(ErrorKind::Parse, err.message).at(err.location)
    }
}

/// Why a script transform failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformErrorKind {
    Syntax,
    /// Syntax the transformer understands but cannot lower, such as a
    /// TypeScript enum.
    Unsupported,
    /// A required collaborator (for example the markup transform) was not
    /// supplied.
    NotConfigured,
}

/// Failure reported by a [`ScriptTransformer`](crate::ScriptTransformer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransformError {
    pub kind: TransformErrorKind,
    pub message: String,
    /// 1-based position in the transformed source.
    pub location: Option<Location>,
}

impl TransformError {
    pub fn syntax(message: impl Into<String>, location: Location) -> Self {
        Self {
            kind: TransformErrorKind::Syntax,
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn unsupported(message: impl Into<String>, location: Location) -> Self {
        Self {
            kind: TransformErrorKind::Unsupported,
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self {
            kind: TransformErrorKind::NotConfigured,
            message: message.into(),
            location: None,
        }
    }
}

impl From<TransformError> for CompileError {
    fn from(err: TransformError) -> Self {
        let kind = match err.kind {
            TransformErrorKind::Syntax => ErrorKind::Script,
            TransformErrorKind::Unsupported | TransformErrorKind::NotConfigured => {
                ErrorKind::Unsupported
            }
        };
        CompileError {
            kind,
            message: err.message,
            location: err.location,
        }
    }
}
