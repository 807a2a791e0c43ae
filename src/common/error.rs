//! The error taxonomy shared by the translator and the instruction selector.

use derive_more::Display;

use crate::common::Line;

/// Errors this core can report, each tagged with the source line it came
/// from. `Syntax` is never constructed here: it exists so the external
/// frontend's errors can be tunneled through the same type at the CLI
/// boundary.
#[derive(Clone, Display)]
pub enum CompileError {
    #[display("Line {line}: {message}")]
    Syntax { line: Line, message: String },
    #[display("Line {line}: {message}")]
    Semantic { line: Line, message: String },
    #[display("Line {line}: type error: {message}")]
    Type { line: Line, message: String },
    #[display("internal error: {message}")]
    Internal { message: String },
}

impl CompileError {
    pub fn semantic(line: Line, message: impl Into<String>) -> Self {
        CompileError::Semantic {
            line,
            message: message.into(),
        }
    }

    pub fn ty(line: Line, message: impl Into<String>) -> Self {
        CompileError::Type {
            line,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }

    /// The source line this error is attached to, if any (`Internal` errors
    /// are not tied to a single source location).
    pub fn line(&self) -> Option<Line> {
        match self {
            CompileError::Syntax { line, .. }
            | CompileError::Semantic { line, .. }
            | CompileError::Type { line, .. } => Some(*line),
            CompileError::Internal { .. } => None,
        }
    }
}

impl std::fmt::Debug for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_line_prefix() {
        let e = CompileError::semantic(12, "break not in loop");
        assert_eq!(format!("{e}"), "Line 12: break not in loop");
    }

    #[test]
    fn internal_errors_have_no_line() {
        let e = CompileError::internal("missing handler");
        assert_eq!(e.line(), None);
        assert_eq!(format!("{e}"), "internal error: missing handler");
    }
}
