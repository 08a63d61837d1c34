use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Syntax,
    UnknownKernel,
    MissingTemplateCategory,
    InvalidArgumentShape,
    RecursionLimitExceeded,
}

impl DiagnosticKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::UnknownKernel => "unknown_kernel",
            Self::MissingTemplateCategory => "missing_template_category",
            Self::InvalidArgumentShape => "invalid_argument_shape",
            Self::RecursionLimitExceeded => "recursion_limit_exceeded",
        }
    }
}

/// Something that went wrong, or was papered over, during one evaluation.
///
/// Coverage and regression tooling read these instead of re-running the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Kernel or template category involved, if any.
    pub subject: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "[{}] {}: {}", self.kind.name(), subject, self.message),
            None => write!(f, "[{}] {}", self.kind.name(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_subject() {
        let d = Diagnostic::new(DiagnosticKind::UnknownKernel, Some("B"), "no handler registered");
        assert_eq!(d.to_string(), "[unknown_kernel] B: no handler registered");
        let d = Diagnostic::new(DiagnosticKind::Syntax, None, "unexpected ')'");
        assert_eq!(d.to_string(), "[syntax] unexpected ')'");
    }
}
