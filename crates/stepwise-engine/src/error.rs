//! Lowering errors

use crate::analysis::Diagnostic;
use thiserror::Error;

pub type LowerResult<T> = Result<T, LowerError>;

#[derive(Debug, Error)]
pub enum LowerError {
    /// Suspension points in positions the transformation cannot handle
    #[error("{} unsupported await usage(s): {}", .0.len(), format_diagnostics(.0))]
    Usage(Vec<Diagnostic>),

    /// A pass broke an invariant of the pipeline
    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl LowerError {
    pub fn internal(message: impl Into<String>) -> Self {
        LowerError::Internal {
            message: message.into(),
        }
    }

    /// Diagnostics carried by a usage error (empty otherwise)
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            LowerError::Usage(diagnostics) => diagnostics,
            LowerError::Internal { .. } => &[],
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, LowerError::Internal { .. })
    }
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
