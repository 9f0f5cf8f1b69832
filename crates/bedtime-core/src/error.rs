use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::IllegalTransition;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Story generation error: {0}")]
    Generation(#[from] bedtime_agent::GenerationError),

    #[error("Critique error: {0}")]
    Critique(#[from] bedtime_critic::CritiqueError),

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Internal pipeline error: {0}")]
    Internal(#[from] IllegalTransition),
}

/// Serializable classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    GenerationError,
    CritiqueError,
    Cancelled,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::GenerationError => write!(f, "GenerationError"),
            ErrorKind::CritiqueError => write!(f, "CritiqueError"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::Internal => write!(f, "Internal"),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Generation(_) => ErrorKind::GenerationError,
            PipelineError::Critique(_) => ErrorKind::CritiqueError,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::Internal(_) => ErrorKind::Internal,
        }
    }
}
