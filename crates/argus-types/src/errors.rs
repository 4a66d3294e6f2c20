use thiserror::Error;

pub type Result<T, E = ArgusError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
///
/// `Construction` is fatal: the component that produced it must not be used.
/// `Detection` is recoverable and terminal for a single frame only.
#[derive(Debug, Error)]
pub enum ArgusError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("construction error: {0}")]
    Construction(String),
    #[error("detection error: {0}")]
    Detection(String),
    #[error("overlay error: {0}")]
    Overlay(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
