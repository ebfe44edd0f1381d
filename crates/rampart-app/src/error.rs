use rampart_core::error::CoreError;
use rampart_security::SecurityError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    CoreError(#[from] CoreError),

    #[error(transparent)]
    SecurityError(#[from] SecurityError),

    #[error("Failed to read `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

pub type AppResult<T> = std::result::Result<T, AppError>;
