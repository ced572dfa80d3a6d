use std::path::PathBuf;

use kurai_core::KuraiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] KuraiError),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("--data must be valid JSON: {0}")]
    InvalidData(serde_json::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render JSON: {0}")]
    Render(serde_json::Error),
}
