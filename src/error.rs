//! Error type for the sample application.

use crate::backend::BackendError;
use resource_loader::LoaderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Loader task failed: {0}")]
    Task(String),
}
