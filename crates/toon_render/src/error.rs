//! Render pipeline error types

use thiserror::Error;
use toon_core::Id;

use crate::blob_shadows::CasterHandle;

/// Errors surfaced by the render pipeline
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("Unknown or stale caster handle: {0:?}")]
    UnknownCaster(CasterHandle),

    #[error("No shadow world registered for scene {0}")]
    SceneNotFound(Id),

    #[error("Shadow world already registered for scene {0}")]
    DuplicateScene(Id),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for render pipeline operations
pub type RenderResult<T> = Result<T, RenderError>;
