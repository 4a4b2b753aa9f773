//! Pipeline Configuration
//!
//! Loaded from TOML. Missing sections fall back to defaults and every value
//! is clamped into range on load.
//!
//! ```toml
//! [blob_shadows]
//! map_size = "512"
//! mode = "Metaballs"
//! saturation = 0.8
//! shadow_offset = [0.25, -0.25]
//!
//! [jobs]
//! worker_threads = 4
//! ```

use serde::{Deserialize, Serialize};

use crate::blob_shadows::BlobShadowSettings;
use crate::error::RenderResult;

/// Culling worker pool configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPoolConfig {
    /// Worker thread count (0 = one per logical core)
    pub worker_threads: usize,
}

/// Top-level pipeline configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToonPipelineConfig {
    /// Blob shadow settings used by cameras without an override
    pub blob_shadows: BlobShadowSettings,

    /// Culling worker pool
    pub jobs: JobPoolConfig,
}

impl ToonPipelineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        let mut config: Self = toml::from_str(source)?;
        config.validate();
        Ok(config)
    }

    /// Clamp every section into range
    pub fn validate(&mut self) {
        self.blob_shadows.validate();
        self.jobs.worker_threads = self.jobs.worker_threads.min(256);
    }
}
