use chrono::{DateTime, Utc};
use fencing_analysis::config::FencingConfig;
use serde::{Deserialize, Serialize};

/// Record of one `analyze` run, written as `run.json` beside the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub analyzed_at: DateTime<Utc>,
    /// Effective configuration; `seed` is always set.
    pub config: FencingConfig,
    pub slides: SlideCounts,
    /// Phenotypes with a result file, in emission order.
    pub phenotypes: Vec<String>,
    /// Phenotypes without any eligible slide.
    pub phenotypes_without_result: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SlideCounts {
    pub loaded: usize,
    /// Loaded with a default image width.
    pub recovered: usize,
    pub skipped: usize,
}
