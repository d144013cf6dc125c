//! Run configuration.
//!
//! [`FencingConfig`] holds every tunable of an analysis run with its default in one
//! place. It deserializes from JSON with missing fields filled from
//! [`FencingConfig::default`], so a config file only needs the values it changes.

use std::num::NonZeroUsize;

use fencing_spatial::{ClusterParams, null::NullSampler, seed::SampleSeed};
use serde::{Deserialize, Serialize};

use crate::cohort::CohortRule;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("eps must be a positive finite distance, got {eps}")]
    InvalidEps { eps: f64 },
    #[display("min_samples must be at least 1")]
    ZeroMinSamples,
    #[display("trials must be at least 1")]
    ZeroTrials,
    #[display("alpha must lie strictly between 0 and 1, got {alpha}")]
    InvalidAlpha { alpha: f64 },
    #[display("reference phenotype must not be empty")]
    EmptyReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FencingConfig {
    /// Permutation trials per (phenotype, slide) unit.
    pub trials: usize,
    /// Clustering radius and adjacency distance.
    pub eps: f64,
    /// Minimum neighborhood size (point itself included) of a core point.
    pub min_samples: usize,
    /// Minimum target and reference cell count of an eligible slide.
    pub min_cell_count: usize,
    /// Significance level, recorded for downstream consumers only.
    pub alpha: f64,
    /// Phenotype the targets are fenced against.
    pub reference_phenotype: String,
    pub cohorts: CohortRule,
    /// Run seed; drawn at random when absent.
    pub seed: Option<SampleSeed>,
    /// Trial worker threads; all available cores when absent.
    pub threads: Option<NonZeroUsize>,
}

impl Default for FencingConfig {
    fn default() -> Self {
        Self {
            trials: NullSampler::DEFAULT_TRIALS,
            eps: ClusterParams::DEFAULT_EPS,
            min_samples: ClusterParams::DEFAULT_MIN_SAMPLES,
            min_cell_count: 20,
            alpha: 0.05,
            reference_phenotype: "Cancer".to_owned(),
            cohorts: CohortRule::default(),
            seed: None,
            threads: None,
        }
    }
}

impl FencingConfig {
    /// Rejects parameter values the pipeline cannot run with.
    ///
    /// ```
    /// use fencing_analysis::config::{ConfigError, FencingConfig};
    ///
    /// assert_eq!(FencingConfig::default().validate(), Ok(()));
    ///
    /// let config = FencingConfig { trials: 0, ..FencingConfig::default() };
    /// assert_eq!(config.validate(), Err(ConfigError::ZeroTrials));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ConfigError::InvalidEps { eps: self.eps });
        }
        if self.min_samples == 0 {
            return Err(ConfigError::ZeroMinSamples);
        }
        if self.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::InvalidAlpha { alpha: self.alpha });
        }
        if self.reference_phenotype.is_empty() {
            return Err(ConfigError::EmptyReference);
        }
        Ok(())
    }

    #[must_use]
    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            eps: self.eps,
            min_samples: self.min_samples,
        }
    }

    #[must_use]
    pub fn sampler(&self) -> NullSampler {
        let sampler = NullSampler::new(self.trials);
        match self.threads {
            Some(threads) => sampler.with_threads(threads),
            None => sampler,
        }
    }
}
