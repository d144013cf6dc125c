use std::{num::NonZeroUsize, path::PathBuf};

use fencing_analysis::config::FencingConfig;
use fencing_spatial::seed::SampleSeed;

use crate::util;

/// Analysis parameters: an optional JSON config file plus per-field overrides.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ConfigArg {
    /// JSON config file; omitted fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Permutation trials per slide [default: 5000]
    #[arg(long)]
    trials: Option<usize>,
    /// Clustering radius and adjacency distance [default: 30]
    #[arg(long)]
    eps: Option<f64>,
    /// Minimum neighborhood size of a core point [default: 3]
    #[arg(long)]
    min_samples: Option<usize>,
    /// Minimum target and reference cells per slide [default: 20]
    #[arg(long)]
    min_cell_count: Option<usize>,
    /// Significance level recorded in the run manifest [default: 0.05]
    #[arg(long)]
    alpha: Option<f64>,
    /// Reference (tumor) phenotype [default: Cancer]
    #[arg(long)]
    reference: Option<String>,
    /// Run seed as 32 hex digits [default: random]
    #[arg(long)]
    seed: Option<SampleSeed>,
    /// Worker threads for permutation trials [default: all cores]
    #[arg(long)]
    threads: Option<NonZeroUsize>,
    /// Slide id prefix of cohort A [default: BrM]
    #[arg(long)]
    cohort_a_prefix: Option<String>,
    /// Slide id prefix of cohort B [default: Glioma]
    #[arg(long)]
    cohort_b_prefix: Option<String>,
}

impl ConfigArg {
    /// Builds the validated configuration.
    pub(crate) fn load(&self) -> anyhow::Result<FencingConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json::<FencingConfig>("config", path)?,
            None => FencingConfig::default(),
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_to(&self, config: &mut FencingConfig) {
        let Self {
            config: _,
            trials,
            eps,
            min_samples,
            min_cell_count,
            alpha,
            reference,
            seed,
            threads,
            cohort_a_prefix,
            cohort_b_prefix,
        } = self;
        if let Some(trials) = trials {
            config.trials = *trials;
        }
        if let Some(eps) = eps {
            config.eps = *eps;
        }
        if let Some(min_samples) = min_samples {
            config.min_samples = *min_samples;
        }
        if let Some(min_cell_count) = min_cell_count {
            config.min_cell_count = *min_cell_count;
        }
        if let Some(alpha) = alpha {
            config.alpha = *alpha;
        }
        if let Some(reference) = reference {
            config.reference_phenotype.clone_from(reference);
        }
        if let Some(seed) = seed {
            config.seed = Some(*seed);
        }
        if let Some(threads) = threads {
            config.threads = Some(*threads);
        }
        if let Some(prefix) = cohort_a_prefix {
            config.cohorts.cohort_a_prefix.clone_from(prefix);
        }
        if let Some(prefix) = cohort_b_prefix {
            config.cohorts.cohort_b_prefix.clone_from(prefix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_defaults() {
        let arg = ConfigArg {
            trials: Some(100),
            reference: Some("Tumor".to_owned()),
            cohort_b_prefix: Some("GBM".to_owned()),
            seed: Some(SampleSeed::from_u64(3)),
            ..ConfigArg::default()
        };
        let config = arg.load().unwrap();
        assert_eq!(config.trials, 100);
        assert_eq!(config.eps, 30.0);
        assert_eq!(config.reference_phenotype, "Tumor");
        assert_eq!(config.cohorts.cohort_a_prefix, "BrM");
        assert_eq!(config.cohorts.cohort_b_prefix, "GBM");
        assert_eq!(config.seed, Some(SampleSeed::from_u64(3)));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let arg = ConfigArg {
            eps: Some(0.0),
            ..ConfigArg::default()
        };
        assert!(arg.load().is_err());
    }
}
