//! Permutation null distribution of the fencing fraction.
//!
//! Each trial draws a pseudo-target of the same size as the real target from the
//! background population (cells that are neither the target phenotype nor the
//! reference phenotype), and measures its fencing fraction against the same
//! reference set with the same clustering parameters. The mean over all trials is
//! the fraction expected from density alone.
//!
//! # Replacement policy
//!
//! A resample is drawn **with replacement** only when it is larger than the
//! background pool, and **without replacement** otherwise (see
//! [`ReplacementPolicy::for_sizes`]). The two branches give null distributions of
//! different variance, so slides with small background pools are not directly
//! comparable to slides with large ones; the asymmetry is kept deliberately to
//! reproduce the established metric.
//!
//! # Parallelization
//!
//! Trials are independent. Every trial gets its own [`Pcg32`] seeded from a
//! per-trial value drawn up front from the unit's [`SampleSeed`], and trials are
//! split into contiguous chunks across scoped threads. The output is therefore
//! identical for any thread count.

use std::{num::NonZeroUsize, thread};

use fencing_stats::descriptive::{DescriptiveStats, mean_or_zero};
use rand::{Rng, SeedableRng as _, seq::index};
use rand_pcg::Pcg32;

use crate::{ClusterParams, Point, fence::fence, seed::SampleSeed};

/// How background cells are drawn for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ReplacementPolicy {
    WithReplacement,
    WithoutReplacement,
}

impl ReplacementPolicy {
    /// With replacement exactly when `sample_size` exceeds `pool_size`.
    #[must_use]
    pub fn for_sizes(sample_size: usize, pool_size: usize) -> Self {
        if sample_size > pool_size {
            Self::WithReplacement
        } else {
            Self::WithoutReplacement
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SampleError {
    #[display("background population is empty")]
    EmptyBackground,
}

/// Fencing fractions of all permutation trials of one (phenotype, slide) unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NullDistribution {
    fractions: Vec<f64>,
}

impl NullDistribution {
    /// Trial fractions, in trial order.
    #[must_use]
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    /// Mean trial fraction, `0.0` for an empty distribution.
    #[must_use]
    pub fn mean(&self) -> f64 {
        mean_or_zero(&self.fractions)
    }

    /// Summary statistics of the trial fractions.
    #[must_use]
    pub fn stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.fractions.iter().copied())
    }
}

impl FromIterator<f64> for NullDistribution {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            fractions: iter.into_iter().collect(),
        }
    }
}

/// Builds null distributions by resampling a background population.
#[derive(Debug, Clone, Copy)]
pub struct NullSampler {
    trials: usize,
    threads: NonZeroUsize,
}

impl NullSampler {
    pub const DEFAULT_TRIALS: usize = 5000;

    /// Creates a sampler running `trials` trials on all available cores.
    #[must_use]
    pub fn new(trials: usize) -> Self {
        Self {
            trials,
            threads: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Like [`Self::new`], but with an explicit worker count.
    #[must_use]
    pub fn with_threads(self, threads: NonZeroUsize) -> Self {
        Self { threads, ..self }
    }

    #[must_use]
    pub fn trials(&self) -> usize {
        self.trials
    }

    #[must_use]
    pub fn threads(&self) -> NonZeroUsize {
        self.threads
    }

    /// Draws the null distribution of the fencing fraction.
    ///
    /// Runs exactly `self.trials()` trials; each resamples `sample_size` points from
    /// `background` under [`ReplacementPolicy::for_sizes`] and fences them against
    /// `reference`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZeroUsize;
    /// use fencing_spatial::{ClusterParams, Point, null::NullSampler, seed::SampleSeed};
    ///
    /// let background = (0..40)
    ///     .map(|i| Point::new(f64::from(i % 8) * 5.0, f64::from(i / 8) * 5.0))
    ///     .collect::<Vec<_>>();
    /// let reference = [Point::new(0.0, 0.0)];
    ///
    /// let sampler = NullSampler::new(50).with_threads(NonZeroUsize::new(2).unwrap());
    /// let null = sampler
    ///     .sample(&background, &reference, 20, ClusterParams::default(), SampleSeed::from_u64(1))
    ///     .unwrap();
    /// assert_eq!(null.len(), 50);
    /// assert!(null.fractions().iter().all(|f| (0.0..=1.0).contains(f)));
    /// ```
    pub fn sample(
        &self,
        background: &[Point],
        reference: &[Point],
        sample_size: usize,
        params: ClusterParams,
        seed: SampleSeed,
    ) -> Result<NullDistribution, SampleError> {
        if background.is_empty() {
            return Err(SampleError::EmptyBackground);
        }
        if self.trials == 0 {
            return Ok(NullDistribution::default());
        }

        let mut master = seed.rng();
        let trial_seeds = (0..self.trials)
            .map(|_| master.random::<u64>())
            .collect::<Vec<_>>();
        let run_chunk = |chunk: &[u64]| {
            chunk
                .iter()
                .map(|&trial_seed| {
                    let mut rng = Pcg32::seed_from_u64(trial_seed);
                    let sample = resample(&mut rng, background, sample_size);
                    fence(&sample, reference, params).fraction
                })
                .collect::<Vec<_>>()
        };

        let workers = self.threads.get().min(self.trials);
        if workers == 1 {
            return Ok(run_chunk(&trial_seeds).into_iter().collect());
        }

        let chunk_size = self.trials.div_ceil(workers);
        let fractions = thread::scope(|s| {
            let handles = trial_seeds
                .chunks(chunk_size)
                .map(|chunk| s.spawn(move || run_chunk(chunk)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });
        Ok(fractions)
    }
}

/// Draws `sample_size` background points under the replacement policy.
fn resample<R>(rng: &mut R, background: &[Point], sample_size: usize) -> Vec<Point>
where
    R: Rng + ?Sized,
{
    match ReplacementPolicy::for_sizes(sample_size, background.len()) {
        ReplacementPolicy::WithReplacement => (0..sample_size)
            .map(|_| background[rng.random_range(0..background.len())])
            .collect(),
        ReplacementPolicy::WithoutReplacement => index::sample(rng, background.len(), sample_size)
            .into_iter()
            .map(|i| background[i])
            .collect(),
    }
}
