//! The per-phenotype, per-slide analysis loop.
//!
//! For every phenotype of a [`PhenotypeRegistry`], every slide is measured in
//! turn:
//!
//! 1. split the slide into target, reference and background populations and apply
//!    the minimum-count gate
//! 2. fence the real target population against the reference population
//! 3. draw the permutation null distribution from the background population
//! 4. normalize the real fraction against the null mean
//!
//! The resulting metric goes to the slide's cohort bucket; once all slides are
//! done the phenotype is finalized and handed to the caller.
//!
//! Each (phenotype, slide) unit samples with its own seed, derived from the run
//! seed, the phenotype and the slide id. A unit's result therefore does not depend
//! on which other phenotypes or slides are part of the run.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use fencing_spatial::{
    ClusterParams,
    fence::{FencingObservation, fence},
    null::{NullSampler, SampleError},
    seed::SampleSeed,
};
use serde::Serialize;

use crate::{
    cohort::{Cohort, CohortAggregator, CohortClassifier, CohortRule, PhenotypeResult},
    config::{ConfigError, FencingConfig},
    event::{SlideEvent, SlideEventSink},
    metric::observation_metric,
    registry::PhenotypeRegistry,
    slide::{Ineligibility, Slide},
};

/// Everything measured for one (phenotype, slide) unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitMeasurement {
    pub target_count: usize,
    pub reference_count: usize,
    pub background_count: usize,
    pub observation: FencingObservation,
    pub null_mean: f64,
    pub null_std_dev: f64,
    pub metric: f64,
    pub seed: SampleSeed,
}

/// Outcome of [`FencingPipeline::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Phenotypes a result was emitted for, in emission order.
    pub emitted: Vec<String>,
    /// Phenotypes without any eligible slide in either cohort.
    pub without_result: Vec<String>,
    /// `true` if the run stopped early on cancellation.
    pub cancelled: bool,
}

pub struct FencingPipeline<C = CohortRule> {
    params: ClusterParams,
    min_cell_count: usize,
    reference_phenotype: String,
    sampler: NullSampler,
    run_seed: SampleSeed,
    classifier: C,
    cancel: Option<Arc<AtomicBool>>,
}

impl FencingPipeline<CohortRule> {
    /// Creates a pipeline with the cohort rule of `config`.
    pub fn new(config: &FencingConfig, run_seed: SampleSeed) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            params: config.cluster_params(),
            min_cell_count: config.min_cell_count,
            reference_phenotype: config.reference_phenotype.clone(),
            sampler: config.sampler(),
            run_seed,
            classifier: config.cohorts.clone(),
            cancel: None,
        })
    }
}

impl<C> FencingPipeline<C>
where
    C: CohortClassifier,
{
    /// Replaces the cohort classifier.
    #[must_use]
    pub fn with_classifier<D>(self, classifier: D) -> FencingPipeline<D>
    where
        D: CohortClassifier,
    {
        FencingPipeline {
            params: self.params,
            min_cell_count: self.min_cell_count,
            reference_phenotype: self.reference_phenotype,
            sampler: self.sampler,
            run_seed: self.run_seed,
            classifier,
            cancel: self.cancel,
        }
    }

    /// Stops [`Self::run`] between slides once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(self, flag: Arc<AtomicBool>) -> Self {
        Self {
            cancel: Some(flag),
            ..self
        }
    }

    #[must_use]
    pub fn run_seed(&self) -> SampleSeed {
        self.run_seed
    }

    /// Seed of the (phenotype, slide) unit.
    #[must_use]
    pub fn unit_seed(&self, phenotype: &str, slide_id: &str) -> SampleSeed {
        self.run_seed.derive(phenotype).derive(slide_id)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Measures the fencing metric of `phenotype` on one slide.
    pub fn measure(&self, slide: &Slide, phenotype: &str) -> Result<UnitMeasurement, Ineligibility> {
        let populations = slide.populations(phenotype, &self.reference_phenotype);
        populations.check(self.min_cell_count)?;

        let observation = fence(&populations.target, &populations.reference, self.params);
        let seed = self.unit_seed(phenotype, &slide.id);
        let null = self
            .sampler
            .sample(
                &populations.background,
                &populations.reference,
                populations.target.len(),
                self.params,
                seed,
            )
            .map_err(|SampleError::EmptyBackground| Ineligibility::EmptyBackground)?;
        let null_mean = null.mean();

        Ok(UnitMeasurement {
            target_count: populations.target.len(),
            reference_count: populations.reference.len(),
            background_count: populations.background.len(),
            observation,
            null_mean,
            null_std_dev: null.stats().map_or(0.0, |s| s.std_dev),
            metric: observation_metric(&observation, null_mean),
            seed,
        })
    }

    /// Runs every slide for one phenotype and finalizes its cohort comparison.
    ///
    /// Returns `None` when no slide of either cohort is eligible, or when the run
    /// was cancelled before the phenotype finished.
    pub fn analyze_phenotype(
        &self,
        phenotype: &str,
        slides: &[Slide],
        sink: &mut dyn SlideEventSink,
    ) -> Option<PhenotypeResult> {
        let mut aggregator = CohortAggregator::new(phenotype);
        for slide in slides {
            if self.is_cancelled() {
                return None;
            }
            let unit = match self.measure(slide, phenotype) {
                Ok(unit) => unit,
                Err(reason) => {
                    sink.report(SlideEvent::InsufficientPopulation {
                        slide_id: slide.id.clone(),
                        phenotype: phenotype.to_owned(),
                        reason,
                    });
                    continue;
                }
            };
            log::debug!(
                "{phenotype} / {}: fraction={:.4} null_mean={:.4} metric={:.4} clusters={}/{}",
                slide.id,
                unit.observation.fraction,
                unit.null_mean,
                unit.metric,
                unit.observation.valid_clusters,
                unit.observation.total_clusters,
            );
            let cohort = self.classifier.classify(&slide.id);
            if !aggregator.push(cohort, unit.metric) {
                log::debug!("{phenotype} / {}: {cohort}, metric discarded", slide.id);
            }
        }

        let result = aggregator.finalize()?;
        if result.is_degenerate() {
            sink.report(SlideEvent::DegenerateComparison {
                phenotype: result.phenotype.clone(),
                n_cohort_a: result.n_cohort_a,
                n_cohort_b: result.n_cohort_b,
            });
        }
        Some(result)
    }

    /// Analyzes every registered phenotype and passes each result to `emit`.
    ///
    /// Results are handed over one at a time and not retained. The run stops at
    /// the first `emit` error.
    pub fn run<E, F>(
        &self,
        registry: &PhenotypeRegistry,
        slides: &[Slide],
        sink: &mut dyn SlideEventSink,
        mut emit: F,
    ) -> Result<RunSummary, E>
    where
        F: FnMut(PhenotypeResult) -> Result<(), E>,
    {
        for slide in slides {
            if self.classifier.classify(&slide.id) == Cohort::Unknown {
                sink.report(SlideEvent::UnclassifiedCohort {
                    slide_id: slide.id.clone(),
                });
            }
        }

        let mut summary = RunSummary::default();
        for (i, phenotype) in registry.phenotypes().iter().enumerate() {
            if self.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            log::info!("[{}/{}] {phenotype}", i + 1, registry.len());
            match self.analyze_phenotype(phenotype, slides, sink) {
                Some(result) => {
                    log::info!(
                        "  {} eligible slides ({} vs {}), KS p-value {}",
                        result.n_valid_slides,
                        result.n_cohort_a,
                        result.n_cohort_b,
                        result
                            .ks_pvalue
                            .map_or_else(|| "n/a".to_owned(), |p| format!("{p:.4}")),
                    );
                    emit(result)?;
                    summary.emitted.push(phenotype.clone());
                }
                None if self.is_cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                None => {
                    log::info!("  no eligible slides");
                    summary.without_result.push(phenotype.clone());
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, num::NonZeroUsize};

    use super::*;
    use crate::slide::CellRecord;

    fn config() -> FencingConfig {
        FencingConfig {
            trials: 40,
            min_cell_count: 5,
            threads: NonZeroUsize::new(2),
            ..FencingConfig::default()
        }
    }

    fn pipeline() -> FencingPipeline {
        FencingPipeline::new(&config(), SampleSeed::from_u64(17)).unwrap()
    }

    /// A slide with a tight target cluster next to a tumor and a sparse background.
    fn fenced_slide(id: &str, target: &str) -> Slide {
        let mut cells = vec![];
        for i in 0..8 {
            cells.push(CellRecord::new(target, 100.0 + f64::from(i) * 2.0, 100.0));
        }
        for i in 0..8 {
            cells.push(CellRecord::new("Cancer", 100.0 + f64::from(i) * 2.0, 120.0));
        }
        for i in 0..20 {
            cells.push(CellRecord::new(
                "Stroma",
                1000.0 + f64::from(i % 5) * 200.0,
                1000.0 + f64::from(i / 5) * 200.0,
            ));
        }
        Slide::new(id, cells)
    }

    /// A slide whose target cells sit far from every tumor cell.
    fn distant_slide(id: &str, target: &str) -> Slide {
        let mut slide = fenced_slide(id, target);
        for cell in &mut slide.cells {
            if cell.phenotype == target {
                cell.x += 5000.0;
            }
        }
        slide
    }

    fn run(
        pipeline: &FencingPipeline,
        slides: &[Slide],
    ) -> (RunSummary, Vec<PhenotypeResult>, Vec<SlideEvent>) {
        let registry = PhenotypeRegistry::from_slides(slides, "Cancer");
        let mut events: Vec<SlideEvent> = vec![];
        let mut results = vec![];
        let summary = pipeline
            .run(&registry, slides, &mut events, |r| {
                results.push(r);
                Ok::<_, Infallible>(())
            })
            .unwrap();
        (summary, results, events)
    }

    #[test]
    fn test_fenced_slide_measures_high_metric() {
        let unit = pipeline().measure(&fenced_slide("BrM_1", "Tc"), "Tc").unwrap();
        assert_eq!(unit.target_count, 8);
        assert_eq!(unit.observation.fraction, 1.0);
        // Sparse background never clusters, so the null mean is zero.
        assert_eq!(unit.null_mean, 0.0);
        assert_eq!(unit.metric, 1.0);
    }

    #[test]
    fn test_ineligible_slide_is_reported() {
        let p = pipeline();
        let mut slide = fenced_slide("BrM_1", "Tc");
        slide.cells.retain(|c| c.phenotype != "Stroma");
        assert_eq!(
            p.measure(&slide, "Tc"),
            Err(Ineligibility::EmptyBackground)
        );
        assert!(matches!(
            p.measure(&slide, "NK cell"),
            Err(Ineligibility::TooFewTargets { count: 0, .. })
        ));
    }

    #[test]
    fn test_measure_is_reproducible() {
        let p = pipeline();
        let slide = fenced_slide("Glioma_2", "Tc");
        assert_eq!(p.measure(&slide, "Tc"), p.measure(&slide, "Tc"));
    }

    #[test]
    fn test_cohort_comparison() {
        let slides = [
            fenced_slide("BrM_1", "Tc"),
            fenced_slide("BrM_2", "Tc"),
            distant_slide("Glioma_1", "Tc"),
            distant_slide("Glioma_2", "Tc"),
        ];
        let (summary, results, _) = run(&pipeline(), &slides);
        // Stroma is eligible too, with the tumor-adjacent cells as its background.
        assert_eq!(summary.emitted, ["Stroma", "Tc"]);
        let tc = results.iter().find(|r| r.phenotype == "Tc").unwrap();
        assert_eq!(tc.n_valid_slides, 4);
        assert_eq!(tc.cohort_a_values, [1.0, 1.0]);
        assert_eq!(tc.cohort_b_values, [0.0, 0.0]);
        assert_eq!(tc.ks_statistic, Some(1.0));
    }

    #[test]
    fn test_phenotype_without_eligible_slides_emits_nothing() {
        let mut slides = vec![fenced_slide("BrM_1", "Tc"), fenced_slide("Glioma_1", "Tc")];
        // Two "B cell" cells on one slide: registered, never eligible.
        slides[0].cells.push(CellRecord::new("B cell", 0.0, 0.0));
        slides[0].cells.push(CellRecord::new("B cell", 1.0, 0.0));
        let (summary, results, events) = run(&pipeline(), &slides);
        assert_eq!(summary.emitted, ["Stroma", "Tc"]);
        assert_eq!(summary.without_result, ["B cell"]);
        assert!(results.iter().all(|r| r.phenotype != "B cell"));
        assert!(events.iter().any(|e| matches!(
            e,
            SlideEvent::InsufficientPopulation { phenotype, .. } if phenotype == "B cell"
        )));
    }

    #[test]
    fn test_unknown_cohort_is_excluded_and_reported() {
        let slides = [
            fenced_slide("BrM_1", "Tc"),
            fenced_slide("Control_1", "Tc"),
            distant_slide("Glioma_1", "Tc"),
        ];
        let (_, results, events) = run(&pipeline(), &slides);
        let tc = results.iter().find(|r| r.phenotype == "Tc").unwrap();
        assert_eq!(tc.n_valid_slides, 2);
        assert_eq!(tc.n_cohort_a, 1);
        assert_eq!(tc.n_cohort_b, 1);
        assert!(events.contains(&SlideEvent::UnclassifiedCohort {
            slide_id: "Control_1".to_owned()
        }));
    }

    #[test]
    fn test_single_cohort_reports_degenerate_comparison() {
        let slides = [fenced_slide("BrM_1", "Tc"), fenced_slide("BrM_2", "Tc")];
        let (_, results, events) = run(&pipeline(), &slides);
        let tc = results.iter().find(|r| r.phenotype == "Tc").unwrap();
        assert!(tc.is_degenerate());
        assert!(events.iter().any(|e| matches!(
            e,
            SlideEvent::DegenerateComparison { phenotype, n_cohort_a: 2, n_cohort_b: 0 } if phenotype == "Tc"
        )));
    }

    #[test]
    fn test_custom_classifier() {
        let slides = [fenced_slide("s1_R", "Tc"), distant_slide("s2_N", "Tc")];
        let p = pipeline().with_classifier(|id: &str| {
            if id.ends_with("_R") {
                Cohort::CohortA
            } else {
                Cohort::CohortB
            }
        });
        let registry = PhenotypeRegistry::from_slides(&slides, "Cancer");
        let mut events: Vec<SlideEvent> = vec![];
        let mut results = vec![];
        p.run(&registry, &slides, &mut events, |r| {
            results.push(r);
            Ok::<_, Infallible>(())
        })
        .unwrap();
        let tc = results.iter().find(|r| r.phenotype == "Tc").unwrap();
        assert_eq!(tc.cohort_a_values, [1.0]);
        assert_eq!(tc.cohort_b_values, [0.0]);
    }

    #[test]
    fn test_unit_results_do_not_depend_on_other_slides() {
        let p = pipeline();
        let target = fenced_slide("Glioma_9", "Tc");
        let (_, alone, _) = run(&p, std::slice::from_ref(&target));
        let (_, together, _) = run(&p, &[fenced_slide("BrM_1", "Tc"), target]);
        let alone = alone.iter().find(|r| r.phenotype == "Tc").unwrap();
        let together = together.iter().find(|r| r.phenotype == "Tc").unwrap();
        assert_eq!(alone.cohort_b_values, together.cohort_b_values);
    }

    #[test]
    fn test_cancelled_run_stops() {
        let flag = Arc::new(AtomicBool::new(true));
        let p = pipeline().with_cancel_flag(Arc::clone(&flag));
        let slides = [fenced_slide("BrM_1", "Tc")];
        let (summary, results, _) = run(&p, &slides);
        assert!(summary.cancelled);
        assert!(results.is_empty());
    }

    #[test]
    fn test_emit_error_stops_run() {
        let slides = [fenced_slide("BrM_1", "Tc"), fenced_slide("Glioma_1", "NK cell")];
        let registry = PhenotypeRegistry::from_slides(&slides, "Cancer");
        let mut calls = 0;
        let result = pipeline().run(&registry, &slides, &mut Vec::<SlideEvent>::new(), |_| {
            calls += 1;
            Err("disk full")
        });
        assert_eq!(result, Err("disk full"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = FencingConfig {
            eps: -1.0,
            ..FencingConfig::default()
        };
        assert!(FencingPipeline::new(&config, SampleSeed::from_u64(0)).is_err());
    }
}
