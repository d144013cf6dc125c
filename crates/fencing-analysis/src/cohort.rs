//! Cohort assignment and per-phenotype cohort comparison.
//!
//! Every slide belongs to one of two cohorts, decided from its identifier alone,
//! or to neither. For each phenotype a [`CohortAggregator`] collects one fencing
//! metric per eligible slide into the slide's cohort bucket, then finalizes into a
//! [`PhenotypeResult`] with a two-sample Kolmogorov-Smirnov comparison.
//!
//! ```text
//! new() ──push()*──> finalize() ──> Option<PhenotypeResult>
//! ```
//!
//! `finalize` consumes the aggregator, so a finalized phenotype cannot receive
//! further slides.

use fencing_stats::ks::KsTest;
use serde::{Deserialize, Serialize};

/// Comparison group of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::IsVariant)]
pub enum Cohort {
    /// First cohort (reported as "responders").
    #[display("cohort A")]
    CohortA,
    /// Second cohort (reported as "non-responders").
    #[display("cohort B")]
    CohortB,
    /// Slide id matches neither cohort; excluded from comparisons.
    #[display("unknown cohort")]
    Unknown,
}

/// Assigns a cohort to a slide from its identifier.
pub trait CohortClassifier {
    fn classify(&self, slide_id: &str) -> Cohort;
}

impl<F> CohortClassifier for F
where
    F: Fn(&str) -> Cohort,
{
    fn classify(&self, slide_id: &str) -> Cohort {
        self(slide_id)
    }
}

/// Prefix-based naming convention for cohort assignment.
///
/// A slide whose id starts with `cohort_a_prefix` belongs to cohort A, one that
/// starts with `cohort_b_prefix` to cohort B; cohort A wins if both match.
///
/// ```
/// use fencing_analysis::cohort::{Cohort, CohortClassifier as _, CohortRule};
///
/// let rule = CohortRule::default();
/// assert_eq!(rule.classify("BrM_12"), Cohort::CohortA);
/// assert_eq!(rule.classify("Glioma_3"), Cohort::CohortB);
/// assert_eq!(rule.classify("Control_1"), Cohort::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortRule {
    pub cohort_a_prefix: String,
    pub cohort_b_prefix: String,
}

impl Default for CohortRule {
    fn default() -> Self {
        Self {
            cohort_a_prefix: "BrM".to_owned(),
            cohort_b_prefix: "Glioma".to_owned(),
        }
    }
}

impl CohortClassifier for CohortRule {
    fn classify(&self, slide_id: &str) -> Cohort {
        if slide_id.starts_with(&self.cohort_a_prefix) {
            Cohort::CohortA
        } else if slide_id.starts_with(&self.cohort_b_prefix) {
            Cohort::CohortB
        } else {
            Cohort::Unknown
        }
    }
}

/// Per-phenotype comparison of fencing metrics between the two cohorts.
///
/// Serializes with the established output field names: cohort A is reported as
/// "responders" and cohort B as "non-responders".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeResult {
    pub phenotype: String,
    /// Always `n_cohort_a + n_cohort_b`.
    pub n_valid_slides: usize,
    #[serde(rename = "n_responders")]
    pub n_cohort_a: usize,
    #[serde(rename = "n_nonresponders")]
    pub n_cohort_b: usize,
    /// `None` unless both cohorts have at least one slide.
    pub ks_statistic: Option<f64>,
    /// `None` unless both cohorts have at least one slide.
    pub ks_pvalue: Option<f64>,
    #[serde(rename = "responder_values")]
    pub cohort_a_values: Vec<f64>,
    #[serde(rename = "nonresponder_values")]
    pub cohort_b_values: Vec<f64>,
}

impl PhenotypeResult {
    /// Returns `true` if the KS comparison was skipped because a cohort is empty.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.ks_statistic.is_none()
    }
}

/// Collects fencing metrics of one phenotype by cohort.
#[derive(Debug, Clone)]
pub struct CohortAggregator {
    phenotype: String,
    cohort_a: Vec<f64>,
    cohort_b: Vec<f64>,
}

impl CohortAggregator {
    #[must_use]
    pub fn new(phenotype: impl Into<String>) -> Self {
        Self {
            phenotype: phenotype.into(),
            cohort_a: vec![],
            cohort_b: vec![],
        }
    }

    #[must_use]
    pub fn phenotype(&self) -> &str {
        &self.phenotype
    }

    /// Adds one slide's metric to its cohort bucket.
    ///
    /// Returns `false` (and drops the value) for [`Cohort::Unknown`].
    pub fn push(&mut self, cohort: Cohort, metric: f64) -> bool {
        match cohort {
            Cohort::CohortA => self.cohort_a.push(metric),
            Cohort::CohortB => self.cohort_b.push(metric),
            Cohort::Unknown => return false,
        }
        true
    }

    /// Number of slides accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cohort_a.len() + self.cohort_b.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finishes the phenotype.
    ///
    /// Returns `None` when no slide reached either cohort. When only one cohort
    /// has slides, the KS fields are `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fencing_analysis::cohort::{Cohort, CohortAggregator};
    ///
    /// let mut agg = CohortAggregator::new("Tc");
    /// for m in [0.8, 0.9, 0.85] {
    ///     agg.push(Cohort::CohortA, m);
    /// }
    /// for m in [0.1, 0.2, 0.15] {
    ///     agg.push(Cohort::CohortB, m);
    /// }
    /// let result = agg.finalize().unwrap();
    /// assert_eq!(result.n_valid_slides, 6);
    /// assert_eq!(result.ks_statistic, Some(1.0));
    /// ```
    #[must_use]
    pub fn finalize(self) -> Option<PhenotypeResult> {
        let Self {
            phenotype,
            cohort_a,
            cohort_b,
        } = self;
        if cohort_a.is_empty() && cohort_b.is_empty() {
            return None;
        }
        let ks = KsTest::two_sample(&cohort_a, &cohort_b);
        Some(PhenotypeResult {
            phenotype,
            n_valid_slides: cohort_a.len() + cohort_b.len(),
            n_cohort_a: cohort_a.len(),
            n_cohort_b: cohort_b.len(),
            ks_statistic: ks.map(|t| t.statistic),
            ks_pvalue: ks.map(|t| t.p_value),
            cohort_a_values: cohort_a,
            cohort_b_values: cohort_b,
        })
    }
}
