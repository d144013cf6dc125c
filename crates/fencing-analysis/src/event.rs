//! Reporting of non-fatal data problems.
//!
//! Nothing in the analysis aborts a run: a malformed slide is skipped, a missing
//! companion file is replaced by a default, and a slide too sparse for a phenotype
//! simply does not contribute to it. Each of these outcomes is reported as a
//! [`SlideEvent`] to a caller-supplied [`SlideEventSink`].

use crate::slide::{Ineligibility, Slide};

/// A reportable outcome of loading or analyzing a slide.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum SlideEvent {
    #[display("slide {slide_id}: loaded {cells} cells")]
    Loaded { slide_id: String, cells: usize },
    /// A companion file could not be used and a default was substituted.
    #[display("slide {slide_id}: {detail}; using default")]
    MissingAuxiliaryData { slide_id: String, detail: String },
    /// The slide could not be parsed and contributes to no phenotype.
    #[display("slide {slide_id}: skipped ({reason})")]
    MalformedSlideData { slide_id: String, reason: String },
    /// The slide fails the population gate for one phenotype.
    #[display("slide {slide_id}: not eligible for {phenotype}: {reason}")]
    InsufficientPopulation {
        slide_id: String,
        phenotype: String,
        reason: Ineligibility,
    },
    /// The slide id matches neither cohort; its metrics are never compared.
    #[display("slide {slide_id}: id matches no cohort")]
    UnclassifiedCohort { slide_id: String },
    /// Only one cohort has eligible slides, so no KS test was run.
    #[display("{phenotype}: no comparison ({n_cohort_a} vs {n_cohort_b} slides)")]
    DegenerateComparison {
        phenotype: String,
        n_cohort_a: usize,
        n_cohort_b: usize,
    },
}

impl SlideEvent {
    /// Log level the event is reported at by [`LogEventSink`].
    #[must_use]
    pub fn level(&self) -> log::Level {
        match self {
            Self::Loaded { .. } | Self::InsufficientPopulation { .. } => log::Level::Debug,
            Self::UnclassifiedCohort { .. } | Self::DegenerateComparison { .. } => log::Level::Info,
            Self::MissingAuxiliaryData { .. } | Self::MalformedSlideData { .. } => log::Level::Warn,
        }
    }
}

/// Receiver of [`SlideEvent`]s.
pub trait SlideEventSink {
    fn report(&mut self, event: SlideEvent);
}

/// Forwards every event to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl SlideEventSink for LogEventSink {
    fn report(&mut self, event: SlideEvent) {
        log::log!(event.level(), "{event}");
    }
}

impl SlideEventSink for Vec<SlideEvent> {
    fn report(&mut self, event: SlideEvent) {
        self.push(event);
    }
}

/// Outcome of loading one slide.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideLoad {
    Loaded(Slide),
    /// Loaded, but with defaults substituted for missing auxiliary data.
    Recovered { slide: Slide, detail: String },
    /// Not usable at all.
    Skipped { slide_id: String, reason: String },
}

impl SlideLoad {
    /// Reports the outcome to `sink` and returns the slide if it is usable.
    pub fn report(self, sink: &mut dyn SlideEventSink) -> Option<Slide> {
        match self {
            Self::Loaded(slide) => {
                sink.report(SlideEvent::Loaded {
                    slide_id: slide.id.clone(),
                    cells: slide.cells.len(),
                });
                Some(slide)
            }
            Self::Recovered { slide, detail } => {
                sink.report(SlideEvent::MissingAuxiliaryData {
                    slide_id: slide.id.clone(),
                    detail,
                });
                sink.report(SlideEvent::Loaded {
                    slide_id: slide.id.clone(),
                    cells: slide.cells.len(),
                });
                Some(slide)
            }
            Self::Skipped { slide_id, reason } => {
                sink.report(SlideEvent::MalformedSlideData { slide_id, reason });
                None
            }
        }
    }

    #[must_use]
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::CellRecord;

    #[test]
    fn test_skipped_slide_is_reported_not_returned() {
        let mut events: Vec<SlideEvent> = vec![];
        let load = SlideLoad::Skipped {
            slide_id: "BrM_3".to_owned(),
            reason: "expected value at line 1 column 1".to_owned(),
        };
        assert!(!load.is_usable());
        assert_eq!(load.report(&mut events), None);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SlideEvent::MalformedSlideData { slide_id, .. } if slide_id == "BrM_3"));
        assert_eq!(events[0].level(), log::Level::Warn);
    }

    #[test]
    fn test_recovered_slide_reports_and_returns() {
        let mut events: Vec<SlideEvent> = vec![];
        let slide = Slide::new("Glioma_1", vec![CellRecord::new("Tc", 1.0, 2.0)]);
        let load = SlideLoad::Recovered {
            slide: slide.clone(),
            detail: "segmentation metadata missing, image width 1000".to_owned(),
        };
        assert_eq!(load.report(&mut events), Some(slide));
        assert!(matches!(events[0], SlideEvent::MissingAuxiliaryData { .. }));
        assert!(matches!(events[1], SlideEvent::Loaded { cells: 1, .. }));
    }

    #[test]
    fn test_event_messages() {
        let event = SlideEvent::InsufficientPopulation {
            slide_id: "BrM_2".to_owned(),
            phenotype: "Tc".to_owned(),
            reason: Ineligibility::TooFewTargets { count: 4, min: 20 },
        };
        assert_eq!(
            event.to_string(),
            "slide BrM_2: not eligible for Tc: 4 target cells (minimum 20)"
        );
    }
}
