//! Cohort-level fencing analysis.
//!
//! This crate turns per-slide cell records into per-phenotype cohort comparisons,
//! using the spatial core of `fencing-spatial` for every (phenotype, slide) unit.
//!
//! # Modules
//!
//! - [`slide`]: cell records, slides and their target/reference/background split
//! - [`registry`]: the list of phenotypes a run iterates over
//! - [`metric`]: normalization of a real fencing fraction against its null mean
//! - [`cohort`]: cohort assignment and the per-phenotype KS comparison
//! - [`config`]: run parameters and their defaults
//! - [`event`]: non-fatal data problems and where they are reported
//! - [`pipeline`]: the phenotype × slide loop tying everything together
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//!
//! use fencing_analysis::{
//!     config::FencingConfig,
//!     event::LogEventSink,
//!     pipeline::FencingPipeline,
//!     registry::PhenotypeRegistry,
//!     slide::{CellRecord, Slide},
//! };
//! use fencing_spatial::seed::SampleSeed;
//!
//! let slide = |id: &str, dx: f64| {
//!     let mut cells = vec![];
//!     for i in 0..5 {
//!         let x = f64::from(i) * 3.0;
//!         cells.push(CellRecord::new("Tc", x + dx, 0.0));
//!         cells.push(CellRecord::new("Cancer", x, 20.0));
//!         cells.push(CellRecord::new("Stroma", x * 100.0, 900.0));
//!     }
//!     Slide::new(id, cells)
//! };
//! let slides = [slide("BrM_1", 0.0), slide("Glioma_1", 4000.0)];
//!
//! let config = FencingConfig { trials: 20, min_cell_count: 5, ..FencingConfig::default() };
//! let pipeline = FencingPipeline::new(&config, SampleSeed::from_u64(1))?;
//! let mut registry = PhenotypeRegistry::from_slides(&slides, &config.reference_phenotype);
//! registry.restrict_to(&["Tc"]);
//!
//! let mut results = vec![];
//! pipeline.run(&registry, &slides, &mut LogEventSink, |result| {
//!     results.push(result);
//!     Ok::<_, Infallible>(())
//! })?;
//! assert_eq!(results[0].cohort_a_values, [1.0]);
//! assert_eq!(results[0].cohort_b_values, [0.0]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

pub mod cohort;
pub mod config;
pub mod event;
pub mod metric;
pub mod pipeline;
pub mod registry;
pub mod slide;
