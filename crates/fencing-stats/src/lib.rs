//! Statistical utilities for the fencing analysis.
//!
//! This crate holds the domain-free statistics used by the spatial and cohort layers:
//!
//! - **Descriptive statistics**: mean, median, variance and spread of a sample
//! - **Two-sample Kolmogorov-Smirnov test**: nonparametric comparison of two samples
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`ks`]: Two-sample Kolmogorov-Smirnov statistic and p-value
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use fencing_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Comparing two samples
//!
//! ```
//! use fencing_stats::ks::KsTest;
//!
//! let a = [0.8, 0.9, 0.85];
//! let b = [0.1, 0.2, 0.15];
//! let test = KsTest::two_sample(&a, &b).unwrap();
//! assert_eq!(test.statistic, 1.0);
//! ```

pub mod descriptive;
pub mod ks;
