//! Spatial core of the fencing analysis.
//!
//! This crate measures how strongly a clustered cell population sits against a
//! reference population (tumor cells), and estimates how much of that adjacency
//! would be expected by chance.
//!
//! # Architecture
//!
//! ```text
//! target points ──> ClusterPartition (DBSCAN)
//!                        │ clusters
//!                        ▼
//! reference points ──> fence() ──> FencingObservation { fraction, valid, total }
//!                        ▲
//! background points ──> NullSampler (resample × trials) ──> NullDistribution
//! ```
//!
//! - [`dbscan`]: density-based clustering of a point set into clusters and noise
//! - [`fence`]: fraction of target points in clusters adjacent to the reference set
//! - [`null`]: permutation null distribution of the same fraction, drawn from a background pool
//! - [`seed`]: 128-bit seeds for reproducible, thread-count-independent sampling
//!
//! # Example
//!
//! ```
//! use fencing_spatial::{ClusterParams, Point, fence::fence};
//!
//! let target = (0..10)
//!     .map(|i| Point::new(100.0 + f64::from(i), 100.0))
//!     .collect::<Vec<_>>();
//! let reference = [Point::new(104.0, 110.0), Point::new(105.0, 90.0)];
//!
//! let observation = fence(&target, &reference, ClusterParams::default());
//! assert_eq!(observation.total_clusters, 1);
//! assert_eq!(observation.valid_clusters, 1);
//! assert_eq!(observation.fraction, 1.0);
//! ```

pub use self::point::{ClusterParams, Point};

pub mod dbscan;
pub mod fence;
pub mod null;
mod point;
pub mod seed;
