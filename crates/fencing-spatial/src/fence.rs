//! Cluster-adjacency ("fencing") measurement.
//!
//! The target population is clustered with DBSCAN; a cluster is *fenced* when any
//! of its members lies within `eps` of any reference point. The observation is the
//! share of all target points that belong to fenced clusters. Noise points count in
//! the denominator only.

use serde::{Deserialize, Serialize};

use crate::{ClusterParams, Point, dbscan::ClusterPartition};

/// Outcome of one fencing measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FencingObservation {
    /// Share of target points in fenced clusters, in `[0, 1]`.
    pub fraction: f64,
    /// Number of fenced clusters.
    pub valid_clusters: usize,
    /// Number of clusters found, fenced or not.
    pub total_clusters: usize,
}

impl FencingObservation {
    /// Observation for a target too small to cluster.
    pub const EMPTY: Self = Self {
        fraction: 0.0,
        valid_clusters: 0,
        total_clusters: 0,
    };
}

/// Measures how much of `target` sits in clusters adjacent to `reference`.
///
/// Returns [`FencingObservation::EMPTY`] when `target` has fewer than
/// `params.min_samples` points. With an empty `reference` no cluster is fenced,
/// but `total_clusters` still counts every cluster found.
///
/// The result depends only on the inputs and their order.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn fence(target: &[Point], reference: &[Point], params: ClusterParams) -> FencingObservation {
    if target.len() < params.min_samples || target.is_empty() {
        return FencingObservation::EMPTY;
    }

    let partition = ClusterPartition::compute(target, params);
    let mut valid_cells = 0;
    let mut valid_clusters = 0;
    for members in partition.clusters() {
        if is_adjacent(target, &members, reference, params.eps) {
            valid_cells += members.len();
            valid_clusters += 1;
        }
    }

    FencingObservation {
        fraction: valid_cells as f64 / target.len() as f64,
        valid_clusters,
        total_clusters: partition.cluster_count(),
    }
}

/// Returns `true` if any cluster member lies within `eps` of any reference point.
fn is_adjacent(points: &[Point], members: &[usize], reference: &[Point], eps: f64) -> bool {
    members.iter().any(|&i| {
        let p = points[i];
        reference.iter().any(|&r| p.is_within(r, eps))
    })
}
