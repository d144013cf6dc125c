//! Density-based clustering (DBSCAN) over a point set.
//!
//! A point is a *core* point when at least `min_samples` points (itself included)
//! lie within `eps` of it. Clusters grow from core points through chains of core
//! neighbors; non-core points reachable from a cluster join it as border points,
//! and everything else is noise.
//!
//! Labeling is deterministic for a given point ordering: points are visited in
//! index order, cluster ids are assigned in order of discovery, and a border point
//! reachable from several clusters joins the first one to reach it.
//!
//! Neighborhoods are found by full pairwise distance checks (`O(n²)`), which is
//! adequate for per-slide populations in the low thousands.

use crate::{ClusterParams, Point};

/// Cluster assignment of a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ClusterLabel {
    /// The point belongs to no cluster.
    Noise,
    /// The point belongs to the cluster with this id (`0..cluster_count`).
    Cluster(usize),
}

/// Result of clustering a point set: one label per input point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterPartition {
    labels: Vec<ClusterLabel>,
    cluster_count: usize,
}

impl ClusterPartition {
    /// Clusters `points` with the given neighborhood radius and minimum neighborhood size.
    ///
    /// # Examples
    ///
    /// ```
    /// use fencing_spatial::{ClusterParams, Point, dbscan::{ClusterLabel, ClusterPartition}};
    ///
    /// let points = [
    ///     Point::new(0.0, 0.0),
    ///     Point::new(1.0, 0.0),
    ///     Point::new(0.0, 1.0),
    ///     Point::new(500.0, 500.0),
    /// ];
    /// let params = ClusterParams { eps: 2.0, min_samples: 3 };
    /// let partition = ClusterPartition::compute(&points, params);
    ///
    /// assert_eq!(partition.cluster_count(), 1);
    /// assert_eq!(partition.labels()[0], ClusterLabel::Cluster(0));
    /// assert_eq!(partition.labels()[3], ClusterLabel::Noise);
    /// ```
    #[must_use]
    pub fn compute(points: &[Point], params: ClusterParams) -> Self {
        let ClusterParams { eps, min_samples } = params;
        let neighbors = points
            .iter()
            .map(|&p| {
                points
                    .iter()
                    .enumerate()
                    .filter(|&(_, &q)| p.is_within(q, eps))
                    .map(|(j, _)| j)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let is_core = neighbors
            .iter()
            .map(|n| n.len() >= min_samples)
            .collect::<Vec<_>>();

        let mut labels = vec![ClusterLabel::Noise; points.len()];
        let mut cluster_count = 0;
        let mut stack = vec![];
        for start in 0..points.len() {
            if !labels[start].is_noise() || !is_core[start] {
                continue;
            }
            let label = ClusterLabel::Cluster(cluster_count);
            labels[start] = label;
            stack.push(start);
            while let Some(i) = stack.pop() {
                if !is_core[i] {
                    continue;
                }
                for &j in &neighbors[i] {
                    if labels[j].is_noise() {
                        labels[j] = label;
                        if is_core[j] {
                            stack.push(j);
                        }
                    }
                }
            }
            cluster_count += 1;
        }

        Self {
            labels,
            cluster_count,
        }
    }

    /// Per-point labels, in input order.
    #[must_use]
    pub fn labels(&self) -> &[ClusterLabel] {
        &self.labels
    }

    /// Number of clusters, noise excluded.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Number of points labeled as noise.
    #[must_use]
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_noise()).count()
    }

    /// Member indices of every cluster, indexed by cluster id.
    #[must_use]
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut clusters = vec![vec![]; self.cluster_count];
        for (i, label) in self.labels.iter().enumerate() {
            if let ClusterLabel::Cluster(id) = *label {
                clusters[id].push(i);
            }
        }
        clusters
    }
}
