use serde::{Deserialize, Serialize};

/// A cell centroid in slide coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Returns `true` if `other` lies within distance `eps` (inclusive).
    #[must_use]
    pub fn is_within(self, other: Self, eps: f64) -> bool {
        self.distance_squared(other) <= eps * eps
    }
}

/// Density-clustering parameters shared by the real measurement and every null trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Neighborhood radius; also the adjacency distance to the reference set.
    pub eps: f64,
    /// Minimum neighborhood size (the point itself included) for a core point.
    pub min_samples: usize,
}

impl ClusterParams {
    pub const DEFAULT_EPS: f64 = 30.0;
    pub const DEFAULT_MIN_SAMPLES: usize = 3;
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps: Self::DEFAULT_EPS,
            min_samples: Self::DEFAULT_MIN_SAMPLES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_is_inclusive() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_squared(b), 25.0);
        assert!(a.is_within(b, 5.0));
        assert!(!a.is_within(b, 4.999));
    }
}
