//! Slide data model and per-phenotype population views.
//!
//! A [`Slide`] is an immutable list of cell records. For a given target phenotype
//! and reference phenotype it splits into three point sets:
//!
//! - **target**: cells of the target phenotype
//! - **reference**: cells of the reference phenotype (tumor cells)
//! - **background**: every other cell, the pool null trials resample from

use fencing_spatial::Point;
use serde::{Deserialize, Serialize};

/// Label given to cells whose phenotype is missing.
pub const UNKNOWN_PHENOTYPE: &str = "Unknown";

/// A single segmented cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub phenotype: String,
    pub x: f64,
    pub y: f64,
}

impl CellRecord {
    #[must_use]
    pub fn new(phenotype: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            phenotype: phenotype.into(),
            x,
            y,
        }
    }

    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// All cells of one tissue slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(rename = "slide_id")]
    pub id: String,
    pub cells: Vec<CellRecord>,
}

impl Slide {
    #[must_use]
    pub fn new(id: impl Into<String>, cells: Vec<CellRecord>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    /// Splits the slide into target, reference and background point sets.
    ///
    /// Point order follows cell order, so the split is deterministic.
    ///
    /// # Examples
    ///
    /// ```
    /// use fencing_analysis::slide::{CellRecord, Slide};
    ///
    /// let slide = Slide::new(
    ///     "BrM_01",
    ///     vec![
    ///         CellRecord::new("Tc", 0.0, 0.0),
    ///         CellRecord::new("Cancer", 1.0, 1.0),
    ///         CellRecord::new("B cell", 2.0, 2.0),
    ///         CellRecord::new("Tc", 3.0, 3.0),
    ///     ],
    /// );
    /// let populations = slide.populations("Tc", "Cancer");
    /// assert_eq!(populations.target.len(), 2);
    /// assert_eq!(populations.reference.len(), 1);
    /// assert_eq!(populations.background.len(), 1);
    /// ```
    #[must_use]
    pub fn populations(&self, target: &str, reference: &str) -> Populations {
        let mut populations = Populations::default();
        for cell in &self.cells {
            let set = if cell.phenotype == target {
                &mut populations.target
            } else if cell.phenotype == reference {
                &mut populations.reference
            } else {
                &mut populations.background
            };
            set.push(cell.point());
        }
        populations
    }
}

/// Reason a slide does not contribute to a phenotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Ineligibility {
    #[display("{count} target cells (minimum {min})")]
    TooFewTargets { count: usize, min: usize },
    #[display("{count} reference cells (minimum {min})")]
    TooFewReference { count: usize, min: usize },
    #[display("no background cells")]
    EmptyBackground,
}

/// Target, reference and background point sets of one slide for one phenotype.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Populations {
    pub target: Vec<Point>,
    pub reference: Vec<Point>,
    pub background: Vec<Point>,
}

impl Populations {
    /// Checks the minimum-count gate: at least `min_cell_count` target and
    /// reference cells, and a non-empty background.
    pub fn check(&self, min_cell_count: usize) -> Result<(), Ineligibility> {
        if self.target.len() < min_cell_count {
            return Err(Ineligibility::TooFewTargets {
                count: self.target.len(),
                min: min_cell_count,
            });
        }
        if self.reference.len() < min_cell_count {
            return Err(Ineligibility::TooFewReference {
                count: self.reference.len(),
                min: min_cell_count,
            });
        }
        if self.background.is_empty() {
            return Err(Ineligibility::EmptyBackground);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(phenotype: &str, n: u32) -> Vec<CellRecord> {
        (0..n)
            .map(|i| CellRecord::new(phenotype, f64::from(i), 0.0))
            .collect()
    }

    #[test]
    fn test_gate_passes_at_exact_minimum() {
        let mut all = cells("Tc", 20);
        all.extend(cells("Cancer", 20));
        all.extend(cells("B cell", 1));
        let slide = Slide::new("BrM_1", all);
        assert_eq!(slide.populations("Tc", "Cancer").check(20), Ok(()));
    }

    #[test]
    fn test_gate_failures() {
        let mut all = cells("Tc", 19);
        all.extend(cells("Cancer", 30));
        all.extend(cells("B cell", 5));
        let slide = Slide::new("s", all);
        assert_eq!(
            slide.populations("Tc", "Cancer").check(20),
            Err(Ineligibility::TooFewTargets { count: 19, min: 20 })
        );
        assert_eq!(
            slide.populations("B cell", "Cancer").check(20),
            Err(Ineligibility::TooFewTargets { count: 5, min: 20 })
        );

        let mut all = cells("Tc", 25);
        all.extend(cells("Cancer", 3));
        all.extend(cells("B cell", 5));
        let slide = Slide::new("s", all);
        assert_eq!(
            slide.populations("Tc", "Cancer").check(20),
            Err(Ineligibility::TooFewReference { count: 3, min: 20 })
        );

        let mut all = cells("Tc", 25);
        all.extend(cells("Cancer", 25));
        let slide = Slide::new("s", all);
        assert_eq!(
            slide.populations("Tc", "Cancer").check(20),
            Err(Ineligibility::EmptyBackground)
        );
    }

    #[test]
    fn test_background_excludes_target_and_reference() {
        let slide = Slide::new(
            "s",
            vec![
                CellRecord::new("Tc", 0.0, 0.0),
                CellRecord::new(UNKNOWN_PHENOTYPE, 1.0, 0.0),
                CellRecord::new("Cancer", 2.0, 0.0),
                CellRecord::new("Endothelial cell", 3.0, 0.0),
            ],
        );
        let p = slide.populations("Tc", "Cancer");
        assert_eq!(p.background, vec![Point::new(1.0, 0.0), Point::new(3.0, 0.0)]);
    }

    #[test]
    fn test_slide_json_layout() {
        let json = r#"{"slide_id":"Glioma_7","cells":[{"phenotype":"Tc","x":1.5,"y":2.0}]}"#;
        let slide: Slide = serde_json::from_str(json).unwrap();
        assert_eq!(slide.id, "Glioma_7");
        assert_eq!(slide.cells[0], CellRecord::new("Tc", 1.5, 2.0));
    }
}
