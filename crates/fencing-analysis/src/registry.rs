use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::slide::Slide;

/// The phenotypes an analysis run iterates over, in sorted order.
///
/// Built once from the loaded slides and handed to the pipeline as an explicit
/// list; the reference phenotype is never part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhenotypeRegistry {
    phenotypes: Vec<String>,
}

impl PhenotypeRegistry {
    /// Every phenotype seen on any slide, except `reference`.
    ///
    /// ```
    /// use fencing_analysis::{registry::PhenotypeRegistry, slide::{CellRecord, Slide}};
    ///
    /// let slides = [
    ///     Slide::new("a", vec![CellRecord::new("Tc", 0.0, 0.0), CellRecord::new("Cancer", 0.0, 0.0)]),
    ///     Slide::new("b", vec![CellRecord::new("B cell", 0.0, 0.0), CellRecord::new("Tc", 0.0, 0.0)]),
    /// ];
    /// let registry = PhenotypeRegistry::from_slides(&slides, "Cancer");
    /// assert_eq!(registry.phenotypes(), ["B cell", "Tc"]);
    /// ```
    #[must_use]
    pub fn from_slides(slides: &[Slide], reference: &str) -> Self {
        slides
            .iter()
            .flat_map(|slide| &slide.cells)
            .map(|cell| cell.phenotype.as_str())
            .filter(|phenotype| *phenotype != reference)
            .collect()
    }

    #[must_use]
    pub fn phenotypes(&self) -> &[String] {
        &self.phenotypes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phenotypes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phenotypes.is_empty()
    }

    /// Keeps only the phenotypes listed in `selection`.
    ///
    /// Returns the names in `selection` that are not registered.
    pub fn restrict_to<S>(&mut self, selection: &[S]) -> Vec<String>
    where
        S: AsRef<str>,
    {
        self.phenotypes
            .retain(|p| selection.iter().any(|s| s.as_ref() == p.as_str()));
        selection
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !self.phenotypes.iter().any(|p| p == *s))
            .map(str::to_owned)
            .collect()
    }
}

impl<'a> FromIterator<&'a str> for PhenotypeRegistry {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let phenotypes = iter
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_owned)
            .collect();
        Self { phenotypes }
    }
}

/// Cell and slide counts of one phenotype across a data set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhenotypeCensus {
    pub phenotype: String,
    pub cells: usize,
    pub slides: usize,
}

/// Counts cells and slides per phenotype, reference included, sorted by name.
#[must_use]
pub fn census(slides: &[Slide]) -> Vec<PhenotypeCensus> {
    let mut counts = BTreeMap::<&str, (usize, usize)>::new();
    for slide in slides {
        let mut seen = BTreeSet::new();
        for cell in &slide.cells {
            let entry = counts.entry(cell.phenotype.as_str()).or_default();
            entry.0 += 1;
            if seen.insert(cell.phenotype.as_str()) {
                entry.1 += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|(phenotype, (cells, slides))| PhenotypeCensus {
            phenotype: phenotype.to_owned(),
            cells,
            slides,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::CellRecord;

    fn slides() -> Vec<Slide> {
        vec![
            Slide::new(
                "BrM_1",
                vec![
                    CellRecord::new("Tc", 0.0, 0.0),
                    CellRecord::new("Tc", 1.0, 0.0),
                    CellRecord::new("Cancer", 2.0, 0.0),
                ],
            ),
            Slide::new(
                "Glioma_1",
                vec![
                    CellRecord::new("Unknown", 0.0, 0.0),
                    CellRecord::new("Tc", 1.0, 0.0),
                    CellRecord::new("Endothelial cell", 2.0, 0.0),
                ],
            ),
        ]
    }

    #[test]
    fn test_registry_excludes_reference_and_dedups() {
        let registry = PhenotypeRegistry::from_slides(&slides(), "Cancer");
        assert_eq!(registry.phenotypes(), ["Endothelial cell", "Tc", "Unknown"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_restrict_to_reports_unknown_names() {
        let mut registry = PhenotypeRegistry::from_slides(&slides(), "Cancer");
        let missing = registry.restrict_to(&["Tc", "NK cell"]);
        assert_eq!(registry.phenotypes(), ["Tc"]);
        assert_eq!(missing, ["NK cell"]);
    }

    #[test]
    fn test_census_counts() {
        let counts = census(&slides());
        let tc = counts.iter().find(|c| c.phenotype == "Tc").unwrap();
        assert_eq!((tc.cells, tc.slides), (3, 2));
        let cancer = counts.iter().find(|c| c.phenotype == "Cancer").unwrap();
        assert_eq!((cancer.cells, cancer.slides), (1, 1));
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn test_empty_input() {
        assert!(PhenotypeRegistry::from_slides(&[], "Cancer").is_empty());
        assert!(census(&[]).is_empty());
    }
}
