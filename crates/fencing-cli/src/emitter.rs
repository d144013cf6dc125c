use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use fencing_analysis::cohort::PhenotypeResult;
use serde::Serialize;

use crate::util;

pub const MANIFEST_FILE_NAME: &str = "run.json";

/// Destination of phenotype results.
#[derive(Debug)]
pub enum ResultEmitter {
    /// One pretty-printed JSON document per result on stdout.
    Stdout,
    /// One `<phenotype>.json` file per result in a directory.
    Directory {
        dir: PathBuf,
        /// Lowercased names already written, so that case-insensitive file systems
        /// cannot merge two results either.
        taken: BTreeSet<String>,
    },
}

impl ResultEmitter {
    /// `None` and `-` write to stdout; anything else is an output directory,
    /// created if missing.
    pub fn new(output: Option<&Path>) -> anyhow::Result<Self> {
        match output {
            Some(dir) if !util::is_stdout_path(dir) => {
                fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create output directory: {}", dir.display())
                })?;
                Ok(Self::Directory {
                    dir: dir.to_owned(),
                    taken: BTreeSet::from([MANIFEST_FILE_NAME.to_lowercase()]),
                })
            }
            _ => Ok(Self::Stdout),
        }
    }

    pub fn emit(&mut self, result: &PhenotypeResult) -> anyhow::Result<()> {
        match self {
            Self::Stdout => util::write_json(None, result),
            Self::Directory { dir, taken } => {
                let file_name = claim_file_name(taken, &result.phenotype);
                util::write_json(Some(dir.join(file_name).as_path()), result)
            }
        }
    }

    /// Writes the run manifest; on stdout it is only logged.
    pub fn finish<T>(self, manifest: &T) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        match self {
            Self::Stdout => {
                let json = serde_json::to_string(manifest)
                    .context("Failed to serialize run manifest")?;
                log::info!("Run manifest: {json}");
                Ok(())
            }
            Self::Directory { dir, .. } => {
                let path = dir.join(MANIFEST_FILE_NAME);
                log::info!("Writing run manifest to {}", path.display());
                util::write_json(Some(path.as_path()), manifest)
            }
        }
    }
}

/// Picks `<stem>.json`, or `<stem>_2.json`, `<stem>_3.json`, ... when that name is taken.
fn claim_file_name(taken: &mut BTreeSet<String>, phenotype: &str) -> String {
    let stem = util::phenotype_file_stem(phenotype);
    let mut file_name = format!("{stem}.json");
    let mut n = 1;
    while !taken.insert(file_name.to_lowercase()) {
        n += 1;
        file_name = format!("{stem}_{n}.json");
    }
    if n > 1 {
        log::warn!("Result file name for phenotype {phenotype:?} is taken; writing {file_name}");
    }
    file_name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(phenotype: &str) -> PhenotypeResult {
        PhenotypeResult {
            phenotype: phenotype.to_owned(),
            n_valid_slides: 1,
            n_cohort_a: 1,
            n_cohort_b: 0,
            ks_statistic: None,
            ks_pvalue: None,
            cohort_a_values: vec![0.25],
            cohort_b_values: vec![],
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fencing-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_directory_emitter_writes_one_file_per_phenotype() {
        let dir = temp_dir("emitter");
        let result = result("Endothelial cell");

        let mut emitter = ResultEmitter::new(Some(dir.as_path())).unwrap();
        emitter.emit(&result).unwrap();
        emitter.finish(&serde_json::json!({"phenotypes": ["Endothelial cell"]})).unwrap();

        let written: PhenotypeResult =
            util::read_json("result", &dir.join("Endothelial_cell.json")).unwrap();
        assert_eq!(written, result);
        assert!(dir.join(MANIFEST_FILE_NAME).is_file());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_colliding_file_names_are_kept_apart() {
        let dir = temp_dir("emitter-collisions");
        let phenotypes = ["CD4/CD8", "CD4 CD8", "run", "tc", "Tc"];

        let mut emitter = ResultEmitter::new(Some(dir.as_path())).unwrap();
        for phenotype in phenotypes {
            emitter.emit(&result(phenotype)).unwrap();
        }
        emitter.finish(&serde_json::json!({"phenotypes": phenotypes})).unwrap();

        let expected = [
            ("CD4/CD8", "CD4_CD8.json"),
            ("CD4 CD8", "CD4_CD8_2.json"),
            ("run", "run_2.json"),
            ("tc", "tc.json"),
            ("Tc", "Tc_2.json"),
        ];
        for (phenotype, file_name) in expected {
            let written: PhenotypeResult = util::read_json("result", &dir.join(file_name)).unwrap();
            assert_eq!(written.phenotype, phenotype);
        }
        let manifest: serde_json::Value =
            util::read_json("manifest", &dir.join(MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(manifest["phenotypes"][2], "run");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_claim_file_name_counts_up() {
        let mut taken = BTreeSet::new();
        assert_eq!(claim_file_name(&mut taken, "B cell"), "B_cell.json");
        assert_eq!(claim_file_name(&mut taken, "B/cell"), "B_cell_2.json");
        assert_eq!(claim_file_name(&mut taken, "B\\cell"), "B_cell_3.json");
    }
}
