use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context as _;
use serde::{Serialize, de::DeserializeOwned};

/// `-` stands for stdout wherever an output path is accepted.
pub fn is_stdout_path(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Writes `value` as pretty JSON plus a trailing newline to `path`.
///
/// `None` and `-` write to stdout.
pub fn write_json<T>(path: Option<&Path>, value: &T) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
{
    match path {
        Some(path) if !is_stdout_path(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_pretty(BufWriter::new(file), value)
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        _ => write_pretty(io::stdout().lock(), value).context("Failed to write to stdout"),
    }
}

fn write_pretty<W, T>(mut writer: W, value: &T) -> io::Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}

/// Reads a JSON document; `what` names it in error messages ("config", "slide", ...).
pub fn read_json<T>(what: &str, path: &Path) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let file =
        File::open(path).with_context(|| format!("Failed to open {what} {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Malformed {what} JSON in {}", path.display()))
}

/// File stem of a phenotype's result record, e.g. `Endothelial_cell`.
///
/// Distinct phenotypes may share a stem (`CD4/CD8` and `CD4 CD8`).
pub fn phenotype_file_stem(phenotype: &str) -> String {
    phenotype
        .chars()
        .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Splits a comma-separated list, dropping empty entries.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phenotype_file_stem() {
        assert_eq!(phenotype_file_stem("Tc"), "Tc");
        assert_eq!(phenotype_file_stem("Endothelial cell"), "Endothelial_cell");
        assert_eq!(phenotype_file_stem("CD4/CD8"), "CD4_CD8");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("Tc, B cell,,NK cell "), ["Tc", "B cell", "NK cell"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_stdout_path() {
        assert!(is_stdout_path(Path::new("-")));
        assert!(!is_stdout_path(Path::new("out")));
    }

    #[test]
    fn test_json_file_round_trip() {
        let path = std::env::temp_dir().join(format!("fencing-util-{}.json", std::process::id()));
        write_json(Some(path.as_path()), &["Tc", "B cell"]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("]\n"));
        let read: Vec<String> = read_json("list", &path).unwrap();
        assert_eq!(read, ["Tc", "B cell"]);

        std::fs::remove_file(&path).unwrap();
        let err = read_json::<Vec<String>>("list", &path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open list"));
    }
}
