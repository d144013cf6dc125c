use std::path::PathBuf;

use fencing_analysis::{event::LogEventSink, registry};

use crate::{loader, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PhenotypesArg {
    /// Directory of slide JSON files
    slides_dir: PathBuf,
    /// Reference (tumor) phenotype, marked in the listing
    #[arg(long, default_value = "Cancer")]
    reference: String,
    /// Write the census as JSON to this file (`-` for stdout)
    #[arg(long)]
    json: Option<PathBuf>,
}

pub(crate) fn run(arg: &PhenotypesArg) -> anyhow::Result<()> {
    let PhenotypesArg {
        slides_dir,
        reference,
        json,
    } = arg;

    let loaded = loader::load_slides(slides_dir, &mut LogEventSink)?;
    let census = registry::census(&loaded.slides);

    if let Some(path) = json {
        return util::write_json(Some(path.as_path()), &census);
    }

    println!("{:<32} {:>10} {:>8}", "PHENOTYPE", "CELLS", "SLIDES");
    for entry in &census {
        let marker = if entry.phenotype == *reference {
            " (reference)"
        } else {
            ""
        };
        println!(
            "{:<32} {:>10} {:>8}{marker}",
            entry.phenotype, entry.cells, entry.slides
        );
    }
    if !census.iter().any(|c| c.phenotype == *reference) {
        log::warn!("Reference phenotype {reference} does not occur on any slide");
    }
    Ok(())
}
