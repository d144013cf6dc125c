use std::path::PathBuf;

use anyhow::{Context as _, bail};
use fencing_analysis::{
    cohort::CohortClassifier as _,
    event::LogEventSink,
    pipeline::{FencingPipeline, UnitMeasurement},
};
use rand::Rng as _;
use serde::Serialize;

use crate::{command::config_arg::ConfigArg, loader, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct FenceArg {
    /// Slide JSON file
    slide_file: PathBuf,
    /// Target phenotype
    #[arg(long)]
    phenotype: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    config: ConfigArg,
}

/// Detail of one (phenotype, slide) unit.
#[derive(Debug, Serialize)]
struct FenceReport<'a> {
    slide_id: &'a str,
    phenotype: &'a str,
    reference_phenotype: &'a str,
    cohort: String,
    #[serde(flatten)]
    measurement: UnitMeasurement,
}

pub(crate) fn run(arg: &FenceArg) -> anyhow::Result<()> {
    let FenceArg {
        slide_file,
        phenotype,
        output,
        config,
    } = arg;

    let mut config = config.load()?;
    let seed = *config.seed.get_or_insert_with(|| rand::rng().random());
    log::info!("Run seed: {seed}");

    let slide = loader::load_slide(slide_file)
        .report(&mut LogEventSink)
        .with_context(|| format!("Failed to load slide: {}", slide_file.display()))?;

    let pipeline = FencingPipeline::new(&config, seed)?;
    let measurement = match pipeline.measure(&slide, phenotype) {
        Ok(measurement) => measurement,
        Err(reason) => bail!("Slide {} is not eligible for {phenotype}: {reason}", slide.id),
    };
    log::info!(
        "{phenotype} on {}: fraction {:.4}, null mean {:.4}, metric {:.4}",
        slide.id,
        measurement.observation.fraction,
        measurement.null_mean,
        measurement.metric,
    );

    let report = FenceReport {
        slide_id: &slide.id,
        phenotype,
        reference_phenotype: &config.reference_phenotype,
        cohort: config.cohorts.classify(&slide.id).to_string(),
        measurement,
    };
    util::write_json(output.as_deref(), &report)
}
