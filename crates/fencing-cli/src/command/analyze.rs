use std::path::PathBuf;

use chrono::Utc;
use fencing_analysis::{
    event::LogEventSink, pipeline::FencingPipeline, registry::PhenotypeRegistry,
};
use rand::Rng as _;

use crate::{
    command::config_arg::ConfigArg,
    emitter::ResultEmitter,
    loader,
    model::manifest::{RunManifest, SlideCounts},
    util,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    /// Directory of slide JSON files
    slides_dir: PathBuf,
    /// Output directory for per-phenotype results and run.json (`-` for stdout)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Comma-separated phenotypes to analyze [default: all except the reference]
    #[arg(long)]
    phenotypes: Option<String>,
    #[command(flatten)]
    config: ConfigArg,
}

pub(crate) fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let AnalyzeArg {
        slides_dir,
        output,
        phenotypes,
        config,
    } = arg;

    let mut config = config.load()?;
    let seed = *config.seed.get_or_insert_with(|| rand::rng().random());
    log::info!("Run seed: {seed}");

    let mut sink = LogEventSink;
    let loaded = loader::load_slides(slides_dir, &mut sink)?;

    let mut registry = PhenotypeRegistry::from_slides(&loaded.slides, &config.reference_phenotype);
    if let Some(list) = phenotypes {
        for missing in registry.restrict_to(&util::split_list(list)) {
            log::warn!("Phenotype {missing} does not occur on any slide");
        }
    }
    log::info!(
        "Analyzing {} phenotypes against {} ({} trials per slide)",
        registry.len(),
        config.reference_phenotype,
        config.trials,
    );

    let pipeline = FencingPipeline::new(&config, seed)?;
    let mut emitter = ResultEmitter::new(output.as_deref())?;
    let summary = pipeline.run(&registry, &loaded.slides, &mut sink, |result| {
        emitter.emit(&result)
    })?;

    let manifest = RunManifest {
        analyzed_at: Utc::now(),
        config,
        slides: SlideCounts {
            loaded: loaded.loaded,
            recovered: loaded.recovered,
            skipped: loaded.skipped,
        },
        phenotypes: summary.emitted,
        phenotypes_without_result: summary.without_result,
    };
    log::info!(
        "Emitted {} of {} phenotypes",
        manifest.phenotypes.len(),
        registry.len()
    );
    emitter.finish(&manifest)
}
