use clap::{Parser, Subcommand};

use self::{analyze::AnalyzeArg, fence::FenceArg, phenotypes::PhenotypesArg};

mod analyze;
mod config_arg;
mod fence;
mod phenotypes;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Compare fencing metrics between cohorts for every phenotype
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// List phenotypes with cell and slide counts
    Phenotypes(#[clap(flatten)] PhenotypesArg),
    /// Measure one phenotype on one slide in detail
    Fence(#[clap(flatten)] FenceArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Analyze(arg) => analyze::run(&arg)?,
        Mode::Phenotypes(arg) => phenotypes::run(&arg)?,
        Mode::Fence(arg) => fence::run(&arg)?,
    }
    Ok(())
}
