use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::LevelFilter;
use picogn::Label;

#[derive(Parser, Debug)]
#[command(name = "picogn")]
#[command(about = "Writes Ninja build edges for the binary targets of a resolved build graph")]
#[command(version)]
pub struct Args {
    /// Directory receiving one .ninja file per target (stdout if not specified)
    #[arg(long, value_name = "dir")]
    pub output_dir: Option<PathBuf>,

    /// Number of parallel jobs (defaults to the number of CPUs)
    #[arg(short, long, value_name = "n")]
    pub jobs: Option<usize>,

    /// Only write this target (can be used multiple times)
    #[arg(long, value_name = "label")]
    pub target: Vec<TargetLabel>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// JSON description of the build settings, toolchains and targets
    pub manifest: PathBuf,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetLabel(pub Label);

impl FromStr for TargetLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = Label::parse(s).with_context(|| format!("Invalid label `{s}`, expected //dir:name"))?;
        Ok(TargetLabel(label))
    }
}

pub fn parse() -> Args {
    Args::parse()
}
