mod error;
mod filter;
mod hairpin;
mod merge;
mod stats;
mod util;
mod vcf;

use anyhow;
use clap::Parser;

#[derive(Parser)]
#[command(version, about, long_about=None)]
///
/// Flag hairpin artifacts (FILTER=HP) in a VCF using per-variant read
/// statistics
///
struct Cli {
    #[command(flatten)]
    args: filter::FilterArgs,
}

/// main CLI for hairpin
///
fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stderr)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    filter::run(&cli.args)?;

    Ok(())
}
