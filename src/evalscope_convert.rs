/*
cargo run --bin evalscope_convert -- \
    data/choice/marriage_labour.jsonl \
    data/evalscope/marriage_labour.jsonl

cargo run --bin evalscope_convert -- data/csv/all.csv data/evalscope/all.jsonl
*/

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use unilaw_convert::logging::{init_logging, progress_bar};
use unilaw_convert::structured::export_structured;
use unilaw_convert::Scheme;

/// Convert JSONL / CSV datasets into question + choices + answer_index JSONL
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input file (.jsonl or .csv)
    input: PathBuf,

    /// Output file (.jsonl)
    output: PathBuf,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.input.exists() {
        bail!("input file {} does not exist", cli.input.display());
    }

    let log_path = init_logging(&cli.log_dir, "evalscope_convert")?;
    info!("Started - input: {:?}, output: {:?}", cli.input, cli.output);

    let bar = progress_bar();
    let report = export_structured(&cli.input, &cli.output, &Scheme::dynamic(), &bar)
        .with_context(|| format!("converting {}", cli.input.display()))?;
    bar.finish_and_clear();

    report.print_summary("Structured export", &cli.output, Some(&log_path));
    Ok(())
}
