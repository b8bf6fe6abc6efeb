/*
cargo run --bin jsonl2csv -- data/choice/marriage_labour.jsonl data/csv/marriage_labour.csv

whole directory, no option columns, GBK for older Excel:
cargo run --bin jsonl2csv -- data/choice data/csv/all.csv --no-options --encoding gbk
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use unilaw_convert::csv_export::{collect_jsonl_inputs, export_csv};
use unilaw_convert::logging::{init_logging, progress_bar};
use unilaw_convert::{ConvertOptions, Scheme};

/// jsonl → csv (multi-label questions)
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// A single .jsonl file or a directory containing .jsonl files
    input: PathBuf,

    /// CSV path to write
    output: PathBuf,

    /// Only write id, question, answer
    #[arg(long)]
    no_options: bool,

    /// Output text encoding (utf-8-sig adds a BOM so Excel detects UTF-8)
    #[arg(long, default_value = "utf-8-sig")]
    encoding: String,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging(&cli.log_dir, "jsonl2csv")?;
    info!("Started - input: {:?}, output: {:?}", cli.input, cli.output);

    let options = ConvertOptions {
        include_option_columns: !cli.no_options,
        text_encoding: cli.encoding.clone(),
        ..Default::default()
    };

    let inputs = collect_jsonl_inputs(&cli.input)
        .with_context(|| format!("listing {}", cli.input.display()))?;

    let bar = progress_bar();
    let report = export_csv(&inputs, &cli.output, &Scheme::dynamic(), &options, &bar)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    bar.finish_and_clear();

    report.print_summary("CSV export", &cli.output, Some(&log_path));
    Ok(())
}
