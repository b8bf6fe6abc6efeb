/*
cargo run --bin convert_dynamic_choice -- \
    data/raw/marriage_labour.jsonl \
    data/choice/marriage_labour.jsonl

structured rows (choices + answer_index), strip "句子:" markers:
cargo run --bin convert_dynamic_choice -- \
    data/raw/structured.jsonl data/choice/structured.jsonl \
    --structured --strip-question-prefix
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use unilaw_convert::batch::convert_file;
use unilaw_convert::logging::{init_logging, progress_bar};
use unilaw_convert::{ConvertOptions, Scheme};

/// Labels declared per dataset ("标签包括：…。") → standard multiple choice
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON array or JSONL file with instruction / question / answer
    input: PathBuf,

    /// JSONL file to write (overwritten if it exists)
    output: PathBuf,

    /// Treat every record as choices + answer_index
    #[arg(long)]
    structured: bool,

    /// Drop a leading "句子:" marker from questions
    #[arg(long)]
    strip_question_prefix: bool,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging(&cli.log_dir, "convert_dynamic_choice")?;
    info!("Started - input: {:?}, output: {:?}", cli.input, cli.output);

    let options = ConvertOptions {
        force_structured_form: cli.structured,
        strip_question_prefix: cli.strip_question_prefix,
        ..Default::default()
    };

    let bar = progress_bar();
    let report = convert_file(&cli.input, &cli.output, &Scheme::dynamic(), &options, &bar)
        .with_context(|| format!("converting {}", cli.input.display()))?;
    bar.finish_and_clear();

    report.print_summary("Dynamic choice", &cli.output, Some(&log_path));
    info!("Finished ✅");
    Ok(())
}
