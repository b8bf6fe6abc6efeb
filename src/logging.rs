use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

use crate::error::{ConvertError, Result};

/// Info and above go to `<log_dir>/<stem>_<timestamp>.log`; warnings are
/// echoed on stderr.
pub fn init_logging(log_dir: &Path, stem: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("{stem}_{ts}.log"));

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Warn,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
        WriteLogger::new(
            LevelFilter::Info,
            Config::default(),
            fs::File::create(&log_path)?,
        ),
    ])
    .map_err(|e| ConvertError::Configuration(format!("cannot initialise logger: {e}")))?;

    Ok(log_path)
}

pub fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} {pos}/{len} {wide_bar:.cyan/blue} {elapsed_precise}")
    {
        bar.set_style(style);
    }
    bar
}
