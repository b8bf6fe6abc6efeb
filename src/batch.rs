//! Whole-file conversion: load records, convert each one, collect the ones
//! that fail, write output and the error artifact.

use std::{
    fmt, fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use indicatif::ProgressBar;
use itertools::Itertools;
use log::{info, warn};
use serde_json::Value;

use crate::alphabet::{position_of, split_labels, Alphabet};
use crate::convert::{convert, structured_letters, AnswerIndex, ConvertOptions, Record};
use crate::error::{ConvertError, FormatError, Result};
use crate::scheme::Scheme;
use crate::structured::{Metadata, StructuredRecord};

/// Suffix of the failure listing written next to the input.
pub const ERROR_ARTIFACT_EXT: &str = "error_lines.txt";

/// Where a record came from, for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// 1-based line of a JSONL or CSV file.
    Line(usize),
    /// 1-based position inside a JSON array.
    Record(usize),
    /// Line of one file among several inputs.
    FileLine { file: String, line: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(n) => write!(f, "line {n}"),
            Location::Record(n) => write!(f, "record {n}"),
            Location::FileLine { file, line } => write!(f, "{file} line {line}"),
        }
    }
}

/// One record or line that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub location: Location,
    pub reason: String,
    pub raw: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.location, self.reason, self.raw)
    }
}

/// Parsed input: records that decoded plus lines that did not.
#[derive(Debug, Default)]
pub struct Loaded {
    pub records: Vec<(Location, Value)>,
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    JsonArray,
    JsonLines,
    Csv,
}

/// `.csv` by extension, otherwise a leading `[` means a JSON array.
pub fn detect_format(path: &Path, text: &str) -> InputFormat {
    let is_csv = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        InputFormat::Csv
    } else if text.trim_start().starts_with('[') {
        InputFormat::JsonArray
    } else {
        InputFormat::JsonLines
    }
}

/// Read any supported input file.
pub fn load_records(path: &Path) -> Result<Loaded> {
    let text = fs::read_to_string(path)?;
    match detect_format(path, &text) {
        InputFormat::Csv => parse_csv(&text),
        InputFormat::JsonArray => parse_json_array(&text),
        InputFormat::JsonLines => Ok(parse_json_lines(&text)),
    }
}

/// A malformed array is fatal: there is no line to skip.
pub fn parse_json_array(text: &str) -> Result<Loaded> {
    let rows: Vec<Value> = serde_json::from_str(text)?;
    Ok(Loaded {
        records: rows
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Location::Record(i + 1), v))
            .collect(),
        failures: Vec::new(),
    })
}

/// Blank lines are ignored; malformed lines become failures.
pub fn parse_json_lines(text: &str) -> Loaded {
    let mut loaded = Loaded::default();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let location = Location::Line(idx + 1);
        match serde_json::from_str::<Value>(line) {
            Ok(v) => loaded.records.push((location, v)),
            Err(e) => {
                warn!("{location}: invalid JSON ({e})");
                loaded.failures.push(Failure {
                    location,
                    reason: format!("invalid JSON: {e}"),
                    raw: line.to_owned(),
                });
            }
        }
    }
    loaded
}

/// CSV with `question` and `answer` columns; every other column except `id`
/// is an option text, in header order. Rows become structured records.
pub fn parse_csv(text: &str) -> Result<Loaded> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(q_col), Some(a_col)) = (column("question"), column("answer")) else {
        return Err(ConvertError::Configuration(
            "CSV header must contain 'question' and 'answer' columns".to_owned(),
        ));
    };
    let option_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !matches!(h.trim(), "id" | "question" | "answer"))
        .map(|(i, _)| i)
        .collect();

    let mut loaded = Loaded::default();
    for (idx, row) in rdr.records().enumerate() {
        // header is line 1
        let location = Location::Line(idx + 2);
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("{location}: malformed CSV row ({e})");
                loaded.failures.push(Failure {
                    location,
                    reason: format!("malformed CSV row: {e}"),
                    raw: String::new(),
                });
                continue;
            }
        };

        let structured = if row.len() != headers.len() {
            Err(format!(
                "malformed CSV row: {} field(s), header has {}",
                row.len(),
                headers.len()
            ))
        } else {
            csv_structured(&row, q_col, a_col, &option_cols).map_err(|e| e.to_string())
        };
        match structured {
            Ok(structured) => loaded.records.push((location, serde_json::to_value(structured)?)),
            Err(reason) => {
                warn!("{location}: {reason}");
                loaded.failures.push(Failure {
                    location,
                    reason,
                    raw: row.iter().join(","),
                });
            }
        }
    }
    Ok(loaded)
}

// Answer cells hold letters (`C、A`); each must point at a non-empty option.
fn csv_structured(
    row: &csv::StringRecord,
    q_col: usize,
    a_col: usize,
    option_cols: &[usize],
) -> Result<StructuredRecord, FormatError> {
    let answer = row.get(a_col).unwrap_or_default();
    let indices = split_labels(answer)
        .into_iter()
        .map(|token| {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => position_of(c.to_ascii_uppercase()).map(|p| p as i64),
                _ => None,
            }
            .ok_or_else(|| FormatError::NotALetter {
                token: token.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let choices: Vec<String> = option_cols
        .iter()
        .filter_map(|&i| row.get(i))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    let answer_index = AnswerIndex::Many(indices);
    structured_letters(&choices, &answer_index)?;

    Ok(StructuredRecord {
        question: row.get(q_col).unwrap_or_default().to_owned(),
        choices,
        answer_index,
        metadata: Metadata {
            original_instruction: None,
            original_answer: answer.to_owned(),
        },
    })
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: usize,
    pub failures: Vec<Failure>,
    pub error_artifact: Option<PathBuf>,
}

impl BatchReport {
    pub fn print_summary(&self, title: &str, output: &Path, log_path: Option<&Path>) {
        println!("\n=== {title} summary ===");
        println!("Converted records  : {}", self.converted);
        println!("Failed records     : {}", self.failures.len());
        println!("Output             : {:?}", output);
        if let Some(artifact) = &self.error_artifact {
            println!("Error lines        : {:?}", artifact);
        }
        if let Some(log_path) = log_path {
            println!("Log file           : {:?}", log_path);
        }
    }
}

/// `<dir>/<stem>.error_lines.txt` next to `input`.
pub fn error_artifact_path(input: &Path) -> PathBuf {
    input.with_extension(ERROR_ARTIFACT_EXT)
}

/// Write one failure per line. An empty list removes any artifact left by
/// an earlier run.
pub fn write_error_artifact(path: &Path, failures: &[Failure]) -> Result<Option<PathBuf>> {
    if failures.is_empty() {
        match fs::remove_file(path) {
            Ok(()) => info!("removed stale {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(None);
    }
    let mut w = BufWriter::new(fs::File::create(path)?);
    for failure in failures {
        writeln!(w, "{failure}")?;
    }
    w.flush()?;
    warn!(
        "{} line(s)/record(s) failed, details in {}",
        failures.len(),
        path.display()
    );
    Ok(Some(path.to_path_buf()))
}

/// Dataset-wide alphabet: the scheme's built-in table, or the declaration in
/// the first record's instruction. `None` when the batch is structured and
/// every record carries its own choices.
pub fn resolve_alphabet(
    scheme: &Scheme,
    first: Option<&Value>,
    options: &ConvertOptions,
) -> Result<Option<Alphabet>> {
    if let Some(labels) = scheme.builtin_labels {
        return Ok(Some(Alphabet::from_labels(labels)?));
    }
    let Some(first) = first else {
        return Ok(None);
    };
    let structured = first.get("choices").is_some() && first.get("answer_index").is_some();
    if options.force_structured_form || structured {
        return Ok(None);
    }

    let instruction = first
        .get("instruction")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ConvertError::Configuration("first record has no instruction".to_owned())
        })?;
    Alphabet::from_declaration(instruction)
        .map(Some)
        .map_err(|e| ConvertError::Configuration(format!("cannot build label alphabet: {e}")))
}

/// Convert `input` into canonical JSONL at `output`.
///
/// Per-record failures are collected in the report; only unreadable input,
/// unwritable output or a missing label alphabet end the run with an error.
pub fn convert_file(
    input: &Path,
    output: &Path,
    scheme: &Scheme,
    options: &ConvertOptions,
    bar: &ProgressBar,
) -> Result<BatchReport> {
    let Loaded { records, mut failures } = load_records(input)?;
    info!(
        "{}: {} record(s), {} unreadable line(s)",
        input.display(),
        records.len(),
        failures.len()
    );

    let mut report = BatchReport::default();
    if records.is_empty() {
        warn!("{}: no records to convert", input.display());
        report.error_artifact = write_error_artifact(&error_artifact_path(input), &failures)?;
        report.failures = failures;
        return Ok(report);
    }

    // established before anything is written
    let alphabet = resolve_alphabet(scheme, records.first().map(|(_, v)| v), options)?;
    if let Some(alphabet) = &alphabet {
        info!("label alphabet ({}): {}", scheme.name, alphabet.labels().join("、"));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(fs::File::create(output)?);

    bar.set_length(records.len() as u64);
    for (location, value) in records {
        let converted = serde_json::from_value::<Record>(value.clone())
            .map_err(|e| format!("unexpected field type: {e}"))
            .and_then(|rec| {
                convert(&rec, alphabet.as_ref(), scheme, options).map_err(|e| e.to_string())
            });
        match converted {
            Ok(canonical) => {
                serde_json::to_writer(&mut w, &canonical)?;
                w.write_all(b"\n")?;
                report.converted += 1;
            }
            Err(reason) => {
                warn!("{location}: {reason}");
                failures.push(Failure {
                    location,
                    reason,
                    raw: value.to_string(),
                });
            }
        }
        bar.inc(1);
    }
    w.flush()?;

    info!("wrote {} record(s) to {}", report.converted, output.display());
    report.error_artifact = write_error_artifact(&error_artifact_path(input), &failures)?;
    report.failures = failures;
    Ok(report)
}
