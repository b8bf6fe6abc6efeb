//! Canonical JSONL → CSV table (`id, question, [A, B, …], answer`).

use std::{
    fs,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use indicatif::ProgressBar;
use itertools::Itertools;
use log::{info, warn};
use serde_json::Value;

use crate::alphabet::Alphabet;
use crate::batch::{parse_json_lines, write_error_artifact, BatchReport, Failure, Location};
use crate::convert::{strip_question_marker, ConvertOptions};
use crate::error::{ConvertError, FormatError, Result};
use crate::extract::extract_letters;
use crate::scheme::Scheme;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A single `.jsonl` file, or every `*.jsonl` in a directory sorted by name.
pub fn collect_jsonl_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let files: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("jsonl"))
        .sorted()
        .collect();
    if files.is_empty() {
        return Err(ConvertError::Configuration(format!(
            "no .jsonl files in {}",
            path.display()
        )));
    }
    Ok(files)
}

/// Encode the finished CSV text with the requested label. UTF-16 is written
/// without a BOM; labels `encoding_rs` can only decode are rejected.
pub fn encode_text(text: &str, label: &str) -> Result<Vec<u8>> {
    match label.trim().to_ascii_lowercase().as_str() {
        "utf-8-sig" | "utf8-sig" => Ok([UTF8_BOM, text.as_bytes()].concat()),
        "utf-8" | "utf8" => Ok(text.as_bytes().to_vec()),
        other => {
            let encoding = Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                ConvertError::Configuration(format!("unknown text encoding '{label}'"))
            })?;
            if encoding == UTF_16LE {
                return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
            }
            if encoding == UTF_16BE {
                return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
            }
            let (bytes, used, had_errors) = encoding.encode(text);
            if used != encoding {
                return Err(ConvertError::Configuration(format!(
                    "'{label}' ({}) cannot be used for writing",
                    encoding.name()
                )));
            }
            if had_errors {
                warn!("some characters are not representable in {}", used.name());
            }
            Ok(bytes.into_owned())
        }
    }
}

/// Write every record of `inputs` as one CSV row. The label alphabet comes
/// from the first record's instruction and is fatal when missing.
pub fn export_csv(
    inputs: &[PathBuf],
    output: &Path,
    scheme: &Scheme,
    options: &ConvertOptions,
    bar: &ProgressBar,
) -> Result<BatchReport> {
    let many = inputs.len() > 1;
    let mut records: Vec<(Location, Value)> = Vec::new();
    let mut failures: Vec<Failure> = Vec::new();

    for file in inputs {
        let loaded = parse_json_lines(&fs::read_to_string(file)?);
        let relocate = |location: Location| match location {
            Location::Line(line) if many => Location::FileLine {
                file: file.display().to_string(),
                line,
            },
            other => other,
        };
        records.extend(loaded.records.into_iter().map(|(l, v)| (relocate(l), v)));
        failures.extend(loaded.failures.into_iter().map(|f| Failure {
            location: relocate(f.location),
            ..f
        }));
    }
    info!("{} record(s) from {} file(s)", records.len(), inputs.len());

    let instruction = records
        .first()
        .and_then(|(_, v)| v.get("instruction"))
        .and_then(Value::as_str)
        .ok_or_else(|| ConvertError::Configuration("first record has no instruction".to_owned()))?;
    let alphabet = Alphabet::from_declaration(instruction)
        .map_err(|e| ConvertError::Configuration(format!("cannot build label alphabet: {e}")))?;

    // CRLF rows, as Excel writes them
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    let mut header = vec!["id".to_owned(), "question".to_owned()];
    if options.include_option_columns {
        header.extend(alphabet.entries().map(|(letter, _)| letter.to_string()));
    }
    header.push("answer".to_owned());
    wtr.write_record(&header)?;

    bar.set_length(records.len() as u64);
    let mut rows = 0usize;
    for (location, value) in records {
        match csv_row(&value, &alphabet, scheme) {
            Ok((question, answer)) => {
                rows += 1;
                let mut row = vec![rows.to_string(), question];
                if options.include_option_columns {
                    row.extend(alphabet.labels().iter().cloned());
                }
                row.push(answer);
                wtr.write_record(&row)?;
            }
            Err(e) => {
                warn!("{location}: {e}");
                failures.push(Failure {
                    location,
                    reason: e.to_string(),
                    raw: value.to_string(),
                });
            }
        }
        bar.inc(1);
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ConvertError::Io(e.into_error()))?;
    let text = String::from_utf8_lossy(&bytes);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, encode_text(&text, &options.text_encoding)?)?;
    info!("wrote {rows} row(s) to {}", output.display());

    let artifact = artifact_path(inputs, output);
    Ok(BatchReport {
        converted: rows,
        error_artifact: write_error_artifact(&artifact, &failures)?,
        failures,
    })
}

fn csv_row(value: &Value, alphabet: &Alphabet, scheme: &Scheme) -> Result<(String, String), FormatError> {
    let question = value
        .get("question")
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingField("question"))?;
    let answer = value
        .get("answer")
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingField("answer"))?;
    let letters = extract_letters(answer, alphabet, scheme)?;
    Ok((
        strip_question_marker(question).to_owned(),
        letters.iter().join("、"),
    ))
}

// Single input: next to it. Directory input: next to the CSV.
fn artifact_path(inputs: &[PathBuf], output: &Path) -> PathBuf {
    match inputs {
        [single] => crate::batch::error_artifact_path(single),
        _ => crate::batch::error_artifact_path(output),
    }
}
