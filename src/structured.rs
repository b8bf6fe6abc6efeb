//! Export to the structured multiple-choice shape used by evaluation
//! harnesses: `{question, choices, answer_index, metadata}`.

use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use indicatif::ProgressBar;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::alphabet::{position_of, Alphabet};
use crate::batch::{error_artifact_path, load_records, write_error_artifact, BatchReport, Failure};
use crate::convert::{structured_letters, AnswerIndex, Record};
use crate::error::{FormatError, Result};
use crate::extract::extract_letters;
use crate::scheme::Scheme;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_instruction: Option<String>,
    #[serde(default)]
    pub original_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub question: String,
    pub choices: Vec<String>,
    pub answer_index: AnswerIndex,
    pub metadata: Metadata,
}

/// Structured form of an instruction/answer record. Choices are the labels
/// declared in the instruction; the answer may use any notation the
/// extractor understands.
pub fn to_structured(record: &Record, scheme: &Scheme) -> Result<StructuredRecord, FormatError> {
    let instruction = record.instruction.as_deref().unwrap_or_default();
    let answer = record.answer.as_deref().unwrap_or_default();

    let alphabet = Alphabet::from_declaration(instruction)?;
    let letters = extract_letters(answer, &alphabet, scheme)?;
    let mut answer_index = Vec::with_capacity(letters.len());
    for c in letters {
        let index = position_of(c).map_or(-1, |p| p as i64);
        if index < 0 || index as usize >= alphabet.len() {
            return Err(FormatError::IndexOutOfRange { index, len: alphabet.len() });
        }
        answer_index.push(index);
    }

    Ok(StructuredRecord {
        question: record.question.clone().unwrap_or_default(),
        choices: alphabet.labels().to_vec(),
        answer_index: AnswerIndex::Many(answer_index),
        metadata: Metadata {
            original_instruction: Some(instruction.to_owned()),
            original_answer: answer.to_owned(),
        },
    })
}

/// Convert a JSONL or CSV file into structured JSONL. Records that already
/// carry `choices` and `answer_index` are copied unchanged.
pub fn export_structured(
    input: &Path,
    output: &Path,
    scheme: &Scheme,
    bar: &ProgressBar,
) -> Result<BatchReport> {
    let loaded = load_records(input)?;
    let mut failures = loaded.failures;
    let mut report = BatchReport::default();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(fs::File::create(output)?);

    bar.set_length(loaded.records.len() as u64);
    for (location, value) in loaded.records {
        match structured_value(&value, scheme) {
            Ok(out) => {
                serde_json::to_writer(&mut w, &out)?;
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

    info!("wrote {} structured record(s) to {}", report.converted, output.display());
    report.error_artifact = write_error_artifact(&error_artifact_path(input), &failures)?;
    report.failures = failures;
    Ok(report)
}

fn structured_value(value: &Value, scheme: &Scheme) -> Result<Value, String> {
    let record: Record =
        serde_json::from_value(value.clone()).map_err(|e| format!("unexpected field type: {e}"))?;
    if let (Some(choices), Some(index)) = (&record.choices, &record.answer_index) {
        structured_letters(choices, index).map_err(|e| e.to_string())?;
        return Ok(value.clone());
    }
    let structured = to_structured(&record, scheme).map_err(|e| e.to_string())?;
    serde_json::to_value(structured).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_record_maps_to_indices() {
        let record = Record {
            instruction: Some(
                "判断句子所属类别，可为单选或多选。类别包括:A、婚姻家庭;B、劳动纠纷;C、交通事故。选择正确的答案。"
                    .into(),
            ),
            question: Some("q".into()),
            answer: Some("正确答案：C、A。".into()),
            ..Default::default()
        };
        let out = to_structured(&record, &Scheme::dynamic()).unwrap();
        assert_eq!(out.choices, ["婚姻家庭", "劳动纠纷", "交通事故"]);
        assert_eq!(out.answer_index, AnswerIndex::Many(vec![0, 2]));
        assert_eq!(out.metadata.original_answer, "正确答案：C、A。");
    }

    #[test]
    fn declared_labels_and_label_answers_work_too() {
        let record = Record {
            instruction: Some("标签包括：婚姻家庭、劳动纠纷。".into()),
            question: Some("q".into()),
            answer: Some("[类别]劳动纠纷<eoa>".into()),
            ..Default::default()
        };
        let out = to_structured(&record, &Scheme::dynamic()).unwrap();
        assert_eq!(out.answer_index, AnswerIndex::Many(vec![1]));
    }

    #[test]
    fn structured_input_passes_through() {
        let value = serde_json::json!({"question": "q", "choices": ["X", "Y"], "answer_index": 1});
        assert_eq!(structured_value(&value, &Scheme::dynamic()), Ok(value.clone()));
    }

    #[test]
    fn instruction_without_listing_fails() {
        let record = Record {
            instruction: Some("请判断".into()),
            answer: Some("A".into()),
            ..Default::default()
        };
        assert_eq!(
            to_structured(&record, &Scheme::dynamic()),
            Err(FormatError::MissingDeclaration)
        );
    }

    #[test]
    fn answer_letter_outside_the_listing_fails() {
        let record = Record {
            instruction: Some("类别包括:A、婚姻家庭;B、劳动纠纷。".into()),
            question: Some("q".into()),
            answer: Some("正确答案：Z。".into()),
            ..Default::default()
        };
        assert!(matches!(
            to_structured(&record, &Scheme::dynamic()),
            Err(FormatError::UnknownLetter { letter: 'Z', len: 2, .. })
        ));
    }

    #[test]
    fn structured_input_with_bad_index_is_rejected() {
        let value = serde_json::json!({"question": "q", "choices": ["X", "Y"], "answer_index": [0, 5]});
        let reason = structured_value(&value, &Scheme::dynamic()).unwrap_err();
        assert!(reason.contains("index 5"), "{reason}");
    }
}
