use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::alphabet::{letter_at, Alphabet};
use crate::error::FormatError;
use crate::extract::{canonical_order, extract_letters};
use crate::scheme::{Scheme, ANSWER_PREFIX};

/// Leading marker some sources put in front of the question text.
const QUESTION_MARKERS: [&str; 2] = ["句子:", "句子："];

// Input row. Every field is optional so that the converter, not serde,
// decides which ones are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub answer_index: Option<AnswerIndex>,
}

impl Record {
    /// Carries the pre-structured `choices` + `answer_index` encoding.
    pub fn is_structured(&self) -> bool {
        self.choices.is_some() && self.answer_index.is_some()
    }
}

/// `answer_index` is either a single integer or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnswerIndex {
    Single(i64),
    Many(Vec<i64>),
}

impl AnswerIndex {
    pub fn indices(&self) -> Vec<i64> {
        match self {
            AnswerIndex::Single(i) => vec![*i],
            AnswerIndex::Many(v) => v.clone(),
        }
    }
}

// Output row; field order is the JSONL key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub instruction: String,
    pub question: String,
    pub answer: String,
}

/// Switches that shape a conversion run. Built once from the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// CSV export: write one column per label.
    pub include_option_columns: bool,
    /// CSV export: output encoding label (`utf-8-sig`, `utf-8`, `gbk`, …).
    pub text_encoding: String,
    /// Treat every record as `choices` + `answer_index`.
    pub force_structured_form: bool,
    /// Drop a leading `句子:` marker from questions.
    pub strip_question_prefix: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_option_columns: true,
            text_encoding: "utf-8-sig".to_owned(),
            force_structured_form: false,
            strip_question_prefix: false,
        }
    }
}

/// `判断…。类别包括:A、x;B、y。选择正确的答案。`
pub fn render_instruction(alphabet: &Alphabet, scheme: &Scheme) -> String {
    let parts = alphabet
        .entries()
        .map(|(letter, label)| format!("{letter}、{label}"))
        .join(";");
    format!("{}类别包括:{parts}。选择正确的答案。", scheme.intro)
}

/// `正确答案：A、B。`
pub fn render_answer(letters: &[char]) -> String {
    format!("{ANSWER_PREFIX}：{}。", letters.iter().join("、"))
}

/// Question text without a leading `句子:` marker and surrounding whitespace.
pub fn strip_question_marker(question: &str) -> &str {
    let trimmed = question.trim();
    QUESTION_MARKERS
        .iter()
        .find_map(|m| trimmed.strip_prefix(m))
        .unwrap_or(trimmed)
        .trim()
}

/// Letters for positional answer indices (`0 → A`), canonically ordered.
pub fn structured_letters(
    choices: &[String],
    answer_index: &AnswerIndex,
) -> Result<Vec<char>, FormatError> {
    let indices = answer_index.indices();
    if indices.is_empty() {
        return Err(FormatError::NoMatch("answer_index is empty".to_owned()));
    }
    let letters = indices
        .into_iter()
        .map(|index| {
            usize::try_from(index)
                .ok()
                .filter(|&i| i < choices.len())
                .and_then(letter_at)
                .ok_or(FormatError::IndexOutOfRange {
                    index,
                    len: choices.len(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(canonical_order(letters))
}

/// Rewrite one record into the canonical shape.
///
/// `alphabet` is the dataset-wide mapping; it may be absent when the batch
/// only carries structured records, which bring their own choice list.
pub fn convert(
    record: &Record,
    alphabet: Option<&Alphabet>,
    scheme: &Scheme,
    options: &ConvertOptions,
) -> Result<CanonicalRecord, FormatError> {
    let question = record
        .question
        .as_deref()
        .ok_or(FormatError::MissingField("question"))?;
    let question = if options.strip_question_prefix {
        strip_question_marker(question)
    } else {
        question
    };

    if options.force_structured_form || record.is_structured() {
        let choices = record
            .choices
            .as_deref()
            .ok_or(FormatError::MissingField("choices"))?;
        let answer_index = record
            .answer_index
            .as_ref()
            .ok_or(FormatError::MissingField("answer_index"))?;
        let own = Alphabet::from_choices(choices)?;
        let letters = structured_letters(choices, answer_index)?;
        return Ok(CanonicalRecord {
            instruction: render_instruction(&own, scheme),
            question: question.to_owned(),
            answer: render_answer(&letters),
        });
    }

    let answer = record
        .answer
        .as_deref()
        .ok_or(FormatError::MissingField("answer"))?;
    let alphabet = alphabet.ok_or(FormatError::MissingDeclaration)?;
    let letters = extract_letters(answer, alphabet, scheme)?;

    Ok(CanonicalRecord {
        instruction: render_instruction(alphabet, scheme),
        question: question.to_owned(),
        answer: render_answer(&letters),
    })
}
