use std::io;

use thiserror::Error;

/// Text that does not follow any recognised labelling convention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("answer matches no known notation: {0}")]
    NoMatch(String),
    #[error("unknown label '{label}' in answer: {text}")]
    UnknownLabel { label: String, text: String },
    #[error("no label declaration ('标签包括：…。' or 'A、label;…') found")]
    MissingDeclaration,
    #[error("{0} distinct labels declared, at most 26 fit the letter alphabet")]
    TooManyLabels(usize),
    #[error("label '{0}' appears more than once among the choices")]
    DuplicateLabel(String),
    #[error("record has no '{0}' field")]
    MissingField(&'static str),
    #[error("letter '{letter}' is not one of the {len} declared labels: {text}")]
    UnknownLetter { letter: char, len: usize, text: String },
    #[error("answer token '{token}' is not a single letter")]
    NotALetter { token: String },
    #[error("answer index {index} is outside the {len} choices")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("lettered listing expected '{expected}' but found '{found}'")]
    NonSequentialLetters { expected: char, found: char },
}

/// Failures of a conversion run. Per-record variants are collected by the
/// batch driver; the rest abort the run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;
