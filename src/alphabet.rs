//! Label ↔ letter mapping for one dataset.

use std::collections::HashMap;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FormatError;

pub const MAX_LABELS: usize = 26;

// 标签包括：婚姻家庭、劳动纠纷。
static DECLARATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"标签包括[：:](.+?)。").expect("valid regex"));
// A、婚姻家庭;B、劳动纠纷
static LETTERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z])、([^;；。]+)").expect("valid regex"));
static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[、,，;；\s]+").expect("valid regex"));

/// Split a label list on any of `、 , ， ; ；` or whitespace, dropping empties.
pub fn split_labels(text: &str) -> Vec<&str> {
    SEPARATOR_RE
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Letter for a zero-based position (`0 → 'A'`).
pub fn letter_at(position: usize) -> Option<char> {
    (position < MAX_LABELS).then(|| (b'A' + position as u8) as char)
}

/// Zero-based position of an uppercase letter.
pub fn position_of(letter: char) -> Option<usize> {
    letter
        .is_ascii_uppercase()
        .then(|| (letter as u8 - b'A') as usize)
}

/// Ordered, injective label → letter mapping. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl Alphabet {
    /// Assign letters in first-seen order; repeated labels keep their first
    /// letter.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, FormatError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_owned())
            .filter(|l| !l.is_empty())
            .unique()
            .collect();
        Self::from_distinct(labels)
    }

    /// Positional alphabet of a structured record: choice `i` gets letter
    /// `i`. Repeated choices would make two letters share a label, so they
    /// are rejected instead of collapsed.
    pub fn from_choices(choices: &[String]) -> Result<Self, FormatError> {
        if let Some(dup) = choices.iter().duplicates().next() {
            return Err(FormatError::DuplicateLabel(dup.clone()));
        }
        Self::from_distinct(choices.to_vec())
    }

    /// Parse the label list out of an instruction. Accepts the
    /// `标签包括：…。` declaration and, failing that, the lettered listing
    /// `A、label;B、label` written by the converter itself.
    pub fn from_declaration(text: &str) -> Result<Self, FormatError> {
        match DECLARATION_RE.captures(text) {
            Some(caps) => {
                let labels = split_labels(&caps[1]);
                if labels.is_empty() {
                    return Err(FormatError::MissingDeclaration);
                }
                Self::from_labels(labels)
            }
            None => Self::from_lettered(text),
        }
    }

    /// Parse a `A、label;B、label` listing. Letters must run from `A` without
    /// gaps.
    pub fn from_lettered(text: &str) -> Result<Self, FormatError> {
        let mut labels = Vec::new();
        for (pos, caps) in LETTERED_RE.captures_iter(text).enumerate() {
            let found = caps[1].chars().next().unwrap_or_default();
            let expected = letter_at(pos).ok_or(FormatError::TooManyLabels(pos + 1))?;
            if found != expected {
                return Err(FormatError::NonSequentialLetters { expected, found });
            }
            labels.push(caps[2].trim().to_owned());
        }
        if labels.is_empty() {
            return Err(FormatError::MissingDeclaration);
        }
        if let Some(dup) = labels.iter().duplicates().next() {
            return Err(FormatError::DuplicateLabel(dup.clone()));
        }
        Self::from_distinct(labels)
    }

    fn from_distinct(labels: Vec<String>) -> Result<Self, FormatError> {
        if labels.len() > MAX_LABELS {
            return Err(FormatError::TooManyLabels(labels.len()));
        }
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Ok(Self { labels, index })
    }

    pub fn letter_of(&self, label: &str) -> Option<char> {
        self.index.get(label).and_then(|&i| letter_at(i))
    }

    pub fn label_of(&self, letter: char) -> Option<&str> {
        position_of(letter)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(letter, label)` pairs in letter order.
    pub fn entries(&self) -> impl Iterator<Item = (char, &str)> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| letter_at(i).map(|c| (c, l.as_str())))
    }
}
