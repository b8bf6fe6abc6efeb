//! Answer text → canonical letters.
//!
//! Four notations are tried in a fixed order and the first that matches wins:
//!
//! 1. bracketed tag: `[类别]婚姻家庭、劳动纠纷<eoa>`
//! 2. field prefix: `类别:婚姻家庭` or `正确答案：A、B。`
//! 3. bare letters: `A,B`
//! 4. bare labels: `婚姻家庭 劳动纠纷`
//!
//! Letter tokens must fall inside the alphabet. The result is always
//! deduplicated and sorted by letter.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::alphabet::{split_labels, Alphabet};
use crate::error::FormatError;
use crate::scheme::Scheme;

static LETTER_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z](?:\s*[、,，;；]\s*[A-Za-z])*").expect("valid regex")
});
static BARE_LETTERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z](?:\s*[、,，;；]\s*[A-Z])*\s*[。.]?$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Matched(Vec<char>),
    NoMatch,
}

type Matcher = fn(&str, &Alphabet, &Scheme) -> Result<Outcome, FormatError>;

const MATCHERS: [Matcher; 4] = [bracketed, colon_labeled, bare_letters, bare_labels];

/// Letters encoded by `answer`, in ascending order without repeats.
pub fn extract_letters(
    answer: &str,
    alphabet: &Alphabet,
    scheme: &Scheme,
) -> Result<Vec<char>, FormatError> {
    let text = answer.trim();
    for matcher in MATCHERS {
        if let Outcome::Matched(letters) = matcher(text, alphabet, scheme)? {
            return Ok(canonical_order(letters));
        }
    }
    Err(FormatError::NoMatch(text.to_owned()))
}

/// Deduplicate and sort into letter order.
pub fn canonical_order<I: IntoIterator<Item = char>>(letters: I) -> Vec<char> {
    letters.into_iter().unique().sorted_unstable().collect()
}

fn bracketed(text: &str, alphabet: &Alphabet, scheme: &Scheme) -> Result<Outcome, FormatError> {
    match scheme.bracket_re.captures(text) {
        Some(caps) => lookup_all(&split_labels(&caps[1]), alphabet, text),
        None => Ok(Outcome::NoMatch),
    }
}

fn colon_labeled(text: &str, alphabet: &Alphabet, scheme: &Scheme) -> Result<Outcome, FormatError> {
    let Some(caps) = scheme.colon_re.captures(text) else {
        return Ok(Outcome::NoMatch);
    };
    let rest = caps.get(1).map_or("", |m| m.as_str());

    if let Some(letters) = leading_letters(rest) {
        return checked_letters(letters, alphabet, text);
    }

    // labels run until the first sentence terminator
    let body = rest.split(['.', ';', '。']).next().unwrap_or_default();
    lookup_all(&split_labels(body), alphabet, text)
}

fn bare_letters(text: &str, alphabet: &Alphabet, _: &Scheme) -> Result<Outcome, FormatError> {
    if !BARE_LETTERS_RE.is_match(text) {
        return Ok(Outcome::NoMatch);
    }
    checked_letters(
        text.chars().filter(char::is_ascii_uppercase).collect(),
        alphabet,
        text,
    )
}

fn bare_labels(text: &str, alphabet: &Alphabet, _: &Scheme) -> Result<Outcome, FormatError> {
    let body = text.trim_end_matches(['。', '.']);
    let tokens = split_labels(body);
    if tokens.is_empty() {
        return Ok(Outcome::NoMatch);
    }

    let letters: Vec<Option<char>> = tokens.iter().map(|t| alphabet.letter_of(t)).collect();
    if letters.iter().all(Option::is_some) {
        return Ok(Outcome::Matched(letters.into_iter().flatten().collect()));
    }
    // Free text that merely contains no label is "no match"; a partial hit is
    // most likely a typo in one label.
    if letters.iter().any(Option::is_some) {
        let pos = letters.iter().position(Option::is_none).unwrap_or_default();
        return Err(FormatError::UnknownLabel {
            label: tokens[pos].to_owned(),
            text: text.to_owned(),
        });
    }
    Ok(Outcome::NoMatch)
}

/// Single-letter tokens at the start of `rest`, upper-cased. `None` when the
/// run is followed directly by more ASCII text (a word, not a letter list).
fn leading_letters(rest: &str) -> Option<Vec<char>> {
    let m = LETTER_RUN_RE.find(rest)?;
    if rest[m.end()..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(
        m.as_str()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_uppercase())
            .collect(),
    )
}

/// Letter tokens must name a declared label.
fn checked_letters(letters: Vec<char>, alphabet: &Alphabet, text: &str) -> Result<Outcome, FormatError> {
    if let Some(&letter) = letters.iter().find(|&&c| alphabet.label_of(c).is_none()) {
        return Err(FormatError::UnknownLetter {
            letter,
            len: alphabet.len(),
            text: text.to_owned(),
        });
    }
    Ok(Outcome::Matched(letters))
}

fn lookup_all(labels: &[&str], alphabet: &Alphabet, text: &str) -> Result<Outcome, FormatError> {
    if labels.is_empty() {
        return Ok(Outcome::NoMatch);
    }
    labels
        .iter()
        .map(|label| {
            alphabet
                .letter_of(label)
                .ok_or_else(|| FormatError::UnknownLabel {
                    label: (*label).to_owned(),
                    text: text.to_owned(),
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Outcome::Matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::FOCUS_LABELS;

    fn family() -> Alphabet {
        Alphabet::from_declaration("标签包括：婚姻家庭、劳动纠纷、交通事故。").unwrap()
    }

    fn letters(answer: &str) -> Result<Vec<char>, FormatError> {
        extract_letters(answer, &family(), &Scheme::dynamic())
    }

    #[test]
    fn colon_labeled_single_label() {
        assert_eq!(letters("类别:婚姻家庭"), Ok(vec!['A']));
    }

    #[test]
    fn bracketed_multi_label() {
        assert_eq!(letters("[类别]婚姻家庭、劳动纠纷<eoa>"), Ok(vec!['A', 'B']));
    }

    #[test]
    fn letter_answer_is_resorted() {
        assert_eq!(letters("正确答案：B、A。"), Ok(vec!['A', 'B']));
    }

    #[test]
    fn every_notation_gives_the_same_letters() {
        let expected = Ok(vec!['A', 'C']);
        for answer in [
            "[类别]交通事故，婚姻家庭<eoa>",
            "类别：交通事故、婚姻家庭。",
            "正确答案：C、A。",
            "C,A",
            "交通事故 婚姻家庭",
        ] {
            assert_eq!(letters(answer), expected, "{answer}");
        }
    }

    #[test]
    fn repeats_collapse() {
        assert_eq!(letters("[类别]劳动纠纷、劳动纠纷<EOA>"), Ok(vec!['B']));
        assert_eq!(letters("A;A;B"), Ok(vec!['A', 'B']));
    }

    #[test]
    fn lowercase_letters_after_prefix_are_accepted() {
        assert_eq!(letters("正确答案: b"), Ok(vec!['B']));
    }

    #[test]
    fn unknown_label_in_colon_form() {
        assert_eq!(
            letters("类别:继承纠纷"),
            Err(FormatError::UnknownLabel {
                label: "继承纠纷".into(),
                text: "类别:继承纠纷".into(),
            })
        );
    }

    #[test]
    fn partial_bare_label_hit_is_an_unknown_label() {
        assert!(matches!(
            letters("婚姻家庭 继承纠纷"),
            Err(FormatError::UnknownLabel { label, .. }) if label == "继承纠纷"
        ));
    }

    #[test]
    fn free_text_is_no_match() {
        assert_eq!(
            letters("无法判断"),
            Err(FormatError::NoMatch("无法判断".into()))
        );
        assert!(matches!(letters("   "), Err(FormatError::NoMatch(_))));
    }

    #[test]
    fn earlier_form_wins_over_later() {
        // the bracket form is consulted before the prefix form
        assert_eq!(
            letters("[类别]劳动纠纷<eoa> 正确答案：A"),
            Ok(vec!['B'])
        );
    }

    #[test]
    fn canonical_answer_round_trips() {
        let first = letters("[类别]交通事故、劳动纠纷<eoa>").unwrap();
        let rendered = format!("正确答案：{}。", first.iter().join("、"));
        assert_eq!(letters(&rendered).unwrap(), first);
        assert_eq!(letters(&first.iter().join(",")).unwrap(), first);
    }

    #[test]
    fn letters_past_the_alphabet_are_rejected() {
        assert_eq!(
            letters("正确答案：Z。"),
            Err(FormatError::UnknownLetter {
                letter: 'Z',
                len: 3,
                text: "正确答案：Z。".into(),
            })
        );
        assert!(matches!(
            letters("A,D"),
            Err(FormatError::UnknownLetter { letter: 'D', .. })
        ));
    }

    #[test]
    fn focus_letters_stop_at_p() {
        let alphabet = Alphabet::from_labels(FOCUS_LABELS).unwrap();
        let scheme = Scheme::focus();
        assert_eq!(extract_letters("正确答案：P", &alphabet, &scheme), Ok(vec!['P']));
        assert!(matches!(
            extract_letters("正确答案：Z", &alphabet, &scheme),
            Err(FormatError::UnknownLetter { letter: 'Z', len: 16, .. })
        ));
        assert!(matches!(
            extract_letters("Q", &alphabet, &scheme),
            Err(FormatError::UnknownLetter { letter: 'Q', .. })
        ));
    }

    #[test]
    fn focus_scheme_reads_its_own_tags() {
        let alphabet = Alphabet::from_labels(FOCUS_LABELS).unwrap();
        let scheme = Scheme::focus();
        assert_eq!(
            extract_letters("[争议焦点]责任认定、责任划分<eoa>", &alphabet, &scheme),
            Ok(vec!['E', 'F'])
        );
        assert_eq!(
            extract_letters("争议焦点类别：肇事逃逸", &alphabet, &scheme),
            Ok(vec!['P'])
        );
        assert_eq!(
            extract_letters("争议焦点: 利息", &alphabet, &scheme),
            Ok(vec!['C'])
        );
    }
}
