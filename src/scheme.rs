//! Textual conventions of a dataset family: which tag word wraps the labels,
//! which field prefixes introduce them, and how the canonical instruction
//! reads.

use regex::Regex;

/// Prefix that introduces an already letter-coded answer in every scheme.
pub const ANSWER_PREFIX: &str = "正确答案";

/// Dispute-focus labels, in letter order `A..=P`.
pub const FOCUS_LABELS: [&str; 16] = [
    "诉讼主体",
    "租金情况",
    "利息",
    "本金争议",
    "责任认定",
    "责任划分",
    "损失认定及处理",
    "原审判决是否适当",
    "合同效力",
    "财产分割",
    "责任承担",
    "鉴定结论采信问题",
    "诉讼时效",
    "违约",
    "合同解除",
    "肇事逃逸",
];

#[derive(Debug, Clone)]
pub struct Scheme {
    pub name: &'static str,
    /// First sentence of the canonical instruction.
    pub intro: &'static str,
    /// Built-in label table; `None` when each dataset declares its own.
    pub builtin_labels: Option<&'static [&'static str]>,
    pub(crate) bracket_re: Regex,
    pub(crate) colon_re: Regex,
}

impl Scheme {
    /// Per-dataset labels declared in the instruction (`标签包括：…。`).
    pub fn dynamic() -> Self {
        Self::new(
            "dynamic",
            "判断句子所属类别，可为单选或多选。",
            None,
            "类别",
            &["类别"],
        )
    }

    /// Fixed dispute-focus table.
    pub fn focus() -> Self {
        Self::new(
            "focus",
            "判断句子包含的争议焦点类别，每个句子只包含一个争议焦点类别。",
            Some(&FOCUS_LABELS),
            "争议焦点",
            // longest first, alternation is leftmost-first
            &["争议焦点类别", "争议焦点"],
        )
    }

    fn new(
        name: &'static str,
        intro: &'static str,
        builtin_labels: Option<&'static [&'static str]>,
        tag: &str,
        field_prefixes: &[&str],
    ) -> Self {
        let bracket = format!(r"\[{}\]\s*([^\[<]+?)<\s*(?i:eoa)\s*>", regex::escape(tag));

        let mut prefixes: Vec<String> = field_prefixes.iter().map(|p| regex::escape(p)).collect();
        prefixes.push(regex::escape(ANSWER_PREFIX));
        let colon = format!(r"(?:{})[:：]\s*(.*)", prefixes.join("|"));

        // Patterns are assembled from escaped literals only.
        Self {
            name,
            intro,
            builtin_labels,
            bracket_re: Regex::new(&bracket).expect("bracket pattern is valid"),
            colon_re: Regex::new(&colon).expect("colon pattern is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_prefers_the_longer_field_prefix() {
        let scheme = Scheme::focus();
        let caps = scheme.colon_re.captures("争议焦点类别：责任认定").unwrap();
        assert_eq!(&caps[1], "责任认定");
    }

    #[test]
    fn bracket_tag_accepts_spaced_and_uppercase_end_marker() {
        let scheme = Scheme::dynamic();
        let caps = scheme.bracket_re.captures("[类别] 婚姻家庭< EOA >").unwrap();
        assert_eq!(&caps[1], "婚姻家庭");
    }

    #[test]
    fn every_scheme_accepts_the_answer_prefix() {
        for scheme in [Scheme::dynamic(), Scheme::focus()] {
            assert!(scheme.colon_re.is_match("正确答案：A。"), "{}", scheme.name);
        }
    }
}
