use std::fs;

use indicatif::ProgressBar;
use tempfile::tempdir;

use unilaw_convert::csv_export::{collect_jsonl_inputs, export_csv};
use unilaw_convert::{ConvertOptions, Scheme};

const INSTRUCTION: &str =
    "判断句子所属类别，可为单选或多选。类别包括:A、婚姻家庭;B、劳动纠纷。选择正确的答案。";

fn line(question: &str, answer: &str) -> String {
    serde_json::json!({"instruction": INSTRUCTION, "question": question, "answer": answer}).to_string()
}

#[test]
fn table_has_option_columns_and_bom() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("set.jsonl");
    let output = dir.path().join("set.csv");
    fs::write(&input, [line("句子:离婚", "正确答案：A。"), line("欠薪", "正确答案：B、A。")].join("\n")).unwrap();

    let inputs = collect_jsonl_inputs(&input).unwrap();
    let report = export_csv(&inputs, &output, &Scheme::dynamic(), &ConvertOptions::default(), &ProgressBar::hidden())
        .unwrap();

    assert_eq!(report.converted, 2);
    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,question,A,B,answer");
    assert_eq!(lines[1], "1,离婚,婚姻家庭,劳动纠纷,A");
    assert_eq!(lines[2], "2,欠薪,婚姻家庭,劳动纠纷,A、B");
}

#[test]
fn option_columns_can_be_dropped() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("set.jsonl");
    let output = dir.path().join("set.csv");
    fs::write(&input, line("q", "正确答案：B。")).unwrap();
    let options = ConvertOptions {
        include_option_columns: false,
        text_encoding: "utf-8".to_owned(),
        ..Default::default()
    };

    export_csv(&[input], &output, &Scheme::dynamic(), &options, &ProgressBar::hidden()).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text, "id,question,answer\r\n1,q,B\r\n");
}

#[test]
fn directory_inputs_are_read_in_name_order() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("b.jsonl"), line("second", "正确答案：B。")).unwrap();
    fs::write(data.join("a.jsonl"), [line("first", "正确答案：A。"), "{bad".to_owned()].join("\n")).unwrap();
    fs::write(data.join("notes.txt"), "ignored").unwrap();
    let output = dir.path().join("all.csv");

    let inputs = collect_jsonl_inputs(&data).unwrap();
    assert_eq!(inputs.len(), 2);

    let options = ConvertOptions {
        text_encoding: "utf-8".to_owned(),
        ..Default::default()
    };
    let report = export_csv(&inputs, &output, &Scheme::dynamic(), &options, &ProgressBar::hidden()).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let questions: Vec<&str> = text.lines().skip(1).map(|l| l.split(',').nth(1).unwrap()).collect();
    assert_eq!(questions, ["first", "second"]);

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].to_string().contains("a.jsonl line 2"));
    assert_eq!(report.error_artifact, Some(dir.path().join("all.error_lines.txt")));
}
