//! Chunk-invariance and replay properties.
//!
//! However a document is fragmented, the session must emit the same records
//! in the same order with indices `0, 1, 2, ...`.

use dayfeed::{Delta, ExtractConfig, Session, StreamEvent, extract_all};
use serde_json::Value;

const DOCUMENT: &str = concat!(
    "Sure, here is the plan:\n",
    r#"{"schedule": ["#,
    "\n  ",
    r#"{"date":"2026-02-21","posts":[{"kind":"text","time":"09:00","caption":"Brace yourself: } ] {"}]},"#,
    "\n  ",
    r#"{"date":"2026-02-22","posts":[{"kind":"image","time":null,"caption":"She said \"[ok]\" \\ fine"}]},"#,
    "\n  ",
    r#"{"date":"2026-02-23","posts":[]},"#,
    "\n  ",
    r#"{"date":"2026-02-24","posts":[{"kind":"video","time":"18:30","caption":"día de campo 🌮 {"}]}"#,
    "\n]}\n"
);

/// Split on char boundaries into pieces of at most `size` bytes.
fn fragments(text: &str, size: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut at = 0;
    while at < text.len() {
        let mut end = (at + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(&text[at..end]);
        at = end;
    }
    out
}

fn records_for(pieces: &[&str]) -> Vec<(usize, Value)> {
    let mut session = Session::new(4);
    let mut records = Vec::new();
    for piece in pieces {
        for event in session.on_delta(Delta::text(*piece)) {
            if let StreamEvent::Record { value, index } = event {
                records.push((index, value));
            }
        }
    }
    records
}

#[test]
fn whole_document_yields_four_days() {
    let records = records_for(&[DOCUMENT]);
    let dates: Vec<&str> = records
        .iter()
        .filter_map(|(_, v)| v["date"].as_str())
        .collect();
    assert_eq!(
        dates,
        vec!["2026-02-21", "2026-02-22", "2026-02-23", "2026-02-24"]
    );
}

#[test]
fn every_fragment_size_matches_whole_document() {
    let expected = records_for(&[DOCUMENT]);

    for size in 1..=DOCUMENT.len() {
        let got = records_for(&fragments(DOCUMENT, size));
        assert_eq!(got, expected, "fragment size {}", size);
    }
}

#[test]
fn indices_are_dense_and_increasing() {
    for size in [1, 2, 3, 7, 50] {
        let indices: Vec<usize> = records_for(&fragments(DOCUMENT, size))
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3], "fragment size {}", size);
    }
}

#[test]
fn replay_of_any_prefix_matches_emitted_records() {
    let config = ExtractConfig::default();
    let mut session = Session::new(4);
    let mut emitted: Vec<Value> = Vec::new();
    let mut fed = 0;

    for piece in fragments(DOCUMENT, 1) {
        fed += piece.len();
        for event in session.on_delta(Delta::text(piece)) {
            if let StreamEvent::Record { value, .. } = event {
                emitted.push(value);
            }
        }

        let replay = extract_all(&DOCUMENT[..fed], &config, |s: &str| {
            serde_json::from_str::<Value>(s)
        });
        let replayed: Vec<Value> = replay.records.into_iter().map(|r| r.value).collect();
        assert_eq!(replayed, emitted, "prefix of length {}", fed);
    }
}

#[test]
fn skipped_elements_do_not_consume_indices() {
    let document = r#"{"schedule":[{"n":0},{"n":},{"n":2},{"n":,},{"n":4}]}"#;

    for size in [1, 4, document.len()] {
        let mut session = Session::new(5);
        let mut got = Vec::new();
        for piece in fragments(document, size) {
            for event in session.on_delta(Delta::text(piece)) {
                if let StreamEvent::Record { value, index } = event {
                    got.push((index, value["n"].as_i64()));
                }
            }
        }
        assert_eq!(got, vec![(0, Some(0)), (1, Some(2)), (2, Some(4))]);
        assert_eq!(session.summary().skipped, 2);
    }
}
