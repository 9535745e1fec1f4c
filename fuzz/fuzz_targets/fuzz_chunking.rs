#![no_main]

use std::convert::Infallible;

use arbitrary::Arbitrary;
use dayfeed::fuzz::SplitPlan;
use dayfeed::{ExtractConfig, RecordExtractor, extract_all};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    body: String,
    plan: SplitPlan,
}

fn raw(s: &str) -> Result<String, Infallible> {
    Ok(s.to_owned())
}

fuzz_target!(|input: Input| {
    let document = format!("{{\"schedule\":[{}", input.body);
    let config = ExtractConfig::default();

    let whole = extract_all(&document, &config, raw);

    let mut extractor = RecordExtractor::with_config(&config);
    let mut records = Vec::new();
    for chunk in input.plan.split(&document) {
        if extractor.feed_into(chunk, &mut records, raw).is_err() {
            return;
        }
    }

    assert_eq!(records, whole.records);
    assert_eq!(extractor.checkpoint().emitted, whole.checkpoint.emitted);
    assert_eq!(extractor.checkpoint().skipped, whole.checkpoint.skipped);
});
