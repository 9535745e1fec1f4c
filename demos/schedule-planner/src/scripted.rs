//! A deterministic stand-in for the upstream generation service.
//!
//! [`ScriptedGenerator`] replays a fixed document in fixed-size fragments,
//! optionally reporting usage and failing part way through. It lets the
//! CLI, tests and benches run sessions without a network.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use dayfeed::async_stream::{DeltaSource, Generator};
use dayfeed::{Delta, SourceError, Usage};

#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    document: Arc<str>,
    fragment: usize,
    usage: Option<Usage>,
    fail_after: Option<usize>,
}

impl ScriptedGenerator {
    /// Replay `document` in fragments of `fragment` bytes (widened to a
    /// character boundary).
    pub fn new(document: impl Into<Arc<str>>, fragment: usize) -> Self {
        Self {
            document: document.into(),
            fragment: fragment.max(1),
            usage: None,
            fail_after: None,
        }
    }

    /// Report `usage` with the last fragment.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Fail with an upstream error after `fragments` fragments.
    pub fn failing_after(mut self, fragments: usize) -> Self {
        self.fail_after = Some(fragments);
        self
    }

    /// Split the document into the fragments a session would receive.
    pub fn fragments(&self) -> Vec<String> {
        let text = &*self.document;
        let mut out = Vec::with_capacity(text.len() / self.fragment + 1);
        let mut at = 0;
        while at < text.len() {
            let mut end = (at + self.fragment).min(text.len());
            while !text.is_char_boundary(end) {
                end += 1;
            }
            out.push(text[at..end].to_owned());
            at = end;
        }
        out
    }
}

impl Generator for ScriptedGenerator {
    type Source = ScriptedSource;

    fn generate(&self, prompt: &str) -> Result<Self::Source, SourceError> {
        if prompt.trim().is_empty() {
            return Err(SourceError::new("prompt is empty"));
        }

        let mut steps: VecDeque<_> = self
            .fragments()
            .into_iter()
            .map(|text| Ok(Delta::text(text)))
            .collect();

        if let Some(after) = self.fail_after {
            steps.truncate(after);
            steps.push_back(Err(SourceError::new("upstream stream reset")));
        } else if let Some(usage) = self.usage {
            match steps.back_mut() {
                Some(Ok(last)) => last.usage = Some(usage),
                _ => steps.push_back(Ok(Delta::text("").with_usage(usage))),
            }
        }

        Ok(ScriptedSource { steps })
    }
}

/// Deltas produced by [`ScriptedGenerator`].
#[derive(Debug)]
pub struct ScriptedSource {
    steps: VecDeque<Result<Delta, SourceError>>,
}

impl DeltaSource for ScriptedSource {
    fn next_delta(&mut self) -> impl Future<Output = Option<Result<Delta, SourceError>>> + Send {
        std::future::ready(self.steps.pop_front())
    }
}

/// A well-formed schedule document of `days` entries dated `2026-03-01`
/// onwards (the day number simply counts up), each with one text post.
/// Wrapped in prose the way chat models tend to reply.
pub fn sample_document(days: usize) -> String {
    let mut doc = String::from("Here is your schedule:\n{\"schedule\":[");
    for day in 0..days {
        if day > 0 {
            doc.push(',');
        }
        doc.push_str(&format!(
            r#"{{"date":"2026-03-{:02}","posts":[{{"kind":"text","time":"09:00","caption":"Day {} {{recap}} [draft] \"quoted\""}}]}}"#,
            day + 1,
            day + 1
        ));
    }
    doc.push_str("]}\nLet me know if you want changes.");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_cover_document() {
        let generator = ScriptedGenerator::new("héllo wörld", 2);
        let fragments = generator.fragments();
        assert_eq!(fragments.concat(), "héllo wörld");
        assert!(fragments.iter().all(|f| !f.is_empty()));
    }

    #[test]
    fn test_sample_document_parses() {
        let doc = sample_document(3);
        let start = doc.find('{').unwrap();
        let end = doc.rfind('}').unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc[start..=end]).unwrap();
        assert_eq!(value["schedule"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["schedule"][2]["date"], "2026-03-03");
    }

    #[test]
    fn test_refuses_empty_prompt() {
        let generator = ScriptedGenerator::new("{}", 1);
        assert!(generator.generate("   ").is_err());
    }
}
