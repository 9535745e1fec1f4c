//! Session state machine for one generation run.
//!
//! A [`Session`] owns the extraction state for a single upstream generation
//! and turns deltas into protocol events. It performs no I/O; the async
//! driver in [`crate::async_stream`] pumps deltas into it and forwards the
//! events it returns.
//!
//! # States
//!
//! ```text
//! Idle --first delta--> Streaming --finish--> Completed
//!   |                       |
//!   +------fail-------------+----fail-------> Failed
//!   +------cancel-----------+----cancel-----> Cancelled
//! ```
//!
//! `start` is emitted on the first delta. A session that finishes or fails
//! before any delta arrived still emits `start` ahead of its terminal event,
//! so every event sequence begins with `start`.

use serde_json::Value;
use tracing::debug;

use crate::Error;
use crate::config::ExtractConfig;
use crate::event::{StreamEvent, Summary, Usage};
use crate::extract::RecordExtractor;

/// One fragment of upstream output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Text to append to the session buffer. May be empty.
    pub text: String,
    /// Usage report carried by this fragment, if any.
    pub usage: Option<Usage>,
}

impl Delta {
    /// A text-only delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    /// Attach a usage report.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

impl From<&str> for Delta {
    fn from(text: &str) -> Self {
        Delta::text(text)
    }
}

impl From<String> for Delta {
    fn from(text: String) -> Self {
        Delta::text(text)
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No delta received yet.
    Idle,
    /// At least one delta received, no terminal event yet.
    Streaming,
    /// `complete` emitted.
    Completed,
    /// `error` emitted.
    Failed,
    /// Torn down without a terminal event.
    Cancelled,
}

impl Phase {
    /// Returns true once no further events can be produced.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed | Phase::Cancelled)
    }
}

/// Extraction session: buffer, cursor, anchor and last usage report.
#[derive(Debug, Clone)]
pub struct Session {
    extractor: RecordExtractor,
    phase: Phase,
    total_hint: usize,
    usage: Option<Usage>,
    context: Value,
}

impl Session {
    /// Create a session expecting `total_hint` records.
    pub fn new(total_hint: usize) -> Self {
        Self::with_config(total_hint, &ExtractConfig::DEFAULT)
    }

    /// Create a session with a custom extraction configuration.
    pub fn with_config(total_hint: usize, config: &ExtractConfig) -> Self {
        Self::with_extractor(total_hint, RecordExtractor::with_config(config))
    }

    /// Create a session around an existing extractor.
    pub fn with_extractor(total_hint: usize, extractor: RecordExtractor) -> Self {
        Self {
            extractor,
            phase: Phase::Idle,
            total_hint,
            usage: None,
            context: Value::Null,
        }
    }

    /// Attach caller context to echo back in the `complete` summary.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Process one delta.
    ///
    /// Returns `start` (on the first delta) followed by one `record` per
    /// newly completed element. If the delta overflows the buffer limit the
    /// session fails and the returned events end with `error`.
    pub fn on_delta(&mut self, delta: Delta) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.phase.is_terminal() {
            return events;
        }
        self.begin(&mut events);

        if let Some(usage) = delta.usage {
            self.usage = Some(usage);
        }
        if delta.text.is_empty() {
            return events;
        }

        let extraction = match self
            .extractor
            .feed(&delta.text, |s: &str| serde_json::from_str::<Value>(s))
        {
            Ok(extraction) => extraction,
            Err(err) => {
                self.phase = Phase::Failed;
                events.push(StreamEvent::error(err));
                return events;
            }
        };

        if extraction.skipped > 0 {
            debug!(
                skipped = extraction.skipped,
                cursor = extraction.checkpoint.cursor,
                "dropped malformed array elements"
            );
        }

        events.extend(
            extraction
                .records
                .into_iter()
                .map(|record| StreamEvent::Record {
                    value: record.value,
                    index: record.index,
                }),
        );
        events
    }

    /// The upstream ended normally: emit `complete`.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.phase.is_terminal() {
            return events;
        }
        self.begin(&mut events);
        self.phase = Phase::Completed;
        events.push(StreamEvent::Complete {
            summary: self.summary(),
        });
        events
    }

    /// The session failed: emit `error`.
    pub fn fail(&mut self, err: &Error) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.phase.is_terminal() {
            return events;
        }
        self.begin(&mut events);
        self.phase = Phase::Failed;
        events.push(StreamEvent::error(err));
        events
    }

    /// The consumer went away: stop without a terminal event.
    pub fn cancel(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Cancelled;
        }
    }

    fn begin(&mut self, events: &mut Vec<StreamEvent>) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Streaming;
            events.push(StreamEvent::Start {
                total_hint: self.total_hint,
            });
        }
    }

    /// Summary as it would be reported if the session completed now.
    pub fn summary(&self) -> Summary {
        let checkpoint = self.extractor.checkpoint();
        Summary {
            total_records: checkpoint.emitted,
            skipped: checkpoint.skipped,
            usage: self.usage,
            context: self.context.clone(),
        }
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last usage report received.
    #[inline]
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Records emitted so far.
    #[inline]
    pub fn records_emitted(&self) -> usize {
        self.extractor.checkpoint().emitted
    }

    /// The underlying extractor.
    #[inline]
    pub fn extractor(&self) -> &RecordExtractor {
        &self.extractor
    }
}
