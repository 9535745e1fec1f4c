//! Client-side reconstruction of a streamed record collection.
//!
//! The [`Assembler`] reads SSE transport chunks, decodes protocol events and
//! rebuilds the ordered record collection as records arrive, so a consumer
//! can render progress before the session ends.
//!
//! Frames that do not decode to a protocol event are skipped. Events that
//! break ordering (see [`EventOrder`]) are ignored. After `error` the
//! assembler halts: the records it already holds stay available but it
//! never finalizes.

use serde_json::Value;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::event::{EventOrder, ProtocolViolation, StreamEvent, Summary};
use crate::extract::extract_all;
use crate::sse::SseDecoder;

/// Completed versus expected records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Records received.
    pub completed: usize,
    /// Records expected; grows if more arrive than were hinted.
    pub total: usize,
}

impl Progress {
    /// Completion ratio in `0.0..=1.0`; `1.0` when nothing is expected.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Where the assembler is in the event sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyState {
    /// Nothing received yet.
    Waiting,
    /// `start` received.
    Streaming,
    /// `complete` received; the collection is final.
    Complete(Summary),
    /// `error` received.
    Failed(String),
}

/// Rebuilds the record collection from protocol events.
#[derive(Debug, Clone)]
pub struct Assembler {
    decoder: SseDecoder,
    order: EventOrder,
    slots: Vec<Option<Value>>,
    total_hint: usize,
    completed: usize,
    state: AssemblyState,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self {
            decoder: SseDecoder::new(),
            order: EventOrder::new(),
            slots: Vec::new(),
            total_hint: 0,
            completed: 0,
            state: AssemblyState::Waiting,
        }
    }

    /// Feed a transport chunk. Returns the number of events applied.
    pub fn ingest(&mut self, chunk: &str) -> usize {
        let payloads = self.decoder.feed(chunk);
        payloads
            .iter()
            .filter(|payload| self.apply_payload(payload))
            .count()
    }

    /// Flush a trailing frame left without its blank line.
    pub fn finish_transport(&mut self) -> usize {
        match core::mem::take(&mut self.decoder).finish() {
            Some(payload) => usize::from(self.apply_payload(&payload)),
            None => 0,
        }
    }

    fn apply_payload(&mut self, payload: &str) -> bool {
        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => match self.apply(event) {
                Ok(()) => true,
                Err(violation) => {
                    debug!(%violation, "ignoring out-of-order event");
                    false
                }
            },
            Err(err) => {
                debug!(error = %err, "skipping undecodable frame");
                false
            }
        }
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: StreamEvent) -> Result<(), ProtocolViolation> {
        self.order.accept(&event)?;

        match event {
            StreamEvent::Start { total_hint } => {
                self.total_hint = total_hint;
                if self.slots.len() < total_hint {
                    self.slots.resize(total_hint, None);
                }
                self.state = AssemblyState::Streaming;
            }
            StreamEvent::Record { value, index } => {
                self.place(index, value);
            }
            StreamEvent::Complete { summary } => {
                self.state = AssemblyState::Complete(summary);
            }
            StreamEvent::Error { message } => {
                self.state = AssemblyState::Failed(message);
            }
        }

        Ok(())
    }

    fn place(&mut self, index: usize, value: Value) -> bool {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        let slot = &mut self.slots[index];
        let filled = slot.is_none();
        if filled {
            self.completed += 1;
        }
        *slot = Some(value);
        filled
    }

    /// Fill positions still missing from a complete raw document.
    ///
    /// Replays the same extraction the session ran, so indices line up with
    /// the ones the stream would have delivered. Positions already filled
    /// are left alone. Returns the number of positions filled.
    pub fn reconcile(&mut self, document: &str, config: &ExtractConfig) -> usize {
        let extraction = extract_all(document, config, |s: &str| {
            serde_json::from_str::<Value>(s)
        });

        let mut filled = 0;
        for record in extraction.records {
            let missing = self
                .slots
                .get(record.index)
                .is_none_or(|slot| slot.is_none());
            if missing && self.place(record.index, record.value) {
                filled += 1;
            }
        }
        filled
    }

    /// Progress so far.
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total_hint.max(self.slots.len()),
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> &AssemblyState {
        &self.state
    }

    /// Whether `complete` has been received.
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, AssemblyState::Complete(_))
    }

    /// The error message, if the session failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            AssemblyState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// The final summary, once complete.
    pub fn summary(&self) -> Option<&Summary> {
        match &self.state {
            AssemblyState::Complete(summary) => Some(summary),
            _ => None,
        }
    }

    /// Record at `index`, if it has arrived.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Received records in index order.
    pub fn records(&self) -> impl Iterator<Item = &Value> {
        self.slots.iter().flatten()
    }

    /// Consume the assembler, returning received records in index order.
    pub fn into_records(self) -> Vec<Value> {
        self.slots.into_iter().flatten().collect()
    }
}
