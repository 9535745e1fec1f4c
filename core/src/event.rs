//! The event protocol between a session and its consumer.
//!
//! Every session produces, in order:
//!
//! - exactly one [`StreamEvent::Start`],
//! - zero or more [`StreamEvent::Record`] with indices `0, 1, 2, ...`,
//! - exactly one terminal event: [`StreamEvent::Complete`] on success or
//!   [`StreamEvent::Error`] on failure, never both.
//!
//! On the wire each event is a JSON object discriminated by `"type"`:
//!
//! ```text
//! {"type":"start","totalHint":2}
//! {"type":"record","value":{"date":"2026-02-21","posts":[]},"index":0}
//! {"type":"complete","summary":{"totalRecords":1,"skipped":0}}
//! {"type":"error","message":"generation failed: upstream closed"}
//! ```
//!
//! [`EventOrder`] checks a sequence against these rules. The client
//! assembler runs one over everything it decodes.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage reported by the upstream generation.
///
/// A session keeps only the most recent report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Payload of the `complete` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Records emitted by the session.
    pub total_records: usize,
    /// Balanced elements dropped because they failed to parse.
    #[serde(default)]
    pub skipped: usize,
    /// Last usage report from the upstream, if any arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Caller-supplied context echoed back to the consumer.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
}

/// One event of the session protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    /// The session has started; `total_hint` records are expected.
    Start { total_hint: usize },
    /// A completed array element.
    Record { value: Value, index: usize },
    /// The upstream finished and every complete element has been emitted.
    Complete { summary: Summary },
    /// The session failed.
    Error { message: String },
}

/// Discriminant of a [`StreamEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Record,
    Complete,
    Error,
}

impl EventKind {
    /// Returns true for `complete` and `error`.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, EventKind::Complete | EventKind::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Start => "start",
            EventKind::Record => "record",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
        })
    }
}

impl StreamEvent {
    /// The event's discriminant.
    pub const fn kind(&self) -> EventKind {
        match self {
            StreamEvent::Start { .. } => EventKind::Start,
            StreamEvent::Record { .. } => EventKind::Record,
            StreamEvent::Complete { .. } => EventKind::Complete,
            StreamEvent::Error { .. } => EventKind::Error,
        }
    }

    /// Build an `error` event from anything displayable.
    pub fn error(err: impl fmt::Display) -> Self {
        StreamEvent::Error {
            message: err.to_string(),
        }
    }
}

/// A breach of the event ordering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// An event arrived before `start`.
    MissingStart { found: EventKind },
    /// A second `start`.
    DuplicateStart,
    /// An event arrived after `complete` or `error`.
    AfterTerminal { terminal: EventKind, found: EventKind },
    /// A record index other than the next expected one.
    IndexOutOfOrder { expected: usize, found: usize },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::MissingStart { found } => {
                write!(f, "{} event before start", found)
            }
            ProtocolViolation::DuplicateStart => write!(f, "duplicate start event"),
            ProtocolViolation::AfterTerminal { terminal, found } => {
                write!(f, "{} event after {}", found, terminal)
            }
            ProtocolViolation::IndexOutOfOrder { expected, found } => {
                write!(f, "record index {} out of order, expected {}", found, expected)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolViolation {}

/// Tracks a sequence of events and rejects ones that break ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOrder {
    started: bool,
    next_index: usize,
    terminal: Option<EventKind>,
}

impl EventOrder {
    /// Fresh tracker, expecting `start`.
    pub const fn new() -> Self {
        Self {
            started: false,
            next_index: 0,
            terminal: None,
        }
    }

    /// Check `event` against the sequence so far and record it.
    ///
    /// A rejected event leaves the tracker unchanged.
    pub fn accept(&mut self, event: &StreamEvent) -> Result<(), ProtocolViolation> {
        let kind = event.kind();

        if let Some(terminal) = self.terminal {
            return Err(ProtocolViolation::AfterTerminal {
                terminal,
                found: kind,
            });
        }

        match event {
            StreamEvent::Start { .. } if self.started => Err(ProtocolViolation::DuplicateStart),
            StreamEvent::Start { .. } => {
                self.started = true;
                Ok(())
            }
            _ if !self.started => Err(ProtocolViolation::MissingStart { found: kind }),
            StreamEvent::Record { index, .. } => {
                if *index != self.next_index {
                    return Err(ProtocolViolation::IndexOutOfOrder {
                        expected: self.next_index,
                        found: *index,
                    });
                }
                self.next_index += 1;
                Ok(())
            }
            StreamEvent::Complete { .. } | StreamEvent::Error { .. } => {
                self.terminal = Some(kind);
                Ok(())
            }
        }
    }

    /// Whether `start` has been seen.
    #[inline]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// The terminal event kind, once one has been seen.
    #[inline]
    pub const fn terminal(&self) -> Option<EventKind> {
        self.terminal
    }

    /// Records accepted so far.
    #[inline]
    pub const fn records(&self) -> usize {
        self.next_index
    }
}
