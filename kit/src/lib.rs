#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]
//! Incremental extraction of array records from streamed JSON generations.
//!
//! A text-generation service asked for `{"schedule":[{...},{...}]}` delivers
//! it as arbitrary fragments. `dayfeed` emits every array element as soon as
//! its closing brace arrives, wrapped in a small event protocol that travels
//! over server-sent events to a client-side [`Assembler`].
//!
//! ```
//! use dayfeed::{Delta, Session, StreamEvent};
//!
//! let mut session = Session::new(2);
//! let mut events = Vec::new();
//! for piece in [r#"{"schedule":[{"date":"2026-02-21"},"#, r#"{"date":"2026-02-22"}]}"#] {
//!     events.extend(session.on_delta(Delta::text(piece)));
//! }
//! events.extend(session.finish());
//!
//! assert!(matches!(events[0], StreamEvent::Start { total_hint: 2 }));
//! assert!(matches!(events[2], StreamEvent::Record { index: 1, .. }));
//! assert!(matches!(events[3], StreamEvent::Complete { .. }));
//! ```
pub use dayfeed_core::*;
