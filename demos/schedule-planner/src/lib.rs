#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! Schedule Planner Example
//!
//! An end-to-end application built on dayfeed: a caller asks for a posting
//! schedule, the request is validated, a prompt is built and sent to a
//! generator, and each day of the schedule is streamed back to the caller
//! as an SSE `record` event the moment its JSON closes.
//!
//! # Flow
//!
//! ```text
//! ScheduleRequest --validate--> build_prompt --Generator--> deltas
//!     --> Session --> start, record*, complete | error --> SSE
//! ```
//!
//! The bundled [`ScriptedGenerator`] replays a fixed document so the whole
//! pipeline runs offline.

use dayfeed::StreamConfig;
use dayfeed::async_stream::tokio_impl::{SessionHandle, spawn_session};
use dayfeed::async_stream::{Generator, SessionOptions};
use thiserror::Error;

pub mod prompt;
pub mod request;
pub mod scripted;

pub use prompt::build_prompt;
pub use request::{
    DaySlot, MAX_POSTS_PER_DAY, Period, PostKind, RequestError, ScheduleRequest, TimeChoice,
    Weekday, WeekdayPlan,
};
pub use scripted::{ScriptedGenerator, ScriptedSource, sample_document};

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Source(#[from] dayfeed::SourceError),

    #[error("session failed: {0}")]
    Session(String),

    #[error("session task panicked or was aborted: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Validate `request` and start streaming its schedule.
///
/// Nothing is generated for an invalid request. On success the returned
/// handle yields `start`, one `record` per day and a terminal event.
pub fn plan<G: Generator>(
    generator: &G,
    request: &ScheduleRequest,
    config: StreamConfig,
) -> Result<SessionHandle, PlannerError> {
    request.validate()?;

    let prompt = build_prompt(request);
    tracing::debug!(
        account = %request.account_id,
        days = request.period.days(),
        prompt_len = prompt.len(),
        "starting schedule generation"
    );

    let options = SessionOptions::new(request.total_hint()).with_context(request.context());
    Ok(spawn_session(generator, &prompt, options, config)?)
}
