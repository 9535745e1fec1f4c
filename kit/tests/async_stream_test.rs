//! Tests for the async session drivers.
//!
//! A scripted source stands in for the upstream generation so every run is
//! deterministic.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use dayfeed::async_stream::tokio_impl::{SessionDriver, SessionOutcome, spawn_session, write_sse};
use dayfeed::async_stream::{DeltaSource, Generator, SessionOptions};
use dayfeed::{Delta, EventKind, EventOrder, SourceError, StreamConfig, StreamEvent, Usage};
use serde_json::json;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TWO_DAYS: &str =
    r#"{"schedule":[{"date":"2026-02-21","posts":[]},{"date":"2026-02-22","posts":[]}]}"#;

pub struct ScriptedSource {
    steps: VecDeque<Result<Delta, SourceError>>,
}

impl ScriptedSource {
    fn fragments(document: &str, size: usize) -> Self {
        let steps = document
            .as_bytes()
            .chunks(size)
            .map(|c| Ok(Delta::text(String::from_utf8_lossy(c).into_owned())))
            .collect();
        Self { steps }
    }

    fn then(mut self, step: Result<Delta, SourceError>) -> Self {
        self.steps.push_back(step);
        self
    }
}

impl DeltaSource for ScriptedSource {
    fn next_delta(&mut self) -> impl Future<Output = Option<Result<Delta, SourceError>>> + Send {
        std::future::ready(self.steps.pop_front())
    }
}

/// A source that never produces anything.
pub struct Stalled;

impl DeltaSource for Stalled {
    fn next_delta(&mut self) -> impl Future<Output = Option<Result<Delta, SourceError>>> + Send {
        std::future::pending()
    }
}

pub struct ScriptedGenerator {
    document: String,
    fragment: usize,
}

impl Generator for ScriptedGenerator {
    type Source = ScriptedSource;

    fn generate(&self, prompt: &str) -> Result<Self::Source, SourceError> {
        if prompt.is_empty() {
            return Err(SourceError::new("empty prompt"));
        }
        let usage = Usage {
            prompt_tokens: 12,
            completion_tokens: 40,
            total_tokens: 52,
        };
        Ok(ScriptedSource::fragments(&self.document, self.fragment)
            .then(Ok(Delta::text("").with_usage(usage))))
    }
}

async fn drain(rx: &mut mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn kinds(events: &[StreamEvent]) -> Vec<EventKind> {
    events.iter().map(StreamEvent::kind).collect()
}

#[tokio::test]
async fn test_driver_emits_ordered_events() {
    let (tx, mut rx) = mpsc::channel(8);
    let driver = SessionDriver::new(ScriptedSource::fragments(TWO_DAYS, 50), tx, 2);
    let task = tokio::spawn(driver.run());

    let events = drain(&mut rx).await;
    let outcome = task.await.unwrap();

    assert_eq!(
        kinds(&events),
        vec![
            EventKind::Start,
            EventKind::Record,
            EventKind::Record,
            EventKind::Complete
        ]
    );
    let mut order = EventOrder::new();
    for event in &events {
        order.accept(event).unwrap();
    }
    assert!(matches!(outcome, SessionOutcome::Completed(ref s) if s.total_records == 2));
}

#[tokio::test]
async fn test_upstream_failure_ends_with_error() {
    let source = ScriptedSource::fragments(&TWO_DAYS[..60], 10)
        .then(Err(SourceError::new("connection reset")));
    let (tx, mut rx) = mpsc::channel(8);
    let task = tokio::spawn(SessionDriver::new(source, tx, 2).run());

    let events = drain(&mut rx).await;
    assert_eq!(
        kinds(&events),
        vec![EventKind::Start, EventKind::Record, EventKind::Error]
    );
    assert_eq!(
        events.last(),
        Some(&StreamEvent::error("generation failed: connection reset"))
    );
    assert_eq!(
        task.await.unwrap(),
        SessionOutcome::Failed("generation failed: connection reset".into())
    );
}

#[tokio::test]
async fn test_failure_before_any_delta_still_starts() {
    let source = ScriptedSource {
        steps: VecDeque::from([Err(SourceError::new("quota exceeded"))]),
    };
    let (tx, mut rx) = mpsc::channel(8);
    tokio::spawn(SessionDriver::new(source, tx, 7).run());

    let events = drain(&mut rx).await;
    assert_eq!(kinds(&events), vec![EventKind::Start, EventKind::Error]);
}

#[tokio::test]
async fn test_consumer_disconnect_cancels() {
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    let outcome = SessionDriver::new(ScriptedSource::fragments(TWO_DAYS, 5), tx, 2)
        .run()
        .await;
    assert_eq!(outcome, SessionOutcome::Cancelled);
}

#[tokio::test]
async fn test_caller_cancellation_closes_channel() {
    let (tx, mut rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(
        SessionDriver::new(Stalled, tx, 1)
            .with_cancellation(cancel.clone())
            .run(),
    );

    cancel.cancel();
    assert_eq!(task.await.unwrap(), SessionOutcome::Cancelled);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_spawn_session_rejects_prompt() {
    let generator = ScriptedGenerator {
        document: TWO_DAYS.into(),
        fragment: 8,
    };
    let result = spawn_session(&generator, "", SessionOptions::new(2), StreamConfig::small());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_sse_wire_output() {
    let generator = ScriptedGenerator {
        document: TWO_DAYS.into(),
        fragment: 50,
    };
    let options = SessionOptions::new(2).with_context(json!({ "accountId": "acc_1", "period": 7 }));
    let mut handle = spawn_session(&generator, "plan a week", options, StreamConfig::small()).unwrap();

    let mut out: Vec<u8> = Vec::new();
    let written = write_sse(&mut handle.events, &mut out).await.unwrap();
    assert_eq!(written, 4);
    handle.task.await.unwrap();

    let wire = String::from_utf8(out).unwrap();
    insta::assert_snapshot!(wire, @r#"
data: {"type":"start","totalHint":2}

data: {"type":"record","value":{"date":"2026-02-21","posts":[]},"index":0}

data: {"type":"record","value":{"date":"2026-02-22","posts":[]},"index":1}

data: {"type":"complete","summary":{"totalRecords":2,"skipped":0,"usage":{"promptTokens":12,"completionTokens":40,"totalTokens":52},"context":{"accountId":"acc_1","period":7}}}
"#);
}

#[tokio::test]
async fn test_wire_round_trips_through_assembler() {
    let generator = ScriptedGenerator {
        document: TWO_DAYS.into(),
        fragment: 1,
    };
    let mut handle =
        spawn_session(&generator, "plan", SessionOptions::new(2), StreamConfig::default()).unwrap();

    let mut out: Vec<u8> = Vec::new();
    write_sse(&mut handle.events, &mut out).await.unwrap();
    let wire = String::from_utf8(out).unwrap();

    let mut assembler = dayfeed::Assembler::new();
    for chunk in wire.as_bytes().chunks(13) {
        assembler.ingest(std::str::from_utf8(chunk).unwrap());
    }

    assert!(assembler.is_complete());
    let dates: Vec<String> = assembler
        .records()
        .filter_map(|v| v["date"].as_str().map(String::from))
        .collect();
    assert_eq!(dates, vec!["2026-02-21", "2026-02-22"]);
}

/// A consumer connection that is already gone.
struct BrokenPipe;

impl AsyncWrite for BrokenPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn many_days(days: usize) -> String {
    let body: Vec<String> = (0..days)
        .map(|day| format!(r#"{{"date":"day-{day}","posts":[]}}"#))
        .collect();
    format!(r#"{{"schedule":[{}]}}"#, body.join(","))
}

#[tokio::test]
async fn test_failed_write_cancels_session() {
    // More records than the small preset's channel holds, so the driver
    // would block on a full channel if the consumer were not closed.
    let generator = ScriptedGenerator {
        document: many_days(40),
        fragment: 1,
    };
    let mut handle =
        spawn_session(&generator, "plan", SessionOptions::new(40), StreamConfig::small()).unwrap();

    let err = write_sse(&mut handle.events, &mut BrokenPipe)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

    let outcome = tokio::time::timeout(Duration::from_secs(5), &mut handle.task)
        .await
        .expect("session task still running after consumer write failure")
        .unwrap();
    assert_eq!(outcome, SessionOutcome::Cancelled);
}

#[cfg(feature = "futures")]
mod futures_tests {
    use super::*;
    use dayfeed::async_stream::futures_impl::{EventStream, StreamSource};
    use futures_core::Stream;

    struct DeltaIter {
        deltas: VecDeque<Result<Delta, SourceError>>,
    }

    impl Stream for DeltaIter {
        type Item = Result<Delta, SourceError>;

        fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Ready(self.deltas.pop_front())
        }
    }

    fn delta_iter(document: &str, size: usize) -> DeltaIter {
        DeltaIter {
            deltas: document
                .as_bytes()
                .chunks(size)
                .map(|c| Ok(Delta::text(String::from_utf8_lossy(c).into_owned())))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_event_stream_yields_protocol() {
        let mut stream = EventStream::new(delta_iter(TWO_DAYS, 3), 2);
        let mut events = Vec::new();
        while let Some(event) =
            std::future::poll_fn(|cx| Pin::new(&mut stream).poll_next(cx)).await
        {
            events.push(event);
        }

        assert_eq!(
            kinds(&events),
            vec![
                EventKind::Start,
                EventKind::Record,
                EventKind::Record,
                EventKind::Complete
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_source_drives_session() {
        let (tx, mut rx) = mpsc::channel(8);
        let source = StreamSource(delta_iter(TWO_DAYS, 7));
        tokio::spawn(SessionDriver::new(source, tx, 2).run());

        let events = drain(&mut rx).await;
        assert_eq!(events.len(), 4);
    }
}
