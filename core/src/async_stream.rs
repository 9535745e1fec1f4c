//! Async session driving.
//!
//! This module connects an upstream generation to a [`Session`] and delivers
//! the resulting protocol events to a consumer.
//!
//! # Architecture
//!
//! - A **Generator** turns a prompt into a **DeltaSource**
//! - The **driver** awaits deltas one at a time and feeds the session
//! - The session's events go to the **consumer** (channel or stream)
//!
//! Two drivers are provided:
//!
//! - [`tokio_impl::SessionDriver`]: runs as a task, writes events into an
//!   `mpsc` channel, observes cancellation and consumer disconnect.
//! - [`futures_impl::EventStream`]: runtime-agnostic `Stream` adapter that
//!   yields events as the caller polls it.
//!
//! # Example
//!
//! ```ignore
//! use dayfeed::async_stream::tokio_impl::spawn_session;
//!
//! let handle = spawn_session(&generator, &prompt, SessionOptions::new(7), StreamConfig::default())?;
//! let mut events = handle.events;
//! while let Some(event) = events.recv().await {
//!     print!("{}", encode_event(&event)?);
//! }
//! ```

use core::future::Future;

use crate::error::SourceError;
use crate::session::Delta;

/// A sequence of upstream deltas.
///
/// `None` marks the natural end of the generation. An `Err` is fatal to the
/// session that reads it.
pub trait DeltaSource: Send {
    /// Wait for the next delta.
    fn next_delta(&mut self) -> impl Future<Output = Option<Result<Delta, SourceError>>> + Send;
}

/// The upstream generation capability: prompt in, deltas out.
///
/// Injected into the driver so sessions can run against deterministic
/// fakes.
pub trait Generator: Send + Sync {
    /// Source returned for each generation.
    type Source: DeltaSource + 'static;

    /// Start a generation for `prompt`.
    fn generate(&self, prompt: &str) -> Result<Self::Source, SourceError>;
}

/// Parameters of one session supplied by the caller.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOptions {
    /// Expected record count, sent in `start`.
    pub total_hint: usize,
    /// Echoed back in the `complete` summary.
    pub context: serde_json::Value,
}

#[cfg(feature = "tokio")]
impl SessionOptions {
    /// Options expecting `total_hint` records, with no context.
    pub fn new(total_hint: usize) -> Self {
        Self {
            total_hint,
            context: serde_json::Value::Null,
        }
    }

    /// Attach caller context.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

#[cfg(feature = "tokio")]
pub mod tokio_impl {
    //! Tokio-based session driver.

    use super::*;
    use crate::Error;
    use crate::config::StreamConfig;
    use crate::event::{StreamEvent, Summary};
    use crate::extract::RecordExtractor;
    use crate::session::{Phase, Session};
    use crate::sse::encode_event;
    use ::tokio::io::{AsyncWrite, AsyncWriteExt};
    use ::tokio::sync::mpsc;
    use ::tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, trace, warn};

    impl DeltaSource for mpsc::Receiver<Result<Delta, SourceError>> {
        fn next_delta(
            &mut self,
        ) -> impl Future<Output = Option<Result<Delta, SourceError>>> + Send {
            self.recv()
        }
    }

    /// How a driven session ended.
    #[derive(Debug, Clone, PartialEq)]
    pub enum SessionOutcome {
        /// `complete` was delivered.
        Completed(Summary),
        /// `error` was delivered with this message.
        Failed(String),
        /// The consumer disconnected or the caller cancelled.
        Cancelled,
    }

    /// Drives one session from a delta source into an event channel.
    ///
    /// The driver owns the source and the sender. Both are dropped when
    /// [`SessionDriver::run`] returns or its task is aborted, which releases
    /// the upstream and closes the consumer's channel on every exit path.
    pub struct SessionDriver<D: DeltaSource> {
        source: D,
        session: Session,
        event_tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    }

    impl<D: DeltaSource> SessionDriver<D> {
        /// Create a driver with a default session expecting `total_hint` records.
        pub fn new(source: D, event_tx: mpsc::Sender<StreamEvent>, total_hint: usize) -> Self {
            Self::with_session(source, Session::new(total_hint), event_tx)
        }

        /// Create a driver around a prepared session.
        pub fn with_session(
            source: D,
            session: Session,
            event_tx: mpsc::Sender<StreamEvent>,
        ) -> Self {
            Self {
                source,
                session,
                event_tx,
                cancel: CancellationToken::new(),
            }
        }

        /// Stop the session when `cancel` fires.
        pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
            self.cancel = cancel;
            self
        }

        /// Run until the session reaches a terminal state.
        pub async fn run(self) -> SessionOutcome {
            let SessionDriver {
                mut source,
                mut session,
                event_tx,
                cancel,
            } = self;

            loop {
                let next = ::tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("session cancelled by caller");
                        session.cancel();
                        return SessionOutcome::Cancelled;
                    }
                    _ = event_tx.closed() => {
                        debug!("consumer disconnected, cancelling session");
                        session.cancel();
                        return SessionOutcome::Cancelled;
                    }
                    next = source.next_delta() => next,
                };

                let events = match next {
                    Some(Ok(delta)) => {
                        trace!(len = delta.text.len(), "delta received");
                        session.on_delta(delta)
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "upstream generation failed");
                        session.fail(&Error::Source(err))
                    }
                    None => session.finish(),
                };

                let mut failure = None;
                for event in events {
                    if let StreamEvent::Error { message } = &event {
                        failure = Some(message.clone());
                    }

                    let sent = ::tokio::select! {
                        biased;
                        _ = cancel.cancelled() => false,
                        res = event_tx.send(event) => res.is_ok(),
                    };
                    if !sent {
                        debug!("event not delivered, cancelling session");
                        session.cancel();
                        return SessionOutcome::Cancelled;
                    }
                }

                match session.phase() {
                    Phase::Completed => {
                        debug!(records = session.records_emitted(), "session completed");
                        return SessionOutcome::Completed(session.summary());
                    }
                    Phase::Failed => {
                        return SessionOutcome::Failed(failure.unwrap_or_default());
                    }
                    Phase::Cancelled => return SessionOutcome::Cancelled,
                    Phase::Idle | Phase::Streaming => {}
                }
            }
        }
    }

    /// A spawned session.
    #[derive(Debug)]
    pub struct SessionHandle {
        /// Protocol events, closed when the session ends.
        pub events: mpsc::Receiver<StreamEvent>,
        /// The driver task.
        pub task: JoinHandle<SessionOutcome>,
        cancel: CancellationToken,
    }

    impl SessionHandle {
        /// Ask the session to stop. No further events are sent.
        pub fn cancel(&self) {
            self.cancel.cancel();
        }

        /// Token that cancels this session when triggered.
        pub fn cancellation_token(&self) -> CancellationToken {
            self.cancel.clone()
        }
    }

    /// Start a generation and drive it on a new task.
    ///
    /// Fails synchronously if the generator refuses the prompt; no events
    /// are produced in that case.
    pub fn spawn_session<G: Generator>(
        generator: &G,
        prompt: &str,
        options: SessionOptions,
        config: StreamConfig,
    ) -> Result<SessionHandle, SourceError> {
        let source = generator.generate(prompt)?;
        let (event_tx, events) = mpsc::channel(config.event_buffer_size.max(1));
        let cancel = CancellationToken::new();

        let extractor = RecordExtractor::with_capacity(&config.extract, config.buffer_capacity);
        let session =
            Session::with_extractor(options.total_hint, extractor).with_context(options.context);
        let driver = SessionDriver::with_session(source, session, event_tx)
            .with_cancellation(cancel.clone());
        let task = ::tokio::spawn(driver.run());

        Ok(SessionHandle {
            events,
            task,
            cancel,
        })
    }

    /// Write events to `writer` as SSE frames, flushing after each one.
    ///
    /// Returns the number of frames written once the channel closes. A
    /// failed write closes `events`, so the driver sees a disconnected
    /// consumer and cancels the session.
    pub async fn write_sse<W>(
        events: &mut mpsc::Receiver<StreamEvent>,
        writer: &mut W,
    ) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0;
        while let Some(event) = events.recv().await {
            if let Err(err) = write_frame(writer, &event).await {
                debug!(error = %err, "consumer write failed, closing event channel");
                events.close();
                return Err(err);
            }
            written += 1;
        }
        Ok(written)
    }

    async fn write_frame<W>(writer: &mut W, event: &StreamEvent) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = encode_event(event).map_err(std::io::Error::other)?;
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await
    }
}

#[cfg(feature = "futures")]
pub mod futures_impl {
    //! Futures-based session adapters (runtime-agnostic).

    use super::*;
    use crate::Error;
    use crate::event::StreamEvent;
    use crate::session::Session;
    use core::pin::Pin;
    use core::task::{Context, Poll};
    use futures_core::Stream;
    use std::collections::VecDeque;

    /// Adapts any `Stream` of deltas into a [`DeltaSource`].
    pub struct StreamSource<S>(pub S);

    impl<S> DeltaSource for StreamSource<S>
    where
        S: Stream<Item = Result<Delta, SourceError>> + Unpin + Send,
    {
        fn next_delta(
            &mut self,
        ) -> impl Future<Output = Option<Result<Delta, SourceError>>> + Send {
            core::future::poll_fn(move |cx| Pin::new(&mut self.0).poll_next(cx))
        }
    }

    /// A stream adapter that yields protocol events for a delta stream.
    ///
    /// Ends after the terminal event.
    pub struct EventStream<S> {
        inner: S,
        session: Session,
        pending: VecDeque<StreamEvent>,
        upstream_done: bool,
    }

    impl<S> EventStream<S>
    where
        S: Stream<Item = Result<Delta, SourceError>>,
    {
        /// Wrap a delta stream with a session expecting `total_hint` records.
        pub fn new(inner: S, total_hint: usize) -> Self {
            Self::with_session(inner, Session::new(total_hint))
        }

        /// Wrap a delta stream with a prepared session.
        pub fn with_session(inner: S, session: Session) -> Self {
            Self {
                inner,
                session,
                pending: VecDeque::new(),
                upstream_done: false,
            }
        }

        /// The session being driven.
        pub fn session(&self) -> &Session {
            &self.session
        }
    }

    impl<S> Stream for EventStream<S>
    where
        S: Stream<Item = Result<Delta, SourceError>> + Unpin,
    {
        type Item = StreamEvent;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            let this = self.get_mut();
            loop {
                if let Some(event) = this.pending.pop_front() {
                    return Poll::Ready(Some(event));
                }
                if this.upstream_done || this.session.phase().is_terminal() {
                    return Poll::Ready(None);
                }

                match Pin::new(&mut this.inner).poll_next(cx) {
                    Poll::Ready(Some(Ok(delta))) => {
                        this.pending.extend(this.session.on_delta(delta));
                    }
                    Poll::Ready(Some(Err(err))) => {
                        this.upstream_done = true;
                        this.pending.extend(this.session.fail(&Error::Source(err)));
                    }
                    Poll::Ready(None) => {
                        this.upstream_done = true;
                        this.pending.extend(this.session.finish());
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }
        }
    }
}
