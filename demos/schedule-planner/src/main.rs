use std::path::PathBuf;

use clap::Parser;
use dayfeed::async_stream::tokio_impl::{SessionOutcome, write_sse};
use dayfeed::sse::{encode_event, header_block};
use dayfeed::{Assembler, ExtractConfig, StreamConfig};
use schedule_planner::{
    Period, PlannerError, ScheduleRequest, ScriptedGenerator, plan, sample_document,
};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Stream a schedule document as server-sent events.
///
/// The document is replayed in small fragments, the way a generation
/// service would deliver it, and every completed day is written to stdout
/// as an SSE `record` frame.
#[derive(Debug, Parser)]
#[command(name = "schedule-planner", version)]
struct Cli {
    /// Raw generation output to replay. A sample document is used if omitted.
    #[arg(long, short)]
    document: Option<PathBuf>,

    /// JSON schedule request. Defaults to one daily post for a week.
    #[arg(long, short)]
    request: Option<PathBuf>,

    /// Fragment size in bytes.
    #[arg(long, short, default_value_t = 16)]
    fragment: usize,

    /// Key of the array holding the records.
    #[arg(long, default_value = "schedule")]
    array_key: String,

    /// Fail the session once the buffer grows past this many bytes.
    #[arg(long)]
    max_buffer: Option<usize>,

    /// Write the event-stream response headers before the first frame.
    #[arg(long)]
    headers: bool,

    /// Rebuild the record list from the emitted frames and log a summary.
    #[arg(long)]
    reassemble: bool,
}

impl Cli {
    fn stream_config(&self) -> StreamConfig {
        let mut extract = ExtractConfig::new().with_array_key(self.array_key.clone());
        if let Some(limit) = self.max_buffer {
            extract = extract.with_max_buffer_len(limit);
        }
        StreamConfig::small().with_extract(extract)
    }

    fn load_request(&self) -> Result<ScheduleRequest, PlannerError> {
        match &self.request {
            Some(path) => ScheduleRequest::from_json(&std::fs::read_to_string(path)?),
            None => Ok(ScheduleRequest::daily("demo", Period::Week)),
        }
    }

    fn load_document(&self, request: &ScheduleRequest) -> Result<String, PlannerError> {
        match &self.document {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => Ok(sample_document(request.period.days())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), PlannerError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let request = cli.load_request()?;
    let generator = ScriptedGenerator::new(cli.load_document(&request)?, cli.fragment);

    let mut handle = plan(&generator, &request, cli.stream_config())?;

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    if cli.headers {
        stdout.write_all(header_block().as_bytes()).await?;
    }
    if cli.reassemble {
        let mut assembler = Assembler::new();
        while let Some(event) = handle.events.recv().await {
            let frame = encode_event(&event)?;
            stdout.write_all(frame.as_bytes()).await?;
            stdout.flush().await?;
            assembler.ingest(&frame);
        }
        let progress = assembler.progress();
        info!(
            completed = progress.completed,
            total = progress.total,
            complete = assembler.is_complete(),
            "reassembled schedule"
        );
    } else {
        write_sse(&mut handle.events, &mut stdout).await?;
    }

    match handle.task.await? {
        SessionOutcome::Completed(summary) => {
            info!(
                records = summary.total_records,
                skipped = summary.skipped,
                "schedule streamed"
            );
            Ok(())
        }
        SessionOutcome::Failed(message) => Err(PlannerError::Session(message)),
        SessionOutcome::Cancelled => {
            warn!("session cancelled");
            Ok(())
        }
    }
}
