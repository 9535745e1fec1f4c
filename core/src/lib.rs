extern crate alloc;

pub mod anchor;
pub mod config;
mod error;
pub mod extract;
pub mod scan;

#[cfg(feature = "serde")]
pub mod assembler;
#[cfg(feature = "serde")]
pub mod event;
#[cfg(feature = "serde")]
pub mod session;
#[cfg(feature = "serde")]
pub mod sse;

#[cfg(any(feature = "tokio", feature = "futures"))]
pub mod async_stream;

#[cfg(feature = "fuzz")]
pub mod fuzz;

pub use anchor::{AnchorState, locate_array};
pub use config::{ExtractConfig, StreamConfig};
pub use error::{Error, SourceError};
pub use extract::{
    ElementScan, ExtractCheckpoint, Extraction, Record, RecordExtractor, extract_all,
    extract_records, next_element,
};
pub use scan::find_matching_delimiter;

#[cfg(feature = "serde")]
pub use assembler::{Assembler, AssemblyState, Progress};
#[cfg(feature = "serde")]
pub use event::{EventKind, EventOrder, ProtocolViolation, StreamEvent, Summary, Usage};
#[cfg(feature = "serde")]
pub use session::{Delta, Phase, Session};
