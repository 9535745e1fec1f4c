//! Incremental extraction of array elements from a growing buffer.
//!
//! The extractor walks the body of the record array one element at a time:
//!
//! 1. skip separators (`,` and whitespace),
//! 2. expect `{`,
//! 3. find the matching `}` with [`find_matching_delimiter`],
//! 4. hand the balanced span to a parse function and advance the cursor.
//!
//! When the next object is still incomplete the loop stops and leaves the
//! cursor where it was. The next call resumes from that cursor, never from
//! the start of the buffer.
//!
//! # Usage Pattern
//!
//! ```
//! use dayfeed_core::extract::RecordExtractor;
//!
//! let mut extractor = RecordExtractor::new();
//! let parse = |s: &str| -> Result<String, ()> { Ok(s.to_string()) };
//!
//! let first = extractor.feed(r#"{"schedule":[{"day":1},{"da"#, parse).unwrap();
//! assert_eq!(first.records.len(), 1);
//!
//! let second = extractor.feed(r#"y":2}]}"#, parse).unwrap();
//! assert_eq!(second.records[0].index, 1);
//! assert_eq!(second.records[0].value, r#"{"day":2}"#);
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use crate::Error;
use crate::anchor::{AnchorState, locate_array};
use crate::config::ExtractConfig;
use crate::scan::find_matching_delimiter;

/// Returns true for bytes allowed between array elements.
#[inline]
pub const fn is_separator(byte: u8) -> bool {
    matches!(byte, b',' | b' ' | b'\n' | b'\r' | b'\t')
}

/// Result of looking for the next element from a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementScan {
    /// A balanced object occupies `start..=end`.
    Complete {
        /// Offset of the opening `{`.
        start: usize,
        /// Offset of the closing `}`.
        end: usize,
    },
    /// The buffer ends before the next object does.
    NeedMore,
    /// The next significant byte is not `{`.
    ///
    /// A `]` here closes the record array. Anything else is not an element
    /// this extractor understands; either way no more records can follow
    /// from this position.
    Halted {
        /// Offset of the byte.
        at: usize,
        /// The byte itself.
        byte: u8,
    },
}

/// Find the next complete element at or after `cursor`.
pub fn next_element(buffer: &str, cursor: usize) -> ElementScan {
    let bytes = buffer.as_bytes();
    let mut i = cursor;

    while i < bytes.len() && is_separator(bytes[i]) {
        i += 1;
    }

    match bytes.get(i) {
        None => ElementScan::NeedMore,
        Some(b'{') => match find_matching_delimiter(buffer, i) {
            Some(end) => ElementScan::Complete { start: i, end },
            None => ElementScan::NeedMore,
        },
        Some(&byte) => ElementScan::Halted { at: i, byte },
    }
}

/// Resume point for incremental extraction.
///
/// `cursor` is an absolute byte offset into the session buffer; everything
/// before it has been turned into records (or skipped).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractCheckpoint {
    /// Offset where the next element scan begins.
    pub cursor: usize,
    /// Records emitted so far. Also the index of the next record.
    pub emitted: usize,
    /// Balanced elements that failed to parse and were dropped.
    pub skipped: usize,
}

impl ExtractCheckpoint {
    /// Checkpoint positioned at `cursor` with nothing emitted.
    #[inline]
    pub const fn at(cursor: usize) -> Self {
        Self {
            cursor,
            emitted: 0,
            skipped: 0,
        }
    }
}

/// A parsed element and its position in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<T> {
    /// 0-based emission index. Skipped elements do not consume one.
    pub index: usize,
    /// The parsed value.
    pub value: T,
}

/// Output of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<T> {
    /// Records completed during this pass, in source order.
    pub records: Vec<Record<T>>,
    /// Elements dropped during this pass because they failed to parse.
    pub skipped: usize,
    /// Where the next pass resumes.
    pub checkpoint: ExtractCheckpoint,
}

impl<T> Extraction<T> {
    fn empty(checkpoint: ExtractCheckpoint) -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            checkpoint,
        }
    }

    /// Returns true if this pass produced no records and skipped nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.skipped == 0
    }
}

/// Extract every element that is complete in `buffer` after `checkpoint`.
///
/// `parse_fn` receives the exact text of each balanced object. Elements it
/// rejects are skipped: the cursor moves past them and they consume no
/// index, so one malformed element never blocks the ones after it.
pub fn extract_records<T, E, F>(
    buffer: &str,
    checkpoint: &ExtractCheckpoint,
    mut parse_fn: F,
) -> Extraction<T>
where
    F: FnMut(&str) -> Result<T, E>,
{
    let mut extraction = Extraction::empty(*checkpoint);

    while let ElementScan::Complete { start, end } =
        next_element(buffer, extraction.checkpoint.cursor)
    {
        let cp = &mut extraction.checkpoint;
        match parse_fn(&buffer[start..=end]) {
            Ok(value) => {
                extraction.records.push(Record {
                    index: cp.emitted,
                    value,
                });
                cp.emitted += 1;
            }
            Err(_) => {
                extraction.skipped += 1;
                cp.skipped += 1;
            }
        }
        cp.cursor = end + 1;
    }

    extraction
}

/// Extract all records from a complete (or partial) document in one pass.
///
/// Equivalent to feeding `text` to a fresh [`RecordExtractor`] as a single
/// delta. Used to replay a buffer from offset 0.
pub fn extract_all<T, E, F>(text: &str, config: &ExtractConfig, parse_fn: F) -> Extraction<T>
where
    F: FnMut(&str) -> Result<T, E>,
{
    match locate_array(text, &config.key_marker()) {
        Some(body_start) => extract_records(text, &ExtractCheckpoint::at(body_start), parse_fn),
        None => Extraction::empty(ExtractCheckpoint::default()),
    }
}

/// Per-session extraction state: the buffer, the anchor and the checkpoint.
///
/// The buffer is append-only. The checkpoint cursor indexes it by absolute
/// offset and never moves backwards.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    buffer: String,
    key_marker: String,
    max_buffer_len: usize,
    anchor: AnchorState,
    checkpoint: ExtractCheckpoint,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordExtractor {
    /// Create an extractor with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&ExtractConfig::DEFAULT)
    }

    /// Create an extractor for the given configuration.
    pub fn with_config(config: &ExtractConfig) -> Self {
        Self::with_capacity(config, 0)
    }

    /// Create an extractor with a pre-allocated buffer.
    pub fn with_capacity(config: &ExtractConfig, capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
            key_marker: config.key_marker(),
            max_buffer_len: config.max_buffer_len,
            anchor: AnchorState::Searching,
            checkpoint: ExtractCheckpoint::default(),
        }
    }

    /// Append a delta to the buffer without extracting.
    ///
    /// Fails without modifying the buffer if the delta would exceed the
    /// configured limit.
    pub fn push(&mut self, delta: &str) -> Result<(), Error> {
        let len = self.buffer.len().saturating_add(delta.len());
        if len > self.max_buffer_len {
            return Err(Error::BufferLimitExceeded {
                len,
                limit: self.max_buffer_len,
            });
        }
        self.buffer.push_str(delta);
        Ok(())
    }

    /// Extract whatever has become complete since the last call.
    ///
    /// Runs the anchor locator until it succeeds; no elements are extracted
    /// before that.
    pub fn extract<T, E, F>(&mut self, parse_fn: F) -> Extraction<T>
    where
        F: FnMut(&str) -> Result<T, E>,
    {
        if let AnchorState::Searching = self.anchor {
            match locate_array(&self.buffer, &self.key_marker) {
                Some(body_start) => {
                    self.anchor = AnchorState::Found { body_start };
                    self.checkpoint.cursor = body_start;
                }
                None => return Extraction::empty(self.checkpoint),
            }
        }

        let extraction = extract_records(&self.buffer, &self.checkpoint, parse_fn);
        self.checkpoint = extraction.checkpoint;
        extraction
    }

    /// Append a delta and extract newly completed records.
    pub fn feed<T, E, F>(&mut self, delta: &str, parse_fn: F) -> Result<Extraction<T>, Error>
    where
        F: FnMut(&str) -> Result<T, E>,
    {
        self.push(delta)?;
        Ok(self.extract(parse_fn))
    }

    /// Append a delta and push newly completed records into `out`.
    ///
    /// Returns the number of records added.
    pub fn feed_into<T, E, F>(
        &mut self,
        delta: &str,
        out: &mut Vec<Record<T>>,
        parse_fn: F,
    ) -> Result<usize, Error>
    where
        F: FnMut(&str) -> Result<T, E>,
    {
        let extraction = self.feed(delta, parse_fn)?;
        let count = extraction.records.len();
        out.extend(extraction.records);
        Ok(count)
    }

    /// Current resume point.
    #[inline]
    pub fn checkpoint(&self) -> ExtractCheckpoint {
        self.checkpoint
    }

    /// Whether the record array has been located.
    #[inline]
    pub fn anchor(&self) -> AnchorState {
        self.anchor
    }

    /// Bytes buffered so far.
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the next significant byte after the cursor closes the array.
    pub fn is_array_closed(&self) -> bool {
        self.anchor.is_found()
            && matches!(
                next_element(&self.buffer, self.checkpoint.cursor),
                ElementScan::Halted { byte: b']', .. }
            )
    }
}
