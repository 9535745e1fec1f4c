//! Delimiter matching over partially received JSON text.
//!
//! [`find_matching_delimiter`] answers one question: given an offset that
//! points at `{` or `[`, where is the delimiter that closes it? The answer is
//! either a byte offset or `None` when the text ends first, which is the
//! normal outcome while a stream is still growing.
//!
//! Only balance is tracked, not bracket kind. `{]` counts as balanced; the
//! text is expected to be well-formed JSON once complete, and anything that
//! balances but does not parse is rejected later by the record parser.
//!
//! All delimiters are ASCII, so the scan walks bytes. Multi-byte UTF-8
//! sequences never contain ASCII bytes, which keeps every returned offset on
//! a `char` boundary.

/// Scanner state carried between bytes.
///
/// Exposed so callers can drive the same state machine byte by byte (the
/// fuzz targets and the balance property tests do).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Nesting depth. The opening delimiter brings this to 1.
    pub depth: usize,
    /// Inside a string literal.
    pub in_string: bool,
    /// The previous byte was a backslash inside a string.
    pub escape_next: bool,
}

impl ScanState {
    /// Fresh state, before the opening delimiter has been consumed.
    #[inline]
    pub const fn new() -> Self {
        Self {
            depth: 0,
            in_string: false,
            escape_next: false,
        }
    }

    /// Advance over one byte.
    ///
    /// Returns `true` when this byte closes the outermost delimiter.
    #[inline]
    pub fn step(&mut self, byte: u8) -> bool {
        if self.escape_next {
            self.escape_next = false;
            return false;
        }

        match byte {
            b'\\' if self.in_string => self.escape_next = true,
            b'"' => self.in_string = !self.in_string,
            _ if self.in_string => {}
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                // A closer seen before any opener is not ours to match.
                if self.depth == 0 {
                    return false;
                }
                self.depth -= 1;
                return self.depth == 0;
            }
            _ => {}
        }

        false
    }
}

/// Returns `true` if `byte` opens a nested structure.
#[inline]
pub const fn is_opener(byte: u8) -> bool {
    matches!(byte, b'{' | b'[')
}

/// Find the delimiter that closes the one at `start`.
///
/// Returns the inclusive byte offset of the closing `}` or `]`, or `None` if
/// `text` ends before depth returns to zero. `None` is also returned when
/// `start` is out of bounds or does not point at `{` or `[`.
///
/// # Example
///
/// ```
/// use dayfeed_core::scan::find_matching_delimiter;
///
/// let text = r#"{"k":"a } b"}"#;
/// assert_eq!(find_matching_delimiter(text, 0), Some(text.len() - 1));
/// assert_eq!(find_matching_delimiter(r#"{"k":"#, 0), None);
/// ```
pub fn find_matching_delimiter(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if !bytes.get(start).copied().is_some_and(is_opener) {
        return None;
    }

    let mut state = ScanState::new();
    for (offset, &byte) in bytes.iter().enumerate().skip(start) {
        if state.step(byte) {
            return Some(offset);
        }
    }

    None
}
