//! Extraction configuration and resource limits.
//!
//! [`ExtractConfig`] controls how a session finds the record array and how
//! much text it is willing to buffer. [`StreamConfig`] adds the sizing of the
//! async output channel on top of it.
//!
//! # Example
//!
//! ```
//! use dayfeed_core::config::ExtractConfig;
//!
//! // Records live under `"schedule"` by default.
//! let config = ExtractConfig::default();
//! assert_eq!(config.key_marker(), "\"schedule\"");
//!
//! // Look for a different wrapper field and cap the buffer at 1 MiB.
//! let config = ExtractConfig::new()
//!     .with_array_key("days")
//!     .with_max_buffer_len(1024 * 1024);
//! assert_eq!(config.key_marker(), "\"days\"");
//! ```

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;

/// Configuration for one extraction session.
///
/// # Default Values
///
/// | Setting | Default | Rationale |
/// |---------|---------|-----------|
/// | `array_key` | `schedule` | Wrapper field of the generated document |
/// | `max_buffer_len` | `usize::MAX` | Documents are small; no limit by default |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Name of the field whose array value holds the records.
    ///
    /// Stored unquoted; the locator searches for the quoted form so that a
    /// bare word in preamble prose does not anchor the scan.
    pub array_key: Cow<'static, str>,

    /// Maximum number of buffered bytes per session.
    ///
    /// A delta that would grow the buffer past this limit fails the session.
    pub max_buffer_len: usize,
}

impl Default for ExtractConfig {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ExtractConfig {
    /// Default configuration, usable in const contexts.
    pub const DEFAULT: Self = Self {
        array_key: Cow::Borrowed("schedule"),
        max_buffer_len: usize::MAX,
    };

    /// Creates a new configuration with default values.
    #[inline]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Sets the field name that introduces the record array.
    pub fn with_array_key(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.array_key = key.into();
        self
    }

    /// Sets the maximum buffered length in bytes.
    #[inline]
    pub const fn with_max_buffer_len(mut self, len: usize) -> Self {
        self.max_buffer_len = len;
        self
    }

    /// The literal searched for by the anchor locator: the key in quotes.
    pub fn key_marker(&self) -> String {
        format!("\"{}\"", self.array_key)
    }
}

/// Configuration for the async session driver.
///
/// # Presets
///
/// - [`StreamConfig::small()`]: a handful of records
/// - [`StreamConfig::medium()`]: default, a month of daily records
/// - [`StreamConfig::large()`]: long documents, generous output buffering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Capacity of the output event channel.
    ///
    /// The driver waits on this channel when the consumer is slow. Default: 64.
    pub event_buffer_size: usize,
    /// Initial buffer capacity in bytes. Default: 4096.
    pub buffer_capacity: usize,
    /// Extraction settings for each session.
    pub extract: ExtractConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::medium()
    }
}

impl StreamConfig {
    /// Configuration for short documents (<1KB).
    pub const fn small() -> Self {
        Self {
            event_buffer_size: 16,
            buffer_capacity: 1024,
            extract: ExtractConfig::DEFAULT,
        }
    }

    /// Configuration for typical documents (1KB-64KB).
    pub const fn medium() -> Self {
        Self {
            event_buffer_size: 64,
            buffer_capacity: 4096,
            extract: ExtractConfig::DEFAULT,
        }
    }

    /// Configuration for large documents (>64KB).
    pub const fn large() -> Self {
        Self {
            event_buffer_size: 512,
            buffer_capacity: 64 * 1024,
            extract: ExtractConfig::DEFAULT,
        }
    }

    /// Replaces the extraction settings.
    pub fn with_extract(mut self, extract: ExtractConfig) -> Self {
        self.extract = extract;
        self
    }
}
