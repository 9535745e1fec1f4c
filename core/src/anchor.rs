//! Locating the record array inside a growing document.

/// Whether the record array has been found yet.
///
/// Moves from `Searching` to `Found` once per session and never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnchorState {
    /// The key marker and its `[` have not both arrived yet.
    #[default]
    Searching,
    /// Element scanning starts at `body_start`, one past the `[`.
    Found {
        /// Offset of the first byte of the array body.
        body_start: usize,
    },
}

impl AnchorState {
    /// Returns true once the array start has been located.
    #[inline]
    pub const fn is_found(&self) -> bool {
        matches!(self, AnchorState::Found { .. })
    }
}

/// Find the start of the array that follows `key_marker`.
///
/// Searches for the first occurrence of `key_marker` (normally a quoted
/// field name such as `"schedule"`) and then for the first `[` after it.
/// Returns the offset one past that `[`, or `None` if either has not
/// arrived yet.
///
/// ```
/// use dayfeed_core::anchor::locate_array;
///
/// let text = r#"Sure! {"schedule": [{"date":"#;
/// assert_eq!(locate_array(text, "\"schedule\""), Some(20));
/// assert_eq!(locate_array(r#"{"schedule""#, "\"schedule\""), None);
/// ```
pub fn locate_array(text: &str, key_marker: &str) -> Option<usize> {
    let key_at = text.find(key_marker)?;
    let after_key = key_at + key_marker.len();
    let bracket = text[after_key..].find('[')?;
    Some(after_key + bracket + 1)
}
