//! Fuzzing support: arbitrary ways of fragmenting a document.

use alloc::vec::Vec;

/// A fragmentation of some text into consecutive chunks.
///
/// Each entry of `cuts` is turned into a chunk length of `1..=16` bytes,
/// widened to the next `char` boundary. Text left over when the cuts run
/// out becomes one final chunk.
#[derive(Debug, Clone, Default, arbitrary::Arbitrary)]
pub struct SplitPlan {
    pub cuts: Vec<u8>,
}

impl SplitPlan {
    /// Split `text` according to the plan. Concatenating the result yields
    /// `text` again.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut chunks = Vec::with_capacity(self.cuts.len() + 1);
        let mut at = 0;

        for cut in &self.cuts {
            if at >= text.len() {
                break;
            }
            let mut end = (at + usize::from(cut % 16) + 1).min(text.len());
            while !text.is_char_boundary(end) {
                end += 1;
            }
            chunks.push(&text[at..end]);
            at = end;
        }

        if at < text.len() {
            chunks.push(&text[at..]);
        }
        chunks
    }
}
