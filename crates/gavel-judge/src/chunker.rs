use serde::{Deserialize, Serialize};

use crate::sizing::floor_char_boundary;

/// Marker prepended to overflow absorbed into the final chunk when the
/// chunk limit is reached before the text runs out.
pub const CONTINUED_MARKER: &str = "[CONTINUED...]";

/// A bounded, boundary-aware slice of oversized content.
///
/// Chunks of the same source are ordered and overlap by a fixed window so
/// context spanning a cut survives in the next chunk. Offsets are byte
/// positions into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChunk {
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Split text into overlapping chunks at semantic boundaries.
///
/// Each window holds at most `max_chars` bytes (cuts snapped to character
/// boundaries) and tries to end at the last paragraph break, failing that
/// the last sentence end, failing that the last word boundary, within the
/// back half of the window. Adjacent chunks share `overlap` bytes. When
/// `max_chunks` windows are exhausted with text remaining, the remainder is
/// appended verbatim to the final chunk behind a [`CONTINUED_MARKER`] —
/// content is never discarded, only redistributed.
pub fn split(text: &str, max_chars: usize, max_chunks: usize, overlap: usize) -> Vec<ContentChunk> {
    let max_chars = max_chars.max(1);
    let max_chunks = max_chunks.max(1);

    if text.len() <= max_chars {
        return vec![ContentChunk {
            index: 0,
            total: 1,
            text: text.to_string(),
            start_offset: 0,
            end_offset: text.len(),
        }];
    }

    // Overlap beyond half a window would stall the sweep.
    let overlap = overlap.min(max_chars / 2);

    let mut pieces: Vec<(String, usize, usize)> = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = floor_char_boundary(text, (start + max_chars).min(text.len()));
        let mut end = hard_end;

        if end < text.len() {
            end = find_break(text, start, end);
            // A remainder smaller than the overlap window is absorbed into
            // this chunk instead of becoming a degenerate tail.
            if text.len() - end <= overlap {
                end = text.len();
            }
        }

        if end < text.len() && pieces.len() + 1 == max_chunks {
            let mut body = text[start..end].to_string();
            body.push_str("\n\n");
            body.push_str(CONTINUED_MARKER);
            body.push('\n');
            body.push_str(&text[end..]);
            pieces.push((body, start, text.len()));
            break;
        }

        pieces.push((text[start..end].to_string(), start, end));

        if end >= text.len() {
            break;
        }

        let next = floor_char_boundary(text, end.saturating_sub(overlap));
        start = if next > start { next } else { end };
    }

    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, (text, start_offset, end_offset))| ContentChunk {
            index,
            total,
            text,
            start_offset,
            end_offset,
        })
        .collect()
}

/// Find the best cut point in `(midpoint, hard_end]` of the current window.
///
/// Preference order: paragraph break, sentence-terminating punctuation
/// followed by whitespace, whitespace. A break in the front half of the
/// window is rejected to avoid degenerate tiny chunks.
fn find_break(text: &str, start: usize, hard_end: usize) -> usize {
    let window = &text[start..hard_end];
    let midpoint = window.len() / 2;

    if let Some(pos) = window.rfind("\n\n") {
        let cut = pos + 2;
        if cut > midpoint {
            return start + cut;
        }
    }

    let mut sentence_cut = None;
    let mut word_cut = None;
    let mut chars = window.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let cut = i + c.len_utf8();
        if cut <= midpoint {
            continue;
        }
        if c.is_whitespace() {
            word_cut = Some(cut);
        }
        if matches!(c, '.' | '!' | '?') {
            let followed_by_space = chars.peek().map(|(_, n)| n.is_whitespace()).unwrap_or(false);
            if followed_by_space {
                sentence_cut = Some(cut);
            }
        }
    }

    if let Some(cut) = sentence_cut.or(word_cut) {
        return start + cut;
    }

    hard_end
}
