/// Default upper bound, in characters, for a single synthesis chunk.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 600;

/// Characters after which a chunk may be cut.
const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？', '.', '!', '?', '\n'];

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// While the remainder is longer than the limit, the last sentence terminator
/// inside the first `max_chars` characters closes the chunk (the terminator
/// stays with it). A window with no terminator is hard-cut at the limit.
///
/// Chunks are borrowed slices of `text`, so their concatenation is exactly
/// `text`. Limits are counted in `char`s, not bytes, which matters for CJK
/// input. A `max_chars` of zero is treated as one.
pub fn segment(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    // `nth(max_chars)` exists only while more than `max_chars` characters remain.
    while let Some((window_end, _)) = rest.char_indices().nth(max_chars) {
        let window = &rest[..window_end];
        let cut = window
            .char_indices()
            .rev()
            .find(|(_, ch)| SENTENCE_TERMINATORS.contains(ch))
            .map(|(idx, ch)| idx + ch.len_utf8())
            .unwrap_or(window_end);

        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}
