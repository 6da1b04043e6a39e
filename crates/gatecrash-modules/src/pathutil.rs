//! Byte-position helpers over raw paths.
//!
//! Paths are treated as opaque character sequences; the only structure the
//! generators rely on is the position of `/` separators. All indices are
//! byte offsets that fall on char boundaries (`/` and segment edges are
//! ASCII; mid-segment positions are computed with `char` lengths).

/// Byte ranges `(start, end)` of the non-empty segments between slashes.
pub(crate) fn segments(path: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, byte) in path.bytes().enumerate() {
        if byte == b'/' {
            if let Some(s) = start.take() {
                out.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, path.len()));
    }
    out
}

/// `path` with `insertion` spliced in at byte offset `i`.
pub(crate) fn insert_at(path: &str, i: usize, insertion: &str) -> String {
    let mut out = String::with_capacity(path.len() + insertion.len());
    out.push_str(&path[..i]);
    out.push_str(insertion);
    out.push_str(&path[i..]);
    out
}

/// `path` with the char at byte offset `i` replaced by `replacement`.
pub(crate) fn replace_at(path: &str, i: usize, replacement: &str) -> String {
    let char_len = path[i..].chars().next().map_or(0, char::len_utf8);
    let mut out = String::with_capacity(path.len() + replacement.len());
    out.push_str(&path[..i]);
    out.push_str(replacement);
    out.push_str(&path[i + char_len..]);
    out
}

/// Byte offset of the last segment's first char, `None` when the path ends
/// in a slash or has no slash-delimited tail.
pub(crate) fn last_segment_start(path: &str) -> Option<usize> {
    path.rfind('/').map(|i| i + 1).filter(|&s| s < path.len())
}
