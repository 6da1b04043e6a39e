//! Percent-encoding of path letters at one, two, and three levels.
//!
//! Proxies that decode once disagree with origins that decode twice. Every
//! ASCII letter gets the single encoding; the double and triple encodings
//! concentrate on the positions where routing rules actually anchor: the
//! last character, the first character after the leading slash, and the
//! last path segment. Each depth reports under its own module name.

use std::collections::BTreeSet;

use gatecrash_payload::RequestDescriptor;

use crate::{
    context::{DedupKey, Emitter, GenerationContext},
    pathutil,
};

const NAME_SINGLE: &str = "char_encode";
const NAME_DOUBLE: &str = "char_encode_double";
const NAME_TRIPLE: &str = "char_encode_triple";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::RawUri);
    let path = ctx.target.path_or_root();

    let letters: Vec<(usize, char)> =
        path.char_indices().filter(|&(_, c)| c.is_ascii_alphabetic()).collect();

    for &(i, c) in &letters {
        ctx.emit_path(&mut emitter, NAME_SINGLE, &encode_at(path, i, c, "%"));
    }

    let focus = focus_positions(path);
    for &(i, c) in letters.iter().filter(|(i, _)| focus.contains(i)) {
        ctx.emit_path(&mut emitter, NAME_DOUBLE, &encode_at(path, i, c, "%25"));
        ctx.emit_path(&mut emitter, NAME_TRIPLE, &encode_at(path, i, c, "%2525"));
    }

    emitter.finish()
}

/// Replace the char at byte offset `i` with `prefix` + its hex code.
fn encode_at(path: &str, i: usize, c: char, prefix: &str) -> String {
    pathutil::replace_at(path, i, &format!("{prefix}{:02X}", c as u32))
}

/// Byte offsets of the positions the deeper encodings target.
fn focus_positions(path: &str) -> BTreeSet<usize> {
    let mut focus = BTreeSet::new();
    if let Some(last) = path.chars().last() {
        focus.insert(path.len() - last.len_utf8());
    }
    if path.starts_with('/') && path.len() > 1 {
        focus.insert(1);
    }
    if let Some(start) = pathutil::last_segment_start(path) {
        for (i, _) in path[start..].char_indices() {
            focus.insert(start + i);
        }
    }
    focus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testutil;

    #[test]
    fn single_letter_path_encodes_once_per_depth() {
        let out = generate(&testutil::ctx("https://h/a"));
        let singles: Vec<_> = out.iter().filter(|d| d.raw_uri == "/%61").collect();
        assert_eq!(singles.len(), 1);
        assert_eq!(singles[0].module, NAME_SINGLE);

        assert!(out.iter().any(|d| d.raw_uri == "/%2561" && d.module == NAME_DOUBLE));
        assert!(out.iter().any(|d| d.raw_uri == "/%252561" && d.module == NAME_TRIPLE));
    }

    #[test]
    fn every_letter_gets_a_single_encoding() {
        let out = generate(&testutil::ctx("https://h/ab/cd"));
        let uris = testutil::uris(&out);
        for expected in ["/%61b/cd", "/a%62/cd", "/ab/%63d", "/ab/c%64"] {
            assert!(uris.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn deep_encodings_stick_to_focus_positions() {
        let out = generate(&testutil::ctx("https://h/ab/cd"));
        let doubles: Vec<_> = out.iter().filter(|d| d.module == NAME_DOUBLE).collect();
        // focus: first char after the leading slash, and the last segment
        let uris: Vec<&str> = doubles.iter().map(|d| d.raw_uri.as_str()).collect();
        assert!(uris.contains(&"/%2561b/cd"));
        assert!(uris.contains(&"/ab/%2563d"));
        assert!(uris.contains(&"/ab/c%2564"));
        // 'b' is neither a focus position nor last
        assert!(!uris.contains(&"/a%2562/cd"));
    }

    #[test]
    fn query_is_preserved() {
        let out = generate(&testutil::ctx("https://h/a?x=1"));
        assert!(out.iter().all(|d| d.raw_uri.ends_with("?x=1")));
    }
}
