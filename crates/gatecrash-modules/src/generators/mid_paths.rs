//! Wordlist fragments inserted around path separators.
//!
//! For every slash in the path and every mid-path fragment, the fragment
//! goes in after the slash and (away from the path start) before it, each
//! in a plain and a doubled-leading-slash form. Segment-centric variants
//! fuse the fragment onto segment starts and ends and splice it after the
//! first character of each segment. The set collapses the heavy overlap
//! between these families.

use gatecrash_payload::RequestDescriptor;

use crate::{
    context::{DedupKey, Emitter, GenerationContext},
    pathutil,
};

const NAME: &str = "mid_paths";

/// Slash positions this close to the path start skip the "before" form;
/// prefixing the very first slash is `path_prefix`'s territory.
const MIN_BEFORE_INDEX: usize = 2;

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::RawUri);
    let path = ctx.target.path_or_root();
    let words = ctx.wordlists.mid_paths();

    let slash_positions: Vec<usize> =
        path.char_indices().filter(|&(_, c)| c == '/').map(|(i, _)| i).collect();

    for &i in &slash_positions {
        for word in words {
            emit_with_doubled_slash(ctx, &mut emitter, &pathutil::insert_at(path, i + 1, word));
            if i >= MIN_BEFORE_INDEX {
                emit_with_doubled_slash(ctx, &mut emitter, &pathutil::insert_at(path, i, word));
            }
        }
    }

    for word in words {
        for &(start, end) in &pathutil::segments(path) {
            // fragment fused to the segment start and end
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start, word));
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, end, word));
            // and spliced in after the segment's first character
            let first_len = path[start..end].chars().next().map_or(0, char::len_utf8);
            if first_len > 0 && start + first_len < end {
                ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start + first_len, word));
            }
        }
    }

    emitter.finish()
}

fn emit_with_doubled_slash(ctx: &GenerationContext, emitter: &mut Emitter, path: &str) {
    ctx.emit_path(emitter, NAME, path);
    if let Some(rest) = path.strip_prefix('/') {
        ctx.emit_path(emitter, NAME, &format!("//{rest}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testutil;

    #[test]
    fn inserts_after_leading_slash() {
        let out = generate(&testutil::ctx("https://h/admin"));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/..;/admin"));
        assert!(uris.contains(&"//..;/admin"), "doubled leading slash form");
        testutil::assert_wire_distinct(&out);
    }

    #[test]
    fn inserts_before_inner_slashes_only() {
        let out = generate(&testutil::ctx("https://h/a/b"));
        let uris = testutil::uris(&out);
        // after the inner slash
        assert!(uris.contains(&"/a/..;/b"));
        // before the inner slash
        assert!(uris.contains(&"/a..;//b"));
        // never a fragment glued in front of the leading slash
        assert!(uris.iter().all(|u| u.starts_with('/')));
    }

    #[test]
    fn fuses_fragments_onto_segment_edges() {
        let out = generate(&testutil::ctx("https://h/admin"));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/admin..;/"), "suffix-fused");
        assert!(uris.contains(&"/a..;/dmin"), "after first char");
    }

    #[test]
    fn query_is_preserved() {
        let out = generate(&testutil::ctx("https://h/admin?x=1"));
        assert!(out.iter().all(|d| d.raw_uri.ends_with("?x=1")));
    }

    #[test]
    fn empty_path_is_treated_as_root() {
        let out = generate(&testutil::ctx("https://h"));
        let uris = testutil::uris(&out);
        assert!(uris.contains(&"/..;/"));
    }
}
