//! Unicode characters that normalize back to path characters.
//!
//! Origins that NFKC-fold incoming paths will collapse a fullwidth solidus
//! into `/` after the proxy has already matched its rules against the
//! unfolded bytes. Every `.` and `/` occurrence gets each known confusable
//! in raw and percent-encoded form, plus whole-path replacements, doubled
//! separators, and first/last-character swaps per segment.

use gatecrash_assets::unicode;
use gatecrash_payload::RequestDescriptor;

use crate::{
    context::{DedupKey, Emitter, GenerationContext},
    pathutil,
};

const NAME: &str = "unicode_path_normalization";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::RawUri);
    let path = ctx.target.path_or_root();

    let dot_variants = unicode::variants_for(b'.');
    let slash_variants = unicode::variants_for(b'/');

    // single-occurrence replacements
    for (i, c) in path.char_indices().filter(|&(_, c)| c == '.' || c == '/') {
        let variants = if c == '.' { dot_variants } else { slash_variants };
        for variant in variants {
            ctx.emit_path(&mut emitter, NAME, &pathutil::replace_at(path, i, &variant.raw));
            ctx.emit_path(&mut emitter, NAME, &pathutil::replace_at(path, i, &variant.percent));
        }
    }

    // all-at-once replacements
    for (target, variants) in [('.', dot_variants), ('/', slash_variants)] {
        if !path.contains(target) {
            continue;
        }
        for variant in variants {
            ctx.emit_path(&mut emitter, NAME, &path.replace(target, &variant.raw));
            ctx.emit_path(&mut emitter, NAME, &path.replace(target, &variant.percent));
        }
    }

    // plain double-slash insertion at each separator
    for (i, _) in path.char_indices().filter(|&(_, c)| c == '/') {
        ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, i + 1, "/"));
    }

    // a confusable slash squeezed in before the last segment
    if let Some(start) = pathutil::last_segment_start(path) {
        for variant in slash_variants {
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start, &variant.raw));
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, start, &variant.percent));
        }
    }

    // and after each real slash
    for (i, _) in path.char_indices().filter(|&(_, c)| c == '/') {
        for variant in slash_variants {
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, i + 1, &variant.raw));
            ctx.emit_path(&mut emitter, NAME, &pathutil::insert_at(path, i + 1, &variant.percent));
        }
    }

    // first and last character of each segment
    for &(start, end) in &pathutil::segments(path) {
        let segment = &path[start..end];
        if let Some(first) = segment.chars().next().filter(char::is_ascii) {
            for variant in unicode::variants_for(first as u8) {
                ctx.emit_path(&mut emitter, NAME, &pathutil::replace_at(path, start, &variant.raw));
                ctx.emit_path(
                    &mut emitter,
                    NAME,
                    &pathutil::replace_at(path, start, &variant.percent),
                );
            }
        }
        if let Some(last) = segment.chars().last().filter(char::is_ascii) {
            let last_start = end - last.len_utf8();
            if last_start > start {
                for variant in unicode::variants_for(last as u8) {
                    ctx.emit_path(
                        &mut emitter,
                        NAME,
                        &pathutil::replace_at(path, last_start, &variant.raw),
                    );
                    ctx.emit_path(
                        &mut emitter,
                        NAME,
                        &pathutil::replace_at(path, last_start, &variant.percent),
                    );
                }
            }
        }
    }

    emitter.finish()
}
