//! Wordlist fragments appended after the path.
//!
//! Every fragment is tried behind a separator slash, with and without a
//! trailing slash. Fragments that do not start with a letter are also glued
//! straight onto the path (`/api` + `.json` → `/api.json`), which only makes
//! sense off the root.

use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "end_paths";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::RawUri);
    let path = ctx.target.path_or_root();
    let is_root = path == "/";
    let separator = if path.ends_with('/') { "" } else { "/" };

    for word in ctx.wordlists.end_paths() {
        ctx.emit_path(&mut emitter, NAME, &format!("{path}{separator}{word}"));
        ctx.emit_path(&mut emitter, NAME, &format!("{path}{separator}{word}/"));

        let starts_with_letter = word.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if !is_root && !starts_with_letter {
            ctx.emit_path(&mut emitter, NAME, &format!("{path}{word}"));
            ctx.emit_path(&mut emitter, NAME, &format!("{path}{word}/"));
        }
    }

    emitter.finish()
}
