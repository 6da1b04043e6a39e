//! Per-letter case flips in the path.
//!
//! Case-sensitive proxy rules in front of case-insensitive filesystems (and
//! the reverse) come apart under single-letter flips. The all-caps path and
//! an uppercased-method variant round the set out.

use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "case_substitution";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::Wire);
    let path = ctx.target.path_or_root();

    for (i, c) in path.char_indices().filter(|&(_, c)| c.is_ascii_alphabetic()) {
        let flipped = if c.is_ascii_uppercase() {
            c.to_ascii_lowercase()
        } else {
            c.to_ascii_uppercase()
        };
        let mut variant = String::with_capacity(path.len());
        variant.push_str(&path[..i]);
        variant.push(flipped);
        variant.push_str(&path[i + 1..]);
        ctx.emit_path(&mut emitter, NAME, &variant);
    }

    let upper = path.to_ascii_uppercase();
    if upper != path {
        ctx.emit_path(&mut emitter, NAME, &upper);
    }

    let mut method_variant = ctx.template(NAME);
    method_variant.method = method_variant.method.to_ascii_uppercase();
    emitter.push(method_variant);

    emitter.finish()
}
