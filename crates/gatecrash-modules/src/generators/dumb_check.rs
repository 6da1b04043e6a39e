//! Baseline probe: the original URL, untouched.
//!
//! Establishes the reference status code the other modules are trying to
//! move away from.

use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "dumb_check";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::RawUri);
    emitter.push(ctx.template(NAME));
    emitter.finish()
}
