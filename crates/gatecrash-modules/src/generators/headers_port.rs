//! Port-carrying spoof headers.
//!
//! Origins that gate admin surfaces on "came in through the internal port"
//! often read it from a forwarded-port header rather than the socket.

use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "http_headers_port";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::Wire);

    for name in ctx.wordlists.header_ports() {
        for port in ctx.wordlists.ports() {
            let mut descriptor = ctx.template(NAME);
            descriptor.push_header(name.clone(), port.clone());
            emitter.push(descriptor);
        }
    }

    emitter.finish()
}
