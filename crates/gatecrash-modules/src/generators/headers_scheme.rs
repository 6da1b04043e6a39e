//! Scheme-carrying spoof headers.
//!
//! Front-ends that terminate TLS often tell the origin about it through one
//! of these headers; origins that trust them will skip scheme-based access
//! rules. Three flag-style headers only ever carry `on`, and `Forwarded`
//! uses its RFC 7239 `proto=` form.

use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "http_headers_scheme";

/// Flag headers: the value list is ignored, only `on` makes sense.
const FLAG_HEADERS: &[&str] = &["Front-End-Https", "X-Forwarded-HTTPS", "X-Forwarded-SSL"];

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::Wire);

    for name in ctx.wordlists.header_proto_schemes() {
        if FLAG_HEADERS.iter().any(|flag| flag.eq_ignore_ascii_case(name)) {
            let mut descriptor = ctx.template(NAME);
            descriptor.push_header(name.clone(), "on");
            emitter.push(descriptor);
            continue;
        }
        for value in ctx.wordlists.proto_schemes() {
            let mut descriptor = ctx.template(NAME);
            if name.eq_ignore_ascii_case("Forwarded") {
                descriptor.push_header(name.clone(), format!("proto={value}"));
            } else {
                descriptor.push_header(name.clone(), value.clone());
            }
            emitter.push(descriptor);
        }
    }

    emitter.finish()
}
