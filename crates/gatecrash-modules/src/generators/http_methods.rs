//! Alternative HTTP method tokens.
//!
//! Every method in the wordlist is tried against the original path+query.
//! Methods that imply a body get an explicit `Content-Length: 0` so strict
//! origins don't hang waiting for one. `POST` additionally gets a variant
//! with the query moved into a form-encoded body, the classic
//! parameter-relocation probe.

use bytes::Bytes;
use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "http_methods";

/// Methods that origin servers expect to carry a body.
const BODY_IMPLYING: &[&str] =
    &["POST", "PUT", "PATCH", "PROPFIND", "PROPPATCH", "MKCOL", "LOCK", "UNLOCK", "DELETE"];

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::Wire);

    for method in ctx.wordlists.http_methods() {
        let mut descriptor = ctx.template(NAME);
        descriptor.method = method.clone();
        if BODY_IMPLYING.contains(&method.as_str()) {
            descriptor.push_header("Content-Length", "0");
        }
        emitter.push(descriptor);

        if method == "POST" && !ctx.target.query.is_empty() {
            let body = ctx.target.query.trim_start_matches('?').to_owned();
            let mut descriptor = ctx.descriptor(NAME, ctx.target.path_or_root());
            descriptor.method = method.clone();
            descriptor.push_header("Content-Type", "application/x-www-form-urlencoded");
            descriptor.push_header("Content-Length", body.len().to_string());
            descriptor.body = Bytes::from(body);
            emitter.push(descriptor);
        }
    }

    emitter.finish()
}
