//! IP-carrying spoof headers.
//!
//! The classic family: convince the origin the request came from inside.
//! User-supplied spoof headers and IPs merge into the embedded lists; a
//! user header is tried both exactly as given and in canonical casing,
//! since some origins match case-sensitively. `Forwarded` expands into its
//! three RFC 7239 placements per IP.

use gatecrash_payload::RequestDescriptor;

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "http_headers_ip";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let mut emitter = Emitter::new(DedupKey::Wire);

    let mut names: Vec<String> = ctx.wordlists.header_ip_hosts().to_vec();
    for header in &ctx.spoof_headers {
        names.push(header.clone());
        let canonical = canonical_case(header);
        if canonical != *header {
            names.push(canonical);
        }
    }

    let mut ips: Vec<String> = ctx.wordlists.ip_hosts().to_vec();
    ips.extend(ctx.spoof_ips.iter().cloned());

    for name in &names {
        for ip in &ips {
            if name.eq_ignore_ascii_case("Forwarded") {
                for value in [format!("by={ip}"), format!("for={ip}"), format!("host={ip}")] {
                    let mut descriptor = ctx.template(NAME);
                    descriptor.push_header(name.clone(), value);
                    emitter.push(descriptor);
                }
            } else {
                let mut descriptor = ctx.template(NAME);
                descriptor.push_header(name.clone(), ip.clone());
                emitter.push(descriptor);
            }
        }
    }

    let mut trusted = ctx.template(NAME);
    trusted.push_header("X-AppEngine-Trusted-IP-Request", "1");
    emitter.push(trusted);

    emitter.finish()
}

/// `x-my-header` → `X-My-Header`.
fn canonical_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testutil;

    #[test]
    fn every_header_gets_every_ip() {
        let out = generate(&testutil::ctx("https://h/p"));
        assert!(out.iter().any(|d| d.header("X-Forwarded-For") == Some("127.0.0.1")));
        assert!(out.iter().any(|d| d.header("X-Real-IP") == Some("169.254.169.254")));
        testutil::assert_wire_distinct(&out);
    }

    #[test]
    fn forwarded_expands_to_three_placements() {
        let out = generate(&testutil::ctx("https://h/p"));
        for value in ["by=127.0.0.1", "for=127.0.0.1", "host=127.0.0.1"] {
            assert!(
                out.iter().any(|d| d.header("Forwarded") == Some(value)),
                "missing {value}"
            );
        }
    }

    #[test]
    fn appengine_probe_is_always_present() {
        let out = generate(&testutil::ctx("https://h/p"));
        assert!(out.iter().any(|d| d.header("X-AppEngine-Trusted-IP-Request") == Some("1")));
    }

    #[test]
    fn user_spoof_values_are_merged_in_both_casings() {
        let mut ctx = testutil::ctx("https://h/p");
        ctx.spoof_headers.push("x-secret-gateway".to_owned());
        ctx.spoof_ips.push("198.51.100.7".to_owned());
        let out = generate(&ctx);

        assert!(out.iter().any(|d| d.header("x-secret-gateway") == Some("198.51.100.7")));
        assert!(out
            .iter()
            .any(|d| d.headers.iter().any(|(n, _)| n == "X-Secret-Gateway")));
        // embedded headers also get the user IP
        assert!(out.iter().any(|d| d.header("X-Forwarded-For") == Some("198.51.100.7")));
    }

    #[test]
    fn canonical_casing() {
        assert_eq!(canonical_case("x-my-header"), "X-My-Header");
        assert_eq!(canonical_case("X-ALREADY-UP"), "X-Already-Up");
    }
}
