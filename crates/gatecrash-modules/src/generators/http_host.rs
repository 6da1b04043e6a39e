//! Host-header vs. dialed-authority mismatches.
//!
//! Fed entirely by recon data: every (scheme, ip, port) the recon service
//! observed is paired with the original hostname in both directions: dial
//! the IP and claim the name, dial the name and claim the IP. CNAMEs get
//! the same treatment plus right-aligned label suffixes, which catch
//! wildcard vhost rules. Without a recon entry the module emits nothing.

use gatecrash_payload::{RequestDescriptor, Scheme};

use crate::context::{DedupKey, Emitter, GenerationContext};

const NAME: &str = "http_host";

pub(crate) fn generate(ctx: &GenerationContext) -> Vec<RequestDescriptor> {
    let Some(entry) = ctx.recon.lookup(&ctx.target.host) else {
        tracing::debug!(host = %ctx.target.host, "no recon entry, http_host has nothing to do");
        return Vec::new();
    };

    let mut emitter = Emitter::new(DedupKey::Wire);
    let original_authority = ctx.target.authority();
    let target_uri = ctx.target.request_target();

    for (services, is_v6) in [(&entry.ipv4_services, false), (&entry.ipv6_services, true)] {
        for (scheme_str, ips) in services {
            let Ok(scheme) = scheme_str.parse::<Scheme>() else {
                tracing::debug!(scheme = %scheme_str, "recon scheme not dialable, skipped");
                continue;
            };
            for (ip, ports) in ips {
                for &port in ports {
                    let authority = ip_authority(ip, port, scheme, is_v6);

                    // dial the IP, claim the original name
                    let mut by_ip = RequestDescriptor::get(
                        &ctx.original_url,
                        scheme,
                        &authority,
                        &target_uri,
                        NAME,
                    );
                    by_ip.push_header("Host", original_authority.clone());
                    emitter.push(by_ip);

                    // dial the original name, claim the IP
                    let mut by_name = ctx.template(NAME);
                    by_name.push_header("Host", authority.clone());
                    emitter.push(by_name);
                }
            }
        }
    }

    for cname in &entry.cnames {
        let mut claim_cname = ctx.template(NAME);
        claim_cname.push_header("Host", cname.clone());
        emitter.push(claim_cname);

        let mut dial_cname = RequestDescriptor::get(
            &ctx.original_url,
            ctx.target.scheme,
            cname,
            &target_uri,
            NAME,
        );
        dial_cname.push_header("Host", original_authority.clone());
        emitter.push(dial_cname);

        let mut both_cname = RequestDescriptor::get(
            &ctx.original_url,
            ctx.target.scheme,
            cname,
            &target_uri,
            NAME,
        );
        both_cname.push_header("Host", cname.clone());
        emitter.push(both_cname);

        // wildcard vhosts: every right-aligned suffix with at least two labels
        let labels: Vec<&str> = cname.split('.').collect();
        if labels.len() > 2 {
            for start in 1..labels.len() - 1 {
                let suffix = labels[start..].join(".");
                let mut claim_suffix = ctx.template(NAME);
                claim_suffix.push_header("Host", suffix);
                emitter.push(claim_suffix);
            }
        }
    }

    emitter.finish()
}

/// `ip[:port]` with brackets for IPv6 and default ports left implicit.
fn ip_authority(ip: &str, port: u16, scheme: Scheme, is_v6: bool) -> String {
    let literal = if is_v6 { format!("[{ip}]") } else { ip.to_owned() };
    if port == scheme.default_port() { literal } else { format!("{literal}:{port}") }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use gatecrash_assets::{ReconCache, ReconEntry, Wordlists};

    use super::*;
    use crate::{GenerationContext, RawUrl};

    fn recon_ctx(url: &str, entry: ReconEntry) -> GenerationContext {
        let target = RawUrl::parse(url).unwrap();
        let mut entries = HashMap::new();
        entries.insert(target.host.clone(), entry);
        GenerationContext::new(
            target,
            url,
            Arc::new(Wordlists::embedded()),
            Arc::new(ReconCache::from_entries(entries)),
        )
    }

    fn v4_entry(scheme: &str, ip: &str, ports: &[u16]) -> ReconEntry {
        let mut entry = ReconEntry::default();
        entry
            .ipv4_services
            .entry(scheme.to_owned())
            .or_default()
            .insert(ip.to_owned(), ports.to_vec());
        entry
    }

    #[test]
    fn pairs_ip_and_hostname_in_both_directions() {
        let ctx = recon_ctx("https://example.com/p", v4_entry("https", "1.2.3.4", &[443]));
        let out = generate(&ctx);

        let by_ip = out.iter().find(|d| d.host == "1.2.3.4").unwrap();
        assert_eq!(by_ip.scheme, Scheme::Https);
        assert_eq!(by_ip.header("Host"), Some("example.com"));
        assert_eq!(by_ip.raw_uri, "/p");

        let by_name = out.iter().find(|d| d.host == "example.com").unwrap();
        assert_eq!(by_name.header("Host"), Some("1.2.3.4"));
    }

    #[test]
    fn nondefault_ports_are_explicit() {
        let ctx = recon_ctx("https://example.com/p", v4_entry("https", "1.2.3.4", &[8443]));
        let out = generate(&ctx);
        assert!(out.iter().any(|d| d.host == "1.2.3.4:8443"));
        assert!(out.iter().any(|d| d.header("Host") == Some("1.2.3.4:8443")));
    }

    #[test]
    fn ipv6_literals_are_bracketed() {
        let mut entry = ReconEntry::default();
        entry
            .ipv6_services
            .entry("http".to_owned())
            .or_default()
            .insert("::1".to_owned(), vec![8080]);
        let ctx = recon_ctx("http://example.com/p", entry);
        let out = generate(&ctx);
        assert!(out.iter().any(|d| d.host == "[::1]:8080"));
    }

    #[test]
    fn cnames_get_three_pairings_and_suffixes() {
        let mut entry = ReconEntry::default();
        entry.cnames.push("edge.cdn.example.net".to_owned());
        let ctx = recon_ctx("https://example.com/p", entry);
        let out = generate(&ctx);

        assert!(out
            .iter()
            .any(|d| d.host == "example.com" && d.header("Host") == Some("edge.cdn.example.net")));
        assert!(out
            .iter()
            .any(|d| d.host == "edge.cdn.example.net" && d.header("Host") == Some("example.com")));
        assert!(out.iter().any(
            |d| d.host == "edge.cdn.example.net" && d.header("Host") == Some("edge.cdn.example.net")
        ));
        // right-aligned suffixes of a 4-label CNAME
        for suffix in ["cdn.example.net", "example.net"] {
            assert!(
                out.iter().any(|d| d.host == "example.com" && d.header("Host") == Some(suffix)),
                "missing suffix {suffix}"
            );
        }
    }

    #[test]
    fn no_recon_entry_means_no_output() {
        let ctx = GenerationContext::new(
            RawUrl::parse("https://unknown.example/p").unwrap(),
            "https://unknown.example/p",
            Arc::new(Wordlists::embedded()),
            Arc::new(ReconCache::empty()),
        );
        assert!(generate(&ctx).is_empty());
    }
}
