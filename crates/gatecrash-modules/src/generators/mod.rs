//! The generator implementations, one file per strategy.

pub(crate) mod case_substitution;
pub(crate) mod char_encode;
pub(crate) mod dumb_check;
pub(crate) mod end_paths;
pub(crate) mod headers_ip;
pub(crate) mod headers_port;
pub(crate) mod headers_scheme;
pub(crate) mod headers_url;
pub(crate) mod http_host;
pub(crate) mod http_methods;
pub(crate) mod mid_paths;
pub(crate) mod nginx_bypasses;
pub(crate) mod path_prefix;
pub(crate) mod unicode_norm;
