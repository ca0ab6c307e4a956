//! Path and host normalization helpers shared by templates and requests.

use std::net::IpAddr;

/// Split a path into its non-empty `/`-delimited segments.
///
/// `/a/b/`, `a/b` and `//a//b` all normalize to `["a", "b"]`; the query
/// string, if any, is ignored.
pub fn split_segments(path: &str) -> Vec<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Compare two strings under an entry's case rule.
pub fn eq_with_case(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Find `needle` in `haystack` under an entry's case rule.
///
/// ASCII folding keeps byte offsets stable, so the returned index is valid
/// for the original `haystack`.
pub fn find_with_case(haystack: &str, needle: &str, case_sensitive: bool) -> Option<usize> {
    if case_sensitive {
        haystack.find(needle)
    } else {
        haystack
            .to_ascii_lowercase()
            .find(&needle.to_ascii_lowercase())
    }
}

/// Strip `prefix` from `s` under an entry's case rule.
pub fn strip_prefix_with_case<'a>(s: &'a str, prefix: &str, case_sensitive: bool) -> Option<&'a str> {
    if s.len() < prefix.len() || !s.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = s.split_at(prefix.len());
    eq_with_case(head, prefix, case_sensitive).then_some(tail)
}

/// Strip `suffix` from `s` under an entry's case rule.
pub fn strip_suffix_with_case<'a>(s: &'a str, suffix: &str, case_sensitive: bool) -> Option<&'a str> {
    if s.len() < suffix.len() {
        return None;
    }
    let split = s.len() - suffix.len();
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    eq_with_case(tail, suffix, case_sensitive).then_some(head)
}

/// Derive the subdomain from a `Host` header value.
///
/// The port is dropped, IP literals never carry a subdomain, and the last
/// `offset` labels are treated as the registered domain. Whatever remains
/// on the left is the subdomain (`a.b.example.com` with offset 2 → `a.b`).
pub fn subdomain_from_host(host: &str, offset: usize) -> Option<String> {
    let host = strip_port(host.trim());
    if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        return None;
    }

    let host = host.trim_end_matches('.');
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= offset {
        return None;
    }
    Some(labels[..labels.len() - offset].join("."))
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal, with or without a port.
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or_default();
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
