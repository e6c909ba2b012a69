//! Pattern and URL decomposition.
//!
//! Patterns are loosely URL-shaped strings ("example.com/products", "//host",
//! "https://host/path?q=1"), so the strict WHATWG parser cannot be used here:
//! a host-first pattern with no scheme must still split into an authority and
//! a path. Parsing is permissive and never fails; unusual inputs degrade to a
//! best-effort decomposition that simply matches nothing downstream.

use std::borrow::Cow;
use std::net::IpAddr;
use std::num::NonZeroUsize;

use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::resolver::DomainResolver;

/// Capacity of the pattern-parse memoization cache. Patterns repeat across
/// rules and bucket re-sorts; URLs at match time are parsed uncached.
pub const PARSE_CACHE_SIZE: usize = 32;

/// Scheme prefix as defined in RFC 3986 section 3.1, followed by `//`.
static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9.+-]*:)?//")
        .expect("SCHEME_PREFIX: hardcoded regex is invalid")
});

/// Decomposed URL or pattern: scheme, netloc, path, query, fragment.
///
/// All components are owned strings; empty means absent. The scheme is
/// lower-cased and default ports are elided (see [`parse_url`]); the netloc
/// keeps its original case, comparison happens case-insensitively at match
/// time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

/// Rewrite a pattern so the host segment parses as authority.
///
/// A pattern without a scheme prefix is host-first ("example.com/path"), so
/// `//` is prepended to force authority parsing. A pattern that already
/// starts with `//` gets another `//` so the leading slashes are treated as
/// path content instead of a scheme-relative authority.
pub fn pattern_to_url(pattern: &str) -> Cow<'_, str> {
    if !SCHEME_PREFIX.is_match(pattern) {
        Cow::Owned(format!("//{pattern}"))
    } else if pattern.starts_with("//") {
        Cow::Owned(format!("////{}", &pattern[2..]))
    } else {
        Cow::Borrowed(pattern)
    }
}

/// Split a URL into [`UrlParts`] and normalize scheme and port.
///
/// The split is syntactic and total: a scheme is recognized as an RFC 3986
/// scheme name before `:`; a netloc only after `//` and up to the next `/`,
/// `?` or `#`; the fragment starts at the first `#` and the query at the
/// first `?` before it. Path parameters (`;params`) stay in the path.
pub fn parse_url(url: &str) -> UrlParts {
    let mut rest = url;
    let mut scheme = String::new();

    if let Some(colon) = rest.find(':') {
        if colon > 0 {
            let candidate = &rest[..colon];
            if candidate.as_bytes()[0].is_ascii_alphabetic()
                && candidate
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
            {
                scheme = candidate.to_ascii_lowercase();
                rest = &rest[colon + 1..];
            }
        }
    }

    let mut netloc = "";
    if let Some(after) = rest.strip_prefix("//") {
        let end = after
            .find(|c| matches!(c, '/' | '?' | '#'))
            .unwrap_or(after.len());
        netloc = &after[..end];
        rest = &after[end..];
    }

    let (rest, fragment) = match rest.split_once('#') {
        Some((before, frag)) => (before, frag),
        None => (rest, ""),
    };
    let (path, query) = match rest.split_once('?') {
        Some((before, q)) => (before, q),
        None => (rest, ""),
    };

    let (scheme, netloc) = normalize_netloc_and_scheme(scheme, netloc.to_string());

    UrlParts {
        scheme,
        netloc,
        path: path.to_string(),
        query: query.to_string(),
        fragment: fragment.to_string(),
    }
}

/// Drop port 80/443 when it agrees with (or implies) the scheme.
///
/// `("http", "host:80")` becomes `("http", "host")`; an empty scheme with
/// port 80 or 443 deduces http or https. Any other combination is left
/// untouched, including mismatches like `("http", "host:443")`.
fn normalize_netloc_and_scheme(scheme: String, netloc: String) -> (String, String) {
    let (domain, port) = split_domain_port(&netloc);
    if port == Some("80") && (scheme == "http" || scheme.is_empty()) {
        return ("http".to_string(), domain.to_string());
    }
    if port == Some("443") && (scheme == "https" || scheme.is_empty()) {
        return ("https".to_string(), domain.to_string());
    }
    (scheme, netloc)
}

/// Split a netloc into domain and port at the last colon.
pub fn split_domain_port(netloc: &str) -> (&str, Option<&str>) {
    match netloc.rsplit_once(':') {
        Some((domain, port)) => (domain, Some(port)),
        None => (netloc, None),
    }
}

/// Sort key that orders hosts from general to specific.
///
/// The host's dot-separated labels are reversed ("blog.example.com" becomes
/// "com.example.blog") so a parent domain sorts as a prefix of its
/// subdomains; IP addresses are kept verbatim. Path, query and fragment are
/// appended as-is.
pub fn hierarchical_key(parts: &UrlParts) -> String {
    let (host, _) = split_domain_port(&parts.netloc);
    let host_key = if host.parse::<IpAddr>().is_ok() {
        host.to_string()
    } else {
        host.rsplit('.').collect::<Vec<_>>().join(".")
    };
    format!("{host_key}{}{}{}", parts.path, parts.query, parts.fragment)
}

/// Registrable domain of a pattern, lower-cased.
///
/// `None` when the pattern has no netloc (path-only patterns and the empty
/// pattern). The netloc is handed to the resolver in authority position so
/// ports and userinfo are stripped consistently.
pub fn pattern_domain(
    pattern: &str,
    resolver: &dyn DomainResolver,
    cache: &ParseCache,
) -> Option<String> {
    let parts = cache.parse(pattern);
    if parts.netloc.is_empty() {
        return None;
    }
    Some(resolver.domain_of(&format!("//{}", parts.netloc)).to_ascii_lowercase())
}

/// Bounded memoization of pattern parses, keyed by the raw pattern string.
///
/// Exists for hot repeated lookups during registration and bucket sorting,
/// not for correctness: parsing is pure and idempotent.
pub struct ParseCache {
    inner: Mutex<LruCache<String, UrlParts>>,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(1).expect("1 is non-zero"));
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Parse a pattern string, consulting the cache first.
    pub fn parse(&self, pattern: &str) -> UrlParts {
        let mut cache = self.inner.lock();
        if let Some(parts) = cache.get(pattern) {
            return parts.clone();
        }
        let parts = parse_url(&pattern_to_url(pattern));
        cache.put(pattern.to_string(), parts.clone());
        parts
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(PARSE_CACHE_SIZE)
    }
}
