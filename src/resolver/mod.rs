//! Domain resolution module.
//!
//! The engine indexes rules by registrable domain ("blog.example.co.uk" is
//! indexed and looked up under "example.co.uk"), but public-suffix knowledge
//! is a collaborator concern: the engine only needs [`DomainResolver`].
//! Implementations here cover the common cases; embedders with their own
//! suffix data can plug in anything that satisfies the trait.

use std::collections::HashMap;
use std::net::IpAddr;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use publicsuffix::{List, Psl};

use crate::error::EngineError;
use crate::parser::{parse_url, split_domain_port};

/// Default capacity for resolver memoization caches.
///
/// Bounded so high-cardinality URL traffic cannot grow memory without limit.
pub const DOMAIN_CACHE_SIZE: usize = 128;

/// Registrable-domain lookup interface.
pub trait DomainResolver: Send + Sync {
    /// Return the registrable domain of a URL or bare host, lower-cased.
    ///
    /// Returns the empty string only when no domain can be determined
    /// (malformed or host-less input). Must be stable: repeated calls with
    /// the same input yield the same output.
    fn domain_of(&self, url_or_host: &str) -> String;
}

/// Extract the lower-cased host from a URL, authority string, or bare host.
fn host_of(url_or_host: &str) -> String {
    let parts = parse_url(url_or_host);
    let netloc = if parts.netloc.is_empty() {
        // Bare hosts ("example.com") parse as path; take the first segment.
        parts.path.split('/').next().unwrap_or("").to_string()
    } else {
        parts.netloc
    };
    let host = match netloc.rsplit_once('@') {
        Some((_, host)) => host.to_string(),
        None => netloc,
    };
    let host = if let Some(bracketed) = host.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or("").to_string()
    } else {
        split_domain_port(&host).0.to_string()
    };
    host.trim_matches('.').to_ascii_lowercase()
}

/// Resolver backed by a public suffix list.
///
/// The list text (the standard `publicsuffix.org` format) is supplied by the
/// caller; results are memoized in a bounded LRU cache.
pub struct PslResolver {
    list: List,
    cache: Mutex<LruCache<String, String>>,
}

impl PslResolver {
    /// Build a resolver from public suffix list text.
    pub fn from_list_str(text: &str) -> Result<Self, EngineError> {
        let list: List = text
            .parse()
            .map_err(|e: publicsuffix::Error| EngineError::SuffixList(e.to_string()))?;
        Ok(Self {
            list,
            cache: Mutex::new(lru_cache(DOMAIN_CACHE_SIZE)),
        })
    }

    fn compute(&self, host: &str) -> String {
        if host.parse::<IpAddr>().is_ok() {
            return host.to_string();
        }
        match self.list.domain(host.as_bytes()) {
            Some(domain) => String::from_utf8_lossy(domain.as_bytes()).into_owned(),
            // Hosts that are entirely suffix (single labels, bare TLDs):
            // keep the last label so "localhost" resolves to itself.
            None => host.rsplit('.').next().unwrap_or("").to_string(),
        }
    }
}

impl DomainResolver for PslResolver {
    fn domain_of(&self, url_or_host: &str) -> String {
        let host = host_of(url_or_host);
        if host.is_empty() {
            return String::new();
        }
        let mut cache = self.cache.lock();
        if let Some(domain) = cache.get(&host) {
            return domain.clone();
        }
        let domain = self.compute(&host);
        cache.put(host, domain.clone());
        domain
    }
}

/// Common multi-part suffixes for the data-free fallback resolver.
const COMMON_TWO_PART_SUFFIXES: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

/// Data-free resolver approximating public-suffix rules.
///
/// Assumes the last label is a suffix, widened to two labels for the common
/// multi-part suffixes above. Good enough for tests and for embedders whose
/// traffic stays on ordinary gTLD/ccTLD hosts; use [`PslResolver`] when full
/// accuracy matters.
pub struct HeuristicResolver {
    cache: Mutex<LruCache<String, String>>,
}

impl HeuristicResolver {
    pub fn new() -> Self {
        Self::with_capacity(DOMAIN_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(lru_cache(capacity)),
        }
    }

    fn compute(host: &str) -> String {
        if host.parse::<IpAddr>().is_ok() {
            return host.to_string();
        }
        let labels: Vec<&str> = host.split('.').collect();
        let n = labels.len();
        if n <= 2 {
            return host.to_string();
        }
        let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
        if COMMON_TWO_PART_SUFFIXES.contains(&last_two.as_str()) {
            labels[n - 3..].join(".")
        } else {
            labels[n - 2..].join(".")
        }
    }
}

impl Default for HeuristicResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainResolver for HeuristicResolver {
    fn domain_of(&self, url_or_host: &str) -> String {
        let host = host_of(url_or_host);
        if host.is_empty() {
            return String::new();
        }
        let mut cache = self.cache.lock();
        if let Some(domain) = cache.get(&host) {
            return domain.clone();
        }
        let domain = Self::compute(&host);
        cache.put(host, domain.clone());
        domain
    }
}

/// Resolver with fixed host-to-domain mappings.
///
/// Lookup walks from the full host up through parent suffixes, so a mapping
/// for "example.com" also covers "blog.example.com". Unmapped hosts resolve
/// to the empty string.
pub struct StaticResolver {
    mappings: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Add a mapping for a host or domain suffix.
    pub fn add(&mut self, host: impl Into<String>, domain: impl Into<String>) {
        self.mappings.insert(host.into().to_ascii_lowercase(), domain.into());
    }

    /// Add a mapping and return self for chaining.
    pub fn with_mapping(mut self, host: impl Into<String>, domain: impl Into<String>) -> Self {
        self.add(host, domain);
        self
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainResolver for StaticResolver {
    fn domain_of(&self, url_or_host: &str) -> String {
        let host = host_of(url_or_host);
        let mut suffix: &str = &host;
        loop {
            if let Some(domain) = self.mappings.get(suffix) {
                return domain.clone();
            }
            match suffix.split_once('.') {
                Some((_, parent)) => suffix = parent,
                None => return String::new(),
            }
        }
    }
}

fn lru_cache(capacity: usize) -> LruCache<String, String> {
    let capacity =
        NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).expect("1 is non-zero"));
    LruCache::new(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
// ===BEGIN ICANN DOMAINS===
// test suffix data
com
org
uk
co.uk
// ===END ICANN DOMAINS===
";

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("http://blog.Example.com/path"), "blog.example.com");
        assert_eq!(host_of("//example.com:8080"), "example.com");
        assert_eq!(host_of("//user:pass@example.com/x"), "example.com");
        assert_eq!(host_of("example.com/path"), "example.com");
        assert_eq!(host_of(""), "");
        assert_eq!(host_of("/just/a/path"), "");
    }

    #[test]
    fn test_heuristic_strips_subdomains() {
        let resolver = HeuristicResolver::new();
        assert_eq!(resolver.domain_of("http://blog.example.com"), "example.com");
        assert_eq!(resolver.domain_of("http://www.example.com"), "example.com");
        assert_eq!(
            resolver.domain_of("http://deeper.blog.example.co.uk"),
            "example.co.uk"
        );
    }

    #[test]
    fn test_heuristic_ip_and_single_label() {
        let resolver = HeuristicResolver::new();
        assert_eq!(resolver.domain_of("http://127.0.0.1"), "127.0.0.1");
        assert_eq!(resolver.domain_of("http://localhost"), "localhost");
        assert_eq!(resolver.domain_of("non-match"), "non-match");
    }

    #[test]
    fn test_heuristic_cached_lookup_is_stable() {
        let resolver = HeuristicResolver::with_capacity(2);
        let first = resolver.domain_of("http://a.b.example.com");
        let second = resolver.domain_of("http://a.b.example.com");
        assert_eq!(first, second);
        assert_eq!(first, "example.com");
    }

    #[test]
    fn test_psl_resolver() {
        let resolver = PslResolver::from_list_str(LIST).unwrap();
        assert_eq!(resolver.domain_of("http://blog.example.co.uk"), "example.co.uk");
        assert_eq!(resolver.domain_of("http://blog.example.com"), "example.com");
        assert_eq!(resolver.domain_of("//dom:80"), "dom");
        assert_eq!(resolver.domain_of("http://127.0.0.1"), "127.0.0.1");
    }

    #[test]
    fn test_static_resolver_walks_suffixes() {
        let resolver = StaticResolver::new().with_mapping("example.com", "example.com");
        assert_eq!(resolver.domain_of("http://example.com"), "example.com");
        assert_eq!(resolver.domain_of("http://deep.blog.example.com"), "example.com");
        assert_eq!(resolver.domain_of("http://other.com"), "");
    }
}
