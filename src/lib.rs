//! URL rule engine - maps URLs to the best-matching rule in a registered set
//!
//! This library answers "which configuration applies to this URL": rules
//! declare include/exclude URL patterns with wildcards plus a numeric
//! priority, and the registry resolves every lookup deterministically to the
//! identifier of the single best match. It is the matching core for
//! URL-routing and crawl-scoping systems and carries no network stack of its
//! own.
//!
//! # Example
//!
//! ```rust
//! use url_rule_engine::{Rule, RuleRegistry};
//!
//! let mut registry = RuleRegistry::new();
//! registry
//!     .add_or_update(1, Rule::new(["example.com/product"]))
//!     .unwrap();
//! registry.add_or_update(2, Rule::new(["other.com"])).unwrap();
//!
//! assert_eq!(
//!     registry.match_url("http://example.com/product/a_product.html", true),
//!     Some(1)
//! );
//! assert_eq!(
//!     registry.match_url("http://other.com/a_different_page", true),
//!     Some(2)
//! );
//! assert_eq!(registry.match_url("http://unknown.com/", true), None);
//! ```
//!
//! # Pattern syntax
//!
//! A pattern is a compact URL-like string, not a full URL:
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `example.com` | The host and any of its subdomains, any path |
//! | `example.com/products` | Paths starting with `/products`, exact host |
//! | `example.com/products\|` | Exactly `/products` (trailing `\|` anchors) |
//! | `example.com/*/detail` | `*` expands to any characters |
//! | `https://example.com` | Restricts the scheme |
//! | `example.com?id=34` | Requires `id=34` in the query, extras ignored |
//! | `` (empty) | Everything (universal rule) |
//!
//! `www.` is optional on both the pattern and the URL host, default ports
//! are elided, and every comparison is ASCII case-insensitive.
//!
//! # Matching semantics
//!
//! A rule matches when at least one include pattern matches (an empty
//! include list matches anything) and no exclude pattern matches. Rules are
//! indexed by the registrable domains of their include patterns; rules whose
//! includes are all empty are *universal* and live in a reserved bucket that
//! is consulted after the domain bucket. Within a bucket, rules are ordered
//! by priority (higher first), then pattern specificity, then identifier.
//!
//! Registrable domains ("blog.example.co.uk" → "example.co.uk") come from a
//! pluggable [`DomainResolver`]; the default is a data-free heuristic, and
//! [`PslResolver`] offers full public-suffix accuracy when fed list data.

pub mod compile;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod types;

// Re-export commonly used items
pub use compile::CompiledRule;
pub use error::{EngineError, RegistryError, Result};
pub use matcher::PatternMatcher;
pub use parser::{parse_url, pattern_to_url, ParseCache, UrlParts};
pub use registry::RuleRegistry;
pub use resolver::{
    DomainResolver, HeuristicResolver, PslResolver, StaticResolver, DOMAIN_CACHE_SIZE,
};
pub use types::{Rule, DEFAULT_PRIORITY};
