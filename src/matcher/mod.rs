//! Compiled pattern matchers.
//!
//! A pattern string compiles once into per-component matchers; a URL is then
//! decomposed the same way and tested component by component. Components the
//! pattern leaves empty impose no constraint. All comparisons are ASCII
//! case-insensitive and full-string.

mod query;

use regex::{Regex, RegexBuilder};

use crate::error::Result;
use crate::parser::{parse_url, ParseCache, UrlParts};

use query::QueryMatcher;

/// A single pattern compiled into executable component matchers.
///
/// - scheme: exact match when the pattern names one;
/// - netloc: literal host match; `www.` is optional on both sides, and a
///   pattern with no path, query or fragment also accepts any subdomain;
/// - path and fragment: `*` expands to any characters, a trailing `|` makes
///   the match exact, otherwise patterns match as prefixes;
/// - query: every parameter the pattern names must be present in the URL
///   with at least one matching value.
pub struct PatternMatcher {
    pattern: String,
    scheme: String,
    netloc_re: Option<Regex>,
    path_re: Option<Regex>,
    fragment_re: Option<Regex>,
    query: Option<QueryMatcher>,
}

impl PatternMatcher {
    pub fn new(pattern: &str, cache: &ParseCache) -> Result<Self> {
        let parts = cache.parse(pattern);

        let netloc_re = if parts.netloc.is_empty() {
            None
        } else {
            let mut re = regex::escape(strip_www(&parts.netloc));
            if parts.path.is_empty() && parts.query.is_empty() && parts.fragment.is_empty() {
                // Host-only pattern: also accept any subdomain.
                re = format!(r"(?:.*\.)?{re}");
            }
            Some(build_insensitive(&format!(r"^(?:www\.)?{re}$"))?)
        };

        let path_re = if parts.path.is_empty() {
            None
        } else {
            Some(path_or_fragment_re(&parts.path)?)
        };
        let fragment_re = if parts.fragment.is_empty() {
            None
        } else {
            Some(path_or_fragment_re(&parts.fragment)?)
        };
        let query = if parts.query.is_empty() {
            None
        } else {
            QueryMatcher::compile(pattern, &parts.query)?
        };

        Ok(Self {
            pattern: pattern.to_string(),
            scheme: parts.scheme,
            netloc_re,
            path_re,
            fragment_re,
            query,
        })
    }

    /// The raw pattern this matcher was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Test a URL string.
    pub fn matches(&self, url: &str) -> bool {
        self.matches_parts(&parse_url(url))
    }

    /// Test an already-decomposed URL.
    pub fn matches_parts(&self, url: &UrlParts) -> bool {
        if !self.scheme.is_empty() && url.scheme != self.scheme {
            return false;
        }
        if let Some(re) = &self.netloc_re {
            if !re.is_match(&url.netloc) {
                return false;
            }
        }
        if let Some(re) = &self.path_re {
            if !re.is_match(&url.path) {
                return false;
            }
        }
        if let Some(re) = &self.fragment_re {
            if !re.is_match(&url.fragment) {
                return false;
            }
        }
        if let Some(query) = &self.query {
            if !query.matches(&url.query) {
                return false;
            }
        }
        true
    }
}

/// Escape regex metacharacters, then expand `*` to "any characters".
pub(crate) fn wildcard_escape(text: &str) -> String {
    regex::escape(text).replace(r"\*", ".*")
}

/// Wildcard expansion plus the end-anchor rule: a trailing unescaped `|`
/// forces an exact match, anything else matches as a prefix.
fn path_or_fragment_re(text: &str) -> Result<Regex> {
    let mut re = wildcard_escape(text);
    if let Some(exact) = re.strip_suffix(r"\|") {
        re = exact.to_string();
    } else {
        re.push_str(".*");
    }
    build_insensitive(&format!("^{re}$"))
}

fn build_insensitive(re: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(re).case_insensitive(true).build()?)
}

/// Strip a leading `www.` label so `www.host` and `host` are interchangeable.
fn strip_www(netloc: &str) -> &str {
    if netloc.len() > 4 && netloc[..4].eq_ignore_ascii_case("www.") {
        &netloc[4..]
    } else {
        netloc
    }
}
