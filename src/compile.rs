use crate::error::Result;
use crate::matcher::PatternMatcher;
use crate::parser::{parse_url, ParseCache, UrlParts};
use crate::types::Rule;

/// A rule compiled and ready for matching.
///
/// Pairs an identifier with the rule it was built from and one compiled
/// [`PatternMatcher`] per include and exclude pattern. Built once when a
/// rule is registered, shared across domain buckets, discarded on removal.
pub struct CompiledRule<K> {
    identifier: K,
    rule: Rule,
    include: Vec<PatternMatcher>,
    exclude: Vec<PatternMatcher>,
}

impl<K> CompiledRule<K> {
    pub fn new(identifier: K, rule: Rule, cache: &ParseCache) -> Result<Self> {
        let include = rule
            .include()
            .iter()
            .map(|pattern| PatternMatcher::new(pattern, cache))
            .collect::<Result<Vec<_>>>()?;
        let exclude = rule
            .exclude()
            .iter()
            .map(|pattern| PatternMatcher::new(pattern, cache))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            identifier,
            rule,
            include,
            exclude,
        })
    }

    pub fn identifier(&self) -> &K {
        &self.identifier
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Test a URL string.
    pub fn matches(&self, url: &str) -> bool {
        self.matches_parts(&parse_url(url))
    }

    /// Test an already-decomposed URL: at least one include matches (an
    /// empty include list matches anything) and no exclude matches.
    pub fn matches_parts(&self, url: &UrlParts) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|m| m.matches_parts(url)) {
            return false;
        }
        !self.exclude.iter().any(|m| m.matches_parts(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(include: &[&str], exclude: &[&str]) -> CompiledRule<u32> {
        let rule = Rule::new(include.iter().copied()).with_exclude(exclude.iter().copied());
        CompiledRule::new(1, rule, &ParseCache::default()).unwrap()
    }

    #[test]
    fn test_any_include_suffices() {
        let rule = compiled(&["example.com/products", "example.com/articles"], &[]);
        assert!(rule.matches("http://example.com/products/1"));
        assert!(rule.matches("http://example.com/articles/2"));
        assert!(!rule.matches("http://example.com/about"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let rule = compiled(
            &["books.toscrape.com/catalogue/"],
            &["/catalogue/category/"],
        );
        assert!(rule.matches("https://books.toscrape.com/catalogue/soumission_998/index.html"));
        assert!(!rule.matches("https://books.toscrape.com/catalogue/category/books/fiction_10/"));
    }

    #[test]
    fn test_empty_include_matches_anything() {
        let rule = compiled(&[], &["/private"]);
        assert!(rule.matches("http://anything.at/all"));
        assert!(!rule.matches("http://anything.at/private/x"));
    }

    #[test]
    fn test_accessors() {
        let rule = compiled(&["example.com"], &[]);
        assert_eq!(*rule.identifier(), 1);
        assert_eq!(rule.rule().include(), ["example.com".to_string()]);
    }
}
