use serde::{Deserialize, Serialize};

use crate::parser::{pattern_domain, ParseCache};
use crate::resolver::DomainResolver;

/// Default rule priority; higher is preferred.
pub const DEFAULT_PRIORITY: i32 = 500;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// An immutable bundle of include patterns, exclude patterns, and a priority.
///
/// Two rules with identical include/exclude/priority are equal and hash the
/// same, so rules behave as values in sets and maps. Pattern order is
/// insertion order and duplicates are kept. Fields are only readable after
/// construction; build with [`Rule::new`] and the `with_*` methods.
///
/// A rule is *universal* when every include entry is the empty string
/// (including the empty list): it matches any domain. Any other rule must
/// have every include pattern resolve to a domain, which the registry checks
/// at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default = "default_priority")]
    priority: i32,
}

impl Rule {
    /// Create a rule from include patterns, with no excludes and the
    /// default priority.
    pub fn new<I, S>(include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Replace the exclude patterns.
    pub fn with_exclude<I, S>(mut self, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = exclude.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// True when there are no include patterns or all of them are empty.
    pub fn is_universal(&self) -> bool {
        self.include.iter().all(|pattern| pattern.is_empty())
    }

    /// Distinct domains of the include patterns, in first-occurrence order.
    ///
    /// Patterns without a netloc contribute nothing; a resolver that cannot
    /// determine a domain for some netloc contributes nothing either.
    pub fn domains(&self, resolver: &dyn DomainResolver, cache: &ParseCache) -> Vec<String> {
        let mut domains = Vec::new();
        for pattern in &self.include {
            if let Some(domain) = pattern_domain(pattern, resolver, cache) {
                if !domain.is_empty() && !domains.contains(&domain) {
                    domains.push(domain);
                }
            }
        }
        domains
    }

    /// Include patterns with no netloc, and therefore no domain.
    pub fn includes_without_domain(&self, cache: &ParseCache) -> Vec<&str> {
        self.include
            .iter()
            .filter(|pattern| cache.parse(pattern).netloc.is_empty())
            .map(String::as_str)
            .collect()
    }

    /// True when every include pattern has a domain.
    pub fn all_includes_have_domain(&self, cache: &ParseCache) -> bool {
        self.includes_without_domain(cache).is_empty()
    }

    /// Include patterns whose domain equals `domain`.
    pub fn includes_for(
        &self,
        domain: &str,
        resolver: &dyn DomainResolver,
        cache: &ParseCache,
    ) -> Vec<&str> {
        self.include
            .iter()
            .filter(|pattern| {
                pattern_domain(pattern, resolver, cache).as_deref() == Some(domain)
            })
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::resolver::HeuristicResolver;

    #[test]
    fn test_value_equality_dedupes_in_sets() {
        let rules: HashSet<Rule> = [
            Rule::new(["example.com"]),
            Rule::new(["example.com"]).with_exclude(Vec::<String>::new()),
        ]
        .into_iter()
        .collect();
        assert_eq!(rules.len(), 1);

        let rules: HashSet<Rule> = [
            Rule::new(["example.com"]),
            Rule::new(["example.com"]).with_priority(1),
        ]
        .into_iter()
        .collect();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_default_priority() {
        assert_eq!(Rule::new(["example.com"]).priority(), 500);
        assert_eq!(Rule::new(["example.com"]).with_priority(300).priority(), 300);
    }

    #[test]
    fn test_is_universal() {
        assert!(Rule::new([""]).is_universal());
        assert!(Rule::new(Vec::<String>::new()).is_universal());
        assert!(Rule::new(["", ""]).is_universal());
        assert!(!Rule::new(["example.com"]).is_universal());
        assert!(!Rule::new(["", "example.com"]).is_universal());
    }

    #[test]
    fn test_domains_dedupe_preserving_order() {
        let resolver = HeuristicResolver::new();
        let cache = ParseCache::default();
        let rule = Rule::new([
            "b.com/one",
            "a.com",
            "blog.b.com/two",
            "",
        ]);
        assert_eq!(
            rule.domains(&resolver, &cache),
            vec!["b.com".to_string(), "a.com".to_string()]
        );
    }

    #[test]
    fn test_includes_without_domain() {
        let cache = ParseCache::default();
        let rule = Rule::new(["example.com", "/no_domain", ""]);
        assert_eq!(rule.includes_without_domain(&cache), vec!["/no_domain", ""]);
        assert!(!rule.all_includes_have_domain(&cache));
        assert!(Rule::new(["example.com"]).all_includes_have_domain(&cache));
    }

    #[test]
    fn test_includes_for_domain() {
        let resolver = HeuristicResolver::new();
        let cache = ParseCache::default();
        let rule = Rule::new(["a.com/x", "b.com", "blog.a.com/y"]);
        assert_eq!(
            rule.includes_for("a.com", &resolver, &cache),
            vec!["a.com/x", "blog.a.com/y"]
        );
        assert_eq!(rule.includes_for("b.com", &resolver, &cache), vec!["b.com"]);
        assert!(rule.includes_for("c.com", &resolver, &cache).is_empty());
    }

    #[test]
    fn test_serde_round_trip_with_defaults() {
        let rule: Rule = serde_json::from_str(r#"{"include": ["example.com"]}"#).unwrap();
        assert_eq!(rule, Rule::new(["example.com"]));

        let full = Rule::new(["example.com/products"])
            .with_exclude(["/products/old"])
            .with_priority(700);
        let json = serde_json::to_string(&full).unwrap();
        assert_eq!(serde_json::from_str::<Rule>(&json).unwrap(), full);
    }
}
