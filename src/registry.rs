//! Rule registry module.
//!
//! Owns all registered rules and an index of compiled rules bucketed by
//! registrable domain, so matching a URL only evaluates the rules that can
//! possibly apply. Buckets are kept sorted under a strict total order, which
//! makes "first match wins" deterministic.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::compile::CompiledRule;
use crate::error::RegistryError;
use crate::parser::{hierarchical_key, parse_url, ParseCache};
use crate::resolver::{DomainResolver, HeuristicResolver};
use crate::types::Rule;

/// Maps URLs to the identifier of the best-matching registered rule.
///
/// Identifiers are opaque: any `Eq + Hash + Ord + Clone + Debug` type works.
/// The `Ord` bound exists for the deterministic tie-break in the bucket
/// order, not for any semantic meaning of identifiers.
///
/// All operations are synchronous with no internal locking; embedders that
/// share a registry across threads must serialize writers against readers.
pub struct RuleRegistry<K> {
    rules: HashMap<K, Rule>,
    by_domain: HashMap<String, Vec<Arc<CompiledRule<K>>>>,
    universal: Vec<Arc<CompiledRule<K>>>,
    resolver: Box<dyn DomainResolver>,
    cache: ParseCache,
}

impl<K> RuleRegistry<K>
where
    K: Eq + Hash + Ord + Clone + fmt::Debug,
{
    /// Create an empty registry with the built-in heuristic resolver.
    pub fn new() -> Self {
        Self::with_resolver(HeuristicResolver::new())
    }

    /// Create an empty registry with a custom domain resolver.
    pub fn with_resolver(resolver: impl DomainResolver + 'static) -> Self {
        Self {
            rules: HashMap::new(),
            by_domain: HashMap::new(),
            universal: Vec::new(),
            resolver: Box::new(resolver),
            cache: ParseCache::default(),
        }
    }

    /// Build a registry from `(identifier, rule)` pairs; equivalent to
    /// calling [`RuleRegistry::add_or_update`] for each pair in order.
    pub fn from_rules<I>(
        resolver: impl DomainResolver + 'static,
        rules: I,
    ) -> Result<Self, RegistryError<K>>
    where
        I: IntoIterator<Item = (K, Rule)>,
    {
        let mut registry = Self::with_resolver(resolver);
        for (identifier, rule) in rules {
            registry.add_or_update(identifier, rule)?;
        }
        Ok(registry)
    }

    /// Register a rule, replacing any rule previously held under the same
    /// identifier.
    ///
    /// A non-universal rule whose include patterns do not all resolve to a
    /// domain is rejected with
    /// [`RegistryError::IncludesWithoutDomain`] and the registry is left
    /// exactly as it was.
    pub fn add_or_update(&mut self, identifier: K, rule: Rule) -> Result<(), RegistryError<K>> {
        if !rule.is_universal() && !rule.all_includes_have_domain(&self.cache) {
            let offending = rule
                .includes_without_domain(&self.cache)
                .into_iter()
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_string)
                .collect();
            return Err(RegistryError::IncludesWithoutDomain {
                identifier,
                rule,
                offending,
            });
        }

        // Compile before touching any state so a failure leaves the
        // registry unchanged.
        let compiled = Arc::new(CompiledRule::new(
            identifier.clone(),
            rule.clone(),
            &self.cache,
        )?);

        self.remove(&identifier);

        let domains = rule.domains(self.resolver.as_ref(), &self.cache);
        let universal = rule.is_universal();
        self.rules.insert(identifier.clone(), rule);
        for domain in &domains {
            let bucket = self.by_domain.entry(domain.clone()).or_default();
            bucket.push(Arc::clone(&compiled));
            sort_bucket(bucket, domain, self.resolver.as_ref(), &self.cache);
        }
        if universal {
            self.universal.push(compiled);
            sort_bucket(&mut self.universal, "", self.resolver.as_ref(), &self.cache);
        }
        tracing::debug!(
            identifier = ?identifier,
            domains = domains.len(),
            universal,
            "rule registered"
        );
        Ok(())
    }

    /// Remove a rule and its compiled state; a no-op for unknown
    /// identifiers. Buckets left empty are pruned.
    pub fn remove(&mut self, identifier: &K) {
        let Some(rule) = self.rules.remove(identifier) else {
            return;
        };
        for domain in rule.domains(self.resolver.as_ref(), &self.cache) {
            let prune = match self.by_domain.get_mut(&domain) {
                Some(bucket) => {
                    bucket.retain(|compiled| compiled.identifier() != identifier);
                    bucket.is_empty()
                }
                None => false,
            };
            if prune {
                self.by_domain.remove(&domain);
            }
        }
        if rule.is_universal() {
            self.universal
                .retain(|compiled| compiled.identifier() != identifier);
        }
    }

    /// The rule registered under `identifier`, if any.
    pub fn get(&self, identifier: &K) -> Option<&Rule> {
        self.rules.get(identifier)
    }

    /// Identifier of the best-matching rule for `url`, or `None`.
    pub fn match_url(&self, url: &str, include_universal: bool) -> Option<K> {
        self.match_all(url, include_universal).next()
    }

    /// Identifiers of every matching rule for `url`, best first.
    ///
    /// Yields matches from the URL's domain bucket in sort order, then, when
    /// `include_universal` is set, matches from the universal bucket in its
    /// own sort order. The iterator is lazy and recomputed per call.
    pub fn match_all<'a>(
        &'a self,
        url: &str,
        include_universal: bool,
    ) -> impl Iterator<Item = K> + 'a {
        let domain = self.resolver.domain_of(url);
        let parsed = parse_url(url);
        let bucket = self
            .by_domain
            .get(&domain)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let universal = if include_universal {
            self.universal.as_slice()
        } else {
            &[]
        };
        bucket
            .iter()
            .chain(universal.iter())
            .filter(move |compiled| compiled.matches_parts(&parsed))
            .map(|compiled| compiled.identifier().clone())
    }

    /// Identifiers of all universal rules in sort order, regardless of URL.
    pub fn match_universal(&self) -> impl Iterator<Item = K> + '_ {
        self.universal
            .iter()
            .map(|compiled| compiled.identifier().clone())
    }

    /// Number of registered rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<K> Default for RuleRegistry<K>
where
    K: Eq + Hash + Ord + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Re-sort a bucket under the total order, descending: rule priority, then
/// the sorted hierarchical keys of the rule's include patterns restricted to
/// this bucket's domain, then the identifier. The identifier tie-break makes
/// the order strict, so match results never depend on insertion order.
fn sort_bucket<K>(
    bucket: &mut [Arc<CompiledRule<K>>],
    domain: &str,
    resolver: &dyn DomainResolver,
    cache: &ParseCache,
) where
    K: Ord + Clone,
{
    bucket.sort_by_cached_key(|compiled| {
        let mut keys: Vec<String> = compiled
            .rule()
            .includes_for(domain, resolver, cache)
            .into_iter()
            .map(|pattern| hierarchical_key(&cache.parse(pattern)))
            .collect();
        keys.sort();
        Reverse((
            compiled.rule().priority(),
            keys,
            compiled.identifier().clone(),
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn test_add_remove_get_lifecycle() {
        let mut registry = RuleRegistry::new();
        let rule = Rule::new(["example.com"]);
        registry.add_or_update(1, rule.clone()).unwrap();
        assert_eq!(registry.match_url("http://example.com", true), Some(1));
        assert_eq!(registry.get(&1), Some(&rule));

        let rule_3 = Rule::new(["example.com/articles"]);
        registry.add_or_update(3, rule_3.clone()).unwrap();
        assert_eq!(
            registry.match_url("http://example.com/articles", true),
            Some(3)
        );
        assert_eq!(registry.get(&3), Some(&rule_3));

        // Updating replaces the old compiled state entirely.
        let rule = Rule::new(["example.com/products"]);
        registry.add_or_update(1, rule.clone()).unwrap();
        assert_eq!(registry.match_url("http://example.com", true), None);
        assert_eq!(
            registry.match_url("http://example.com/products", true),
            Some(1)
        );
        assert_eq!(registry.get(&1), Some(&rule));

        // Universal rules pick up anything the domain rules don't.
        let universal = Rule::new([""]);
        registry.add_or_update(2, universal.clone()).unwrap();
        assert_eq!(registry.match_url("http://example.com", true), Some(2));
        assert_eq!(
            registry.match_url("http://example.com/products", true),
            Some(1)
        );
        assert_eq!(registry.get(&2), Some(&universal));

        registry.remove(&2);
        assert_eq!(registry.match_url("http://example.com", true), None);
        assert_eq!(registry.get(&2), None);

        registry.remove(&3);
        assert_eq!(
            registry.match_url("http://example.com/products", true),
            Some(1)
        );
        assert_eq!(registry.match_url("http://example.com/articles", true), None);

        registry.remove(&1);
        assert_eq!(registry.match_url("http://example.com/products", true), None);
        assert_eq!(registry.get(&1), None);
        assert!(registry.by_domain.is_empty(), "empty buckets must be pruned");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry: RuleRegistry<u32> = RuleRegistry::new();
        registry.remove(&42);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_validation_rejects_domainless_includes() {
        let mut registry = RuleRegistry::new();
        let err = registry
            .add_or_update(1, Rule::new(["/no_domain_pattern"]))
            .unwrap_err();
        match err {
            RegistryError::IncludesWithoutDomain {
                identifier,
                offending,
                ..
            } => {
                assert_eq!(identifier, 1);
                assert_eq!(offending, vec!["/no_domain_pattern".to_string()]);
            }
            other => panic!("expected IncludesWithoutDomain, got {other:?}"),
        }
        // Rejection is atomic.
        assert!(registry.is_empty());
        assert_eq!(registry.get(&1), None);
    }

    #[test]
    fn test_validation_mixed_empty_include_reports_no_patterns() {
        // An empty include inside a non-universal rule fails validation,
        // but the empty pattern itself is filtered from the report.
        let mut registry = RuleRegistry::new();
        let err = registry
            .add_or_update(1, Rule::new(["example.com", ""]))
            .unwrap_err();
        match err {
            RegistryError::IncludesWithoutDomain { offending, .. } => {
                assert!(offending.is_empty());
            }
            other => panic!("expected IncludesWithoutDomain, got {other:?}"),
        }
    }

    #[test]
    fn test_universal_rule_registers() {
        let mut registry = RuleRegistry::new();
        registry.add_or_update(1, Rule::new([""])).unwrap();
        registry
            .add_or_update(2, Rule::new(Vec::<String>::new()))
            .unwrap();
        assert_eq!(registry.match_universal().collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut registry = RuleRegistry::new();
        let rule = Rule::new(["example.com/products"]).with_exclude(["/products/old"]);
        registry.add_or_update(1, rule.clone()).unwrap();
        let before: Vec<_> = registry
            .match_all("http://example.com/products/1", true)
            .collect();
        registry.add_or_update(1, rule).unwrap();
        let after: Vec<_> = registry
            .match_all("http://example.com/products/1", true)
            .collect();
        assert_eq!(before, after);
        assert_eq!(registry.rule_count(), 1);
    }

    #[test]
    fn test_rule_spanning_multiple_domains() {
        let mut registry = RuleRegistry::new();
        registry
            .add_or_update(1, Rule::new(["a.com/x", "b.com/y"]))
            .unwrap();
        assert_eq!(registry.match_url("http://a.com/x1", true), Some(1));
        assert_eq!(registry.match_url("http://b.com/y2", true), Some(1));
        assert_eq!(registry.match_url("http://b.com/x1", true), None);

        registry.remove(&1);
        assert!(registry.by_domain.is_empty());
    }

    #[test]
    fn test_match_all_is_restartable() {
        let mut registry = RuleRegistry::new();
        registry.add_or_update(1, Rule::new(["example.com"])).unwrap();
        registry
            .add_or_update(2, Rule::new(["blog.example.com"]))
            .unwrap();
        let url = "http://blog.example.com/post";
        let first: Vec<_> = registry.match_all(url, true).collect();
        let second: Vec<_> = registry.match_all(url, true).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![2, 1]);
    }
}
