//! Query-parameter matching.
//!
//! A pattern query like `?param=a&param=b*&flag=` compiles to one
//! alternation regex per parameter name. A URL query satisfies the matcher
//! only if every pattern parameter is present with at least one matching
//! value; parameters the pattern does not mention are ignored.

use std::collections::HashMap;

use regex::Regex;
use url::form_urlencoded;

use crate::error::Result;

use super::{build_insensitive, wildcard_escape};

/// Decode a query string into `(name, values)` groups.
///
/// Names keep their first-occurrence order, values keep query order, blank
/// values are retained, and `%xx`/`+` sequences are decoded.
fn group_pairs(query: &str) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        let name = name.into_owned();
        if !grouped.contains_key(&name) {
            order.push(name.clone());
        }
        grouped.entry(name).or_default().push(value.into_owned());
    }
    order
        .into_iter()
        .map(|name| {
            let values = grouped.remove(&name).unwrap_or_default();
            (name, values)
        })
        .collect()
}

/// Compiled per-parameter value matchers for a pattern's query component.
#[derive(Debug)]
pub(crate) struct QueryMatcher {
    params: HashMap<String, Regex>,
}

impl QueryMatcher {
    /// Compile a pattern's query component.
    ///
    /// Parameter names are lower-cased. Wildcards in a parameter *name* are
    /// unsupported: a warning is emitted and the `*` is stripped, leaving a
    /// literal name (names that become empty are dropped). Returns `None`
    /// when no usable parameters remain.
    pub(crate) fn compile(pattern: &str, query: &str) -> Result<Option<Self>> {
        let mut params = HashMap::new();
        for (name, values) in group_pairs(query) {
            let mut name = name.to_lowercase();
            if name.contains('*') {
                tracing::warn!(
                    pattern,
                    parameter = %name,
                    "wildcard expansion is only supported in query parameter \
                     values; stripping '*' from the parameter name"
                );
                name = name.replace('*', "");
            }
            if name.is_empty() {
                continue;
            }
            let alternation = values
                .iter()
                .map(|value| wildcard_escape(value))
                .collect::<Vec<_>>()
                .join("|");
            params.insert(name, build_insensitive(&format!("^(?:{alternation})$"))?);
        }
        Ok(if params.is_empty() {
            None
        } else {
            Some(Self { params })
        })
    }

    /// Test a URL's query string.
    pub(crate) fn matches(&self, url_query: &str) -> bool {
        let mut kvs: HashMap<String, Vec<String>> = HashMap::new();
        for (name, values) in group_pairs(url_query) {
            // Lower-casing can collide distinct raw names; the later group
            // replaces the earlier one.
            kvs.insert(name.to_lowercase(), values);
        }
        self.params.iter().all(|(name, re)| {
            kvs.get(name)
                .map_or(false, |values| values.iter().any(|value| re.is_match(value)))
        })
    }
}
