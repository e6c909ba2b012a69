use std::fmt;

use thiserror::Error;

use crate::types::Rule;

/// Engine error types for pattern compilation and resolver construction.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A compiled pattern exceeded the regex engine's limits.
    ///
    /// Pattern components are literal-escaped before compilation, so this
    /// only triggers on pathological inputs (e.g. the engine size limit).
    #[error("pattern regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The public suffix list text handed to the resolver could not be parsed.
    #[error("invalid public suffix list: {0}")]
    SuffixList(String),
}

/// Registration error types reported by the rule registry.
#[derive(Error, Debug)]
pub enum RegistryError<K: fmt::Debug> {
    /// A non-universal rule contains include patterns that do not resolve
    /// to any domain. Carries the identifier, the rejected rule, and the
    /// offending pattern strings; the registry is left untouched.
    #[error(
        "all include patterns must belong to a domain but {offending:?} do not \
         (identifier: {identifier:?}); e.g. the include pattern '/product/*' is \
         invalid whereas 'example.com/product/*' is not. The only exception is \
         the empty pattern, which matches everything"
    )]
    IncludesWithoutDomain {
        identifier: K,
        rule: Rule,
        offending: Vec<String>,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
