//! Find and resolve matching over registered endpoints.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::metadata::{EndpointAddress, EndpointMetadata};

/// Criteria for a find request.
///
/// [`is_match`](Matches::is_match) is the base predicate (scope, type or any
/// host-specific query). The registry additionally requires every value in
/// [`extensions`](Matches::extensions) to appear among the endpoint's
/// annotation values.
pub trait Matches: Send + Sync {
    /// Base predicate evaluated against each registered endpoint.
    fn is_match(&self, endpoint: &EndpointMetadata) -> bool;

    /// Annotation values an endpoint must carry, all of them.
    fn extensions(&self) -> &[String] {
        &[]
    }

    /// Stop after this many matches.
    fn max_results(&self) -> Option<usize> {
        None
    }
}

/// How criteria scopes are compared with endpoint scopes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeMatchBy {
    /// Scopes must be string-equal.
    Exact,
    /// Criteria scope must equal, or be a `/`-segment prefix of, the endpoint scope.
    #[default]
    Prefix,
}

impl ScopeMatchBy {
    fn matches(self, criteria: &str, endpoint: &str) -> bool {
        match self {
            Self::Exact => criteria == endpoint,
            Self::Prefix => {
                let criteria = criteria.trim_end_matches('/');
                let endpoint = endpoint.trim_end_matches('/');
                match endpoint.strip_prefix(criteria) {
                    Some(rest) => criteria.is_empty() || rest.is_empty() || rest.starts_with('/'),
                    None => false,
                }
            }
        }
    }
}

/// Stock find criteria: contract types, scopes and required extension values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindCriteria {
    /// Contract types the endpoint must implement, all of them.
    pub contract_types: Vec<String>,
    /// Scopes the endpoint must belong to, all of them.
    pub scopes: Vec<String>,
    /// Rule for comparing scopes.
    pub scope_match_by: ScopeMatchBy,
    /// Annotation values the endpoint must carry, all of them.
    pub extensions: Vec<String>,
    /// Upper bound on returned endpoints.
    pub max_results: Option<usize>,
}

impl FindCriteria {
    /// Criteria that match every endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a contract type.
    pub fn contract_type(mut self, contract: impl Into<String>) -> Self {
        self.contract_types.push(contract.into());
        self
    }

    /// Require a scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Set the scope comparison rule. Default: [`ScopeMatchBy::Prefix`].
    pub fn scope_match_by(mut self, rule: ScopeMatchBy) -> Self {
        self.scope_match_by = rule;
        self
    }

    /// Require an annotation value.
    pub fn extension(mut self, value: impl Into<String>) -> Self {
        self.extensions.push(value.into());
        self
    }

    /// Cap the number of results.
    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }
}

impl Matches for FindCriteria {
    fn is_match(&self, endpoint: &EndpointMetadata) -> bool {
        let contracts = self
            .contract_types
            .iter()
            .all(|c| endpoint.contract_types.contains(c));
        let scopes = self.scopes.iter().all(|wanted| {
            endpoint
                .scopes
                .iter()
                .any(|have| self.scope_match_by.matches(wanted, have))
        });
        contracts && scopes
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn max_results(&self) -> Option<usize> {
        self.max_results
    }
}

/// Criteria for a resolve request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveCriteria {
    /// Address to look up.
    pub address: EndpointAddress,
}

impl ResolveCriteria {
    /// Resolve the given address.
    pub fn new(address: impl Into<EndpointAddress>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Check that the endpoint carries every required annotation value.
fn has_extension_values(endpoint: &EndpointMetadata, required: &[String]) -> bool {
    required.iter().all(|v| endpoint.has_annotation_value(v))
}

pub(crate) fn find<'a, C, I>(criteria: &C, endpoints: I) -> Vec<EndpointMetadata>
where
    C: Matches + ?Sized,
    I: IntoIterator<Item = &'a EndpointMetadata>,
{
    let limit = criteria.max_results().unwrap_or(usize::MAX);
    let required = criteria.extensions();

    let matches: Vec<EndpointMetadata> = endpoints
        .into_iter()
        .filter(|endpoint| criteria.is_match(endpoint))
        .filter(|endpoint| required.is_empty() || has_extension_values(endpoint, required))
        .take(limit)
        .cloned()
        .collect();

    trace!(matches = matches.len(), "find: matched endpoints");
    matches
}

pub(crate) fn resolve<'a, I>(criteria: &ResolveCriteria, endpoints: I) -> Option<EndpointMetadata>
where
    I: IntoIterator<Item = &'a EndpointMetadata>,
{
    let found = endpoints
        .into_iter()
        .find(|endpoint| *endpoint.effective_address() == criteria.address)
        .cloned();

    trace!(address = %criteria.address, found = found.is_some(), "resolve");
    found
}
