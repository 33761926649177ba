//! Resource kinds, the data source boundary, and the filter contract shared
//! by every resolver.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// The three read-only domains served by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Allocations,
    CloudCosts,
    Assets,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [Self::Allocations, Self::CloudCosts, Self::Assets];

    /// Path segment used both by the gateway and the data source.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Allocations => "allocations",
            Self::CloudCosts => "cloudCosts",
            Self::Assets => "assets",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Failure while fetching or decoding records from the data source.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The data source was unreachable or answered with a non-success status.
    #[error("failed to get {kind} from {url}: {message}")]
    Upstream {
        kind: ResourceKind,
        url: String,
        message: String,
    },
    /// The data source answered, but not with the expected record array.
    #[error("failed to decode {kind} from {url}: {source}")]
    Decode {
        kind: ResourceKind,
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw payload returned by a data source, with the URL it came from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: String,
    pub body: String,
}

/// External collaborator supplying raw records for each resource kind.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the raw body for `kind`, passing `params` as filter query parameters.
    async fn fetch(
        &self,
        kind: ResourceKind,
        params: &[(&'static str, String)],
    ) -> Result<Fetched, ResolveError>;

    /// The name of this data source implementation.
    fn name(&self) -> &str;
}

/// Kind-specific filters and the predicate the data source applies with them.
///
/// Every field is a string where empty means "do not filter on this field".
pub trait ResourceFilter:
    Serialize + DeserializeOwned + Default + Clone + fmt::Debug + Send + Sync + 'static
{
    type Record: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    const KIND: ResourceKind;

    /// Non-empty filter fields as query parameters for the data source.
    fn query_params(&self) -> Vec<(&'static str, String)>;

    /// Whether `record` passes these filters.
    fn matches(&self, record: &Self::Record) -> bool;
}

/// Collect `(name, value)` pairs, skipping empty values.
pub(crate) fn non_empty_params<const N: usize>(
    pairs: [(&'static str, &str); N],
) -> Vec<(&'static str, String)> {
    pairs
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name, value.to_string()))
        .collect()
}

/// Deserialize an optional wire field, reading JSON `null` as the default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
