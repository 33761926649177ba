//! Fetch, decode and re-filter records for one resource kind.

use std::sync::Arc;

use super::traits::{DataSource, ResolveError, ResourceFilter};

/// Records that survived the local re-filter, plus where they came from.
#[derive(Debug, Clone)]
pub struct Resolved<R> {
    pub records: Vec<R>,
    pub source_url: String,
}

/// Dispatches filters to the data source and re-applies them locally.
///
/// The local pass uses the same predicate the data source is expected to
/// apply, so a source that ignores or misapplies filters cannot leak
/// unrelated records to the caller.
pub struct ResourceResolver {
    source: Arc<dyn DataSource>,
}

impl ResourceResolver {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn resolve<F: ResourceFilter>(
        &self,
        filters: &F,
    ) -> Result<Resolved<F::Record>, ResolveError> {
        let kind = F::KIND;
        let fetched = self.source.fetch(kind, &filters.query_params()).await?;

        let decoded: Vec<F::Record> =
            serde_json::from_str(&fetched.body).map_err(|source| ResolveError::Decode {
                kind,
                url: fetched.url.clone(),
                source,
            })?;
        let received = decoded.len();

        let records: Vec<F::Record> = decoded
            .into_iter()
            .filter(|record| filters.matches(record))
            .collect();

        if records.len() < received {
            tracing::warn!(
                %kind,
                url = %fetched.url,
                dropped = received - records.len(),
                "Data source returned records outside the requested filters"
            );
        }
        tracing::info!(%kind, url = %fetched.url, records = records.len(), "Resolved records");

        Ok(Resolved {
            records,
            source_url: fetched.url,
        })
    }
}
