//! Resource resolution: typed filters and records for each resource kind,
//! the data source boundary, and the resolver that ties them together.
//!
//! Each kind implements [`ResourceFilter`] in its own submodule. The
//! [`ResourceResolver`] is generic over that trait, so adding a kind means
//! adding a filter/record pair and wiring its routes in the gateway.

pub mod allocations;
pub mod assets;
pub mod cloud_costs;
pub mod resolver;
pub mod source;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use crate::config::UpstreamConfig;

pub use allocations::{Allocation, AllocationFilters};
pub use assets::{Asset, AssetFilters};
pub use cloud_costs::{CloudCost, CloudCostFilters};
pub use resolver::{Resolved, ResourceResolver};
pub use source::HttpDataSource;
pub use traits::{DataSource, Fetched, ResolveError, ResourceFilter, ResourceKind};

/// Create the HTTP data source described by `[upstream]`.
pub fn create_data_source(config: &UpstreamConfig) -> Arc<dyn DataSource> {
    Arc::new(HttpDataSource::new(
        &config.base_url,
        Duration::from_secs(config.timeout_secs),
        Duration::from_secs(config.connect_timeout_secs),
    ))
}
