//! Cloud costs: spend per VM or workload name.

use serde::{Deserialize, Serialize};

use super::traits::{non_empty_params, null_as_default, ResourceFilter, ResourceKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCost {
    pub name: String,
    pub cpu_cost: f64,
    pub gpu_cost: f64,
    pub total_cost: f64,
}

/// Cloud cost filters. `namespace` is matched against the record name as a
/// case-insensitive substring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudCostFilters {
    #[serde(deserialize_with = "null_as_default")]
    pub namespace: String,
}

impl ResourceFilter for CloudCostFilters {
    type Record = CloudCost;

    const KIND: ResourceKind = ResourceKind::CloudCosts;

    fn query_params(&self) -> Vec<(&'static str, String)> {
        non_empty_params([("namespace", self.namespace.as_str())])
    }

    fn matches(&self, record: &CloudCost) -> bool {
        self.namespace.is_empty()
            || record
                .name
                .to_lowercase()
                .contains(&self.namespace.to_lowercase())
    }
}
