//! Assets: provisioned cloud resources by provider and region.

use serde::{Deserialize, Serialize};

use super::traits::{non_empty_params, null_as_default, ResourceFilter, ResourceKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub provider: String,
    pub region: String,
    pub cost: f64,
}

/// Asset filters, both matched case-insensitively and exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetFilters {
    #[serde(deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(deserialize_with = "null_as_default")]
    pub region: String,
}

/// Empty filters match everything; otherwise compare with case folded.
fn equal_ignoring_case(filter: &str, value: &str) -> bool {
    filter.is_empty()
        || filter.eq_ignore_ascii_case(value)
        || filter
            .chars()
            .flat_map(char::to_lowercase)
            .eq(value.chars().flat_map(char::to_lowercase))
}

impl ResourceFilter for AssetFilters {
    type Record = Asset;

    const KIND: ResourceKind = ResourceKind::Assets;

    fn query_params(&self) -> Vec<(&'static str, String)> {
        non_empty_params([
            ("provider", self.provider.as_str()),
            ("region", self.region.as_str()),
        ])
    }

    fn matches(&self, record: &Asset) -> bool {
        equal_ignoring_case(&self.provider, &record.provider)
            && equal_ignoring_case(&self.region, &record.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(provider: &str, region: &str) -> Asset {
        Asset {
            asset_id: "asset-001".to_string(),
            name: "EC2 m5.large".to_string(),
            kind: "VM".to_string(),
            status: "active".to_string(),
            provider: provider.to_string(),
            region: region.to_string(),
            cost: 120.5,
        }
    }

    fn filters(provider: &str, region: &str) -> AssetFilters {
        AssetFilters {
            provider: provider.to_string(),
            region: region.to_string(),
        }
    }

    #[test]
    fn provider_only_filter_ignores_case() {
        let records = [asset("AWS", "us-west-2"), asset("Azure", "centralindia")];
        let kept: Vec<_> = records
            .iter()
            .filter(|r| filters("aws", "").matches(r))
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].provider, "AWS");
    }

    #[test]
    fn provider_and_region_must_both_match() {
        let record = asset("AWS", "us-west-2");
        assert!(filters("aws", "US-WEST-2").matches(&record));
        assert!(!filters("aws", "eu-west-1").matches(&record));
        assert!(!filters("aw", "").matches(&record));
    }

    #[test]
    fn case_folding_covers_non_ascii() {
        let record = asset("Östcloud", "MÜNCHEN");
        assert!(filters("östcloud", "münchen").matches(&record));
        assert!(!filters("ostcloud", "").matches(&record));
        assert!(!filters("östcloudx", "").matches(&record));
    }

    #[test]
    fn null_filter_fields_read_as_empty() {
        let parsed: AssetFilters =
            serde_json::from_str(r#"{"provider":null,"region":"us-west-2"}"#).unwrap();
        assert_eq!(parsed, filters("", "us-west-2"));
    }

    #[test]
    fn type_field_uses_wire_name() {
        let json = serde_json::to_value(asset("AWS", "us-west-2")).unwrap();
        assert_eq!(json["type"], "VM");
        assert!(json.get("kind").is_none());
    }
}
