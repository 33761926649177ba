//! Plain-text tables for gateway replies.

use std::fmt::Write;

use crate::gateway::QueryMeta;
use crate::resources::{Allocation, Asset, CloudCost};

/// A record type that can be printed as one row of a fixed-width table.
pub trait Tabular {
    fn header() -> String;
    fn rule_width() -> usize;
    fn row(&self) -> String;
}

impl Tabular for Allocation {
    fn header() -> String {
        format!(
            "{:<12} {:<12} {:<8} {:<8} {:<8} {:<8}",
            "Namespace", "ResID", "CPU", "Memory", "GPU", "Total"
        )
    }

    fn rule_width() -> usize {
        60
    }

    fn row(&self) -> String {
        format!(
            "{:<12} {:<12} {:<8.2} {:<8.2} {:<8.2} {:<8.2}",
            self.namespace,
            self.resource_id,
            self.cpu_cost,
            self.memory_cost,
            self.gpu_cost,
            self.total_cost
        )
    }
}

impl Tabular for CloudCost {
    fn header() -> String {
        format!("{:<20} {:<10}", "Name", "Cost")
    }

    fn rule_width() -> usize {
        30
    }

    fn row(&self) -> String {
        format!("{:<20} {:<10.2}", self.name, self.total_cost)
    }
}

impl Tabular for Asset {
    fn header() -> String {
        format!("{:<10} {:<12} {:<20} {:<10}", "Provider", "Region", "Name", "Type")
    }

    fn rule_width() -> usize {
        55
    }

    fn row(&self) -> String {
        format!(
            "{:<10} {:<12} {:<20} {:<10}",
            self.provider, self.region, self.name, self.kind
        )
    }
}

/// Render the conversation metadata block.
pub fn render_meta<F>(meta: &QueryMeta<F>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session ID:           {}", meta.session_id);
    let _ = writeln!(out, "Previous Query:       {}", meta.previous_query);
    let _ = writeln!(
        out,
        "Conversation Context: [{}]",
        meta.conversation_context.join(", ")
    );
    let _ = writeln!(out, "Total Records:        {}", meta.total);
    out
}

/// Render records as a table, or a placeholder line when there are none.
pub fn render_records<R: Tabular>(records: &[R]) -> String {
    if records.is_empty() {
        return "(No data records returned.)\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", R::header());
    let _ = writeln!(out, "{}", "-".repeat(R::rule_width()));
    for record in records {
        let _ = writeln!(out, "{}", record.row());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;
    use crate::resources::CloudCostFilters;

    #[test]
    fn cloud_cost_rows_show_total_cost() {
        let table = render_records(&mock::cloud_costs());
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Name"));
        assert_eq!(lines[1], "-".repeat(30));
        assert!(lines[2].starts_with("prod-vm-1"));
        assert!(lines[2].contains("15.50"));
        assert!(lines[3].contains("11.50"));
    }

    #[test]
    fn allocation_rows_align_costs() {
        let table = render_records(&mock::allocations());
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("dev "));
        assert!(row.contains("pod-123"));
        assert!(row.contains("4.50"));
        assert!(row.trim_end().ends_with("5.70"));
    }

    #[test]
    fn asset_rows_include_type() {
        let table = render_records(&mock::assets());
        assert!(table.contains("Azure"));
        assert!(table.contains("Database"));
    }

    #[test]
    fn empty_records_render_placeholder() {
        let table = render_records::<Asset>(&[]);
        assert_eq!(table, "(No data records returned.)\n");
    }

    #[test]
    fn meta_lists_context_in_order() {
        let meta = QueryMeta {
            filters_used: CloudCostFilters::default(),
            session_id: "s1".into(),
            previous_query: "Q1".into(),
            conversation_context: vec!["Q1".into(), "Q2".into()],
            total: 2,
        };
        let rendered = render_meta(&meta);

        assert!(rendered.contains("Session ID:           s1"));
        assert!(rendered.contains("Previous Query:       Q1"));
        assert!(rendered.contains("[Q1, Q2]"));
        assert!(rendered.contains("Total Records:        2"));
    }
}
