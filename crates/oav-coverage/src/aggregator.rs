//! # Coverage Aggregation
//!
//! Tracks, per specification file, which declared operations were exercised
//! by traffic and which of those failed validation, then rolls the counts up
//! into [`OperationCoverageInfo`] records.
//!
//! ## Invariants
//!
//! - Declared operations are collected before any sample is recorded.
//! - An operation recorded as covered stays covered; later failures only add
//!   it to the failing set.
//! - Specifications never matched by a sample, and specifications declaring
//!   no operations, are left out of the report.
//! - Every list in the report is sorted lexically; uncovered batches are
//!   sorted by group key.

use std::collections::{BTreeMap, BTreeSet};

use oav_spec::SpecGraph;
use serde::{Deserialize, Serialize};

use crate::traffic::CallPlane;

#[derive(Debug, Clone, Default)]
struct SpecCoverage {
    api_version: String,
    declared: BTreeSet<String>,
    covered: BTreeSet<String>,
    failed: BTreeSet<String>,
    is_match: bool,
}

/// Uncovered operations sharing the identifier prefix before the first `_`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredBatch {
    /// Group key, the identifier up to its first underscore.
    pub key: String,
    /// Full identifiers, sorted.
    pub operation_id_list: Vec<String>,
}

/// Coverage rollup for one specification file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCoverageInfo {
    /// Specification file.
    pub spec: String,
    /// `info.version` of the specification.
    pub api_version: String,
    /// Operations exercised by at least one sample.
    pub covered_operations: usize,
    /// Exercised operations with at least one failing sample.
    pub validation_fail_operations: usize,
    /// Operations never exercised.
    pub un_covered_operations: usize,
    /// Declared operations.
    pub total_operations: usize,
    /// `covered_operations / total_operations`.
    pub coverage_rate: f64,
    /// Exercised operation identifiers, sorted.
    pub covered_operations_list: Vec<String>,
    /// Failing operation identifiers, sorted.
    pub validation_fail_operations_list: Vec<String>,
    /// Unexercised operation identifiers, sorted.
    pub un_covered_operations_list: Vec<String>,
    /// Unexercised operations grouped by identifier prefix.
    pub un_covered_operations_list_gen: Vec<UncoveredBatch>,
}

/// Accumulates coverage across a traffic run.
#[derive(Debug, Clone, Default)]
pub struct CoverageAggregator {
    specs: BTreeMap<String, SpecCoverage>,
    undefined: usize,
}

impl CoverageAggregator {
    /// Empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded specification and its declared operations.
    pub fn declare_spec(&mut self, graph: &SpecGraph) {
        let entry = self.specs.entry(graph.file_path.clone()).or_default();
        entry.api_version = graph.api_version.clone();
        graph.traverse(|op| {
            if let Some(id) = &op.operation_id {
                entry.declared.insert(id.clone());
            }
        });
    }

    /// Specification files owning a sample's operation.
    ///
    /// A specification owns the sample when it declares `operation_id`, its
    /// version equals `api_version` or its path contains it, and, for a
    /// control-plane call, its path contains the provider namespace
    /// (case-insensitively). Without an `api_version` the identifier alone
    /// decides.
    pub fn owning_specs(
        &self,
        operation_id: &str,
        api_version: Option<&str>,
        plane: &CallPlane,
    ) -> Vec<String> {
        self.specs
            .iter()
            .filter(|(path, spec)| {
                if !spec.declared.contains(operation_id) {
                    return false;
                }
                if let Some(version) = api_version {
                    if spec.api_version != version && !path.contains(version) {
                        return false;
                    }
                }
                match plane {
                    CallPlane::ControlPlane { provider } => path
                        .to_ascii_lowercase()
                        .contains(&provider.to_ascii_lowercase()),
                    CallPlane::DataPlane => true,
                }
            })
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Record that a sample exercised `operation_id` of `spec`.
    pub fn record(&mut self, spec: &str, operation_id: &str, failed: bool) {
        let Some(entry) = self.specs.get_mut(spec) else {
            tracing::warn!(spec, operation_id, "coverage recorded for undeclared specification");
            return;
        };
        entry.is_match = true;
        entry.covered.insert(operation_id.to_string());
        if failed {
            entry.failed.insert(operation_id.to_string());
        }
    }

    /// Count a sample no specification owns.
    pub fn record_undefined(&mut self) {
        self.undefined += 1;
    }

    /// Samples no specification owned.
    pub fn undefined_count(&self) -> usize {
        self.undefined
    }

    /// Roll up per-specification coverage, ordered by specification path.
    pub fn report(&self) -> Vec<OperationCoverageInfo> {
        self.specs
            .iter()
            .filter(|(_, spec)| spec.is_match && !spec.declared.is_empty())
            .map(|(path, spec)| {
                let total = spec.declared.len();
                let covered: Vec<String> = spec
                    .covered
                    .iter()
                    .filter(|id| spec.declared.contains(*id))
                    .cloned()
                    .collect();
                let failed: Vec<String> = spec
                    .failed
                    .iter()
                    .filter(|id| spec.declared.contains(*id))
                    .cloned()
                    .collect();
                let uncovered: Vec<String> = spec
                    .declared
                    .difference(&spec.covered)
                    .cloned()
                    .collect();
                OperationCoverageInfo {
                    spec: path.clone(),
                    api_version: spec.api_version.clone(),
                    covered_operations: covered.len(),
                    validation_fail_operations: failed.len(),
                    un_covered_operations: uncovered.len(),
                    total_operations: total,
                    coverage_rate: covered.len() as f64 / total as f64,
                    un_covered_operations_list_gen: batch_by_group(&uncovered),
                    covered_operations_list: covered,
                    validation_fail_operations_list: failed,
                    un_covered_operations_list: uncovered,
                }
            })
            .collect()
    }
}

/// Group sorted identifiers by the prefix before their first `_`.
fn batch_by_group(ids: &[String]) -> Vec<UncoveredBatch> {
    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for id in ids {
        let key = id.split('_').next().unwrap_or(id);
        groups.entry(key).or_default().push(id.clone());
    }
    groups
        .into_iter()
        .map(|(key, operation_id_list)| UncoveredBatch {
            key: key.to_string(),
            operation_id_list,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oav_spec::SwaggerLoader;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    fn graph(file: &str, version: &str, ids: &[&str]) -> SpecGraph {
        let mut paths = Map::new();
        for (i, id) in ids.iter().enumerate() {
            paths.insert(
                format!("/r{i}"),
                json!({"get": {"operationId": id, "responses": {"200": {"description": "ok"}}}}),
            );
        }
        let doc = json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": version},
            "paths": Value::Object(paths)
        });
        SwaggerLoader::new().load_document(file, &doc).unwrap()
    }

    const TEN: [&str; 10] = [
        "Widgets_List",
        "Widgets_Get",
        "Widgets_Delete",
        "Gadgets_Get",
        "Gadgets_List",
        "Operations_List",
        "Widgets_Update",
        "Gadgets_Create",
        "Usages_List",
        "Widgets_Create",
    ];

    #[test]
    fn ten_operations_six_covered_two_failing() {
        let mut agg = CoverageAggregator::new();
        agg.declare_spec(&graph("specs/widgets.json", "2024-01-01", &TEN));
        for (id, failed) in [
            ("Widgets_Get", false),
            ("Widgets_List", true),
            ("Gadgets_Get", false),
            ("Widgets_Get", true),
            ("Operations_List", false),
            ("Widgets_Create", false),
            ("Gadgets_List", false),
            ("Widgets_List", false),
        ] {
            agg.record("specs/widgets.json", id, failed);
        }

        let report = agg.report();
        assert_eq!(report.len(), 1);
        let info = &report[0];
        assert_eq!(info.total_operations, 10);
        assert_eq!(info.covered_operations, 6);
        assert_eq!(info.validation_fail_operations, 2);
        assert_eq!(info.un_covered_operations, 4);
        assert_eq!(info.coverage_rate, 0.6);
        assert_eq!(
            info.covered_operations_list,
            vec![
                "Gadgets_Get",
                "Gadgets_List",
                "Operations_List",
                "Widgets_Create",
                "Widgets_Get",
                "Widgets_List"
            ]
        );
        assert_eq!(
            info.validation_fail_operations_list,
            vec!["Widgets_Get", "Widgets_List"]
        );
        assert_eq!(
            info.un_covered_operations_list,
            vec!["Gadgets_Create", "Usages_List", "Widgets_Delete", "Widgets_Update"]
        );
        let keys: Vec<_> = info
            .un_covered_operations_list_gen
            .iter()
            .map(|b| b.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Gadgets", "Usages", "Widgets"]);
        assert_eq!(
            info.un_covered_operations_list_gen[2].operation_id_list,
            vec!["Widgets_Delete", "Widgets_Update"]
        );
    }

    #[test]
    fn unmatched_and_empty_specs_are_excluded() {
        let mut agg = CoverageAggregator::new();
        agg.declare_spec(&graph("a.json", "1", &["A_Get"]));
        agg.declare_spec(&graph("b.json", "1", &["B_Get"]));
        agg.declare_spec(&graph("empty.json", "1", &[]));
        agg.record("a.json", "A_Get", false);
        agg.record("empty.json", "X", false);
        agg.record_undefined();
        let report = agg.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].spec, "a.json");
        assert_eq!(agg.undefined_count(), 1);
    }

    #[test]
    fn ownership_checks_version_and_provider() {
        let mut agg = CoverageAggregator::new();
        agg.declare_spec(&graph(
            "specification/compute/Microsoft.Compute/stable/2024-01-01/compute.json",
            "2024-01-01",
            &["VirtualMachines_Get"],
        ));
        agg.declare_spec(&graph(
            "specification/compute/Microsoft.Compute/stable/2023-01-01/compute.json",
            "2023-01-01",
            &["VirtualMachines_Get"],
        ));
        let compute = CallPlane::ControlPlane {
            provider: "microsoft.compute".into(),
        };
        let owners = agg.owning_specs("VirtualMachines_Get", Some("2024-01-01"), &compute);
        assert_eq!(owners.len(), 1);
        assert!(owners[0].contains("2024-01-01"));

        assert_eq!(agg.owning_specs("VirtualMachines_Get", None, &compute).len(), 2);

        let network = CallPlane::ControlPlane {
            provider: "Microsoft.Network".into(),
        };
        assert!(agg
            .owning_specs("VirtualMachines_Get", Some("2024-01-01"), &network)
            .is_empty());
        assert_eq!(
            agg.owning_specs("VirtualMachines_Get", Some("2024-01-01"), &CallPlane::DataPlane)
                .len(),
            1
        );
    }

    proptest! {
        #[test]
        fn coverage_rate_is_covered_over_total(
            total in 1usize..40,
            picks in prop::collection::vec((0usize..40, any::<bool>()), 0..60),
        ) {
            let ids: Vec<String> = (0..total).map(|i| format!("Group{}_Op{i}", i % 3)).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let mut agg = CoverageAggregator::new();
            agg.declare_spec(&graph("p.json", "1", &refs));
            agg.record("p.json", &ids[0], false);
            for (i, failed) in picks {
                agg.record("p.json", &ids[i % total], failed);
            }
            let info = agg.report().remove(0);
            prop_assert!(info.covered_operations <= info.total_operations);
            prop_assert_eq!(
                info.covered_operations + info.un_covered_operations,
                info.total_operations
            );
            prop_assert!(info.validation_fail_operations <= info.covered_operations);
            prop_assert_eq!(
                info.coverage_rate,
                info.covered_operations as f64 / info.total_operations as f64
            );
            let mut sorted = info.un_covered_operations_list.clone();
            sorted.sort();
            prop_assert_eq!(sorted, info.un_covered_operations_list);
        }
    }
}
