use std::collections::BTreeSet;

use mts_core::params::{fields, ParamValue, PolicyType};
use serde::Serialize;

use crate::ident::identifier_fields;
use crate::spec::SweepSpec;

/// A field that takes several values but does not reach the identifier of `policy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncoveredField {
    pub field: String,
    pub policy: PolicyType,
    pub distinct_values: usize,
    /// Whether the benchmark receives the field. Forwarded fields make two
    /// different invocations share one set of output files; the rest only
    /// produce redundant duplicates.
    pub forwarded: bool,
}

/// Lists varying fields that the identifier of some enumerated policy ignores.
pub fn uncovered_fields(spec: &SweepSpec) -> Vec<UncoveredField> {
    let policies: BTreeSet<PolicyType> = spec
        .get(fields::POLICY_TYPE)
        .map(|param| {
            param
                .values
                .iter()
                .filter_map(ParamValue::as_str)
                .filter_map(|name| name.parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let mut gaps = Vec::new();
    for param in spec.params() {
        let distinct_values = param
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<BTreeSet<_>>()
            .len();
        if distinct_values < 2 {
            continue;
        }
        for policy in &policies {
            if identifier_fields(*policy).contains(&param.name.as_str()) {
                continue;
            }
            gaps.push(UncoveredField {
                field: param.name.clone(),
                policy: *policy,
                distinct_values,
                forwarded: fields::COMMON_REQUIRED.contains(&param.name.as_str())
                    || policy.requires(&param.name),
            });
        }
    }
    gaps
}
