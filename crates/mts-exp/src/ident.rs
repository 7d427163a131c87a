use mts_core::params::{fields, PolicyType};

use crate::config::RunConfig;

/// Separator placed between identifier components.
pub const SEPARATOR: char = '_';

/// Fields embedded in every identifier, in order.
pub const COMMON_IDENTIFIER_FIELDS: [&str; 7] = [
    fields::PATTERN,
    fields::CLIENT_TIER_SIZES,
    fields::SERVER_MEM_SIZES,
    fields::BUFFER_SIZE,
    fields::SCAN_INTERVAL,
    fields::SAMPLE_RATE,
    fields::POLICY_TYPE,
];

/// Every field that contributes to the identifier of a `policy` run.
pub fn identifier_fields(policy: PolicyType) -> Vec<&'static str> {
    COMMON_IDENTIFIER_FIELDS
        .iter()
        .copied()
        .chain(policy.fields().iter().map(|field| field.name))
        .collect()
}

/// Derives the filesystem-safe name used for a run's artefacts.
pub fn build_identifier(config: &RunConfig) -> String {
    let mut parts = vec![
        sanitize(&config.pattern),
        sanitize(&config.client_tier_sizes),
        sanitize(&config.server_mem_sizes),
        format!("buf{}", config.buffer_size),
        sanitize(&format!("scan{}", config.scan_interval)),
        sanitize(&format!("sample{}", config.sample_rate)),
        config.policy_type.as_str().to_string(),
    ];
    for (field, value) in config.policy_values() {
        parts.push(sanitize(&format!("{}{}", field.tag, value)));
    }
    parts.join(&SEPARATOR.to_string())
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|ch| match ch {
            ' ' | ',' | '/' | '\\' | '\t' => '-',
            other => other,
        })
        .collect()
}
