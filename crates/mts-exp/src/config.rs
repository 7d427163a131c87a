use mts_core::errors::{ErrorInfo, SweepError};
use mts_core::params::{fields, ParamValue, PolicyField, PolicyType};
use serde::Serialize;

use crate::combos::Combination;

/// Typed configuration for a single benchmark run.
///
/// Policy-specific fields are optional in the type; [`RunConfig::from_combination`]
/// guarantees every field required by `policy_type` is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub pattern: String,
    pub client_tier_sizes: String,
    pub server_mem_sizes: String,
    pub buffer_size: u64,
    pub running_time: ParamValue,
    pub policy_type: PolicyType,
    pub num_tiers: u64,
    pub scan_interval: ParamValue,
    pub sample_rate: ParamValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_threshold: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cold_threshold: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_count: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cold_count: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recency_weight: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_weight: Option<ParamValue>,
}

impl RunConfig {
    /// Validates `combination` and lifts it into a typed record.
    pub fn from_combination(combination: &Combination) -> Result<Self, SweepError> {
        let policy_type = match required(combination, fields::POLICY_TYPE, None)? {
            ParamValue::Text(name) => name.parse::<PolicyType>()?,
            other => return Err(invalid_type(fields::POLICY_TYPE, "text", other)),
        };
        let policy = Some(policy_type);

        let mut config = Self {
            pattern: text(combination, fields::PATTERN, policy)?,
            client_tier_sizes: sizes(combination, fields::CLIENT_TIER_SIZES, policy)?,
            server_mem_sizes: sizes(combination, fields::SERVER_MEM_SIZES, policy)?,
            buffer_size: count(combination, fields::BUFFER_SIZE, policy)?,
            running_time: number(combination, fields::RUNNING_TIME, policy)?,
            policy_type,
            num_tiers: count(combination, fields::NUM_TIERS, policy)?,
            scan_interval: number(combination, fields::SCAN_INTERVAL, policy)?,
            sample_rate: number(combination, fields::SAMPLE_RATE, policy)?,
            hot_threshold: None,
            cold_threshold: None,
            hot_count: None,
            cold_count: None,
            recency_weight: None,
            frequency_weight: None,
        };
        for field in policy_type.fields() {
            let value = Some(number(combination, field.name, policy)?);
            match field.name {
                fields::HOT_THRESHOLD => config.hot_threshold = value,
                fields::COLD_THRESHOLD => config.cold_threshold = value,
                fields::HOT_COUNT => config.hot_count = value,
                fields::COLD_COUNT => config.cold_count = value,
                fields::RECENCY_WEIGHT => config.recency_weight = value,
                fields::FREQUENCY_WEIGHT => config.frequency_weight = value,
                _ => {}
            }
        }
        Ok(config)
    }

    /// Value of a policy-specific field by specification name.
    pub fn policy_value(&self, name: &str) -> Option<&ParamValue> {
        match name {
            fields::HOT_THRESHOLD => self.hot_threshold.as_ref(),
            fields::COLD_THRESHOLD => self.cold_threshold.as_ref(),
            fields::HOT_COUNT => self.hot_count.as_ref(),
            fields::COLD_COUNT => self.cold_count.as_ref(),
            fields::RECENCY_WEIGHT => self.recency_weight.as_ref(),
            fields::FREQUENCY_WEIGHT => self.frequency_weight.as_ref(),
            _ => None,
        }
    }

    /// Policy fields paired with their values, in identifier/argument order.
    pub fn policy_values(&self) -> Vec<(&'static PolicyField, &ParamValue)> {
        self.policy_type
            .fields()
            .iter()
            .filter_map(|field| self.policy_value(field.name).map(|value| (field, value)))
            .collect()
    }
}

fn required<'a>(
    combination: &'a Combination,
    field: &str,
    policy: Option<PolicyType>,
) -> Result<&'a ParamValue, SweepError> {
    combination.get(field).ok_or_else(|| {
        let mut info = ErrorInfo::new("missing_required_field", "missing required field")
            .with_context("field", field);
        if let Some(policy) = policy {
            info = info.with_context("policy_type", policy.as_str());
        }
        SweepError::Config(info)
    })
}

fn invalid_type(field: &str, expected: &str, found: &ParamValue) -> SweepError {
    SweepError::Config(
        ErrorInfo::new("invalid_field_type", "field has the wrong type")
            .with_context("field", field)
            .with_context("expected", expected)
            .with_context("found", found.kind())
            .with_context("value", found.to_string()),
    )
}

fn text(
    combination: &Combination,
    field: &str,
    policy: Option<PolicyType>,
) -> Result<String, SweepError> {
    match required(combination, field, policy)? {
        ParamValue::Text(value) => Ok(value.clone()),
        other => Err(invalid_type(field, "text", other)),
    }
}

// Tier size lists are usually quoted strings ("10 20 30") but a single size
// may arrive as a bare integer.
fn sizes(
    combination: &Combination,
    field: &str,
    policy: Option<PolicyType>,
) -> Result<String, SweepError> {
    match required(combination, field, policy)? {
        value @ (ParamValue::Text(_) | ParamValue::Int(_)) => Ok(value.to_string()),
        other => Err(invalid_type(field, "text", other)),
    }
}

fn count(
    combination: &Combination,
    field: &str,
    policy: Option<PolicyType>,
) -> Result<u64, SweepError> {
    let value = required(combination, field, policy)?;
    value
        .as_u64()
        .ok_or_else(|| invalid_type(field, "non-negative integer", value))
}

fn number(
    combination: &Combination,
    field: &str,
    policy: Option<PolicyType>,
) -> Result<ParamValue, SweepError> {
    let value = required(combination, field, policy)?;
    if value.is_numeric() {
        Ok(value.clone())
    } else {
        Err(invalid_type(field, "number", value))
    }
}
