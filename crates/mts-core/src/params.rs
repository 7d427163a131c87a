//! Parameter values, policy types and the recognized field vocabulary.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SweepError};

/// Recognized specification field names.
pub mod fields {
    pub const PATTERN: &str = "pattern";
    pub const CLIENT_TIER_SIZES: &str = "client_tier_sizes";
    pub const SERVER_MEM_SIZES: &str = "server_mem_sizes";
    pub const BUFFER_SIZE: &str = "buffer_size";
    pub const RUNNING_TIME: &str = "running_time";
    pub const POLICY_TYPE: &str = "policy_type";
    pub const NUM_TIERS: &str = "num_tiers";
    pub const SCAN_INTERVAL: &str = "scan_interval";
    pub const SAMPLE_RATE: &str = "sample_rate";
    pub const HOT_THRESHOLD: &str = "hot_threshold";
    pub const COLD_THRESHOLD: &str = "cold_threshold";
    pub const HOT_COUNT: &str = "hot_count";
    pub const COLD_COUNT: &str = "cold_count";
    pub const RECENCY_WEIGHT: &str = "recency_weight";
    pub const FREQUENCY_WEIGHT: &str = "frequency_weight";

    /// Every field name the driver knows how to forward.
    pub const RECOGNIZED: [&str; 15] = [
        PATTERN,
        CLIENT_TIER_SIZES,
        SERVER_MEM_SIZES,
        BUFFER_SIZE,
        RUNNING_TIME,
        POLICY_TYPE,
        NUM_TIERS,
        SCAN_INTERVAL,
        SAMPLE_RATE,
        HOT_THRESHOLD,
        COLD_THRESHOLD,
        HOT_COUNT,
        COLD_COUNT,
        RECENCY_WEIGHT,
        FREQUENCY_WEIGHT,
    ];

    /// Fields every combination must carry regardless of policy.
    pub const COMMON_REQUIRED: [&str; 9] = [
        PATTERN,
        CLIENT_TIER_SIZES,
        SERVER_MEM_SIZES,
        BUFFER_SIZE,
        RUNNING_TIME,
        POLICY_TYPE,
        NUM_TIERS,
        SCAN_INTERVAL,
        SAMPLE_RATE,
    ];

    /// Returns true when `name` is part of the recognized vocabulary.
    pub fn is_recognized(name: &str) -> bool {
        RECOGNIZED.contains(&name)
    }
}

/// A single scalar taken from the sweep specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value; `None` for text and booleans.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(value) => Some(*value as f64),
            ParamValue::Float(value) => Some(*value),
            ParamValue::Bool(_) | ParamValue::Text(_) => None,
        }
    }

    /// Returns the value when it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Borrowed string view for text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// True for integers and floats.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Short lowercase label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "text",
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write_float(f, *value),
            ParamValue::Text(value) => f.write_str(value),
        }
    }
}

/// Writes `value` the way the benchmark's historical result names spell floats:
/// `1.0` keeps its decimal point and exponents are signed with two digits (`1e-05`).
fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return f.write_str("nan");
    }
    // Debug switches to exponent form at the same magnitudes (1e-4, 1e16).
    let debug = format!("{value:?}");
    match debug.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            write!(f, "{mantissa}e{sign}{digits:0>2}")
        }
        None => f.write_str(&debug),
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Policy-specific field forwarded to the benchmark and embedded in identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyField {
    /// Specification field name.
    pub name: &'static str,
    /// Command line flag understood by the benchmark executable.
    pub flag: &'static str,
    /// Short prefix used inside identifiers.
    pub tag: &'static str,
}

const HOT_THRESHOLD_FIELD: PolicyField = PolicyField {
    name: fields::HOT_THRESHOLD,
    flag: "--hot-threshold",
    tag: "h",
};
const COLD_THRESHOLD_FIELD: PolicyField = PolicyField {
    name: fields::COLD_THRESHOLD,
    flag: "--cold-threshold",
    tag: "c",
};
const HOT_COUNT_FIELD: PolicyField = PolicyField {
    name: fields::HOT_COUNT,
    flag: "--hot-count",
    tag: "hc",
};
const COLD_COUNT_FIELD: PolicyField = PolicyField {
    name: fields::COLD_COUNT,
    flag: "--cold-count",
    tag: "cc",
};
const RECENCY_WEIGHT_FIELD: PolicyField = PolicyField {
    name: fields::RECENCY_WEIGHT,
    flag: "--recency-weight",
    tag: "wr",
};
const FREQUENCY_WEIGHT_FIELD: PolicyField = PolicyField {
    name: fields::FREQUENCY_WEIGHT,
    flag: "--frequency-weight",
    tag: "wf",
};

const LRU_FIELDS: [PolicyField; 2] = [HOT_THRESHOLD_FIELD, COLD_THRESHOLD_FIELD];
const FREQUENCY_FIELDS: [PolicyField; 2] = [HOT_COUNT_FIELD, COLD_COUNT_FIELD];
const HYBRID_FIELDS: [PolicyField; 6] = [
    HOT_THRESHOLD_FIELD,
    COLD_THRESHOLD_FIELD,
    HOT_COUNT_FIELD,
    COLD_COUNT_FIELD,
    RECENCY_WEIGHT_FIELD,
    FREQUENCY_WEIGHT_FIELD,
];

/// Hot/cold eligibility rule used by the tiering engine under test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    Lru,
    Frequency,
    Hybrid,
}

impl PolicyType {
    /// All supported policies in declaration order.
    pub const ALL: [PolicyType; 3] = [PolicyType::Lru, PolicyType::Frequency, PolicyType::Hybrid];

    /// Wire name used in specifications and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Lru => "lru",
            PolicyType::Frequency => "frequency",
            PolicyType::Hybrid => "hybrid",
        }
    }

    /// Policy-specific fields in identifier and argument order.
    pub fn fields(&self) -> &'static [PolicyField] {
        match self {
            PolicyType::Lru => &LRU_FIELDS,
            PolicyType::Frequency => &FREQUENCY_FIELDS,
            PolicyType::Hybrid => &HYBRID_FIELDS,
        }
    }

    /// True when `field` must be present for this policy.
    pub fn requires(&self, field: &str) -> bool {
        self.fields().iter().any(|f| f.name == field)
    }
}

impl Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = SweepError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PolicyType::ALL
            .into_iter()
            .find(|policy| policy.as_str() == value)
            .ok_or_else(|| {
                SweepError::Config(
                    ErrorInfo::new("unknown_policy_type", "unsupported policy type")
                        .with_context("policy_type", value)
                        .with_hint("expected one of lru, frequency, hybrid"),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_render_with_decimal_point() {
        assert_eq!(ParamValue::Float(1.0).to_string(), "1.0");
        assert_eq!(ParamValue::Float(0.25).to_string(), "0.25");
        assert_eq!(ParamValue::Int(4096).to_string(), "4096");
        assert_eq!(ParamValue::from("10 20").to_string(), "10 20");
    }

    #[test]
    fn float_exponents_are_signed_and_padded() {
        assert_eq!(ParamValue::Float(1e-5).to_string(), "1e-05");
        assert_eq!(ParamValue::Float(1.5e-7).to_string(), "1.5e-07");
        assert_eq!(ParamValue::Float(1e16).to_string(), "1e+16");
        assert_eq!(ParamValue::Float(-2.5e120).to_string(), "-2.5e+120");
        assert_eq!(ParamValue::Float(0.0001).to_string(), "0.0001");
        assert_eq!(ParamValue::Float(f64::NAN).to_string(), "nan");
        assert_eq!(ParamValue::Float(f64::NEG_INFINITY).to_string(), "-inf");
    }

    #[test]
    fn negative_ints_are_not_u64() {
        assert_eq!(ParamValue::Int(-1).as_u64(), None);
        assert_eq!(ParamValue::Int(7).as_u64(), Some(7));
        assert_eq!(ParamValue::Float(7.0).as_u64(), None);
    }

    #[test]
    fn policy_parse_round_trip() {
        for policy in PolicyType::ALL {
            assert_eq!(policy.as_str().parse::<PolicyType>().unwrap(), policy);
        }
        let err = "lfu".parse::<PolicyType>().unwrap_err();
        assert_eq!(err.code(), "unknown_policy_type");
    }

    #[test]
    fn hybrid_requires_every_policy_field() {
        for field in [
            fields::HOT_THRESHOLD,
            fields::COLD_THRESHOLD,
            fields::HOT_COUNT,
            fields::COLD_COUNT,
            fields::RECENCY_WEIGHT,
            fields::FREQUENCY_WEIGHT,
        ] {
            assert!(PolicyType::Hybrid.requires(field));
        }
        assert!(!PolicyType::Lru.requires(fields::HOT_COUNT));
        assert!(!PolicyType::Frequency.requires(fields::COLD_THRESHOLD));
    }
}
