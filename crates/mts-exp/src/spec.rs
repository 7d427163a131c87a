use std::fs;
use std::path::{Path, PathBuf};

use mts_core::errors::{ErrorInfo, SweepError};
use mts_core::params::{fields, ParamValue};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::canonical::stable_hash_string;
use crate::combos::Combinations;
use crate::filter::ConstraintTable;

fn spec_error(code: &str, message: impl Into<String>) -> SweepError {
    SweepError::Spec(ErrorInfo::new(code, message))
}

/// One parameter of a normalized specification and its candidate values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecParam {
    pub name: String,
    pub values: Vec<ParamValue>,
}

/// Sweep specification with every value lifted to an ordered sequence.
///
/// Parameter order follows the source document and drives the enumeration
/// order of [`Combinations`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepSpec {
    params: Vec<SpecParam>,
}

impl SweepSpec {
    /// Creates an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the candidate values of `name`, keeping its original position if present.
    pub fn with_values<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let name = name.into();
        let values: Vec<ParamValue> = values.into_iter().map(Into::into).collect();
        match self.params.iter_mut().find(|param| param.name == name) {
            Some(existing) => existing.values = values,
            None => self.params.push(SpecParam { name, values }),
        }
        self
    }

    /// Scalar shorthand for [`SweepSpec::with_values`].
    pub fn with_value(self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.with_values(name, [value.into()])
    }

    /// Normalizes a loaded YAML mapping: scalars become one-element sequences.
    pub fn normalize(raw: &Mapping) -> Result<Self, SweepError> {
        let mut params = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let name = match key {
                Value::String(name) => name.clone(),
                other => {
                    return Err(SweepError::Spec(
                        ErrorInfo::new("spec_key", "parameter names must be strings")
                            .with_context("key", format!("{other:?}")),
                    ))
                }
            };
            let values = match value {
                Value::Sequence(items) => items
                    .iter()
                    .map(|item| scalar(&name, item))
                    .collect::<Result<Vec<_>, _>>()?,
                other => vec![scalar(&name, other)?],
            };
            params.push(SpecParam { name, values });
        }
        Ok(Self { params })
    }

    /// Parses and normalizes a YAML document.
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self, SweepError> {
        let document: Value = serde_yaml::from_slice(bytes)
            .map_err(|err| spec_error("spec_yaml", err.to_string()))?;
        let spec = match document {
            Value::Mapping(mapping) => Self::normalize(&mapping)?,
            Value::Null => Self::new(),
            other => {
                return Err(SweepError::Spec(
                    ErrorInfo::new("spec_shape", "specification must be a mapping")
                        .with_context("found", yaml_kind(&other)),
                ))
            }
        };
        if spec.is_empty() {
            return Err(spec_error("spec_empty", "specification defines no parameters"));
        }
        Ok(spec)
    }

    /// Parameters in document order.
    pub fn params(&self) -> &[SpecParam] {
        &self.params
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&SpecParam> {
        self.params.iter().find(|param| param.name == name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Size of the unfiltered Cartesian product (saturating).
    pub fn product_size(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params
            .iter()
            .fold(1usize, |acc, param| acc.saturating_mul(param.values.len()))
    }

    /// Parameter names the benchmark driver does not forward.
    pub fn unrecognized_fields(&self) -> Vec<&str> {
        self.params
            .iter()
            .map(|param| param.name.as_str())
            .filter(|name| !fields::is_recognized(name))
            .collect()
    }

    /// Stable digest of the normalized specification.
    pub fn spec_hash(&self) -> Result<String, SweepError> {
        stable_hash_string(&self.params)
    }

    /// Lazily enumerates valid combinations using the standard constraint table.
    pub fn combinations(&self) -> Combinations<'_> {
        self.combinations_with(ConstraintTable::default())
    }

    /// Lazily enumerates combinations admitted by `table`.
    pub fn combinations_with(&self, table: ConstraintTable) -> Combinations<'_> {
        Combinations::new(&self.params, table)
    }
}

fn scalar(name: &str, value: &Value) -> Result<ParamValue, SweepError> {
    match value {
        Value::Bool(flag) => Ok(ParamValue::Bool(*flag)),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(ParamValue::Int(int))
            } else if let Some(float) = number.as_f64() {
                Ok(ParamValue::Float(float))
            } else {
                Err(SweepError::Spec(
                    ErrorInfo::new("spec_number", "numeric value out of range")
                        .with_context("field", name),
                ))
            }
        }
        Value::String(text) => Ok(ParamValue::Text(text.clone())),
        other => Err(SweepError::Spec(
            ErrorInfo::new("spec_value", "unsupported value shape")
                .with_context("field", name)
                .with_context("found", yaml_kind(other))
                .with_hint("values must be scalars or flat lists of scalars"),
        )),
    }
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

/// Conventional location of an experiment specification.
pub fn spec_path(experiment_dir: &Path, experiment: &str) -> PathBuf {
    experiment_dir.join(format!("{experiment}.yaml"))
}

/// Loads and normalizes the specification at `path`.
pub fn load_spec<P: AsRef<Path>>(path: P) -> Result<SweepSpec, SweepError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SweepError::Spec(
            ErrorInfo::new("spec_missing", "experiment specification not found")
                .with_context("path", path.display().to_string()),
        ));
    }
    let bytes = fs::read(path).map_err(|err| {
        SweepError::Io(
            ErrorInfo::new("spec_read", "failed to read experiment specification")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    SweepSpec::from_yaml_slice(&bytes).map_err(|err| match err {
        SweepError::Spec(info) => {
            SweepError::Spec(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}
