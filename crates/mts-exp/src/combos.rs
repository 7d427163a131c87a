use std::fmt::{self, Display};
use std::iter::FusedIterator;

use mts_core::params::{fields, ParamValue};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::filter::ConstraintTable;
use crate::spec::SpecParam;

/// Fully resolved assignment of one value to every specification parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    entries: Vec<(String, ParamValue)>,
}

impl Combination {
    /// Builds a combination from ordered `(name, value)` entries.
    pub fn new(entries: Vec<(String, ParamValue)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Numeric view of a field; `None` when absent or not a number.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    /// Raw `policy_type` value when it is text.
    pub fn policy_name(&self) -> Option<&str> {
        self.get(fields::POLICY_TYPE).and_then(ParamValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ParamValue)> for Combination {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for Combination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Lazy, single-pass Cartesian product over a specification.
///
/// The last parameter varies fastest. Combinations rejected by the
/// constraint table are counted in [`Combinations::pruned`] and never yielded.
/// Re-enumeration requires a fresh iterator.
#[derive(Debug)]
pub struct Combinations<'a> {
    params: &'a [SpecParam],
    table: ConstraintTable,
    cursor: Option<Vec<usize>>,
    yielded: usize,
    pruned: usize,
}

impl<'a> Combinations<'a> {
    pub(crate) fn new(params: &'a [SpecParam], table: ConstraintTable) -> Self {
        let cursor = if params.is_empty() || params.iter().any(|param| param.values.is_empty()) {
            None
        } else {
            Some(vec![0; params.len()])
        };
        Self {
            params,
            table,
            cursor,
            yielded: 0,
            pruned: 0,
        }
    }

    /// Number of combinations yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Number of combinations discarded by the constraint table so far.
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    fn current(&self) -> Option<Combination> {
        let indices = self.cursor.as_ref()?;
        Some(
            self.params
                .iter()
                .zip(indices)
                .map(|(param, &idx)| (param.name.clone(), param.values[idx].clone()))
                .collect(),
        )
    }

    fn advance(&mut self) {
        let Some(indices) = self.cursor.as_mut() else {
            return;
        };
        for pos in (0..indices.len()).rev() {
            indices[pos] += 1;
            if indices[pos] < self.params[pos].values.len() {
                return;
            }
            indices[pos] = 0;
        }
        self.cursor = None;
    }
}

impl Iterator for Combinations<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let combination = self.current()?;
            self.advance();
            match self.table.violation(&combination) {
                Some(rule) => {
                    self.pruned += 1;
                    debug!(rule, combination = %combination, "pruned invalid combination");
                }
                None => {
                    self.yielded += 1;
                    return Some(combination);
                }
            }
        }
    }
}

impl FusedIterator for Combinations<'_> {}
