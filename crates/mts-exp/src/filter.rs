use mts_core::params::{fields, PolicyType};

use crate::combos::Combination;

/// Predicate over a combination. `None` means the rule cannot be evaluated
/// (missing or non-numeric field); such combinations are not rejected here.
pub type Predicate = fn(&Combination) -> Option<bool>;

/// Cross-field constraint applying to a set of policy names.
#[derive(Debug, Clone)]
pub struct ConstraintRule {
    pub name: &'static str,
    pub policies: Vec<String>,
    pub predicate: Predicate,
}

impl ConstraintRule {
    pub fn new(
        name: &'static str,
        policies: impl IntoIterator<Item = impl Into<String>>,
        predicate: Predicate,
    ) -> Self {
        Self {
            name,
            policies: policies.into_iter().map(Into::into).collect(),
            predicate,
        }
    }

    fn applies_to(&self, policy: &str) -> bool {
        self.policies.iter().any(|p| p == policy)
    }
}

/// Validity predicates keyed by `policy_type`.
///
/// Policies without registered rules pass through unfiltered.
#[derive(Debug, Clone)]
pub struct ConstraintTable {
    rules: Vec<ConstraintRule>,
}

impl ConstraintTable {
    /// Table with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule; rules are evaluated in registration order.
    pub fn register(&mut self, rule: ConstraintRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ConstraintRule] {
        &self.rules
    }

    /// Name of the first applicable rule that rejects `combination`.
    pub fn violation(&self, combination: &Combination) -> Option<&'static str> {
        let policy = combination.policy_name()?;
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(policy))
            .find(|rule| (rule.predicate)(combination) == Some(false))
            .map(|rule| rule.name)
    }

    pub fn admits(&self, combination: &Combination) -> bool {
        self.violation(combination).is_none()
    }
}

impl Default for ConstraintTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table
            .register(ConstraintRule::new(
                "cold_threshold_not_before_hot",
                [PolicyType::Lru.as_str(), PolicyType::Hybrid.as_str()],
                cold_threshold_not_before_hot,
            ))
            .register(ConstraintRule::new(
                "cold_count_not_above_hot",
                [PolicyType::Frequency.as_str(), PolicyType::Hybrid.as_str()],
                cold_count_not_above_hot,
            ));
        table
    }
}

fn cold_threshold_not_before_hot(combination: &Combination) -> Option<bool> {
    let hot = combination.number(fields::HOT_THRESHOLD)?;
    let cold = combination.number(fields::COLD_THRESHOLD)?;
    Some(cold >= hot)
}

fn cold_count_not_above_hot(combination: &Combination) -> Option<bool> {
    let hot = combination.number(fields::HOT_COUNT)?;
    let cold = combination.number(fields::COLD_COUNT)?;
    Some(cold <= hot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mts_core::ParamValue;

    fn combo(entries: &[(&str, ParamValue)]) -> Combination {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn lru_rejects_cold_before_hot() {
        let table = ConstraintTable::default();
        let rejected = combo(&[
            ("policy_type", "lru".into()),
            ("hot_threshold", 5.into()),
            ("cold_threshold", 3.into()),
        ]);
        assert_eq!(table.violation(&rejected), Some("cold_threshold_not_before_hot"));
        let equal = combo(&[
            ("policy_type", "lru".into()),
            ("hot_threshold", 5.into()),
            ("cold_threshold", 5.into()),
        ]);
        assert!(table.admits(&equal));
    }

    #[test]
    fn hybrid_checks_both_rules() {
        let table = ConstraintTable::default();
        let rejected = combo(&[
            ("policy_type", "hybrid".into()),
            ("hot_threshold", 5.into()),
            ("cold_threshold", 10.into()),
            ("hot_count", 2.into()),
            ("cold_count", 4.into()),
        ]);
        assert_eq!(table.violation(&rejected), Some("cold_count_not_above_hot"));
    }

    #[test]
    fn unknown_policy_and_missing_fields_pass() {
        let table = ConstraintTable::default();
        let unknown = combo(&[
            ("policy_type", "clock".into()),
            ("hot_threshold", 5.into()),
            ("cold_threshold", 3.into()),
        ]);
        assert!(table.admits(&unknown));
        let missing = combo(&[("policy_type", "lru".into()), ("hot_threshold", 5.into())]);
        assert!(table.admits(&missing));
    }

    #[test]
    fn rules_can_be_registered() {
        let mut table = ConstraintTable::default();
        table.register(ConstraintRule::new("no_clock", ["clock"], |_| Some(false)));
        let clock = combo(&[("policy_type", "clock".into())]);
        assert_eq!(table.violation(&clock), Some("no_clock"));
    }
}
