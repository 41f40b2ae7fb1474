//! Per-block validation hooks.
//!
//! A definition can carry two kinds of extra checks beyond the generic
//! validator rules: declarative [`Check`]s written in its description file,
//! and an attached [`CustomValidator`] for anything the declarative rules
//! cannot express. Both produce [`Finding`]s that the validator turns into
//! issues against the block.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::definition::BlockDefinition;
use crate::value::Value;

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks generation.
    #[default]
    Error,
    /// Reported, does not block generation.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// One result of a block-level check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// How serious it is.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl Finding {
    /// An error finding.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// A warning finding.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// What a check sees of one block instance.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Instance id.
    pub block_id: &'a str,
    /// The block's definition.
    pub definition: &'a BlockDefinition,
    /// Raw parameter expressions.
    pub expressions: &'a BTreeMap<String, String>,
    /// Parameter values that evaluated successfully.
    pub values: &'a BTreeMap<String, Value>,
}

/// Extra validation attached to a block definition.
pub trait CustomValidator: Send + Sync + fmt::Debug {
    /// Returns every problem found with the block. An empty list means valid.
    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Finding>;
}

/// Built-in rules usable from description files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CheckRule {
    /// Value must be an odd integer.
    Odd,
    /// Value must be a number greater than zero.
    Positive,
    /// Value must be a number greater than or equal to zero.
    NonNegative,
    /// Value must be a number within `[min, max]`.
    Range {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Value must be a non-empty string or list.
    NonEmpty,
}

impl Eq for CheckRule {}

impl CheckRule {
    fn holds(&self, value: &Value) -> bool {
        match self {
            CheckRule::Odd => value.as_integer().is_some_and(|n| n % 2 != 0),
            CheckRule::Positive => value.as_number().is_some_and(|n| n > 0.0),
            CheckRule::NonNegative => value.as_number().is_some_and(|n| n >= 0.0),
            CheckRule::Range { min, max } => value
                .as_number()
                .is_some_and(|n| (*min..=*max).contains(&n)),
            CheckRule::NonEmpty => match value {
                Value::Str(s) => !s.is_empty(),
                Value::List(items) => !items.is_empty(),
                _ => true,
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            CheckRule::Odd => "must be odd".to_string(),
            CheckRule::Positive => "must be positive".to_string(),
            CheckRule::NonNegative => "must not be negative".to_string(),
            CheckRule::Range { min, max } => format!(
                "must be between {} and {}",
                Value::Number(*min),
                Value::Number(*max)
            ),
            CheckRule::NonEmpty => "must not be empty".to_string(),
        }
    }
}

/// A declarative rule applied to one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    /// Parameter id the rule applies to.
    pub param: String,
    /// The rule.
    #[serde(flatten)]
    pub rule: CheckRule,
    /// Severity when the rule fails.
    #[serde(default)]
    pub severity: Severity,
    /// Message overriding the generated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Check {
    /// An error-severity check with a generated message.
    pub fn new(param: impl Into<String>, rule: CheckRule) -> Self {
        Self {
            param: param.into(),
            rule,
            severity: Severity::Error,
            message: None,
        }
    }

    /// Downgrades the check to a warning.
    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }
}

/// Adapts a list of declarative checks to [`CustomValidator`].
///
/// Parameters without an evaluated value are skipped; their evaluation
/// failure is reported elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct DeclarativeChecks<'a>(pub &'a [Check]);

impl CustomValidator for DeclarativeChecks<'_> {
    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Finding> {
        self.0
            .iter()
            .filter_map(|check| {
                let value = ctx.values.get(&check.param)?;
                if check.rule.holds(value) {
                    return None;
                }
                let message = check.message.clone().unwrap_or_else(|| {
                    format!("param '{}' {} (got {value})", check.param, check.rule.describe())
                });
                Some(Finding {
                    severity: check.severity,
                    message,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::BlockKind;

    fn run(checks: &[Check], values: &[(&str, Value)]) -> Vec<Finding> {
        let def = BlockDefinition::new("fir", BlockKind::Block);
        let expressions = BTreeMap::new();
        let values: BTreeMap<String, Value> = values
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        let ctx = CheckContext {
            block_id: "b1",
            definition: &def,
            expressions: &expressions,
            values: &values,
        };
        DeclarativeChecks(checks).check(&ctx)
    }

    #[test]
    fn test_odd_rule() {
        let checks = [Check::new("taps", CheckRule::Odd)];
        assert!(run(&checks, &[("taps", Value::Number(31.0))]).is_empty());
        let findings = run(&checks, &[("taps", Value::Number(32.0))]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].message, "param 'taps' must be odd (got 32)");
    }

    #[test]
    fn test_range_rule_is_inclusive() {
        let checks = [Check::new("gain", CheckRule::Range { min: 0.0, max: 1.0 })];
        assert!(run(&checks, &[("gain", Value::Number(1.0))]).is_empty());
        assert_eq!(run(&checks, &[("gain", Value::Number(1.5))]).len(), 1);
    }

    #[test]
    fn test_warning_severity_and_custom_message() {
        let mut check = Check::new("name", CheckRule::NonEmpty).warning();
        check.message = Some("name is blank".into());
        let findings = run(&[check], &[("name", Value::from(""))]);
        assert_eq!(findings, vec![Finding::warning("name is blank")]);
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let checks = [Check::new("rate", CheckRule::Positive)];
        assert!(run(&checks, &[]).is_empty());
    }

    #[test]
    fn test_severity_orders_errors_first() {
        assert!(Severity::Error < Severity::Warning);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
