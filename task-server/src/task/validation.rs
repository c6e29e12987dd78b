//! Field-level validation of tasks against an explicit rule table.
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::task::Task;

/// A single failed rule on a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Name of the offending field, as it appears on the wire.
    pub field: &'static str,
    /// Tag of the rule that failed, e.g. `required`.
    pub rule: &'static str,
    /// Description of what the rule expects.
    pub expected: &'static str,
    /// The rejected value.
    pub received: Value,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}' failed validation on the '{}' rule",
            self.field, self.rule
        )
    }
}

struct FieldRule {
    field: &'static str,
    rule: &'static str,
    expected: &'static str,
    holds: fn(&Task) -> bool,
    value: fn(&Task) -> Value,
}

const RULES: &[FieldRule] = &[FieldRule {
    field: "title",
    rule: "required",
    expected: "string",
    holds: title_is_present,
    value: title_value,
}];

fn title_is_present(task: &Task) -> bool {
    !task.title().is_empty()
}

fn title_value(task: &Task) -> Value {
    Value::String(task.title().to_string())
}

/// Checks a task against every rule and returns the violations found.
///
/// An empty result means the task is valid.
pub fn validate(task: &Task) -> Vec<FieldViolation> {
    RULES
        .iter()
        .filter(|rule| !(rule.holds)(task))
        .map(|rule| FieldViolation {
            field: rule.field,
            rule: rule.rule,
            expected: rule.expected,
            received: (rule.value)(task),
        })
        .collect()
}
