use serde::{Deserialize, Serialize};

/// The four transformation rule kinds (spec.md §4.12). `EXACT` maps one
/// literal group name to one entitlement; `REGEX` captures groups from a
/// pattern and substitutes them into a template; `HIERARCHICAL` maps a
/// `/`-delimited group path to a nested entitlement path; `CONDITIONAL`
/// only fires when a secondary attribute predicate holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RuleKind {
    Exact {
        group_name: String,
        entitlement: String,
    },
    Regex {
        pattern: String,
        entitlement_template: String,
    },
    Hierarchical {
        path_separator: String,
        entitlement_template: String,
    },
    Conditional {
        group_name: String,
        entitlement: String,
        attribute: String,
        expected_value: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationRule {
    pub id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub kind: RuleKind,
}
