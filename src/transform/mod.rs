//! Transformation engine (C12): maps a tenant's SCIM group membership to
//! downstream entitlements using typed rules (spec.md §4.12), and attempts
//! a best-effort reverse mapping. No direct teacher/example grounding
//! exists for this component; it follows this crate's own C2/C4 idiom
//! (typed rule enum, `regex` for the REGEX kind) for consistency.

mod reverse;
mod rules;
mod template;

pub use reverse::reverse_transform;
pub use rules::forward_transform;

use crate::model::TransformationRule;

/// Picks the applicable rules for a tenant, ordered by priority (lower
/// value applies first), the way the teacher orders schema extensions.
pub fn applicable_rules<'a>(
    rules: &'a [TransformationRule],
    tenant_id: &str,
) -> Vec<&'a TransformationRule> {
    let mut matched: Vec<&TransformationRule> = rules
        .iter()
        .filter(|r| r.tenant_id == tenant_id)
        .collect();
    matched.sort_by_key(|r| r.priority);
    matched
}
