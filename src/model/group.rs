use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ResourceMeta;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScimGroupMember {
    pub value: String,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScimGroup {
    pub schemas: Vec<String>,
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub members: Vec<ScimGroupMember>,
    pub meta: ResourceMeta,
}

impl ScimGroup {
    /// `members` has set semantics keyed on `value` (spec.md §3): adding a
    /// member already present, or removing one not present, is a no-op
    /// rather than an error.
    pub fn member_values(&self) -> BTreeSet<&str> {
        self.members.iter().map(|m| m.value.as_str()).collect()
    }

    pub fn add_member(&mut self, member: ScimGroupMember) {
        if !self.members.iter().any(|m| m.value == member.value) {
            self.members.push(member);
        }
    }

    pub fn remove_member(&mut self, value: &str) {
        self.members.retain(|m| m.value != value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group() -> ScimGroup {
        ScimGroup {
            schemas: vec![super::super::GROUP_SCHEMA.to_string()],
            id: "g1".into(),
            display_name: "Sales Team".into(),
            members: vec![],
            meta: ResourceMeta {
                resource_type: "Group".into(),
                created: Utc::now(),
                last_modified: Utc::now(),
                version: "v0".into(),
            },
        }
    }

    #[test]
    fn adding_duplicate_member_is_noop() {
        let mut g = group();
        let m = ScimGroupMember {
            value: "u1".into(),
            reference: None,
            kind: None,
        };
        g.add_member(m.clone());
        g.add_member(m);
        assert_eq!(g.members.len(), 1);
    }

    #[test]
    fn removing_absent_member_is_noop() {
        let mut g = group();
        g.remove_member("does-not-exist");
        assert!(g.members.is_empty());
    }
}
