use super::types::{AttributeDefinition, AttributeType, Mutability};
use once_cell::sync::Lazy;

/// The built-in User and Group attribute tables, built once and shared via
/// [`Lazy`] the way the teacher's schema registry is constructed eagerly
/// at process start.
static USER_ATTRIBUTES: Lazy<Vec<AttributeDefinition>> = Lazy::new(|| {
    vec![
        attr("userName", AttributeType::String, false, true, Mutability::ReadWrite),
        attr("displayName", AttributeType::String, false, false, Mutability::ReadWrite),
        attr("active", AttributeType::Boolean, false, false, Mutability::ReadWrite),
        attr("emails", AttributeType::Complex, true, false, Mutability::ReadWrite),
    ]
});

static GROUP_ATTRIBUTES: Lazy<Vec<AttributeDefinition>> = Lazy::new(|| {
    vec![
        attr("displayName", AttributeType::String, false, true, Mutability::ReadWrite),
        attr("members", AttributeType::Complex, true, false, Mutability::ReadWrite),
    ]
});

fn attr(
    name: &str,
    attr_type: AttributeType,
    multi_valued: bool,
    required: bool,
    mutability: Mutability,
) -> AttributeDefinition {
    AttributeDefinition {
        name: name.to_string(),
        attr_type,
        multi_valued,
        required,
        mutability,
        canonical_values: Vec::new(),
    }
}

/// Looks up attribute definitions for the two resource types this gateway
/// serves. Unlike the teacher's registry, there is no dynamic schema
/// registration — the gateway's resource types are fixed (spec.md §3).
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn attributes_for(resource_type: &str) -> Option<&'static [AttributeDefinition]> {
        match resource_type {
            "User" => Some(&USER_ATTRIBUTES),
            "Group" => Some(&GROUP_ATTRIBUTES),
            _ => None,
        }
    }

    pub fn required_attributes(resource_type: &str) -> Vec<&'static str> {
        Self::attributes_for(resource_type)
            .unwrap_or(&[])
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_requires_username() {
        assert_eq!(SchemaRegistry::required_attributes("User"), vec!["userName"]);
    }

    #[test]
    fn group_requires_display_name() {
        assert_eq!(
            SchemaRegistry::required_attributes("Group"),
            vec!["displayName"]
        );
    }
}
