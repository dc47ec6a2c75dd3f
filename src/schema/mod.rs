//! Schema validator (C4): structural checks over the SCIM User/Group
//! schemas and the Enterprise User extension, following the teacher's
//! attribute-definition and canonical-value validation approach.

mod registry;
mod types;

pub use registry::SchemaRegistry;
pub use types::{AttributeDefinition, AttributeType, Mutability};

use crate::error::ValidationError;
use crate::model::{ScimGroup, ScimUser};

/// Validates a [`ScimUser`] against the User + Enterprise User schemas:
/// required attributes present, canonical values honored, and the
/// at-most-one-primary invariant.
pub fn validate_user(user: &ScimUser) -> Result<(), ValidationError> {
    if user.user_name.trim().is_empty() {
        return Err(ValidationError::MissingRequiredAttribute {
            attribute: "userName".into(),
        });
    }
    user.validate_primary_invariant()
        .map_err(ValidationError::Custom)?;
    for email in &user.emails {
        if let Some(kind) = &email.kind {
            let allowed = ["work", "home", "other"];
            if !allowed.contains(&kind.as_str()) {
                return Err(ValidationError::InvalidCanonicalValue {
                    attribute: "emails.type".into(),
                    value: kind.clone(),
                    allowed: allowed.iter().map(|s| s.to_string()).collect(),
                });
            }
        }
    }
    Ok(())
}

/// Validates a [`ScimGroup`]: `displayName` is required; uniqueness across
/// a tenant (case-insensitive) is enforced by the repository layer (C7)
/// since it requires looking at sibling resources.
pub fn validate_group(group: &ScimGroup) -> Result<(), ValidationError> {
    if group.display_name.trim().is_empty() {
        return Err(ValidationError::MissingRequiredAttribute {
            attribute: "displayName".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceMeta;
    use chrono::Utc;

    fn meta() -> ResourceMeta {
        ResourceMeta {
            resource_type: "User".into(),
            created: Utc::now(),
            last_modified: Utc::now(),
            version: "v0".into(),
        }
    }

    #[test]
    fn rejects_empty_username() {
        let user = ScimUser {
            schemas: vec![],
            id: "1".into(),
            external_id: None,
            user_name: "   ".into(),
            active: true,
            display_name: None,
            emails: vec![],
            phone_numbers: vec![],
            addresses: vec![],
            enterprise: None,
            meta: meta(),
        };
        assert!(validate_user(&user).is_err());
    }

    #[test]
    fn rejects_empty_group_display_name() {
        let group = ScimGroup {
            schemas: vec![],
            id: "g1".into(),
            display_name: "".into(),
            members: vec![],
            meta: ResourceMeta {
                resource_type: "Group".into(),
                created: Utc::now(),
                last_modified: Utc::now(),
                version: "v0".into(),
            },
        };
        assert!(validate_group(&group).is_err());
    }
}
