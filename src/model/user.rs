use serde::{Deserialize, Serialize};

use super::ResourceMeta;

/// A value with RFC 7643's common multi-valued-attribute shape (email,
/// phone number, address, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiValued {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manager {
    pub value: String,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// `urn:ietf:params:scim:schemas:extension:enterprise:2.0:User` (RFC 7643
/// §8.3): five flat attributes plus the `manager` complex attribute.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnterpriseExtension {
    #[serde(rename = "employeeNumber", skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
    #[serde(rename = "costCenter", skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<Manager>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScimUser {
    pub schemas: Vec<String>,
    pub id: String,
    #[serde(rename = "externalId", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub emails: Vec<MultiValued>,
    #[serde(rename = "phoneNumbers", default)]
    pub phone_numbers: Vec<MultiValued>,
    #[serde(default)]
    pub addresses: Vec<MultiValued>,
    #[serde(
        rename = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
        skip_serializing_if = "Option::is_none"
    )]
    pub enterprise: Option<EnterpriseExtension>,
    pub meta: ResourceMeta,
}

impl ScimUser {
    /// At most one multi-valued entry in each of emails/phoneNumbers/
    /// addresses may be marked primary (spec.md §3 invariant).
    pub fn validate_primary_invariant(&self) -> Result<(), String> {
        for (label, values) in [
            ("emails", &self.emails),
            ("phoneNumbers", &self.phone_numbers),
            ("addresses", &self.addresses),
        ] {
            if values.iter().filter(|v| v.primary).count() > 1 {
                return Err(format!("more than one primary {label}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn meta() -> ResourceMeta {
        ResourceMeta {
            resource_type: "User".into(),
            created: Utc::now(),
            last_modified: Utc::now(),
            version: "abc".into(),
        }
    }

    #[test]
    fn rejects_two_primary_emails() {
        let user = ScimUser {
            schemas: vec![super::super::USER_SCHEMA.to_string()],
            id: "1".into(),
            external_id: None,
            user_name: "jdoe".into(),
            active: true,
            display_name: None,
            emails: vec![
                MultiValued {
                    value: "a@example.com".into(),
                    kind: None,
                    primary: true,
                },
                MultiValued {
                    value: "b@example.com".into(),
                    kind: None,
                    primary: true,
                },
            ],
            phone_numbers: vec![],
            addresses: vec![],
            enterprise: None,
            meta: meta(),
        };
        assert!(user.validate_primary_invariant().is_err());
    }
}
