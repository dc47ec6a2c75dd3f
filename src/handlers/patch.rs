use crate::error::{GatewayError, ValidationError};
use crate::model::{PatchOpKind, PatchRequest, PATCH_OP_SCHEMA};
use serde_json::Value;

/// Rejects a PatchOp request that has no operations or doesn't declare the
/// `PatchOp` schema — a PATCH with no operations is a client error, not a
/// no-op success.
pub fn validate_patch_request(patch: &PatchRequest) -> Result<(), GatewayError> {
    if patch.operations.is_empty() {
        return Err(GatewayError::Protocol(
            "PatchOp request must include at least one operation".into(),
        ));
    }
    if !patch.schemas.iter().any(|s| s == PATCH_OP_SCHEMA) {
        return Err(GatewayError::Protocol(format!(
            "PatchOp request schemas must include {PATCH_OP_SCHEMA}"
        )));
    }
    Ok(())
}

/// A parsed value-filter path selector, e.g. `emails[type eq "work"].value`
/// (RFC 7644 §3.5.2, spec.md §4.11): `attr` names the multi-valued
/// attribute, `filter_attr`/`filter_value` pick out the matching element(s),
/// and `sub` (if present) is the attribute set/removed on the match instead
/// of the whole element.
struct ValueFilterPath {
    attr: String,
    filter_attr: String,
    filter_value: String,
    sub: Option<String>,
}

fn parse_value_filter_path(path: &str) -> Option<ValueFilterPath> {
    let open = path.find('[')?;
    let close = path.find(']')?;
    if close < open {
        return None;
    }
    let attr = path[..open].to_string();
    let inner = &path[open + 1..close];
    let sub = path[close + 1..].strip_prefix('.').map(|s| s.to_string());

    let mut parts = inner.splitn(3, ' ');
    let filter_attr = parts.next()?.trim().to_string();
    let op = parts.next()?.trim();
    if op != "eq" {
        return None;
    }
    let raw_value = parts.next()?.trim();
    let filter_value = raw_value.trim_matches('"').to_string();

    Some(ValueFilterPath {
        attr,
        filter_attr,
        filter_value,
        sub,
    })
}

fn matches_filter(item: &Value, attr: &str, expected: &str) -> bool {
    item.get(attr)
        .and_then(Value::as_str)
        .map(|s| s == expected)
        .unwrap_or(false)
}

/// Applies a PATCH request's operations to a JSON resource representation
/// in place. Supports plain dotted paths, value-filter path selectors
/// (`emails[type eq "work"].value`), and root-level merges (`add`/`replace`
/// with no `path`, RFC 7644 §3.5.2). Group `members` patches are handled by
/// [`crate::handlers::patch_group`] since set semantics differ from plain
/// attribute replace.
pub fn apply_patch(resource: &mut Value, patch: &PatchRequest) -> Result<(), GatewayError> {
    for op in &patch.operations {
        match op.op {
            PatchOpKind::Add | PatchOpKind::Replace => {
                let value = op
                    .value
                    .clone()
                    .ok_or_else(|| GatewayError::Protocol("add/replace PatchOp requires a value".into()))?;
                match &op.path {
                    None => merge_at_root(resource, value)?,
                    Some(path) => match parse_value_filter_path(path) {
                        Some(vf) => apply_value_filter_set(resource, &vf, value)?,
                        None => set_path(resource, path, value)?,
                    },
                }
            }
            PatchOpKind::Remove => {
                let path = op
                    .path
                    .clone()
                    .ok_or_else(|| GatewayError::Protocol("remove PatchOp requires a path".into()))?;
                match parse_value_filter_path(&path) {
                    Some(vf) => apply_value_filter_remove(resource, &vf)?,
                    None if remove_path(resource, &path) => {}
                    None => {
                        return Err(GatewayError::Validation(ValidationError::NoTarget {
                            attribute: path,
                        }))
                    }
                }
            }
        }
    }
    Ok(())
}

/// `add`/`replace` with no `path` merges the given object's keys directly
/// into the resource root (RFC 7644 §3.5.2).
fn merge_at_root(resource: &mut Value, value: Value) -> Result<(), GatewayError> {
    let Value::Object(incoming) = value else {
        return Err(GatewayError::Protocol(
            "add/replace PatchOp with no path requires an object value".into(),
        ));
    };
    let Value::Object(map) = resource else {
        return Err(GatewayError::Protocol("resource root is not an object".into()));
    };
    for (k, v) in incoming {
        map.insert(k, v);
    }
    Ok(())
}

fn apply_value_filter_set(resource: &mut Value, vf: &ValueFilterPath, value: Value) -> Result<(), GatewayError> {
    let Value::Object(map) = resource else {
        return Err(GatewayError::Protocol("resource root is not an object".into()));
    };
    let Some(Value::Array(items)) = map.get_mut(&vf.attr) else {
        return Err(GatewayError::Validation(ValidationError::NoTarget {
            attribute: vf.attr.clone(),
        }));
    };
    let mut matched = false;
    for item in items.iter_mut() {
        if !matches_filter(item, &vf.filter_attr, &vf.filter_value) {
            continue;
        }
        matched = true;
        match &vf.sub {
            Some(sub) => {
                if let Value::Object(obj) = item {
                    obj.insert(sub.clone(), value.clone());
                }
            }
            None => *item = value.clone(),
        }
    }
    if matched {
        Ok(())
    } else {
        Err(GatewayError::Validation(ValidationError::NoTarget {
            attribute: vf.attr.clone(),
        }))
    }
}

fn apply_value_filter_remove(resource: &mut Value, vf: &ValueFilterPath) -> Result<(), GatewayError> {
    let Value::Object(map) = resource else {
        return Err(GatewayError::Protocol("resource root is not an object".into()));
    };
    let Some(Value::Array(items)) = map.get_mut(&vf.attr) else {
        return Err(GatewayError::Validation(ValidationError::NoTarget {
            attribute: vf.attr.clone(),
        }));
    };
    match &vf.sub {
        Some(sub) => {
            let mut matched = false;
            for item in items.iter_mut() {
                if matches_filter(item, &vf.filter_attr, &vf.filter_value) {
                    matched = true;
                    if let Value::Object(obj) = item {
                        obj.remove(sub);
                    }
                }
            }
            if matched {
                Ok(())
            } else {
                Err(GatewayError::Validation(ValidationError::NoTarget {
                    attribute: vf.attr.clone(),
                }))
            }
        }
        None => {
            let before = items.len();
            items.retain(|item| !matches_filter(item, &vf.filter_attr, &vf.filter_value));
            if items.len() < before {
                Ok(())
            } else {
                Err(GatewayError::Validation(ValidationError::NoTarget {
                    attribute: vf.attr.clone(),
                }))
            }
        }
    }
}

fn set_path(resource: &mut Value, path: &str, value: Value) -> Result<(), GatewayError> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or(path);
    match segments.next() {
        None => {
            if let Value::Object(map) = resource {
                map.insert(first.to_string(), value);
                Ok(())
            } else {
                Err(GatewayError::Protocol("resource root is not an object".into()))
            }
        }
        Some(second) => {
            let Value::Object(map) = resource else {
                return Err(GatewayError::Protocol("resource root is not an object".into()));
            };
            let nested = map
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Value::Object(nested_map) = nested {
                nested_map.insert(second.to_string(), value);
                Ok(())
            } else {
                Err(GatewayError::Protocol(format!("'{first}' is not an object")))
            }
        }
    }
}

/// Removes the attribute at `path`, returning whether anything was actually
/// removed so callers can distinguish a real removal from a no-op.
fn remove_path(resource: &mut Value, path: &str) -> bool {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or(path);
    match segments.next() {
        None => match resource {
            Value::Object(map) => map.remove(first).is_some(),
            _ => false,
        },
        Some(second) => match resource {
            Value::Object(map) => match map.get_mut(first) {
                Some(Value::Object(nested)) => nested.remove(second).is_some(),
                _ => false,
            },
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PatchOperation;
    use serde_json::json;

    #[test]
    fn replace_sets_top_level_attribute() {
        let mut resource = json!({"active": true});
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Replace,
                path: Some("active".into()),
                value: Some(json!(false)),
            }],
        };
        apply_patch(&mut resource, &patch).unwrap();
        assert_eq!(resource["active"], false);
    }

    #[test]
    fn remove_deletes_nested_attribute() {
        let mut resource = json!({"name": {"givenName": "Jane", "familyName": "Doe"}});
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Remove,
                path: Some("name.givenName".into()),
                value: None,
            }],
        };
        apply_patch(&mut resource, &patch).unwrap();
        assert!(resource["name"].get("givenName").is_none());
        assert_eq!(resource["name"]["familyName"], "Doe");
    }

    #[test]
    fn remove_of_missing_target_is_no_target_error() {
        let mut resource = json!({"active": true});
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Remove,
                path: Some("nickName".into()),
                value: None,
            }],
        };
        let err = apply_patch(&mut resource, &patch).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation(ValidationError::NoTarget { .. })
        ));
    }

    #[test]
    fn add_with_no_path_merges_object_at_root() {
        let mut resource = json!({"active": true});
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Add,
                path: None,
                value: Some(json!({"displayName": "Jane Doe", "active": false})),
            }],
        };
        apply_patch(&mut resource, &patch).unwrap();
        assert_eq!(resource["displayName"], "Jane Doe");
        assert_eq!(resource["active"], false);
    }

    #[test]
    fn add_with_no_path_and_non_object_value_is_protocol_error() {
        let mut resource = json!({"active": true});
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Replace,
                path: None,
                value: Some(json!("not an object")),
            }],
        };
        assert!(matches!(
            apply_patch(&mut resource, &patch),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[test]
    fn value_filter_path_replaces_matching_element_attribute() {
        let mut resource = json!({
            "emails": [
                {"value": "old@example.com", "type": "work", "primary": true},
                {"value": "home@example.com", "type": "home", "primary": false}
            ]
        });
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Replace,
                path: Some(r#"emails[type eq "work"].value"#.into()),
                value: Some(json!("new@example.com")),
            }],
        };
        apply_patch(&mut resource, &patch).unwrap();
        assert_eq!(resource["emails"][0]["value"], "new@example.com");
        assert_eq!(resource["emails"][1]["value"], "home@example.com");
    }

    #[test]
    fn value_filter_path_remove_drops_matching_element() {
        let mut resource = json!({
            "emails": [
                {"value": "work@example.com", "type": "work"},
                {"value": "home@example.com", "type": "home"}
            ]
        });
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Remove,
                path: Some(r#"emails[type eq "work"]"#.into()),
                value: None,
            }],
        };
        apply_patch(&mut resource, &patch).unwrap();
        let emails = resource["emails"].as_array().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0]["type"], "home");
    }

    #[test]
    fn value_filter_path_with_no_match_is_no_target_error() {
        let mut resource = json!({"emails": [{"value": "a@example.com", "type": "home"}]});
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Remove,
                path: Some(r#"emails[type eq "work"]"#.into()),
                value: None,
            }],
        };
        let err = apply_patch(&mut resource, &patch).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation(ValidationError::NoTarget { .. })
        ));
    }

    #[test]
    fn empty_operations_is_rejected() {
        let patch = PatchRequest {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations: vec![],
        };
        assert!(matches!(
            validate_patch_request(&patch),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[test]
    fn missing_patch_op_schema_is_rejected() {
        let patch = PatchRequest {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: PatchOpKind::Replace,
                path: Some("active".into()),
                value: Some(json!(true)),
            }],
        };
        assert!(matches!(
            validate_patch_request(&patch),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[test]
    fn valid_patch_request_passes() {
        let patch = PatchRequest {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations: vec![PatchOperation {
                op: PatchOpKind::Replace,
                path: Some("active".into()),
                value: Some(json!(true)),
            }],
        };
        assert!(validate_patch_request(&patch).is_ok());
    }
}
