use super::template::substitute_placeholders;
use crate::model::RuleKind;
use regex::Regex;
use serde_json::Value;

/// Forward transformation: group name (+ optional predicate attributes)
/// -> entitlement name, per the rule kind.
pub fn forward_transform(rule: &RuleKind, group_name: &str, attributes: &Value) -> Option<String> {
    match rule {
        RuleKind::Exact {
            group_name: expected,
            entitlement,
        } => (group_name == expected).then(|| entitlement.clone()),

        RuleKind::Regex {
            pattern,
            entitlement_template,
        } => {
            let re = Regex::new(pattern).ok()?;
            let caps = re.captures(group_name)?;
            Some(substitute_placeholders(entitlement_template, |idx| {
                caps.get(idx).map(|m| m.as_str().to_string())
            }))
        }

        RuleKind::Hierarchical {
            path_separator,
            entitlement_template,
        } => {
            let segments: Vec<&str> = group_name.split(path_separator.as_str()).collect();
            if segments.len() < 2 {
                return None;
            }
            Some(substitute_placeholders(entitlement_template, |idx| {
                segments.get(idx).map(|s| s.to_string())
            }))
        }

        RuleKind::Conditional {
            group_name: expected,
            entitlement,
            attribute,
            expected_value,
        } => {
            if group_name != expected {
                return None;
            }
            let actual = attributes.get(attribute).and_then(|v| v.as_str())?;
            (actual == expected_value).then(|| entitlement.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_rule_matches_literal_name() {
        let rule = RuleKind::Exact {
            group_name: "Sales Team".into(),
            entitlement: "sales-license".into(),
        };
        assert_eq!(
            forward_transform(&rule, "Sales Team", &json!({})),
            Some("sales-license".into())
        );
        assert_eq!(forward_transform(&rule, "Eng Team", &json!({})), None);
    }

    #[test]
    fn regex_rule_substitutes_captures() {
        let rule = RuleKind::Regex {
            pattern: r"^Sales-(\w+)$".into(),
            entitlement_template: "sales-${1}-license".into(),
        };
        assert_eq!(
            forward_transform(&rule, "Sales-EMEA", &json!({})),
            Some("sales-EMEA-license".into())
        );
    }

    #[test]
    fn regex_rule_matches_scenario_five_template() {
        let rule = RuleKind::Regex {
            pattern: r"^Sales-(.*)$".into(),
            entitlement_template: "Sales_${1}_Rep".into(),
        };
        assert_eq!(
            forward_transform(&rule, "Sales-EMEA", &json!({})),
            Some("Sales_EMEA_Rep".into())
        );
    }

    #[test]
    fn hierarchical_rule_maps_path_segments() {
        let rule = RuleKind::Hierarchical {
            path_separator: "/".into(),
            entitlement_template: "${level0}::${level1}".into(),
        };
        assert_eq!(
            forward_transform(&rule, "Sales/EMEA", &json!({})),
            Some("Sales::EMEA".into())
        );
    }

    #[test]
    fn conditional_rule_requires_matching_attribute() {
        let rule = RuleKind::Conditional {
            group_name: "Contractors".into(),
            entitlement: "contractor-access".into(),
            attribute: "employmentType".into(),
            expected_value: "contractor".into(),
        };
        assert_eq!(
            forward_transform(&rule, "Contractors", &json!({"employmentType": "contractor"})),
            Some("contractor-access".into())
        );
        assert_eq!(
            forward_transform(&rule, "Contractors", &json!({"employmentType": "employee"})),
            None
        );
    }
}
