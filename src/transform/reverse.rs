use super::template::placeholder_index;
use crate::model::RuleKind;
use regex::Regex;
use std::collections::BTreeMap;

/// Best-effort reverse mapping: entitlement name -> candidate group
/// name(s). Lossy kinds (REGEX/HIERARCHICAL) may produce zero or multiple
/// candidates; callers treat more than one as informational rather than
/// picking one arbitrarily (§12 of `SPEC_FULL.md`).
pub fn reverse_transform(rule: &RuleKind, entitlement: &str) -> Vec<String> {
    match rule {
        RuleKind::Exact {
            group_name,
            entitlement: expected,
        } => {
            if entitlement == expected {
                vec![group_name.clone()]
            } else {
                vec![]
            }
        }

        RuleKind::Regex {
            pattern,
            entitlement_template,
        } => reverse_regex(pattern, entitlement_template, entitlement),

        RuleKind::Hierarchical {
            path_separator,
            entitlement_template,
        } => reverse_hierarchical(path_separator, entitlement_template, entitlement),

        RuleKind::Conditional {
            group_name,
            entitlement: expected,
            ..
        } => {
            if entitlement == expected {
                vec![group_name.clone()]
            } else {
                vec![]
            }
        }
    }
}

/// Substitutes `${k}`/`$k` placeholders in `template` with `(.*)`,
/// escaping the literal text between them, and returns the resulting
/// anchored regex alongside the placeholder index each capture group
/// corresponds to (in the order the groups appear).
fn build_reverse_pattern(template: &str) -> (String, Vec<usize>) {
    let mut regex_str = String::from("^");
    let mut order = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }
        let idx = if chars.peek() == Some(&'{') {
            chars.next();
            let mut inner = String::new();
            let mut closed = false;
            while let Some(&d) = chars.peek() {
                if d == '}' {
                    chars.next();
                    closed = true;
                    break;
                }
                inner.push(d);
                chars.next();
            }
            closed.then(|| placeholder_index(&inner)).flatten()
        } else {
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    digits.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            digits.parse::<usize>().ok()
        };
        match idx {
            Some(idx) => {
                regex_str.push_str(&regex::escape(&literal));
                literal.clear();
                regex_str.push_str("(.*)");
                order.push(idx);
            }
            None => literal.push('$'),
        }
    }
    regex_str.push_str(&regex::escape(&literal));
    regex_str.push('$');
    (regex_str, order)
}

/// Rebuilds a candidate source value by substituting `values` (keyed by
/// capture-group number) into `pattern`'s literal skeleton: every
/// top-level `(...)` group is replaced by its captured value, anchors are
/// dropped, and backslash escapes are unescaped to their literal char.
/// Returns `None` if `pattern` has no capturing group at all.
fn reconstruct_from_skeleton(pattern: &str, values: &BTreeMap<usize, String>) -> Option<String> {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    let mut group_index = 0usize;
    let mut saw_group = false;
    while let Some(c) = chars.next() {
        match c {
            '^' | '$' => continue,
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '(' => {
                let is_capturing = chars.peek() != Some(&'?');
                let mut depth = 1;
                while depth > 0 {
                    match chars.next() {
                        Some('(') => depth += 1,
                        Some(')') => depth -= 1,
                        Some(_) => {}
                        None => break,
                    }
                }
                if is_capturing {
                    group_index += 1;
                    saw_group = true;
                    if let Some(value) = values.get(&group_index) {
                        out.push_str(value);
                    }
                }
            }
            other => out.push(other),
        }
    }
    saw_group.then_some(out)
}

fn reverse_regex(pattern: &str, entitlement_template: &str, entitlement: &str) -> Vec<String> {
    let (reverse_pattern, order) = build_reverse_pattern(entitlement_template);
    let Ok(re) = Regex::new(&reverse_pattern) else {
        return vec![];
    };
    let Some(caps) = re.captures(entitlement) else {
        return vec![];
    };
    let mut values = BTreeMap::new();
    for (group_idx, placeholder) in order.iter().enumerate() {
        if let Some(m) = caps.get(group_idx + 1) {
            values.insert(*placeholder, m.as_str().to_string());
        }
    }
    match reconstruct_from_skeleton(pattern, &values) {
        Some(candidate) => vec![candidate],
        None => vec![],
    }
}

fn reverse_hierarchical(path_separator: &str, entitlement_template: &str, entitlement: &str) -> Vec<String> {
    let (reverse_pattern, order) = build_reverse_pattern(entitlement_template);
    let Ok(re) = Regex::new(&reverse_pattern) else {
        return vec![];
    };
    let Some(caps) = re.captures(entitlement) else {
        return vec![];
    };
    let mut by_level = BTreeMap::new();
    for (group_idx, level) in order.iter().enumerate() {
        if let Some(m) = caps.get(group_idx + 1) {
            by_level.insert(*level, m.as_str().to_string());
        }
    }
    if by_level.is_empty() {
        return vec![];
    }
    vec![by_level.into_values().collect::<Vec<_>>().join(path_separator)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rule_reverses_to_single_candidate() {
        let rule = RuleKind::Exact {
            group_name: "Sales Team".into(),
            entitlement: "sales-license".into(),
        };
        assert_eq!(reverse_transform(&rule, "sales-license"), vec!["Sales Team"]);
    }

    #[test]
    fn exact_rule_reverses_to_nothing_on_mismatch() {
        let rule = RuleKind::Exact {
            group_name: "Sales Team".into(),
            entitlement: "sales-license".into(),
        };
        assert!(reverse_transform(&rule, "eng-license").is_empty());
    }

    #[test]
    fn hierarchical_rule_reconstructs_path() {
        let rule = RuleKind::Hierarchical {
            path_separator: "/".into(),
            entitlement_template: "${level0}::${level1}".into(),
        };
        let candidates = reverse_transform(&rule, "Sales::EMEA");
        assert_eq!(candidates, vec!["Sales/EMEA"]);
    }

    #[test]
    fn regex_rule_reconstructs_scenario_five_candidate() {
        let rule = RuleKind::Regex {
            pattern: r"^Sales-(.*)$".into(),
            entitlement_template: "Sales_${1}_Rep".into(),
        };
        let candidates = reverse_transform(&rule, "Sales_EMEA_Rep");
        assert_eq!(candidates, vec!["Sales-EMEA"]);
    }

    #[test]
    fn regex_rule_yields_no_candidates_on_shape_mismatch() {
        let rule = RuleKind::Regex {
            pattern: r"^Sales-(.*)$".into(),
            entitlement_template: "Sales_${1}_Rep".into(),
        };
        assert!(reverse_transform(&rule, "Eng_EMEA_Rep").is_empty());
    }
}
