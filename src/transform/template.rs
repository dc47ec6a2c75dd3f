//! Shared `${k}`/`${levelN}` placeholder handling for REGEX and
//! HIERARCHICAL rule templates (spec.md §4.12). Also accepts the bare
//! `$k` form for callers that don't need brace disambiguation.

/// Substitutes every `${k}`/`${levelN}`/`$k` placeholder in `template`,
/// resolving each index through `resolve`. A placeholder with no
/// resolved value is left in the output verbatim.
pub fn substitute_placeholders(template: &str, resolve: impl Fn(usize) -> Option<String>) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'{') {
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
            if closed {
                if let Some(idx) = placeholder_index(&inner) {
                    if let Some(value) = resolve(idx) {
                        out.push_str(&value);
                        continue;
                    }
                }
            }
            out.push('$');
            out.push('{');
            out.push_str(&inner);
            if closed {
                out.push('}');
            }
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
            match digits.parse::<usize>().ok().and_then(&resolve) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(&digits);
                }
            }
        }
    }
    out
}

/// Parses a placeholder's inner text (`"1"` or `"level1"`) into its index.
pub fn placeholder_index(inner: &str) -> Option<usize> {
    if let Ok(idx) = inner.parse::<usize>() {
        return Some(idx);
    }
    inner.strip_prefix("level")?.parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_brace_and_bare_forms() {
        let resolve = |idx: usize| match idx {
            0 => Some("Sales".to_string()),
            1 => Some("EMEA".to_string()),
            _ => None,
        };
        assert_eq!(substitute_placeholders("Sales_${1}_Rep", resolve), "Sales_EMEA_Rep");
        assert_eq!(substitute_placeholders("$0-$1", resolve), "Sales-EMEA");
    }

    #[test]
    fn leaves_unresolved_placeholder_verbatim() {
        let resolve = |_: usize| None;
        assert_eq!(substitute_placeholders("x${5}y", resolve), "x${5}y");
    }

    #[test]
    fn parses_level_prefixed_index() {
        assert_eq!(placeholder_index("level2"), Some(2));
        assert_eq!(placeholder_index("2"), Some(2));
        assert_eq!(placeholder_index("levelx"), None);
    }
}
