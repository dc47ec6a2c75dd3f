//! PII Redactor (C1): a deterministic, total function from a JSON value (or
//! string) to a redacted copy. Used on resource snapshots and PatchOp
//! values before they're written to an audit entry.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\-. ]{7,}\d").unwrap());
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})\b").unwrap());
static IPV6_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[0-9a-fA-F]{1,4}:){2,7}[0-9a-fA-F]{1,4}\b").unwrap());
static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CREDIT_CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{3,4}\b").unwrap());

/// Field names that carry a SCIM `value` leaf generic enough that the
/// containing attribute (e.g. `emails`, `phoneNumbers`) is what actually
/// names the PII family, not the leaf key itself.
const GENERIC_LEAF_KEYS: &[&str] = &["value"];

const FIELD_KEYS_POSTAL: &[&str] = &["postalcode", "zip", "zipcode"];

/// Keys fully redacted regardless of content, per spec.md §4.1.
const FIELD_KEYS_FULL_REDACT: &[&str] = &[
    "ssn",
    "taxid",
    "password",
    "secret",
    "token",
    "apikey",
    "clientsecret",
    "dob",
];

/// Redacts a single email address: keeps the first and last character of
/// the local part and the full domain, e.g. `jdoe@example.com` ->
/// `j**e@example.com`.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if local.len() > 2 => {
            let first = &local[..1];
            let last = &local[local.len() - 1..];
            format!("{first}{}{last}@{domain}", "*".repeat(local.len() - 2))
        }
        Some((local, domain)) => format!("{}@{}", "*".repeat(local.len()), domain),
        None => "*".repeat(email.len()),
    }
}

/// Redacts a phone number, keeping the trailing 4 digits.
pub fn redact_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return "*".repeat(digits.len());
    }
    let keep: String = digits[digits.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - 4), keep)
}

/// Redacts an IPv4 address, keeping the first two octets.
pub fn redact_ipv4(ip: &str) -> String {
    IPV4_RE
        .replace(ip, |caps: &regex::Captures| {
            format!("{}.{}.*.*", &caps[1], &caps[2])
        })
        .into_owned()
}

/// Redacts an IP address: IPv4 keeps its first two octets, IPv6 is fully
/// redacted (spec.md §4.1).
pub fn redact_ip(ip: &str) -> String {
    if IPV4_RE.is_match(ip) {
        redact_ipv4(ip)
    } else {
        "*".repeat(ip.chars().count())
    }
}

/// Redacts a postal code, keeping the leading 3 characters.
pub fn redact_postal_code(code: &str) -> String {
    if code.len() <= 3 {
        return "*".repeat(code.len());
    }
    let (head, tail) = code.split_at(3);
    format!("{head}{}", "*".repeat(tail.chars().count()))
}

/// Scans free text for embedded emails/phones/IPs/SSNs/credit-card-like
/// sequences and redacts any matches in place, for fields whose key
/// doesn't hint at their content (e.g. `detail` strings inside an audit
/// entry).
pub fn redact_free_text(text: &str) -> String {
    let text = EMAIL_RE.replace_all(text, |caps: &regex::Captures| redact_email(&caps[0]));
    let text = PHONE_RE.replace_all(&text, |caps: &regex::Captures| redact_phone(&caps[0]));
    let text = SSN_RE.replace_all(&text, |caps: &regex::Captures| "*".repeat(caps[0].len()));
    let text = CREDIT_CARD_RE.replace_all(&text, |caps: &regex::Captures| "*".repeat(caps[0].len()));
    let text = IPV6_RE.replace_all(&text, |caps: &regex::Captures| "*".repeat(caps[0].len()));
    IPV4_RE
        .replace_all(&text, |caps: &regex::Captures| {
            format!("{}.{}.*.*", &caps[1], &caps[2])
        })
        .into_owned()
}

/// Recursively redacts a JSON value: object keys are matched against known
/// PII field names (case-insensitively) to pick a targeted redactor;
/// unmatched strings fall back to the free-text scan. The function is
/// total — every input produces an output, nothing is ever dropped.
pub fn redact_json(value: &Value) -> Value {
    redact_json_keyed(value, None, None)
}

fn redact_json_keyed(value: &Value, key: Option<&str>, ancestor: Option<&str>) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), redact_json_keyed(v, Some(k), ancestor));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| redact_json_keyed(v, key, key)).collect())
        }
        Value::String(s) => {
            let effective = match key {
                Some(k) if GENERIC_LEAF_KEYS.iter().any(|g| k.eq_ignore_ascii_case(g)) => {
                    ancestor.or(key)
                }
                other => other,
            };
            Value::String(redact_string_for_key(effective, s))
        }
        other => other.clone(),
    }
}

fn redact_string_for_key(key: Option<&str>, s: &str) -> String {
    let Some(raw_key) = key else {
        return redact_free_text(s);
    };
    let lower_key = raw_key.to_ascii_lowercase();

    if FIELD_KEYS_POSTAL.contains(&lower_key.as_str()) {
        return redact_postal_code(s);
    }
    if FIELD_KEYS_FULL_REDACT.contains(&lower_key.as_str()) {
        return "*".repeat(s.chars().count());
    }
    if lower_key.starts_with("email") && s.contains('@') {
        return redact_email(s);
    }
    if lower_key.starts_with("phone") {
        return redact_phone(s);
    }
    if lower_key.starts_with("address") {
        return "*".repeat(s.chars().count());
    }
    if lower_key.starts_with("ip") {
        return redact_ip(s);
    }
    redact_free_text(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_keeps_first_last_and_domain() {
        assert_eq!(redact_email("jdoe@example.com"), "j**e@example.com");
    }

    #[test]
    fn phone_keeps_last_four_digits() {
        assert_eq!(redact_phone("+1-555-867-5309"), "*******5309");
    }

    #[test]
    fn ipv4_keeps_first_two_octets() {
        assert_eq!(redact_ipv4("192.168.1.42"), "192.168.*.*");
    }

    #[test]
    fn ipv6_is_fully_redacted() {
        let redacted = redact_ip("2001:db8::8a2e:370:7334");
        assert!(!redacted.contains(':'));
        assert_eq!(redacted.len(), "2001:db8::8a2e:370:7334".len());
    }

    #[test]
    fn postal_code_keeps_leading_three() {
        assert_eq!(redact_postal_code("98052-6399"), "980*******");
    }

    #[test]
    fn json_object_redacts_nested_emails() {
        let input = json!({"emails": [{"value": "jdoe@example.com", "primary": true}]});
        let output = redact_json(&input);
        assert_eq!(output["emails"][0]["value"], "j**e@example.com");
        assert_eq!(output["emails"][0]["primary"], true);
    }

    #[test]
    fn json_object_redacts_nested_phone_via_ancestor_key() {
        let input = json!({"phoneNumbers": [{"value": "+1-555-867-5309", "type": "work"}]});
        let output = redact_json(&input);
        assert_eq!(output["phoneNumbers"][0]["value"], "*******5309");
    }

    #[test]
    fn json_object_fully_redacts_address_value() {
        let input = json!({"addresses": [{"value": "123 Main St", "postalCode": "98052-6399"}]});
        let output = redact_json(&input);
        assert_eq!(output["addresses"][0]["value"], "***********");
        assert_eq!(output["addresses"][0]["postalCode"], "980*******");
    }

    #[test]
    fn json_object_fully_redacts_secret_like_fields() {
        let input = json!({"password": "hunter2", "apiKey": "sk-abcdef", "ssn": "123-45-6789"});
        let output = redact_json(&input);
        assert_eq!(output["password"], "*******");
        assert_eq!(output["apiKey"], "********");
        assert_eq!(output["ssn"], "***********");
    }

    #[test]
    fn free_text_scan_catches_embedded_email() {
        let redacted = redact_free_text("contact jdoe@example.com for help");
        assert!(redacted.contains("j**e@example.com"));
        assert!(!redacted.contains("jdoe@example.com"));
    }

    #[test]
    fn free_text_scan_catches_ssn_and_credit_card() {
        let redacted = redact_free_text("ssn 123-45-6789 card 4111 1111 1111 1111");
        assert!(!redacted.contains("123-45-6789"));
        assert!(!redacted.contains("4111 1111 1111 1111"));
    }
}
