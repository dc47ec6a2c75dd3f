//! SCIM filter parser (C2): a recursive-descent parser for the RFC 7644
//! §3.4.2.2 filter grammar, plus an evaluator over `serde_json::Value`
//! resource representations.

use crate::error::ValidationError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare {
        attribute: String,
        op: CompareOp,
        value: Option<Value>,
    },
    Present { attribute: String },
    /// `attr[subfilter]` (RFC 7644 §3.4.2.2's `valuePath`): true if at
    /// least one element of the `attr` array satisfies `filter`.
    ValuePath {
        attribute: String,
        filter: Box<FilterExpr>,
    },
    /// `attr[subfilter].subAttr op value`: the `valuePath` form followed by
    /// a sub-attribute comparison, e.g. `emails[type eq "work"].value eq
    /// "jdoe@example.com"`.
    ValuePathCompare {
        attribute: String,
        filter: Box<FilterExpr>,
        sub_attribute: String,
        op: CompareOp,
        value: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn from_str(s: &str) -> Option<Self> {
        Some(match s.to_ascii_lowercase().as_str() {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "co" => CompareOp::Co,
            "sw" => CompareOp::Sw,
            "ew" => CompareOp::Ew,
            "gt" => CompareOp::Gt,
            "ge" => CompareOp::Ge,
            "lt" => CompareOp::Lt,
            "le" => CompareOp::Le,
            _ => return None,
        })
    }
}

/// A small hand-rolled tokenizer/parser. Operator precedence, low to high:
/// `or`, `and`, `not`, primary (comparison / `pr` / parenthesized group).
pub struct FilterParser<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> FilterParser<'a> {
    pub fn parse(input: &'a str) -> Result<FilterExpr, ValidationError> {
        let tokens = tokenize(input);
        let mut parser = FilterParser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(ValidationError::InvalidFilter(format!(
                "unexpected trailing input at token {}",
                parser.pos
            )));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<&'a str> {
        let t = self.tokens.get(self.pos).copied();
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> Result<FilterExpr, ValidationError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(t) if t.eq_ignore_ascii_case("or")) {
            self.advance();
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, ValidationError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Some(t) if t.eq_ignore_ascii_case("and")) {
            self.advance();
            let right = self.parse_not()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<FilterExpr, ValidationError> {
        if matches!(self.peek(), Some(t) if t.eq_ignore_ascii_case("not")) {
            self.advance();
            let inner = self.parse_primary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterExpr, ValidationError> {
        if matches!(self.peek(), Some("(")) {
            self.advance();
            let expr = self.parse_or()?;
            match self.advance() {
                Some(")") => Ok(expr),
                _ => Err(ValidationError::InvalidFilter(format!(
                    "expected ')' at token {}",
                    self.pos.saturating_sub(1)
                ))),
            }
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, ValidationError> {
        let attr_token = self.pos;
        let attribute = self
            .advance()
            .ok_or_else(|| ValidationError::InvalidFilter(format!("expected attribute name at token {attr_token}")))?
            .to_string();

        if matches!(self.peek(), Some("[")) {
            return self.parse_value_path(attribute);
        }

        match self.peek() {
            Some(op) if op.eq_ignore_ascii_case("pr") => {
                self.advance();
                Ok(FilterExpr::Present { attribute })
            }
            Some(op_str) => {
                let op_token = self.pos;
                let op = CompareOp::from_str(op_str).ok_or_else(|| {
                    ValidationError::InvalidFilter(format!("unknown operator at token {op_token}"))
                })?;
                self.advance();
                let value_token = self.pos;
                let raw = self
                    .advance()
                    .ok_or_else(|| ValidationError::InvalidFilter(format!("expected value at token {value_token}")))?;
                let value = parse_literal(raw, value_token)?;
                Ok(FilterExpr::Compare {
                    attribute,
                    op,
                    value: Some(value),
                })
            }
            None => Err(ValidationError::InvalidFilter(format!(
                "expected operator after token {attr_token}"
            ))),
        }
    }

    /// `attr[subfilter]`, optionally followed by `.subAttr op value`
    /// (RFC 7644 §3.4.2.2's `valuePath`, primary form).
    fn parse_value_path(&mut self, attribute: String) -> Result<FilterExpr, ValidationError> {
        let bracket_token = self.pos;
        self.advance(); // consume '['
        let inner = self.parse_or()?;
        match self.advance() {
            Some("]") => {}
            _ => {
                return Err(ValidationError::InvalidFilter(format!(
                    "unterminated '[' opened at token {bracket_token}"
                )))
            }
        }

        let Some(sub_attribute) = self.peek().and_then(|t| t.strip_prefix('.')) else {
            return Ok(FilterExpr::ValuePath {
                attribute,
                filter: Box::new(inner),
            });
        };
        let sub_attribute = sub_attribute.to_string();
        self.advance();

        let op_token = self.pos;
        let op_str = self
            .advance()
            .ok_or_else(|| ValidationError::InvalidFilter(format!("expected operator at token {op_token}")))?;
        let op = CompareOp::from_str(op_str)
            .ok_or_else(|| ValidationError::InvalidFilter(format!("unknown operator at token {op_token}")))?;
        let value_token = self.pos;
        let raw = self
            .advance()
            .ok_or_else(|| ValidationError::InvalidFilter(format!("expected value at token {value_token}")))?;
        let value = parse_literal(raw, value_token)?;
        Ok(FilterExpr::ValuePathCompare {
            attribute,
            filter: Box::new(inner),
            sub_attribute,
            op,
            value,
        })
    }
}

fn parse_literal(raw: &str, token_index: usize) -> Result<Value, ValidationError> {
    if let Some(stripped) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok(Value::String(stripped.to_string()));
    }
    if raw == "true" {
        return Ok(Value::Bool(true));
    }
    if raw == "false" {
        return Ok(Value::Bool(false));
    }
    if let Ok(n) = raw.parse::<f64>() {
        return Ok(serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null));
    }
    Err(ValidationError::InvalidFilter(format!(
        "unparsable literal at token {token_index}"
    )))
}

/// Splits on whitespace while keeping quoted strings and parens intact.
fn tokenize(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' || c == ')' || c == '[' || c == ']' {
            tokens.push(&input[i..i + 1]);
            i += 1;
            continue;
        }
        if c == '"' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] as char != '"' {
                i += 1;
            }
            i = (i + 1).min(bytes.len());
            tokens.push(&input[start..i]);
            continue;
        }
        let start = i;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if c.is_whitespace() || c == '(' || c == ')' || c == '[' || c == ']' {
                break;
            }
            i += 1;
        }
        tokens.push(&input[start..i]);
    }
    tokens
}

/// Evaluates a parsed filter against a resource represented as JSON.
/// Attribute lookup is case-insensitive, matching SCIM's attribute naming
/// rules.
pub fn evaluate_filter(expr: &FilterExpr, resource: &Value) -> bool {
    match expr {
        FilterExpr::And(l, r) => evaluate_filter(l, resource) && evaluate_filter(r, resource),
        FilterExpr::Or(l, r) => evaluate_filter(l, resource) || evaluate_filter(r, resource),
        FilterExpr::Not(inner) => !evaluate_filter(inner, resource),
        FilterExpr::Present { attribute } => lookup(resource, attribute).is_some(),
        FilterExpr::Compare {
            attribute,
            op,
            value,
        } => {
            let actual = lookup(resource, attribute);
            let expected = value.as_ref();
            match (actual, expected) {
                (Some(a), Some(e)) => compare(a, *op, e),
                _ => false,
            }
        }
        FilterExpr::ValuePath { attribute, filter } => value_path_elements(resource, attribute)
            .into_iter()
            .any(|item| evaluate_filter(filter, item)),
        FilterExpr::ValuePathCompare {
            attribute,
            filter,
            sub_attribute,
            op,
            value,
        } => value_path_elements(resource, attribute).into_iter().any(|item| {
            evaluate_filter(filter, item)
                && lookup(item, sub_attribute)
                    .map(|actual| compare(actual, *op, value))
                    .unwrap_or(false)
        }),
    }
}

fn value_path_elements<'a>(resource: &'a Value, attribute: &str) -> Vec<&'a Value> {
    match lookup(resource, attribute) {
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}

fn lookup<'a>(resource: &'a Value, attribute: &str) -> Option<&'a Value> {
    match resource {
        Value::Object(map) => map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(attribute))
            .map(|(_, v)| v),
        _ => None,
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(e)) => {
            let (a, e) = (a.to_ascii_lowercase(), e.to_ascii_lowercase());
            match op {
                CompareOp::Eq => a == e,
                CompareOp::Ne => a != e,
                CompareOp::Co => a.contains(&e),
                CompareOp::Sw => a.starts_with(&e),
                CompareOp::Ew => a.ends_with(&e),
                CompareOp::Gt => a > e,
                CompareOp::Ge => a >= e,
                CompareOp::Lt => a < e,
                CompareOp::Le => a <= e,
            }
        }
        (Value::Number(a), Value::Number(e)) => {
            let (a, e) = (a.as_f64().unwrap_or(0.0), e.as_f64().unwrap_or(0.0));
            match op {
                CompareOp::Eq => a == e,
                CompareOp::Ne => a != e,
                CompareOp::Gt => a > e,
                CompareOp::Ge => a >= e,
                CompareOp::Lt => a < e,
                CompareOp::Le => a <= e,
                CompareOp::Co | CompareOp::Sw | CompareOp::Ew => false,
            }
        }
        (Value::Bool(a), Value::Bool(e)) => match op {
            CompareOp::Eq => a == e,
            CompareOp::Ne => a != e,
            _ => false,
        },
        _ => false,
    }
}
