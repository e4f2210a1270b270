//! Request body validation.
//!
//! Rules are declared per field and every failing rule contributes its
//! message; the first failure on a field stops the remaining rules for
//! that field.
//!
//! ```rust
//! let mut v = Validator::new(&body);
//! v.field("name").required("name required").min_len(3, "too short");
//! v.finish()?;
//! ```

use mongodb::bson::oid::ObjectId;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Collects validation failures for one request body.
pub struct Validator<'a> {
    body: &'a Map<String, Value>,
    errors: Vec<String>,
}

impl<'a> Validator<'a> {
    pub fn new(body: &'a Map<String, Value>) -> Self {
        Self {
            body,
            errors: Vec::new(),
        }
    }

    /// Start a rule chain for a field.
    pub fn field<'v>(&'v mut self, name: &str) -> Field<'v, 'a> {
        let body: &'a Map<String, Value> = self.body;
        let value = body.get(name).filter(|v| !v.is_null());
        Field {
            validator: self,
            value,
            failed: false,
        }
    }

    /// Record a failure that does not belong to a single rule chain.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Turn collected failures into a 400.
    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(self.errors.join(". ")))
        }
    }
}

/// Rule chain for one field. Absent fields pass every rule except `required`.
pub struct Field<'v, 'a> {
    validator: &'v mut Validator<'a>,
    value: Option<&'a Value>,
    failed: bool,
}

impl<'a> Field<'_, 'a> {
    fn check(mut self, ok: impl FnOnce(&'a Value) -> bool, message: &str) -> Self {
        if self.failed {
            return self;
        }
        if let Some(value) = self.value
            && !ok(value)
        {
            self.validator.errors.push(message.to_string());
            self.failed = true;
        }
        self
    }

    pub fn required(mut self, message: &str) -> Self {
        let missing = match self.value {
            None => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if !self.failed && missing {
            self.validator.errors.push(message.to_string());
            self.failed = true;
        }
        self
    }

    pub fn string(self, message: &str) -> Self {
        self.check(Value::is_string, message)
    }

    pub fn min_len(self, min: usize, message: &str) -> Self {
        self.check(
            |v| v.as_str().is_none_or(|s| s.trim().chars().count() >= min),
            message,
        )
    }

    pub fn max_len(self, max: usize, message: &str) -> Self {
        self.check(
            |v| v.as_str().is_none_or(|s| s.trim().chars().count() <= max),
            message,
        )
    }

    pub fn number(self, message: &str) -> Self {
        self.check(Value::is_number, message)
    }

    pub fn integer(self, message: &str) -> Self {
        self.check(
            |v| v.is_i64() || v.is_u64() || v.as_f64().is_some_and(|f| f.fract() == 0.0),
            message,
        )
    }

    pub fn min(self, min: f64, message: &str) -> Self {
        self.check(|v| v.as_f64().is_none_or(|f| f >= min), message)
    }

    pub fn max(self, max: f64, message: &str) -> Self {
        self.check(|v| v.as_f64().is_none_or(|f| f <= max), message)
    }

    pub fn object_id(self, message: &str) -> Self {
        self.check(
            |v| v.as_str().is_some_and(|s| ObjectId::parse_str(s).is_ok()),
            message,
        )
    }

    pub fn email(self, message: &str) -> Self {
        self.check(|v| v.as_str().is_some_and(is_email), message)
    }

    pub fn array(self, message: &str) -> Self {
        self.check(Value::is_array, message)
    }

    pub fn one_of(self, allowed: &[&str], message: &str) -> Self {
        self.check(
            |v| v.as_str().is_some_and(|s| allowed.contains(&s)),
            message,
        )
    }

    /// Whether the field is present and passed every rule so far.
    pub fn valid(&self) -> bool {
        self.value.is_some() && !self.failed
    }
}

/// Loose address check: one `@`, non-empty local part, dotted domain.
pub fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !s.contains(char::is_whitespace)
}

/// Parse a path or body id, mapping failure to the resource's 400 message.
pub fn parse_object_id(raw: &str, label: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::invalid_id(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_and_chain_stops_at_first_failure() {
        let b = body(json!({ "price": "abc" }));
        let mut v = Validator::new(&b);
        v.field("name").required("name required").min_len(3, "too short");
        v.field("price")
            .required("price required")
            .number("price must be a number")
            .min(0.0, "price must be positive");

        let err = v.finish().unwrap_err().to_string();
        assert!(err.contains("name required"));
        assert!(err.contains("price must be a number"));
        assert!(!err.contains("too short"));
        assert!(!err.contains("price must be positive"));
    }

    #[test]
    fn test_integer_rule() {
        let b = body(json!({ "a": 5, "b": 5.5, "c": 5.0 }));
        let mut v = Validator::new(&b);
        v.field("a").integer("a");
        v.field("c").integer("c");
        v.field("b").integer("b must be an integer");
        assert_eq!(v.finish().unwrap_err().to_string(), "b must be an integer");
    }

    #[test]
    fn test_blank_string_counts_as_missing() {
        let b = body(json!({ "name": "   " }));
        let mut v = Validator::new(&b);
        v.field("name").required("name required");
        assert!(v.finish().is_err());
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("admin@example.com"));
        assert!(!is_email("admin.example.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a b@example.com"));
    }
}
