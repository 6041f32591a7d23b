//! Validation schema generated from a form's field list.
//!
//! [`FormSchema::compile`] turns each [`Field`] into a [`FieldRule`] once;
//! [`FormSchema::validate`] then checks and coerces submission payloads. The
//! same schema serializes to a descriptor clients use to mirror the checks, so
//! both sides report identical messages.

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use crate::domain::field::{Field, FieldKind};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

const REQUIRED: &str = "This field is required";
const REQUIRED_SELECTION: &str = "Please select at least one option";
const INVALID_OPTION: &str = "Please select a valid option";

/// Problems with a field definition, detected before any value is checked
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Field id cannot be empty")]
    EmptyId,

    #[error("Field '{0}' must have a label")]
    EmptyLabel(String),

    #[error("Duplicate field id '{0}'")]
    DuplicateId(String),

    #[error("Field '{0}' needs at least one option")]
    MissingOptions(String),

    #[error("Field '{field}': {reason}")]
    InvalidConstraint { field: String, reason: String },

    #[error("Field '{field}' has an invalid pattern: {reason}")]
    InvalidPattern { field: String, reason: String },
}

/// Per-field error messages for a rejected submission, keyed by field id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field_id: &str) -> Option<&str> {
        self.0.get(field_id).map(String::as_str)
    }

    /// Record a message for a field; the first message per field wins
    pub fn insert(&mut self, field_id: &str, message: impl Into<String>) {
        self.0
            .entry(field_id.to_string())
            .or_insert_with(|| message.into());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for FieldErrors {}

/// A compiled regex that must match the entire value
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    fn compile(field: &str, source: &str) -> Result<Self, SchemaError> {
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            SchemaError::InvalidPattern {
                field: field.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Constraint payload of a rule. Textarea shares `Text`, radio uses `Choice`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Check {
    #[serde(rename_all = "camelCase")]
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_length: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<Pattern>,
    },
    #[serde(rename_all = "camelCase")]
    Email {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        allowed_domains: Vec<String>,
    },
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    Choice { options: Vec<String> },
    #[serde(rename_all = "camelCase")]
    MultiChoice {
        options: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_selections: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_selections: Option<u32>,
    },
}

/// Validation rule for one field
#[derive(Debug, Clone, Serialize)]
pub struct FieldRule {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub required: bool,
    #[serde(flatten)]
    pub check: Check,
}

/// Validation schema for a whole form
#[derive(Debug, Clone, Serialize)]
pub struct FormSchema {
    #[serde(rename = "fields")]
    rules: Vec<FieldRule>,
}

impl FormSchema {
    /// Compile the rules for `fields`, rejecting definitions that could never validate.
    pub fn compile(fields: &[Field]) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(fields.len());

        for field in fields {
            field.check()?;
            if !seen.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateId(field.id.clone()));
            }
            rules.push(FieldRule {
                id: field.id.clone(),
                label: field.label.clone(),
                field_type: field.kind.type_name(),
                required: field.required,
                check: Check::from_kind(&field.id, &field.kind)?,
            });
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Validate a submission payload.
    ///
    /// Returns the cleaned payload: coerced values for every present field and
    /// nothing for keys the form does not define.
    pub fn validate(&self, payload: &Map<String, Value>) -> Result<Map<String, Value>, FieldErrors> {
        let mut cleaned = Map::new();
        let mut errors = FieldErrors::default();

        for rule in &self.rules {
            match rule.check.present(payload.get(&rule.id)) {
                None => {
                    if rule.required {
                        errors.insert(&rule.id, rule.check.required_message());
                    }
                }
                Some(value) => match rule.check.apply(value) {
                    Ok(clean) => {
                        cleaned.insert(rule.id.clone(), clean);
                    }
                    Err(message) => errors.insert(&rule.id, message),
                },
            }
        }

        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(errors)
        }
    }

    /// Initial values for an empty response: `""` for scalar fields, `[]` for checkboxes.
    pub fn default_values(&self) -> Map<String, Value> {
        self.rules
            .iter()
            .map(|rule| {
                let value = match rule.check {
                    Check::MultiChoice { .. } => Value::Array(Vec::new()),
                    _ => Value::String(String::new()),
                };
                (rule.id.clone(), value)
            })
            .collect()
    }
}

impl Check {
    fn from_kind(field_id: &str, kind: &FieldKind) -> Result<Self, SchemaError> {
        Ok(match kind {
            FieldKind::Text { settings } => Self::Text {
                min_length: settings.min_length,
                max_length: settings.max_length,
                pattern: settings
                    .pattern
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .map(|p| Pattern::compile(field_id, p))
                    .transpose()?,
            },
            FieldKind::Textarea { settings } => Self::Text {
                min_length: settings.min_length,
                max_length: settings.max_length,
                pattern: None,
            },
            FieldKind::Email { settings } => Self::Email {
                allowed_domains: settings.allowed_domains.iter().map(|d| d.trim().to_string()).collect(),
            },
            FieldKind::Number { settings } => Self::Number {
                min: settings.min,
                max: settings.max,
                step: settings.step,
            },
            FieldKind::Radio { options, .. } => Self::Choice {
                options: options.clone(),
            },
            FieldKind::Checkbox { options, settings } => Self::MultiChoice {
                options: options.clone(),
                min_selections: settings.min_selections,
                max_selections: settings.max_selections,
            },
        })
    }

    fn required_message(&self) -> &'static str {
        match self {
            Self::MultiChoice { .. } => REQUIRED_SELECTION,
            _ => REQUIRED,
        }
    }

    /// Blank values count as missing: null, `""`, and an empty checkbox list.
    fn present<'a>(&self, raw: Option<&'a Value>) -> Option<&'a Value> {
        match raw? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::Array(items) if items.is_empty() && matches!(self, Self::MultiChoice { .. }) => {
                None
            }
            value => Some(value),
        }
    }

    fn apply(&self, value: &Value) -> Result<Value, String> {
        match self {
            Self::Text {
                min_length,
                max_length,
                pattern,
            } => {
                let text = value.as_str().ok_or("Expected a text value")?;
                check_length(text, *min_length, *max_length)?;
                if let Some(pattern) = pattern {
                    if !pattern.is_match(text) {
                        return Err("Does not match the required format".to_string());
                    }
                }
                Ok(value.clone())
            }
            Self::Email { allowed_domains } => {
                let email = value.as_str().ok_or("Expected a text value")?;
                if !EMAIL.is_match(email) {
                    return Err("Please enter a valid email address".to_string());
                }
                if !allowed_domains.is_empty() {
                    let domain = email
                        .rsplit_once('@')
                        .map(|(_, domain)| domain.to_lowercase())
                        .unwrap_or_default();
                    if !allowed_domains.iter().any(|d| d.to_lowercase() == domain) {
                        return Err(format!(
                            "Email must be from one of these domains: {}",
                            allowed_domains.join(", ")
                        ));
                    }
                }
                Ok(value.clone())
            }
            Self::Number { min, max, step } => {
                let number = coerce_number(value).ok_or("Expected a number")?;
                if let Some(min) = min {
                    if number < *min {
                        return Err(format!("Must be at least {}", min));
                    }
                }
                if let Some(max) = max {
                    if number > *max {
                        return Err(format!("Must be at most {}", max));
                    }
                }
                if let Some(step) = step {
                    // float error in the quotient grows with its magnitude
                    let steps = (number - min.unwrap_or(0.0)) / step;
                    let tolerance = (steps.abs() * 1e-12).max(1e-9);
                    if (steps - steps.round()).abs() > tolerance {
                        return Err(format!("Must be a multiple of {}", step));
                    }
                }
                Ok(number_value(value, number))
            }
            Self::Choice { options } => {
                let choice = value.as_str().ok_or("Expected a text value")?;
                if !options.iter().any(|o| o == choice) {
                    return Err(INVALID_OPTION.to_string());
                }
                Ok(value.clone())
            }
            Self::MultiChoice {
                options,
                min_selections,
                max_selections,
            } => {
                let mut selected: Vec<&str> = match value {
                    Value::String(s) => vec![s.as_str()],
                    Value::Array(items) => items
                        .iter()
                        .map(Value::as_str)
                        .collect::<Option<Vec<_>>>()
                        .ok_or("Expected a list of options")?,
                    _ => return Err("Expected a list of options".to_string()),
                };
                let mut seen = HashSet::new();
                selected.retain(|s| seen.insert(*s));
                if selected.iter().any(|s| !options.iter().any(|o| o == s)) {
                    return Err(INVALID_OPTION.to_string());
                }
                let count = selected.len() as u32;
                if let Some(min) = min_selections {
                    if count < *min {
                        return Err(format!("Please select at least {}", plural_options(*min)));
                    }
                }
                if let Some(max) = max_selections {
                    if count > *max {
                        return Err(format!("Please select at most {}", plural_options(*max)));
                    }
                }
                Ok(Value::Array(
                    selected.into_iter().map(|s| Value::String(s.to_string())).collect(),
                ))
            }
        }
    }
}

fn check_length(text: &str, min: Option<u32>, max: Option<u32>) -> Result<(), String> {
    let len = text.chars().count();
    if let Some(min) = min {
        if len < min as usize {
            return Err(format!("Must be at least {} characters", min));
        }
    }
    if let Some(max) = max {
        if len > max as usize {
            return Err(format!("Must be at most {} characters", max));
        }
    }
    Ok(())
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Numbers pass through untouched; coerced strings become integers when exact.
fn number_value(original: &Value, number: f64) -> Value {
    if original.is_number() {
        return original.clone();
    }
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::from(number as i64)
    } else {
        Value::from(number)
    }
}

fn plural_options(n: u32) -> String {
    if n == 1 {
        "1 option".to_string()
    } else {
        format!("{} options", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(fields: Value) -> FormSchema {
        let fields: Vec<Field> = serde_json::from_value(fields).unwrap();
        FormSchema::compile(&fields).unwrap()
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn contact_schema() -> FormSchema {
        schema(json!([
            { "id": "name", "type": "text", "label": "Name", "required": true,
              "settings": { "minLength": 2, "maxLength": 10 } },
            { "id": "email", "type": "email", "label": "Email",
              "settings": { "allowedDomains": ["Example.com"] } },
            { "id": "age", "type": "number", "label": "Age",
              "settings": { "min": 18, "max": 99 } },
            { "id": "bio", "type": "textarea", "label": "Bio" },
            { "id": "topics", "type": "checkbox", "label": "Topics", "required": true,
              "options": ["rust", "go", "zig"], "settings": { "maxSelections": 2 } },
            { "id": "plan", "type": "radio", "label": "Plan", "options": ["free", "pro"] }
        ]))
    }

    #[test]
    fn test_valid_payload_is_cleaned() {
        let cleaned = contact_schema()
            .validate(&payload(json!({
                "name": "Ada",
                "email": "ada@example.COM",
                "age": "36",
                "bio": "",
                "topics": "rust",
                "plan": "pro",
                "extra": "dropped"
            })))
            .unwrap();

        assert_eq!(cleaned["age"], json!(36));
        assert_eq!(cleaned["topics"], json!(["rust"]));
        assert!(!cleaned.contains_key("bio"));
        assert!(!cleaned.contains_key("extra"));
        assert_eq!(cleaned.len(), 5);
    }

    #[test]
    fn test_required_fields_report_their_message() {
        let errors = contact_schema()
            .validate(&payload(json!({ "name": "", "topics": [] })))
            .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("name"), Some(REQUIRED));
        assert_eq!(errors.get("topics"), Some(REQUIRED_SELECTION));
    }

    #[test]
    fn test_optional_fields_may_be_missing() {
        let cleaned = contact_schema()
            .validate(&payload(json!({ "name": "Ada", "topics": ["go"], "age": null })))
            .unwrap();
        assert_eq!(cleaned.len(), 2);
    }

    #[test]
    fn test_text_length_bounds() {
        let schema = contact_schema();
        let short = schema
            .validate(&payload(json!({ "name": "A", "topics": ["go"] })))
            .unwrap_err();
        assert_eq!(short.get("name"), Some("Must be at least 2 characters"));

        let long = schema
            .validate(&payload(json!({ "name": "Ada Lovelace!", "topics": ["go"] })))
            .unwrap_err();
        assert_eq!(long.get("name"), Some("Must be at most 10 characters"));

        // lengths count characters, not bytes
        assert!(schema
            .validate(&payload(json!({ "name": "Zoë", "topics": ["go"] })))
            .is_ok());
    }

    #[test]
    fn test_pattern_must_match_whole_value() {
        let schema = schema(json!([
            { "id": "zip", "type": "text", "label": "Zip", "settings": { "pattern": "[0-9]{5}" } }
        ]));

        assert!(schema.validate(&payload(json!({ "zip": "12345" }))).is_ok());
        let errors = schema.validate(&payload(json!({ "zip": "123456" }))).unwrap_err();
        assert_eq!(errors.get("zip"), Some("Does not match the required format"));
    }

    #[test]
    fn test_email_format_and_domains() {
        let schema = contact_schema();
        let base = json!({ "name": "Ada", "topics": ["go"] });

        let mut bad = payload(base.clone());
        bad.insert("email".into(), json!("not-an-email"));
        assert_eq!(
            schema.validate(&bad).unwrap_err().get("email"),
            Some("Please enter a valid email address")
        );

        let mut wrong_domain = payload(base);
        wrong_domain.insert("email".into(), json!("ada@other.org"));
        assert_eq!(
            schema.validate(&wrong_domain).unwrap_err().get("email"),
            Some("Email must be from one of these domains: Example.com")
        );
    }

    #[test]
    fn test_number_coercion_and_range() {
        let schema = contact_schema();
        let check = |age: Value| {
            schema
                .validate(&payload(json!({ "name": "Ada", "topics": ["go"], "age": age })))
                .map_err(|e| e.get("age").map(str::to_string))
        };

        assert_eq!(check(json!("abc")).unwrap_err().as_deref(), Some("Expected a number"));
        assert_eq!(check(json!(17)).unwrap_err().as_deref(), Some("Must be at least 18"));
        assert_eq!(check(json!("100")).unwrap_err().as_deref(), Some("Must be at most 99"));
        assert_eq!(check(json!(" 42.5 ")).unwrap()["age"], json!(42.5));
        assert_eq!(check(json!(true)).unwrap_err().as_deref(), Some("Expected a number"));
    }

    #[test]
    fn test_number_step() {
        let schema = schema(json!([
            { "id": "qty", "type": "number", "label": "Qty", "settings": { "min": 1, "step": 0.5 } }
        ]));
        assert!(schema.validate(&payload(json!({ "qty": 2.5 }))).is_ok());
        let errors = schema.validate(&payload(json!({ "qty": 2.2 }))).unwrap_err();
        assert_eq!(errors.get("qty"), Some("Must be a multiple of 0.5"));
    }

    #[test]
    fn test_number_step_large_values() {
        let schema = schema(json!([
            { "id": "price", "type": "number", "label": "Price", "settings": { "step": 0.01 } }
        ]));
        for price in [json!(1234567.89), json!("98765432.1"), json!(99999.99)] {
            assert!(schema.validate(&payload(json!({ "price": price }))).is_ok(), "{}", price);
        }
        for price in [json!(1234567.895), json!("98765432.105")] {
            let errors = schema.validate(&payload(json!({ "price": price }))).unwrap_err();
            assert_eq!(errors.get("price"), Some("Must be a multiple of 0.01"));
        }
    }

    #[test]
    fn test_choice_fields_reject_unknown_options() {
        let schema = contact_schema();
        let errors = schema
            .validate(&payload(json!({
                "name": "Ada",
                "topics": ["rust", "cobol"],
                "plan": "enterprise"
            })))
            .unwrap_err();

        assert_eq!(errors.get("topics"), Some(INVALID_OPTION));
        assert_eq!(errors.get("plan"), Some(INVALID_OPTION));
    }

    #[test]
    fn test_selection_bounds() {
        let schema = schema(json!([
            { "id": "t", "type": "checkbox", "label": "T", "options": ["a", "b", "c"],
              "settings": { "minSelections": 2, "maxSelections": 2 } }
        ]));

        let few = schema.validate(&payload(json!({ "t": ["a"] }))).unwrap_err();
        assert_eq!(few.get("t"), Some("Please select at least 2 options"));

        let many = schema.validate(&payload(json!({ "t": ["a", "b", "c"] }))).unwrap_err();
        assert_eq!(many.get("t"), Some("Please select at most 2 options"));

        let wrong_type = schema.validate(&payload(json!({ "t": [1, 2] }))).unwrap_err();
        assert_eq!(wrong_type.get("t"), Some("Expected a list of options"));
    }

    #[test]
    fn test_repeated_selections_count_once() {
        let schema = schema(json!([
            { "id": "t", "type": "checkbox", "label": "T", "options": ["a", "b", "c"],
              "settings": { "minSelections": 2 } }
        ]));

        let repeated = schema.validate(&payload(json!({ "t": ["a", "a"] }))).unwrap_err();
        assert_eq!(repeated.get("t"), Some("Please select at least 2 options"));

        let cleaned = schema
            .validate(&payload(json!({ "t": ["b", "a", "b"] })))
            .unwrap();
        assert_eq!(cleaned["t"], json!(["b", "a"]));
    }

    #[test]
    fn test_compile_rejects_duplicates_and_bad_patterns() {
        let fields: Vec<Field> = serde_json::from_value(json!([
            { "id": "a", "type": "text", "label": "A" },
            { "id": "a", "type": "number", "label": "Also A" }
        ]))
        .unwrap();
        assert_eq!(
            FormSchema::compile(&fields).unwrap_err(),
            SchemaError::DuplicateId("a".to_string())
        );

        let fields: Vec<Field> = serde_json::from_value(json!([
            { "id": "p", "type": "text", "label": "P", "settings": { "pattern": "([a-z" } }
        ]))
        .unwrap();
        assert!(matches!(
            FormSchema::compile(&fields),
            Err(SchemaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_default_values() {
        let defaults = contact_schema().default_values();
        assert_eq!(defaults["name"], json!(""));
        assert_eq!(defaults["age"], json!(""));
        assert_eq!(defaults["topics"], json!([]));
        assert_eq!(defaults.len(), 6);
    }

    #[test]
    fn test_descriptor_shape() {
        let value = serde_json::to_value(contact_schema()).unwrap();
        let fields = value["fields"].as_array().unwrap();

        assert_eq!(fields[0]["type"], "text");
        assert_eq!(fields[0]["minLength"], 2);
        assert_eq!(fields[1]["allowedDomains"], json!(["Example.com"]));
        assert_eq!(fields[4]["maxSelections"], 2);
        assert_eq!(fields[5]["options"], json!(["free", "pro"]));
        assert!(fields[3].get("pattern").is_none());
    }
}
