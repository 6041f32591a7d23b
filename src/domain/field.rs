//! Field definitions for form builders.
//!
//! A [`Field`] is one input of a form. Its type tag and the type-specific
//! constraint settings travel together in [`FieldKind`], so a number field can
//! never carry a regex pattern and a text field can never carry options.

use serde::{Deserialize, Serialize};

use crate::domain::schema::SchemaError;

/// Every field type tag accepted on the wire, in builder menu order.
pub const FIELD_TYPES: [&str; 6] = ["text", "number", "email", "textarea", "checkbox", "radio"];

/// Options pre-filled when a choice field is added in the builder.
pub const DEFAULT_CHOICE_OPTIONS: [&str; 3] = ["Option 1", "Option 2", "Option 3"];

/// A single input definition within a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Key of this field inside a submission payload
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Field type tag plus the constraint payload that type supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        settings: TextSettings,
    },
    Number {
        #[serde(default)]
        settings: NumberSettings,
    },
    Email {
        #[serde(default)]
        settings: EmailSettings,
    },
    Textarea {
        #[serde(default)]
        settings: TextareaSettings,
    },
    Checkbox {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        settings: CheckboxSettings,
    },
    Radio {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        settings: RadioSettings,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Regular expression the whole value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextareaSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Visible height hint for renderers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Domains accepted after the `@`, compared case-insensitively
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckboxSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_selections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selections: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FieldKind {
    /// Wire tag of this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Number { .. } => "number",
            Self::Email { .. } => "email",
            Self::Textarea { .. } => "textarea",
            Self::Checkbox { .. } => "checkbox",
            Self::Radio { .. } => "radio",
        }
    }

    /// Options offered by choice fields, empty for free-form ones
    pub fn options(&self) -> &[String] {
        match self {
            Self::Checkbox { options, .. } | Self::Radio { options, .. } => options,
            _ => &[],
        }
    }
}

impl Field {
    /// Checks the definition itself, independent of any submitted value.
    ///
    /// Patterns are not compiled here; [`crate::domain::schema::FormSchema::compile`]
    /// does that once per form.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.id.trim().is_empty() {
            return Err(SchemaError::EmptyId);
        }
        if self.label.trim().is_empty() {
            return Err(SchemaError::EmptyLabel(self.id.clone()));
        }

        match &self.kind {
            FieldKind::Text { settings } => {
                self.check_lengths(settings.min_length, settings.max_length)
            }
            FieldKind::Textarea { settings } => {
                self.check_lengths(settings.min_length, settings.max_length)
            }
            FieldKind::Number { settings } => {
                for (name, bound) in [("min", settings.min), ("max", settings.max)] {
                    if bound.is_some_and(|b| !b.is_finite()) {
                        return Err(self.constraint(format!("{} must be a finite number", name)));
                    }
                }
                if let (Some(min), Some(max)) = (settings.min, settings.max) {
                    if min > max {
                        return Err(self.constraint(format!(
                            "min ({}) is greater than max ({})",
                            min, max
                        )));
                    }
                }
                if let Some(step) = settings.step {
                    if !step.is_finite() || step <= 0.0 {
                        return Err(self.constraint("step must be greater than 0".to_string()));
                    }
                }
                Ok(())
            }
            FieldKind::Email { settings } => {
                if settings.allowed_domains.iter().any(|d| d.trim().is_empty()) {
                    return Err(self.constraint("allowed domains cannot be empty".to_string()));
                }
                Ok(())
            }
            FieldKind::Checkbox { options, settings } => {
                self.check_options(options)?;
                if let (Some(min), Some(max)) = (settings.min_selections, settings.max_selections) {
                    if min > max {
                        return Err(self.constraint(format!(
                            "minSelections ({}) is greater than maxSelections ({})",
                            min, max
                        )));
                    }
                }
                Ok(())
            }
            FieldKind::Radio { options, .. } => self.check_options(options),
        }
    }

    fn check_lengths(&self, min: Option<u32>, max: Option<u32>) -> Result<(), SchemaError> {
        match (min, max) {
            (Some(min), Some(max)) if min > max => Err(self.constraint(format!(
                "minLength ({}) is greater than maxLength ({})",
                min, max
            ))),
            _ => Ok(()),
        }
    }

    fn check_options(&self, options: &[String]) -> Result<(), SchemaError> {
        if options.is_empty() {
            return Err(SchemaError::MissingOptions(self.id.clone()));
        }
        if options.iter().any(|o| o.is_empty()) {
            return Err(self.constraint("options cannot be empty strings".to_string()));
        }
        Ok(())
    }

    fn constraint(&self, reason: String) -> SchemaError {
        SchemaError::InvalidConstraint {
            field: self.id.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Field {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_text_field_with_settings() {
        let field = parse(json!({
            "id": "name",
            "type": "text",
            "label": "Name",
            "required": true,
            "settings": { "minLength": 2, "maxLength": 40, "pattern": "[A-Za-z ]+", "placeholder": "Jane" }
        }));

        assert!(field.required);
        match field.kind {
            FieldKind::Text { settings } => {
                assert_eq!(settings.min_length, Some(2));
                assert_eq!(settings.max_length, Some(40));
                assert_eq!(settings.pattern.as_deref(), Some("[A-Za-z ]+"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_choice_field_without_settings() {
        let field = parse(json!({
            "id": "color",
            "type": "radio",
            "label": "Favourite colour",
            "options": ["Red", "Green"]
        }));

        assert!(!field.required);
        assert_eq!(field.kind.type_name(), "radio");
        assert_eq!(field.kind.options(), ["Red".to_string(), "Green".to_string()]);
    }

    #[test]
    fn test_unknown_settings_are_ignored() {
        let field = parse(json!({
            "id": "age",
            "type": "number",
            "label": "Age",
            "settings": { "min": 0, "rows": 4 }
        }));

        assert_eq!(
            field.kind,
            FieldKind::Number {
                settings: NumberSettings {
                    min: Some(0.0),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<Field, _> = serde_json::from_value(json!({
            "id": "dob",
            "type": "date",
            "label": "Date of birth"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_keeps_wire_shape() {
        let field = parse(json!({
            "id": "contact",
            "type": "email",
            "label": "Contact",
            "settings": { "allowedDomains": ["example.com"] }
        }));

        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], "email");
        assert_eq!(value["required"], false);
        assert_eq!(value["settings"]["allowedDomains"][0], "example.com");
        assert!(value.get("options").is_none());
    }

    #[test]
    fn test_check_rejects_bad_definitions() {
        let no_options = parse(json!({ "id": "c", "type": "checkbox", "label": "C" }));
        assert!(matches!(no_options.check(), Err(SchemaError::MissingOptions(id)) if id == "c"));

        let bad_lengths = parse(json!({
            "id": "t", "type": "textarea", "label": "T",
            "settings": { "minLength": 10, "maxLength": 5 }
        }));
        assert!(matches!(bad_lengths.check(), Err(SchemaError::InvalidConstraint { .. })));

        let bad_range = parse(json!({
            "id": "n", "type": "number", "label": "N",
            "settings": { "min": 10, "max": 1 }
        }));
        assert!(bad_range.check().is_err());

        let bad_step = parse(json!({
            "id": "n", "type": "number", "label": "N",
            "settings": { "step": 0 }
        }));
        assert!(bad_step.check().is_err());

        let empty_label = parse(json!({ "id": "x", "type": "text", "label": " " }));
        assert!(matches!(empty_label.check(), Err(SchemaError::EmptyLabel(_))));
    }

    #[test]
    fn test_check_accepts_default_choice_options() {
        let field = Field {
            id: "pick".to_string(),
            label: "Pick".to_string(),
            description: None,
            required: false,
            kind: FieldKind::Checkbox {
                options: DEFAULT_CHOICE_OPTIONS.iter().map(|o| o.to_string()).collect(),
                settings: CheckboxSettings::default(),
            },
        };
        assert!(field.check().is_ok());
        assert!(FIELD_TYPES.contains(&field.kind.type_name()));
    }
}
