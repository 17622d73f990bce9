use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::definition::{Field, FieldType};
use crate::dom::Dom;
use crate::renderer::{Control, FieldBlock, ERROR_FIELD_CLASS};

const REQUIRED_MESSAGE: &str = "This field is required";
const EMAIL_MESSAGE: &str = "Please enter a valid email address";
const PHONE_MESSAGE: &str = "Please enter a valid phone number, e.g. +14155550123";
const PATTERN_MESSAGE: &str = "Please match the requested format";
const NUMBER_MESSAGE: &str = "Please enter a number";

pub fn validate_email(value: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
    re.is_match(value)
}

/// E.164: a plus sign, a non-zero digit, then 1 to 14 more digits.
pub fn validate_phone(value: &str) -> bool {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = PHONE_REGEX.get_or_init(|| Regex::new(r"^\+[1-9]\d{1,14}$").unwrap());
    re.is_match(value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_for(&self, field_id: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field_id == field_id)
    }
}

/// Per-field rules, compiled once when the widget mounts
#[derive(Debug, Clone)]
struct FieldRules {
    field_type: FieldType,
    required: bool,
    pattern: Option<Regex>,
    min: Option<f64>,
    max: Option<f64>,
    message: Option<String>,
}

impl FieldRules {
    fn from_field(field: &Field) -> Self {
        let validation = field.validation.as_ref();
        let pattern = validation
            .and_then(|v| v.pattern.as_deref())
            .filter(|p| !p.is_empty())
            .and_then(|p| match Regex::new(&format!("^(?:{})$", p)) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(field = %field.id, pattern = %p, error = %e, "ignoring invalid field pattern");
                    None
                }
            });
        Self {
            field_type: field.field_type,
            required: field.required,
            pattern,
            min: validation.and_then(|v| v.min),
            max: validation.and_then(|v| v.max),
            message: validation.and_then(|v| v.message.clone()),
        }
    }

    /// Check one text value. `None` means the control has nothing selected.
    ///
    /// Whitespace-only counts as empty, but format checks see the value exactly
    /// as it will be submitted.
    fn check(&self, value: Option<&str>) -> Result<(), &'static str> {
        let value = value.filter(|v| !v.trim().is_empty());
        let Some(value) = value else {
            return if self.required {
                Err(REQUIRED_MESSAGE)
            } else {
                Ok(())
            };
        };

        match self.field_type {
            FieldType::Email if !validate_email(value) => return Err(EMAIL_MESSAGE),
            FieldType::Tel if !validate_phone(value) => return Err(PHONE_MESSAGE),
            FieldType::Number => {
                let n: f64 = value.parse().map_err(|_| NUMBER_MESSAGE)?;
                if !n.is_finite() {
                    return Err(NUMBER_MESSAGE);
                }
                if self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max) {
                    return Err(NUMBER_MESSAGE);
                }
            }
            _ => {}
        }

        if let Some(pattern) = &self.pattern {
            if self.field_type.input_type().is_some() && !pattern.is_match(value) {
                return Err(PATTERN_MESSAGE);
            }
        }
        Ok(())
    }
}

/// Checks field values against their definitions and marks failing blocks.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Vec<FieldRules>,
}

impl Validator {
    pub fn new(fields: &[Field]) -> Self {
        Self {
            rules: fields.iter().map(FieldRules::from_field).collect(),
        }
    }

    /// Inspect current control state without touching the tree.
    pub fn check(&self, dom: &Dom, blocks: &[FieldBlock]) -> ValidationReport {
        let errors = self
            .rules
            .iter()
            .zip(blocks)
            .filter_map(|(rules, block)| {
                let result = match &block.control {
                    Control::None => Ok(()),
                    Control::Checkbox(input) => {
                        let checked = dom.is_checked(*input).then_some("on");
                        rules.check(checked)
                    }
                    Control::Radio(inputs) => {
                        let selected = inputs.iter().any(|i| dom.is_checked(*i));
                        rules.check(selected.then_some("on"))
                    }
                    Control::Input(node) | Control::TextArea(node) => rules.check(dom.value(*node)),
                    Control::Rating { hidden, .. } => rules.check(dom.value(*hidden)),
                };
                result.err().map(|default| FieldError {
                    field_id: block.field_id.clone(),
                    message: rules.message.clone().unwrap_or_else(|| default.to_string()),
                })
            })
            .collect();
        ValidationReport { errors }
    }

    /// Validate and toggle the error state on every block.
    pub fn validate(&self, dom: &mut Dom, blocks: &[FieldBlock]) -> ValidationReport {
        let report = self.check(dom, blocks);
        for block in blocks {
            match report.error_for(&block.field_id) {
                Some(error) => {
                    dom.set_text(block.error, error.message.clone());
                    dom.add_class(block.wrapper, ERROR_FIELD_CLASS);
                }
                None => dom.remove_class(block.wrapper, ERROR_FIELD_CLASS),
            }
        }
        report
    }

    /// Clear every error marker, used when the form is reset.
    pub fn clear(&self, dom: &mut Dom, blocks: &[FieldBlock]) {
        for block in blocks {
            dom.remove_class(block.wrapper, ERROR_FIELD_CLASS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldValidation, FormDefinition, Metadata};
    use crate::renderer::{self, RenderedWidget};
    use pretty_assertions::assert_eq;

    fn field(id: &str, field_type: FieldType, required: bool) -> Field {
        Field {
            id: id.to_string(),
            field_type,
            label: id.to_string(),
            required,
            placeholder: None,
            validation: None,
            options: None,
            youtube_url: None,
        }
    }

    fn rendered(fields: Vec<Field>) -> (Validator, RenderedWidget) {
        let validator = Validator::new(&fields);
        let def = FormDefinition {
            fields,
            metadata: Metadata::default(),
            embed_settings: Default::default(),
        };
        (validator, renderer::render(&def))
    }

    fn input_of(widget: &RenderedWidget, index: usize) -> crate::dom::NodeId {
        match widget.blocks[index].control {
            Control::Input(n) | Control::TextArea(n) | Control::Checkbox(n) => n,
            ref other => panic!("unexpected control {:?}", other),
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co"));
        assert!(validate_email("first.last+tag@example.org"));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("not an email"));
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+14155550123"));
        assert!(!validate_phone("4155550123"));
        assert!(!validate_phone("+0123"));
        assert!(!validate_phone("+1234567890123456"));
    }

    #[test]
    fn test_required_empty_fails() {
        let (validator, mut widget) = rendered(vec![field("name", FieldType::Text, true)]);
        let report = validator.validate(&mut widget.dom, &widget.blocks);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].message, REQUIRED_MESSAGE);
        assert!(widget.dom.has_class(widget.blocks[0].wrapper, ERROR_FIELD_CLASS));
    }

    #[test]
    fn test_whitespace_counts_as_empty() {
        let (validator, mut widget) = rendered(vec![field("name", FieldType::Text, true)]);
        let input = input_of(&widget, 0);
        widget.dom.set_value(input, "   ");
        assert!(!validator.check(&widget.dom, &widget.blocks).is_valid());
    }

    #[test]
    fn test_optional_empty_email_passes() {
        let (validator, mut widget) = rendered(vec![field("email", FieldType::Email, false)]);
        assert!(validator.validate(&mut widget.dom, &widget.blocks).is_valid());
        let input = input_of(&widget, 0);
        widget.dom.set_value(input, "a@b");
        let report = validator.validate(&mut widget.dom, &widget.blocks);
        assert_eq!(report.errors[0].message, EMAIL_MESSAGE);
    }

    #[test]
    fn test_error_class_cleared_once_fixed() {
        let (validator, mut widget) = rendered(vec![field("phone", FieldType::Tel, true)]);
        let input = input_of(&widget, 0);
        widget.dom.set_value(input, "4155550123");
        assert!(!validator.validate(&mut widget.dom, &widget.blocks).is_valid());
        widget.dom.set_value(input, "+14155550123");
        assert!(validator.validate(&mut widget.dom, &widget.blocks).is_valid());
        assert!(!widget.dom.has_class(widget.blocks[0].wrapper, ERROR_FIELD_CLASS));
    }

    #[test]
    fn test_format_checks_see_untrimmed_value() {
        let mut code = field("code", FieldType::Text, false);
        code.validation = Some(FieldValidation {
            pattern: Some("[A-Z]{3}".to_string()),
            ..Default::default()
        });
        let (validator, mut widget) = rendered(vec![field("phone", FieldType::Tel, false), code]);
        let phone = input_of(&widget, 0);
        let code = input_of(&widget, 1);

        widget.dom.set_value(phone, "+14155550123 ");
        widget.dom.set_value(code, " ABC");
        let report = validator.check(&widget.dom, &widget.blocks);
        assert_eq!(report.error_for("phone").map(|e| e.message.as_str()), Some(PHONE_MESSAGE));
        assert_eq!(report.error_for("code").map(|e| e.message.as_str()), Some(PATTERN_MESSAGE));

        widget.dom.set_value(phone, "+14155550123");
        widget.dom.set_value(code, "ABC");
        assert!(validator.check(&widget.dom, &widget.blocks).is_valid());
    }

    #[test]
    fn test_custom_message_wins() {
        let mut f = field("code", FieldType::Text, false);
        f.validation = Some(FieldValidation {
            pattern: Some("[A-Z]{3}".to_string()),
            message: Some("Three capitals please".to_string()),
            ..Default::default()
        });
        let (validator, mut widget) = rendered(vec![f]);
        let input = input_of(&widget, 0);
        widget.dom.set_value(input, "ABCD");
        let report = validator.validate(&mut widget.dom, &widget.blocks);
        assert_eq!(report.errors[0].message, "Three capitals please");
        assert_eq!(widget.dom.text_content(widget.blocks[0].error), "Three capitals please");
        widget.dom.set_value(input, "ABC");
        assert!(validator.check(&widget.dom, &widget.blocks).is_valid());
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let mut f = field("code", FieldType::Text, false);
        f.validation = Some(FieldValidation {
            pattern: Some("([unclosed".to_string()),
            ..Default::default()
        });
        let (validator, mut widget) = rendered(vec![f]);
        let input = input_of(&widget, 0);
        widget.dom.set_value(input, "anything");
        assert!(validator.check(&widget.dom, &widget.blocks).is_valid());
    }

    #[test]
    fn test_number_bounds() {
        let mut f = field("age", FieldType::Number, false);
        f.validation = Some(FieldValidation {
            min: Some(18.0),
            max: Some(99.0),
            ..Default::default()
        });
        let (validator, mut widget) = rendered(vec![f]);
        let input = input_of(&widget, 0);
        for (value, ok) in [("42", true), ("17", false), ("100", false), ("abc", false)] {
            widget.dom.set_value(input, value);
            assert_eq!(validator.check(&widget.dom, &widget.blocks).is_valid(), ok, "{}", value);
        }
    }

    #[test]
    fn test_checkbox_and_radio_required() {
        let mut radio = field("plan", FieldType::Radio, true);
        radio.options = Some(vec![crate::definition::FieldOption {
            label: "Free".to_string(),
            value: "free".to_string(),
        }]);
        let (validator, mut widget) =
            rendered(vec![field("terms", FieldType::Checkbox, true), radio]);
        let report = validator.check(&widget.dom, &widget.blocks);
        assert_eq!(report.errors.len(), 2);

        let checkbox = input_of(&widget, 0);
        widget.dom.set_checked(checkbox, true);
        let Control::Radio(options) = widget.blocks[1].control.clone() else {
            panic!("expected radio");
        };
        widget.dom.set_checked(options[0], true);
        assert!(validator.check(&widget.dom, &widget.blocks).is_valid());
    }

    #[test]
    fn test_required_rating_needs_a_value() {
        let (validator, mut widget) = rendered(vec![
            field("stars", FieldType::StarRating, true),
            field("intro", FieldType::Youtube, true),
        ]);
        assert_eq!(validator.check(&widget.dom, &widget.blocks).errors.len(), 1);
        let Control::Rating { hidden, .. } = widget.blocks[0].control.clone() else {
            panic!("expected rating");
        };
        widget.dom.set_value(hidden, "4");
        assert!(validator.check(&widget.dom, &widget.blocks).is_valid());
    }
}
