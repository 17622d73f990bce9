use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

use crate::error::{WidgetError, WidgetResult};
use crate::theme;

/// Seconds before a delayed auto-open when the definition omits `delay`.
pub const DEFAULT_DELAY_SECS: f64 = 5.0;
/// Scroll threshold (percent) when the definition omits `scrollPercentage`.
pub const DEFAULT_SCROLL_PERCENTAGE: f64 = 50.0;
const MAX_DELAY_SECS: f64 = 24.0 * 60.0 * 60.0;

/// A published form as served by `get-published-form`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub embed_settings: EmbedSettings,
}

/// One configured input unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Email,
    Tel,
    Number,
    Textarea,
    Checkbox,
    Radio,
    File,
    StarRating,
    EmojiRating,
    Youtube,
    /// Any tag this widget does not know; rendered as a plain text input.
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// The `type` attribute of the single-line input used for this field, if it renders as one.
    pub fn input_type(&self) -> Option<&'static str> {
        match self {
            FieldType::Text | FieldType::Unknown => Some("text"),
            FieldType::Email => Some("email"),
            FieldType::Tel => Some("tel"),
            FieldType::Number => Some("number"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl Field {
    pub fn validation_message(&self) -> Option<&str> {
        self.validation.as_ref().and_then(|v| v.message.as_deref())
    }

    pub fn options(&self) -> &[FieldOption] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// Number of stars for a star rating: `validation.max`, default 5, clamped to 1..=10.
    pub fn star_count(&self) -> usize {
        const DEFAULT_STARS: usize = 5;
        const MAX_STARS: usize = 10;
        match self.validation.as_ref().and_then(|v| v.max) {
            Some(max) if max.is_finite() && max >= 1.0 => (max as usize).min(MAX_STARS),
            _ => DEFAULT_STARS,
        }
    }
}

/// Display strings for the bubble and panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bubble_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_button_text: Option<String>,
}

impl Metadata {
    pub fn submit_label(&self) -> &str {
        self.submit_button_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Submit")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedSettings {
    #[serde(deserialize_with = "null_as_default")]
    pub position: Position,
    #[serde(deserialize_with = "null_as_default")]
    pub timing: Timing,
    #[serde(deserialize_with = "null_as_default")]
    pub url_rules: UrlRules,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: PositionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_y: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionKind {
    #[default]
    BottomRight,
    BottomLeft,
    Custom,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timing {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: TimingKind,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingKind {
    #[default]
    Immediate,
    Delay,
    Scroll,
    Exit,
}

/// Resolved auto-open trigger with defaults applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Immediate,
    Delay(Duration),
    Scroll { percentage: f64 },
    ExitIntent,
}

impl Timing {
    pub fn trigger(&self) -> Trigger {
        match self.kind {
            TimingKind::Immediate => Trigger::Immediate,
            TimingKind::Delay => {
                let secs = sanitize(self.delay, DEFAULT_DELAY_SECS, MAX_DELAY_SECS);
                Trigger::Delay(Duration::from_secs_f64(secs))
            }
            TimingKind::Scroll => Trigger::Scroll {
                percentage: sanitize(self.scroll_percentage, DEFAULT_SCROLL_PERCENTAGE, 100.0),
            },
            TimingKind::Exit => Trigger::ExitIntent,
        }
    }
}

fn sanitize(value: Option<f64>, default: f64, max: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, max),
        _ => default,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlRules {
    #[serde(deserialize_with = "null_as_default")]
    pub show_on: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub hide_on: Vec<String>,
}

/// The backend serialises unset columns as `null`; treat them like missing keys.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl FormDefinition {
    /// Parse a definition from the JSON body of `get-published-form` and check it.
    pub fn from_json(json: &str) -> WidgetResult<Self> {
        let definition: FormDefinition = serde_json::from_str(json)?;
        definition.checked()
    }

    /// Check field ids and sanitise metadata that ends up in style attributes.
    pub fn checked(mut self) -> WidgetResult<Self> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.id.trim().is_empty() {
                return Err(WidgetError::InvalidDefinition(format!(
                    "field '{}' has an empty id",
                    field.label
                )));
            }
            if !seen.insert(field.id.as_str()) {
                return Err(WidgetError::DuplicateFieldId {
                    id: field.id.clone(),
                });
            }
        }

        if let Some(color) = self.metadata.theme_color.take() {
            if theme::is_safe_color(&color) {
                self.metadata.theme_color = Some(color);
            } else {
                warn!(color = %color, "ignoring unsafe themeColor, using default");
            }
        }
        if let Some(family) = self.metadata.font_family.take() {
            if theme::is_safe_font_family(&family) {
                self.metadata.font_family = Some(family);
            } else {
                warn!(font_family = %family, "ignoring unsafe fontFamily");
            }
        }

        Ok(self)
    }
}
