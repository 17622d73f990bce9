use regex::Regex;
use std::sync::OnceLock;

use crate::definition::Metadata;

pub const DEFAULT_THEME_COLOR: &str = "#0EA5E9";

const NAMED_COLORS: &[&str] = &[
    "red", "blue", "green", "white", "black", "transparent", "yellow", "orange", "purple",
    "pink", "gray", "grey", "teal", "navy", "indigo", "violet", "crimson", "tomato",
];

/// Resolved visual settings for one widget
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub color: String,
    pub font_family: Option<String>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            color: DEFAULT_THEME_COLOR.to_string(),
            font_family: None,
        }
    }
}

impl Theme {
    /// Resolve the theme from form metadata, falling back to defaults for absent or unsafe values.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let color = metadata
            .theme_color
            .as_deref()
            .map(str::trim)
            .filter(|c| is_safe_color(c))
            .unwrap_or(DEFAULT_THEME_COLOR)
            .to_string();
        let font_family = metadata
            .font_family
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty() && is_safe_font_family(f))
            .map(str::to_string);
        Self { color, font_family }
    }

    /// Inline style for tinted surfaces (bubble, header, submit button)
    pub fn background_css(&self) -> String {
        format!("background-color: {}", self.color)
    }

    pub fn font_css(&self) -> Option<String> {
        self.font_family
            .as_ref()
            .map(|family| format!("font-family: {}", family))
    }
}

/// A color that can be placed inside a `style` attribute without escaping its declaration.
pub fn is_safe_color(color: &str) -> bool {
    static HEX_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    static FUNC_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    let hex = HEX_COLOR_REGEX.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
    });
    let func = FUNC_COLOR_REGEX.get_or_init(|| {
        Regex::new(r"^(?:rgb|rgba|hsl|hsla)\(\s*[0-9.%]+\s*(?:,\s*[0-9.%]+\s*){2,3}\)$").unwrap()
    });
    let color = color.trim();
    hex.is_match(color)
        || func.is_match(color)
        || NAMED_COLORS.contains(&color.to_ascii_lowercase().as_str())
}

pub fn is_safe_font_family(family: &str) -> bool {
    static FONT_FAMILY_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = FONT_FAMILY_REGEX.get_or_init(|| Regex::new(r#"^[a-zA-Z0-9 ,'"\-]+$"#).unwrap());
    re.is_match(family)
}
