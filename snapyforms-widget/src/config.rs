use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{WidgetError, WidgetResult};

pub const DEFAULT_API_URL: &str = "https://cwcyjjogegbttltkextf.supabase.co/functions/v1";
/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "SNAPYFORMS_API_URL";

/// Everything needed to reach the backend for one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub form_id: String,
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl WidgetConfig {
    pub fn new(form_id: impl Into<String>, api_key: impl Into<String>) -> WidgetResult<Self> {
        let config = Self {
            form_id: form_id.into(),
            api_key: api_key.into(),
            api_url: default_api_url(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Like [`WidgetConfig::new`], but honours `SNAPYFORMS_API_URL` when set.
    pub fn from_env(form_id: impl Into<String>, api_key: impl Into<String>) -> WidgetResult<Self> {
        let config = Self::new(form_id, api_key)?;
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_api_url(url),
            _ => Ok(config),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> WidgetResult<Self> {
        self.api_url = api_url.into();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> WidgetResult<()> {
        if self.form_id.trim().is_empty() {
            return Err(WidgetError::Config("formId is required".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(WidgetError::Config("apiKey is required".to_string()));
        }
        let url = self.api_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(WidgetError::Config(format!(
                "API URL '{}' must start with http:// or https://",
                self.api_url
            )));
        }
        Ok(())
    }

    /// Full URL of a backend function, e.g. `get-published-form`.
    pub fn endpoint(&self, function: &str) -> String {
        format!("{}/{}", self.api_url.trim().trim_end_matches('/'), function)
    }
}

/// Presentation knobs that are not part of the form definition
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOptions {
    /// How long the panel stays in the error state after a failed submit
    pub error_duration: Duration,
    pub success_message: String,
    pub error_message: String,
    pub submitting_label: String,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            error_duration: Duration::from_secs(3),
            success_message: "Form submitted successfully!".to_string(),
            error_message: "Failed to submit form. Please try again.".to_string(),
            submitting_label: "Submitting...".to_string(),
        }
    }
}
