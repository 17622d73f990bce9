use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::WidgetConfig;
use crate::definition::FormDefinition;
use crate::error::{WidgetError, WidgetResult};

const GET_FORM_FUNCTION: &str = "get-published-form";
const SUBMIT_FUNCTION: &str = "submit-form-response";

/// Body of a `submit-form-response` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub form_id: String,
    pub response_data: BTreeMap<String, String>,
}

impl SubmitPayload {
    /// Build from form-data pairs. A repeated name keeps its last value.
    pub fn from_pairs(form_id: impl Into<String>, pairs: Vec<(String, String)>) -> Self {
        Self {
            form_id: form_id.into(),
            response_data: pairs.into_iter().collect(),
        }
    }
}

/// HTTP client for the SnapyForms backend functions
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: WidgetConfig,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    /// Fetch and check the published definition of the configured form.
    pub async fn fetch_form(&self) -> WidgetResult<FormDefinition> {
        let url = self.config.endpoint(GET_FORM_FUNCTION);
        debug!(url = %url, form_id = %self.config.form_id, "fetching form definition");
        let resp = self
            .client
            .get(&url)
            .query(&[("formId", self.config.form_id.as_str())])
            .header("Authorization", self.bearer())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WidgetError::Load {
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        let body = resp.text().await?;
        FormDefinition::from_json(&body).map_err(WidgetError::into_load)
    }

    /// Post a response. Any transport failure or non-2xx status is a submit error.
    pub async fn submit_response(&self, payload: &SubmitPayload) -> WidgetResult<()> {
        let url = self.config.endpoint(SUBMIT_FUNCTION);
        debug!(url = %url, fields = payload.response_data.len(), "submitting form response");
        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(payload)
            .send()
            .await
            .map_err(|e| WidgetError::Submit {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WidgetError::Submit {
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        Ok(())
    }
}
