use thiserror::Error;

pub type WidgetResult<T> = Result<T, WidgetError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WidgetError {
    #[error("Failed to load form configuration: {reason}")]
    Load { reason: String },

    #[error("Failed to submit form: {reason}")]
    Submit { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid form definition: {0}")]
    InvalidDefinition(String),

    #[error("Duplicate field id '{id}': field ids must be unique within a form")]
    DuplicateFieldId { id: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl WidgetError {
    /// Wrap any error as a load failure. Errors that already are load failures pass through.
    pub fn into_load(self) -> Self {
        match self {
            WidgetError::Load { .. } => self,
            other => WidgetError::Load {
                reason: other.to_string(),
            },
        }
    }

    pub fn is_load(&self) -> bool {
        matches!(self, WidgetError::Load { .. })
    }

    pub fn is_submit(&self) -> bool {
        matches!(self, WidgetError::Submit { .. })
    }
}

impl From<serde_json::Error> for WidgetError {
    fn from(err: serde_json::Error) -> Self {
        WidgetError::Deserialization(err.to_string())
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(err: reqwest::Error) -> Self {
        WidgetError::Load {
            reason: err.to_string(),
        }
    }
}
