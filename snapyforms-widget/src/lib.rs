//! # SnapyForms widget
//!
//! Core of the embeddable SnapyForms feedback widget: a floating launcher bubble
//! that opens a panel with a form fetched from the SnapyForms backend.
//!
//! ## Features
//! - Typed form definitions with load-time checks
//! - Rendering into an in-memory element tree, journalled as patches for a host page
//! - Client-side validation (required, email, E.164 phone, pattern, number bounds)
//! - Display rules: URL show/hide patterns and delay, scroll or exit-intent auto-open
//! - Backend client for loading forms and posting responses
//!
//! ## Example
//! ```ignore
//! use snapyforms_widget::{FormDefinition, FormWidget, WidgetConfig, WidgetOptions};
//!
//! let config = WidgetConfig::new("form-id", "api-key")?;
//! let definition = FormDefinition::from_json(json)?;
//! let mut widget = FormWidget::mount(config, definition, "/pricing", WidgetOptions::default());
//!
//! let bubble = widget.view().bubble;
//! widget.dispatch(bubble, DomEvent::Click);
//! for effect in widget.drain_effects() {
//!     // apply to the page
//! }
//! ```

pub mod client;
pub mod config;
pub mod definition;
pub mod dom;
pub mod effect;
pub mod error;
pub mod icons;
pub mod renderer;
pub mod rules;
pub mod style;
pub mod theme;
pub mod validator;
pub mod widget;

// --- Core types ---
pub use client::{ApiClient, SubmitPayload};
pub use config::{WidgetConfig, WidgetOptions, API_URL_ENV, DEFAULT_API_URL};
pub use definition::{
    EmbedSettings, Field, FieldType, FormDefinition, Metadata, Position, PositionKind, Timing,
    TimingKind, Trigger, UrlRules,
};
pub use dom::{Action, Dom, DomEvent, Node, NodeId, Patch};
pub use effect::{Effect, PageEvent, PageListener, Timer};
pub use error::{WidgetError, WidgetResult};
pub use renderer::{Control, FieldBlock, RenderedWidget};
pub use theme::Theme;
pub use validator::{validate_email, validate_phone, ValidationReport, Validator};
pub use widget::{FormWidget, SubmitPhase};

/// Parse and check a form definition from its JSON wire form
pub fn parse_definition(json: &str) -> WidgetResult<FormDefinition> {
    FormDefinition::from_json(json)
}

/// Parse a definition and render the widget markup, panel closed
pub fn render_html(json: &str) -> WidgetResult<String> {
    let definition = FormDefinition::from_json(json)?;
    let rendered = renderer::render(&definition);
    Ok(rendered.dom.to_html(rendered.container))
}
