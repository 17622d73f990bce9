//! The form widget: one loaded form, its rendered tree, and the visitor-facing state.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::client::{ApiClient, SubmitPayload};
use crate::config::{WidgetConfig, WidgetOptions};
use crate::definition::FormDefinition;
use crate::dom::{Action, Dom, DomEvent, NodeId};
use crate::effect::{Effect, PageEvent, Timer};
use crate::error::WidgetResult;
use crate::renderer::{
    self, Control, FieldBlock, RatingKind, RenderedWidget, ACTIVE_CLASS, ERROR_PANEL_CLASS,
    OPEN_CLASS, SUBMITTED_CLASS,
};
use crate::rules::{DisplayRuleEngine, TriggerState, UrlMatcher};
use crate::validator::{ValidationReport, Validator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitPhase {
    #[default]
    Idle,
    Submitting,
    Submitted,
    Error,
}

#[derive(Debug, Clone)]
pub struct FormWidget {
    config: WidgetConfig,
    options: WidgetOptions,
    definition: FormDefinition,
    view: RenderedWidget,
    validator: Validator,
    rules: DisplayRuleEngine,
    is_open: bool,
    phase: SubmitPhase,
    in_flight: bool,
    removed: bool,
    last_validation: Option<ValidationReport>,
    effects: Vec<Effect>,
}

impl FormWidget {
    /// Fetch the published form and mount it for a page at `path`.
    ///
    /// Nothing is rendered when loading fails; the error is logged and returned.
    pub async fn load(client: &ApiClient, path: &str, options: WidgetOptions) -> WidgetResult<Self> {
        let config = client.config().clone();
        if let Err(e) = config.validate() {
            error!(error = %e, "refusing to load form");
            return Err(e);
        }
        match client.fetch_form().await {
            Ok(definition) => Ok(Self::mount(config, definition, path, options)),
            Err(e) => {
                error!(form_id = %config.form_id, error = %e, "failed to load form");
                Err(e.into_load())
            }
        }
    }

    /// Render an already loaded definition and apply its display rules for `path`.
    pub fn mount(
        config: WidgetConfig,
        definition: FormDefinition,
        path: &str,
        options: WidgetOptions,
    ) -> Self {
        let mut view = renderer::render(&definition);
        view.dom.start_recording();
        let validator = Validator::new(&definition.fields);
        let rules = DisplayRuleEngine::new(definition.embed_settings.timing.trigger());
        let matcher = UrlMatcher::compile(&definition.embed_settings.url_rules);

        let mut widget = Self {
            config,
            options,
            definition,
            view,
            validator,
            rules,
            is_open: false,
            phase: SubmitPhase::Idle,
            in_flight: false,
            removed: false,
            last_validation: None,
            effects: Vec::new(),
        };
        info!(
            form_id = %widget.config.form_id,
            fields = widget.definition.fields.len(),
            "widget mounted"
        );

        if matcher.is_visible(path) {
            let armed = widget.rules.arm();
            widget.emit_all(armed);
        } else {
            debug!(path, "URL rules hide the widget on this page");
            widget.remove();
        }
        widget.flush();
        widget
    }

    // ─── Panel ──────────────────────────────────────────────────────────────

    pub fn toggle(&mut self) {
        self.set_open(!self.is_open);
    }

    pub fn open(&mut self) {
        self.set_open(true);
    }

    pub fn close(&mut self) {
        self.set_open(false);
    }

    fn set_open(&mut self, open: bool) {
        if self.removed || self.is_open == open {
            return;
        }
        self.is_open = open;
        self.view.dom.toggle_class(self.view.panel, OPEN_CLASS, open);
        self.flush();
    }

    // ─── Visitor input ──────────────────────────────────────────────────────

    /// Route a browser event on `node` to its listener.
    ///
    /// Returns a payload when the event starts a submission. The host must send it and
    /// report the outcome through [`FormWidget::finish_submit`].
    pub fn dispatch(&mut self, node: NodeId, event: DomEvent) -> Option<SubmitPayload> {
        if self.removed {
            return None;
        }
        let action = self.view.dom.listener(node, event)?.clone();
        match action {
            Action::TogglePanel => self.toggle(),
            Action::ClosePanel => self.close(),
            Action::Rate { field, value } => self.rate(field, value),
            Action::SubmitForm => return self.begin_submit(),
        }
        None
    }

    /// Select rating `value` (1-based) on the field at `field_index`.
    pub fn rate(&mut self, field_index: usize, value: u8) {
        let Some(FieldBlock {
            control: Control::Rating { kind, hidden, units },
            ..
        }) = self.view.blocks.get(field_index)
        else {
            return;
        };
        let value = value.clamp(1, units.len() as u8);
        let (kind, hidden, units) = (*kind, *hidden, units.clone());
        self.view.dom.set_value(hidden, value.to_string());
        for (i, unit) in units.iter().enumerate() {
            let position = i + 1;
            let active = match kind {
                RatingKind::Stars => position <= value as usize,
                RatingKind::Emoji => position == value as usize,
            };
            self.view.dom.toggle_class(*unit, ACTIVE_CLASS, active);
        }
        self.flush();
    }

    /// Record a text value the visitor typed or picked.
    pub fn input(&mut self, node: NodeId, value: impl Into<String>) {
        self.view.dom.sync_value(node, value);
    }

    /// Record a checkbox or radio change. Checking a radio unchecks the rest of its group.
    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if checked {
            let group = self.view.blocks.iter().find_map(|b| match &b.control {
                Control::Radio(inputs) if inputs.contains(&node) => Some(inputs.clone()),
                _ => None,
            });
            for other in group.into_iter().flatten().filter(|n| *n != node) {
                self.view.dom.sync_checked(other, false);
            }
        }
        self.view.dom.sync_checked(node, checked);
    }

    // ─── Submission ─────────────────────────────────────────────────────────

    /// Validate and, when every field passes, lock the form and return the payload to send.
    pub fn begin_submit(&mut self) -> Option<SubmitPayload> {
        if self.removed {
            return None;
        }
        if self.in_flight {
            debug!("submit ignored: a submission is already in flight");
            return None;
        }

        let report = self.validator.validate(&mut self.view.dom, &self.view.blocks);
        let valid = report.is_valid();
        if !valid {
            debug!(errors = report.errors.len(), "submit blocked by validation");
        }
        self.last_validation = Some(report);
        if !valid {
            self.flush();
            return None;
        }

        if self.phase == SubmitPhase::Error {
            self.emit(Effect::CancelTimer {
                timer: Timer::ClearError,
            });
        }
        let dom = &mut self.view.dom;
        dom.remove_class(self.view.panel, ERROR_PANEL_CLASS);
        dom.remove_class(self.view.panel, SUBMITTED_CLASS);
        dom.set_disabled(self.view.submit_button, true);
        dom.set_text(self.view.submit_button, self.options.submitting_label.clone());

        let pairs = dom.form_data(self.view.form);
        self.in_flight = true;
        self.phase = SubmitPhase::Submitting;
        self.flush();
        Some(SubmitPayload::from_pairs(self.config.form_id.clone(), pairs))
    }

    /// Apply the outcome of the request started by [`FormWidget::begin_submit`].
    pub fn finish_submit(&mut self, result: WidgetResult<()>) {
        if !self.in_flight {
            return;
        }
        self.in_flight = false;
        if self.removed {
            debug!("submit result dropped: widget was torn down");
            self.phase = SubmitPhase::Idle;
            return;
        }
        let label = self.definition.metadata.submit_label().to_string();
        let dom = &mut self.view.dom;
        dom.set_disabled(self.view.submit_button, false);
        dom.set_text(self.view.submit_button, label);

        match result {
            Ok(()) => {
                info!(form_id = %self.config.form_id, "form response submitted");
                self.phase = SubmitPhase::Submitted;
                dom.set_text(self.view.status, self.options.success_message.clone());
                dom.add_class(self.view.panel, SUBMITTED_CLASS);
                self.reset_form();
                self.close();
            }
            Err(e) => {
                error!(form_id = %self.config.form_id, error = %e, "form submission failed");
                self.phase = SubmitPhase::Error;
                dom.set_text(self.view.status, self.options.error_message.clone());
                dom.add_class(self.view.panel, ERROR_PANEL_CLASS);
                self.emit(Effect::ScheduleTimer {
                    timer: Timer::ClearError,
                    after: self.options.error_duration,
                });
            }
        }
        self.flush();
    }

    /// Validate, send and apply the result in one go.
    ///
    /// Returns `Ok(false)` when nothing was sent (validation failed or a submit is in flight).
    pub async fn submit(&mut self, client: &ApiClient) -> WidgetResult<bool> {
        let Some(payload) = self.begin_submit() else {
            return Ok(false);
        };
        let result = client.submit_response(&payload).await;
        self.finish_submit(result.clone());
        result.map(|_| true)
    }

    fn reset_form(&mut self) {
        let dom = &mut self.view.dom;
        dom.reset_form(self.view.form);
        for block in &self.view.blocks {
            if let Control::Rating { units, .. } = &block.control {
                for unit in units {
                    dom.remove_class(*unit, ACTIVE_CLASS);
                }
            }
        }
        self.validator.clear(dom, &self.view.blocks);
    }

    // ─── Page ───────────────────────────────────────────────────────────────

    pub fn handle_page_event(&mut self, event: PageEvent) {
        if let PageEvent::TimerElapsed(Timer::ClearError) = event {
            if self.phase == SubmitPhase::Error {
                self.phase = SubmitPhase::Idle;
                self.view.dom.remove_class(self.view.panel, ERROR_PANEL_CLASS);
                self.view.dom.set_text(self.view.status, "");
                self.flush();
            }
            return;
        }
        if self.removed {
            return;
        }
        if let Some(released) = self.rules.on_page_event(&event) {
            self.emit_all(released);
            self.open();
        }
    }

    /// Take everything queued for the host since the last call.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        self.flush();
        std::mem::take(&mut self.effects)
    }

    /// Release page listeners and timers and take the widget off the page.
    pub fn teardown(&mut self) {
        let released = self.rules.teardown();
        self.emit_all(released);
        if self.phase == SubmitPhase::Error {
            self.emit(Effect::CancelTimer {
                timer: Timer::ClearError,
            });
        }
        self.remove();
        self.flush();
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        self.is_open = false;
        self.view.dom.remove(self.view.container);
    }

    fn flush(&mut self) {
        self.effects.extend(
            self.view
                .dom
                .take_patches()
                .into_iter()
                .map(|patch| Effect::Patch { patch }),
        );
    }

    fn emit(&mut self, effect: Effect) {
        self.flush();
        self.effects.push(effect);
    }

    fn emit_all(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.emit(effect);
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn dom(&self) -> &Dom {
        &self.view.dom
    }

    pub fn view(&self) -> &RenderedWidget {
        &self.view
    }

    pub fn container(&self) -> NodeId {
        self.view.container
    }

    pub fn block(&self, field_id: &str) -> Option<&FieldBlock> {
        self.view.blocks.iter().find(|b| b.field_id == field_id)
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn phase(&self) -> SubmitPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.rules.state()
    }

    pub fn last_validation(&self) -> Option<&ValidationReport> {
        self.last_validation.as_ref()
    }

    pub fn to_html(&self) -> String {
        self.view.dom.to_html(self.view.container)
    }
}
