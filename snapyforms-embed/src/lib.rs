//! # SnapyForms browser bundle
//!
//! Exposes one `SnapyForms` class to pages that load the bundle with a script tag:
//!
//! ```js
//! new SnapyForms({ formId: "...", apiKey: "..." });
//! // or
//! new SnapyForms("form-id", "api-key");
//! ```
//!
//! The class fetches the published form, mirrors the widget's element tree into the
//! page and forwards browser events back to it. Effects queued by the widget (patches,
//! timers, page listeners) are applied after every call into it.

mod logging;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use js_sys::Reflect;
use snapyforms_widget::{
    ApiClient, Dom, DomEvent, Effect, FormWidget, Node, NodeId, PageEvent, PageListener, Patch,
    Timer, WidgetConfig, WidgetOptions, WidgetResult,
};
use tracing::{debug, error};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    console, Document, Element, Event, EventTarget, HtmlInputElement, HtmlTextAreaElement,
    MouseEvent,
};

type EventClosure = Closure<dyn FnMut(Event)>;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::install();
}

#[wasm_bindgen]
pub struct SnapyForms {
    host: Rc<Host>,
}

#[wasm_bindgen]
impl SnapyForms {
    /// `new SnapyForms({formId, apiKey})` or `new SnapyForms(formId, apiKey)`
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue, api_key: Option<String>) -> Result<SnapyForms, JsValue> {
        let config = read_config(&options, api_key).map_err(|e| {
            error!(error = %e, "invalid SnapyForms options");
            JsValue::from_str(&e.to_string())
        })?;
        let host = Rc::new(Host::new(ApiClient::new(config)));
        let loading = Rc::clone(&host);
        wasm_bindgen_futures::spawn_local(async move { loading.init().await });
        Ok(SnapyForms { host })
    }

    pub fn open(&self) {
        self.host.with_widget(FormWidget::open);
    }

    pub fn close(&self) {
        self.host.with_widget(FormWidget::close);
    }

    pub fn toggle(&self) {
        self.host.with_widget(FormWidget::toggle);
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.host
            .widget
            .borrow()
            .as_ref()
            .is_some_and(FormWidget::is_open)
    }

    #[wasm_bindgen(js_name = isLoaded)]
    pub fn is_loaded(&self) -> bool {
        self.host.widget.borrow().is_some()
    }

    /// Remove the widget from the page and release its listeners and timers.
    ///
    /// Safe to call before the form has loaded; the load result is then discarded.
    pub fn destroy(&self) {
        self.host.destroy();
    }
}

fn read_config(options: &JsValue, api_key: Option<String>) -> WidgetResult<WidgetConfig> {
    if let Some(form_id) = options.as_string() {
        return config_from_parts(Some(form_id), api_key, None);
    }
    if options.is_object() {
        return config_from_parts(
            js_string(options, "formId"),
            js_string(options, "apiKey").or(api_key),
            js_string(options, "apiUrl"),
        );
    }
    config_from_parts(None, api_key, None)
}

fn config_from_parts(
    form_id: Option<String>,
    api_key: Option<String>,
    api_url: Option<String>,
) -> WidgetResult<WidgetConfig> {
    let config = WidgetConfig::new(form_id.unwrap_or_default(), api_key.unwrap_or_default())?;
    match api_url.filter(|u| !u.trim().is_empty()) {
        Some(url) => config.with_api_url(url),
        None => Ok(config),
    }
}

fn js_string(object: &JsValue, key: &str) -> Option<String> {
    Reflect::get(object, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
}

/// Page-side state for one widget instance
struct Host {
    client: ApiClient,
    widget: RefCell<Option<FormWidget>>,
    nodes: RefCell<HashMap<NodeId, web_sys::Node>>,
    dom_listeners: RefCell<Vec<EventClosure>>,
    page_listeners: RefCell<HashMap<PageListener, EventClosure>>,
    // Listeners released from inside their own callback; kept alive until the host drops.
    retired: RefCell<Vec<EventClosure>>,
    timers: RefCell<HashMap<Timer, (i32, Closure<dyn FnMut()>)>>,
    destroyed: Cell<bool>,
}

impl Host {
    fn new(client: ApiClient) -> Self {
        Self {
            client,
            widget: RefCell::new(None),
            nodes: RefCell::new(HashMap::new()),
            dom_listeners: RefCell::new(Vec::new()),
            page_listeners: RefCell::new(HashMap::new()),
            retired: RefCell::new(Vec::new()),
            timers: RefCell::new(HashMap::new()),
            destroyed: Cell::new(false),
        }
    }

    async fn init(self: Rc<Self>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };
        let path = window
            .location()
            .pathname()
            .unwrap_or_else(|_| "/".to_string());

        let Ok(widget) = FormWidget::load(&self.client, &path, WidgetOptions::default()).await
        else {
            return;
        };
        if !self.install(widget) {
            self.take_effects();
            return;
        }

        if let Err(e) = self.attach(&document) {
            console::error_1(&e);
            return;
        }
        self.flush();
    }

    /// Store a freshly loaded widget. Returns whether it should be put on the page.
    fn install(&self, widget: FormWidget) -> bool {
        if self.destroyed.get() {
            debug!("widget destroyed before the form finished loading");
            return false;
        }
        let visible = !widget.is_removed();
        *self.widget.borrow_mut() = Some(widget);
        visible
    }

    fn destroy(self: &Rc<Self>) {
        self.destroyed.set(true);
        self.with_widget(FormWidget::teardown);
        self.dom_listeners.borrow_mut().clear();
        self.nodes.borrow_mut().clear();
    }

    fn with_widget(self: &Rc<Self>, f: impl FnOnce(&mut FormWidget)) {
        if let Some(widget) = self.widget.borrow_mut().as_mut() {
            f(widget);
        }
        self.flush();
    }

    fn take_effects(&self) -> Vec<Effect> {
        self.widget
            .borrow_mut()
            .as_mut()
            .map(FormWidget::drain_effects)
            .unwrap_or_default()
    }

    fn flush(self: &Rc<Self>) {
        for effect in self.take_effects() {
            self.apply(effect);
        }
    }

    // ─── Building ───────────────────────────────────────────────────────────

    fn attach(self: &Rc<Self>, document: &Document) -> Result<(), JsValue> {
        let root = {
            let guard = self.widget.borrow();
            let Some(widget) = guard.as_ref() else {
                return Ok(());
            };
            self.build(document, widget.dom(), widget.container())?
        };
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(&root)?;
        Ok(())
    }

    fn build(
        self: &Rc<Self>,
        document: &Document,
        dom: &Dom,
        id: NodeId,
    ) -> Result<web_sys::Node, JsValue> {
        let node: web_sys::Node = match dom.node(id) {
            Some(Node::Text(text)) => document.create_text_node(text).into(),
            Some(Node::Element(el)) => {
                let element = document.create_element(el.tag())?;
                for (name, value) in el.attrs() {
                    element.set_attribute(name, value)?;
                }
                if !el.classes().is_empty() {
                    element.set_attribute("class", &el.classes().join(" "))?;
                }
                if el.is_disabled() {
                    element.set_attribute("disabled", "")?;
                }
                if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
                    if input.type_() != "file" {
                        input.set_value(el.value().unwrap_or_default());
                    }
                    input.set_checked(el.is_checked());
                }
                for listener in el.listeners() {
                    self.listen_dom(&element, id, listener.event)?;
                }
                if matches!(el.tag(), "input" | "textarea") {
                    self.track_input(&element, id)?;
                }
                for child in el.children() {
                    match dom.node(*child) {
                        Some(Node::Markup(markup)) if el.tag() == "style" => {
                            element.set_text_content(Some(markup));
                        }
                        Some(Node::Markup(markup)) => {
                            element.insert_adjacent_html("beforeend", markup)?;
                        }
                        _ => {
                            let built = self.build(document, dom, *child)?;
                            element.append_child(&built)?;
                        }
                    }
                }
                element.into()
            }
            Some(Node::Markup(_)) | None => {
                return Err(JsValue::from_str("node cannot be built on its own"));
            }
        };
        self.nodes.borrow_mut().insert(id, node.clone());
        Ok(node)
    }

    fn listen_dom(self: &Rc<Self>, element: &Element, id: NodeId, event: DomEvent) -> Result<(), JsValue> {
        let host = Rc::downgrade(self);
        let closure = EventClosure::new(move |e: Event| {
            if event == DomEvent::Submit {
                e.prevent_default();
            }
            if let Some(host) = host.upgrade() {
                host.on_dom_event(id, event);
            }
        });
        element.add_event_listener_with_callback(event.as_str(), closure.as_ref().unchecked_ref())?;
        self.dom_listeners.borrow_mut().push(closure);
        Ok(())
    }

    fn track_input(self: &Rc<Self>, element: &Element, id: NodeId) -> Result<(), JsValue> {
        let host = Rc::downgrade(self);
        let closure = EventClosure::new(move |e: Event| {
            let (Some(host), Some(target)) = (host.upgrade(), e.current_target()) else {
                return;
            };
            host.on_input(id, &target);
        });
        for name in ["input", "change"] {
            element.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        }
        self.dom_listeners.borrow_mut().push(closure);
        Ok(())
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    fn on_dom_event(self: &Rc<Self>, id: NodeId, event: DomEvent) {
        let payload = {
            let mut guard = self.widget.borrow_mut();
            let Some(widget) = guard.as_mut() else {
                return;
            };
            widget.dispatch(id, event)
        };
        self.flush();

        let Some(payload) = payload else {
            return;
        };
        let host = Rc::clone(self);
        wasm_bindgen_futures::spawn_local(async move {
            let result = host.client.submit_response(&payload).await;
            if let Some(widget) = host.widget.borrow_mut().as_mut() {
                // Drops the result when the widget was destroyed meanwhile.
                widget.finish_submit(result);
            }
            if !host.destroyed.get() {
                host.flush();
            }
        });
    }

    fn on_input(&self, id: NodeId, target: &EventTarget) {
        let mut guard = self.widget.borrow_mut();
        let Some(widget) = guard.as_mut() else {
            return;
        };
        if let Some(input) = target.dyn_ref::<HtmlInputElement>() {
            match input.type_().as_str() {
                "checkbox" | "radio" => widget.set_checked(id, input.checked()),
                "file" => {
                    let name = input
                        .files()
                        .and_then(|files| files.get(0))
                        .map(|file| file.name())
                        .unwrap_or_default();
                    widget.input(id, name);
                }
                _ => widget.input(id, input.value()),
            }
        } else if let Some(area) = target.dyn_ref::<HtmlTextAreaElement>() {
            widget.input(id, area.value());
        }
    }

    fn on_page_event(self: &Rc<Self>, event: PageEvent) {
        self.with_widget(|widget| widget.handle_page_event(event));
    }

    // ─── Effects ────────────────────────────────────────────────────────────

    fn apply(self: &Rc<Self>, effect: Effect) {
        match effect {
            Effect::Patch { patch } => {
                if let Err(e) = self.apply_patch(&patch) {
                    console::warn_1(&e);
                }
            }
            Effect::ScheduleTimer { timer, after } => self.schedule(timer, after),
            Effect::CancelTimer { timer } => self.cancel(timer),
            Effect::Listen { listener } => self.listen_page(listener),
            Effect::Unlisten { listener } => self.unlisten_page(listener),
        }
    }

    fn apply_patch(&self, patch: &Patch) -> Result<(), JsValue> {
        let node_id = match patch {
            Patch::AddClass { node, .. }
            | Patch::RemoveClass { node, .. }
            | Patch::SetAttribute { node, .. }
            | Patch::SetValue { node, .. }
            | Patch::SetChecked { node, .. }
            | Patch::SetDisabled { node, .. }
            | Patch::SetText { node, .. }
            | Patch::Remove { node } => *node,
        };
        let Some(node) = self.nodes.borrow().get(&node_id).cloned() else {
            return Ok(());
        };
        let Some(element) = node.dyn_ref::<Element>() else {
            return Ok(());
        };

        match patch {
            Patch::AddClass { class, .. } => element.class_list().add_1(class)?,
            Patch::RemoveClass { class, .. } => element.class_list().remove_1(class)?,
            Patch::SetAttribute { name, value, .. } => element.set_attribute(name, value)?,
            Patch::SetValue { value, .. } => {
                if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
                    if input.type_() == "file" {
                        if value.is_empty() {
                            input.set_value("");
                        }
                    } else {
                        input.set_value(value);
                    }
                } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
                    area.set_value(value);
                }
            }
            Patch::SetChecked { checked, .. } => {
                if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
                    input.set_checked(*checked);
                }
            }
            Patch::SetDisabled { disabled, .. } => {
                if *disabled {
                    element.set_attribute("disabled", "")?;
                } else {
                    element.remove_attribute("disabled")?;
                }
            }
            Patch::SetText { text, .. } => element.set_text_content(Some(text)),
            Patch::Remove { .. } => element.remove(),
        }
        Ok(())
    }

    fn schedule(self: &Rc<Self>, timer: Timer, after: Duration) {
        let Some(window) = web_sys::window() else {
            return;
        };
        self.cancel(timer);
        let host = Rc::downgrade(self);
        let closure: Closure<dyn FnMut()> = Closure::once(move || {
            if let Some(host) = host.upgrade() {
                host.on_page_event(PageEvent::TimerElapsed(timer));
            }
        });
        let millis = after.as_millis().min(i32::MAX as u128) as i32;
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            millis,
        ) {
            Ok(handle) => {
                self.timers.borrow_mut().insert(timer, (handle, closure));
            }
            Err(e) => console::warn_1(&e),
        }
    }

    fn cancel(&self, timer: Timer) {
        let Some((handle, _closure)) = self.timers.borrow_mut().remove(&timer) else {
            return;
        };
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(handle);
        }
    }

    fn listen_page(self: &Rc<Self>, listener: PageListener) {
        let Some(target) = page_target(listener) else {
            return;
        };
        let host = Rc::downgrade(self);
        let closure = EventClosure::new(move |e: Event| {
            let Some(host) = host.upgrade() else {
                return;
            };
            let event = match listener {
                PageListener::Scroll => scroll_event(),
                PageListener::PointerLeave => e.dyn_ref::<MouseEvent>().map(|m| {
                    PageEvent::PointerLeave {
                        client_y: m.client_y() as f64,
                    }
                }),
            };
            if let Some(event) = event {
                host.on_page_event(event);
            }
        });
        if let Err(e) = target
            .add_event_listener_with_callback(page_event_name(listener), closure.as_ref().unchecked_ref())
        {
            console::warn_1(&e);
            return;
        }
        self.page_listeners.borrow_mut().insert(listener, closure);
    }

    fn unlisten_page(&self, listener: PageListener) {
        let Some(closure) = self.page_listeners.borrow_mut().remove(&listener) else {
            return;
        };
        if let Some(target) = page_target(listener) {
            let _ = target.remove_event_listener_with_callback(
                page_event_name(listener),
                closure.as_ref().unchecked_ref(),
            );
        }
        // Release may run inside this very closure's callback.
        self.retired.borrow_mut().push(closure);
    }
}

fn page_target(listener: PageListener) -> Option<EventTarget> {
    let window = web_sys::window()?;
    match listener {
        PageListener::Scroll => Some(window.into()),
        PageListener::PointerLeave => Some(window.document()?.document_element()?.into()),
    }
}

fn page_event_name(listener: PageListener) -> &'static str {
    match listener {
        PageListener::Scroll => "scroll",
        PageListener::PointerLeave => "mouseleave",
    }
}

fn scroll_event() -> Option<PageEvent> {
    let window = web_sys::window()?;
    let root = window.document()?.document_element()?;
    Some(PageEvent::Scroll {
        scroll_y: window.scroll_y().ok()?,
        document_height: root.scroll_height() as f64,
        viewport_height: window.inner_height().ok()?.as_f64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapyforms_widget::{WidgetError, DEFAULT_API_URL};

    #[test]
    fn test_config_from_positional_parts() {
        let config =
            config_from_parts(Some("form-1".to_string()), Some("pk".to_string()), None).unwrap();
        assert_eq!(config.form_id, "form-1");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_requires_both_parts() {
        assert!(matches!(
            config_from_parts(Some("form-1".to_string()), None, None),
            Err(WidgetError::Config(_))
        ));
        assert!(matches!(
            config_from_parts(None, Some("pk".to_string()), None),
            Err(WidgetError::Config(_))
        ));
    }

    #[test]
    fn test_config_api_url_override() {
        let config = config_from_parts(
            Some("form-1".to_string()),
            Some("pk".to_string()),
            Some("http://localhost:54321/functions/v1".to_string()),
        )
        .unwrap();
        assert_eq!(
            config.endpoint("get-published-form"),
            "http://localhost:54321/functions/v1/get-published-form"
        );
    }

    fn mounted(show_on: &str) -> FormWidget {
        let json = format!(
            r#"{{"fields": [], "embedSettings": {{"urlRules": {{"showOn": ["{}"]}}}}}}"#,
            show_on
        );
        let definition = snapyforms_widget::FormDefinition::from_json(&json).unwrap();
        let config = WidgetConfig::new("form-1", "pk").unwrap();
        FormWidget::mount(config, definition, "/pricing", WidgetOptions::default())
    }

    fn new_host() -> Rc<Host> {
        Rc::new(Host::new(ApiClient::new(
            WidgetConfig::new("form-1", "pk").unwrap(),
        )))
    }

    #[test]
    fn test_install_keeps_loaded_widget() {
        let host = new_host();
        assert!(host.install(mounted("^/pricing$")));
        assert!(host.widget.borrow().is_some());

        let hidden = new_host();
        assert!(!hidden.install(mounted("^/about$")));
        assert!(hidden.widget.borrow().is_some());
    }

    #[test]
    fn test_destroy_before_load_discards_widget() {
        let host = new_host();
        host.destroy();
        assert!(!host.install(mounted("^/pricing$")));
        assert!(host.widget.borrow().is_none());
    }

    #[test]
    fn test_page_event_names() {
        assert_eq!(page_event_name(PageListener::Scroll), "scroll");
        assert_eq!(page_event_name(PageListener::PointerLeave), "mouseleave");
    }
}
