//! In-memory element tree owned by one widget instance.
//!
//! The renderer builds the tree once; afterwards every mutation is journalled as a
//! [`Patch`] so a host can mirror it into a real page. No script and no inline event
//! handlers are ever produced: interactive elements carry explicit [`Listener`]s.

use serde::Serialize;

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &["input", "br", "hr", "img", "meta", "link"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Trusted static markup (icon SVGs); emitted verbatim.
    Markup(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    classes: Vec<String>,
    value: Option<String>,
    checked: bool,
    disabled: bool,
    listeners: Vec<Listener>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            classes: Vec::new(),
            value: None,
            checked: false,
            disabled: false,
            listeners: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn attrs(&self) -> &[(&'static str, String)] {
        &self.attrs
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Browser events the widget listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    Click,
    Submit,
}

impl DomEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomEvent::Click => "click",
            DomEvent::Submit => "submit",
        }
    }
}

/// What the widget does when a listener fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    TogglePanel,
    ClosePanel,
    /// Set rating `value` (1-based) on the field at `field` (index into the form's fields).
    Rate { field: usize, value: u8 },
    SubmitForm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listener {
    pub event: DomEvent,
    pub action: Action,
}

/// A mutation applied after the initial render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Patch {
    AddClass { node: NodeId, class: String },
    RemoveClass { node: NodeId, class: String },
    SetAttribute { node: NodeId, name: &'static str, value: String },
    SetValue { node: NodeId, value: String },
    SetChecked { node: NodeId, checked: bool },
    SetDisabled { node: NodeId, disabled: bool },
    /// Replace all children with a single text node.
    SetText { node: NodeId, text: String },
    Remove { node: NodeId },
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dom {
    slots: Vec<Slot>,
    recording: bool,
    journal: Vec<Patch>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Construction ───────────────────────────────────────────────────────

    pub fn create_element(&mut self, parent: Option<NodeId>, tag: &'static str) -> NodeId {
        self.push(parent, Node::Element(Element::new(tag)))
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.push(Some(parent), Node::Text(text.into()))
    }

    pub fn append_markup(&mut self, parent: NodeId, markup: &'static str) -> NodeId {
        self.push(Some(parent), Node::Markup(markup))
    }

    fn push(&mut self, parent: Option<NodeId>, node: Node) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot { node, parent });
        if let Some(p) = parent {
            if let Some(el) = self.element_mut(p) {
                el.children.push(id);
            }
        }
        id
    }

    pub fn listen(&mut self, node: NodeId, event: DomEvent, action: Action) {
        if let Some(el) = self.element_mut(node) {
            el.listeners.push(Listener { event, action });
        }
    }

    /// Start journalling mutations as patches.
    pub fn start_recording(&mut self) {
        self.recording = true;
    }

    pub fn take_patches(&mut self) -> Vec<Patch> {
        std::mem::take(&mut self.journal)
    }

    fn record(&mut self, patch: Patch) {
        if self.recording {
            self.journal.push(patch);
        }
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).map(|s| &s.node)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.slots.get_mut(id.0).map(|s| &mut s.node) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|s| s.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map(|el| el.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&'static str> {
        self.element(id).map(|el| el.tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|el| el.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.element(id).and_then(|el| el.value.as_deref())
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.checked).unwrap_or(false)
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.disabled).unwrap_or(false)
    }

    pub fn listener(&self, id: NodeId, event: DomEvent) -> Option<&Action> {
        self.element(id)?
            .listeners
            .iter()
            .find(|l| l.event == event)
            .map(|l| &l.action)
    }

    /// All nodes under `root` in document order, `root` included.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn find_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(Node::Text(t)) = self.node(node) {
                out.push_str(t);
            }
        }
        out
    }

    /// True when `id` is still connected to a root that was never removed.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            match self.slots.get(current.0) {
                None => return false,
                Some(slot) => match slot.parent {
                    None => return current.0 == 0,
                    Some(p) => {
                        if !self.children(p).contains(&current) {
                            return false;
                        }
                        current = p;
                    }
                },
            }
        }
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    pub fn set_attr(&mut self, id: NodeId, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        let Some(el) = self.element_mut(id) else { return };
        match el.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value.clone(),
            None => el.attrs.push((name, value.clone())),
        }
        self.record(Patch::SetAttribute {
            node: id,
            name,
            value,
        });
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let Some(el) = self.element_mut(id) else { return };
        if el.classes.iter().any(|c| c == class) {
            return;
        }
        el.classes.push(class.to_string());
        self.record(Patch::AddClass {
            node: id,
            class: class.to_string(),
        });
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(el) = self.element_mut(id) else { return };
        let before = el.classes.len();
        el.classes.retain(|c| c != class);
        if el.classes.len() != before {
            self.record(Patch::RemoveClass {
                node: id,
                class: class.to_string(),
            });
        }
    }

    pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        let value = value.into();
        let Some(el) = self.element_mut(id) else { return };
        if el.value.as_deref() == Some(value.as_str()) {
            return;
        }
        el.value = Some(value.clone());
        self.record(Patch::SetValue { node: id, value });
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        let Some(el) = self.element_mut(id) else { return };
        if el.checked == checked {
            return;
        }
        el.checked = checked;
        self.record(Patch::SetChecked { node: id, checked });
    }

    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        let Some(el) = self.element_mut(id) else { return };
        if el.disabled == disabled {
            return;
        }
        el.disabled = disabled;
        self.record(Patch::SetDisabled { node: id, disabled });
    }

    /// Take a value the page already shows (visitor typing). Not journalled.
    pub fn sync_value(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.value = Some(value.into());
        }
    }

    /// Take a check state the page already shows. Not journalled.
    pub fn sync_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(el) = self.element_mut(id) {
            el.checked = checked;
        }
    }

    /// Replace the children of `id` with one text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let text = text.into();
        if self.element(id).is_none() {
            return;
        }
        let was_recording = self.recording;
        self.recording = false;
        if let Some(el) = self.element_mut(id) {
            el.children.clear();
        }
        if !text.is_empty() {
            self.append_text(id, text.clone());
        }
        self.recording = was_recording;
        self.record(Patch::SetText { node: id, text });
    }

    /// Detach `id` from its parent. Detaching the root marks the whole tree as removed.
    pub fn remove(&mut self, id: NodeId) {
        match self.parent(id) {
            Some(p) => {
                if let Some(el) = self.element_mut(p) {
                    el.children.retain(|c| *c != id);
                }
            }
            None => {
                // Root: re-parent onto itself so is_attached() reports false.
                if let Some(slot) = self.slots.get_mut(id.0) {
                    slot.parent = Some(id);
                }
            }
        }
        self.record(Patch::Remove { node: id });
    }

    // ─── Forms ──────────────────────────────────────────────────────────────

    /// Name/value pairs the form would submit, in document order.
    ///
    /// Follows HTML form-data rules: unnamed or disabled controls are skipped, checkboxes
    /// and radios only contribute when checked, file inputs only with a selection.
    pub fn form_data(&self, form: NodeId) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for id in self.descendants(form) {
            let Some(el) = self.element(id) else { continue };
            if !matches!(el.tag, "input" | "textarea" | "select") || el.disabled {
                continue;
            }
            let Some(name) = el.attr("name").filter(|n| !n.is_empty()) else {
                continue;
            };
            let value = match el.attr("type").unwrap_or("text") {
                "checkbox" | "radio" => {
                    if !el.checked {
                        continue;
                    }
                    el.attr("value").unwrap_or("on").to_string()
                }
                "file" => match el.value.as_deref().filter(|v| !v.is_empty()) {
                    Some(v) => v.to_string(),
                    None => continue,
                },
                "submit" | "button" | "reset" => continue,
                _ => el.value.clone().unwrap_or_default(),
            };
            pairs.push((name.to_string(), value));
        }
        pairs
    }

    /// Clear every control under `form` back to its empty state.
    pub fn reset_form(&mut self, form: NodeId) {
        for id in self.descendants(form) {
            let Some(el) = self.element(id) else { continue };
            if !matches!(el.tag, "input" | "textarea") {
                continue;
            }
            match el.attr("type").unwrap_or("text") {
                "checkbox" | "radio" => self.set_checked(id, false),
                "submit" | "button" | "reset" => {}
                _ => {
                    if self.value(id).is_some_and(|v| !v.is_empty()) {
                        self.set_value(id, "");
                    }
                }
            }
        }
    }

    // ─── Serialisation ──────────────────────────────────────────────────────

    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.node(id) {
            None => {}
            Some(Node::Text(t)) => out.push_str(&escape_html(t)),
            Some(Node::Markup(m)) => out.push_str(m),
            Some(Node::Element(el)) => {
                out.push('<');
                out.push_str(el.tag);
                for (name, value) in &el.attrs {
                    push_attr(out, name, value);
                }
                if !el.classes.is_empty() {
                    push_attr(out, "class", &el.classes.join(" "));
                }
                if el.tag == "input" {
                    if let Some(v) = el.value.as_deref().filter(|v| !v.is_empty()) {
                        if el.attr("type") != Some("file") {
                            push_attr(out, "value", v);
                        }
                    }
                    if el.checked {
                        out.push_str(" checked");
                    }
                }
                if el.disabled {
                    out.push_str(" disabled");
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag) {
                    return;
                }
                if el.tag == "textarea" {
                    out.push_str(&escape_html(el.value.as_deref().unwrap_or_default()));
                } else {
                    for child in &el.children {
                        self.write_html(*child, out);
                    }
                }
                out.push_str("</");
                out.push_str(el.tag);
                out.push('>');
            }
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    if value.is_empty() && is_boolean_attr(name) {
        out.push(' ');
        out.push_str(name);
        return;
    }
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_html(value));
    out.push('"');
}

fn is_boolean_attr(name: &str) -> bool {
    matches!(name, "required" | "allowfullscreen" | "novalidate" | "hidden")
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
