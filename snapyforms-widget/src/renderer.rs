//! Builds the launcher bubble and the form panel for a form definition.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::definition::{Field, FieldType, FormDefinition};
use crate::dom::{Action, Dom, DomEvent, NodeId};
use crate::icons::{self, BubbleIcon, EMOJI_SCALE};
use crate::style::{self, WIDGET_STYLES};
use crate::theme::Theme;

pub const CONTAINER_ID: &str = "snapyforms-container";

pub const OPEN_CLASS: &str = "open";
pub const ACTIVE_CLASS: &str = "active";
pub const ERROR_FIELD_CLASS: &str = "has-error";
pub const SUBMITTED_CLASS: &str = "submitted";
pub const ERROR_PANEL_CLASS: &str = "error";

/// The rendered tree plus handles to the nodes the widget drives later
#[derive(Debug, Clone)]
pub struct RenderedWidget {
    pub dom: Dom,
    pub container: NodeId,
    pub bubble: NodeId,
    pub panel: NodeId,
    pub form: NodeId,
    pub submit_button: NodeId,
    pub status: NodeId,
    /// One block per field, in declared order
    pub blocks: Vec<FieldBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldBlock {
    pub field_id: String,
    pub field_type: FieldType,
    pub wrapper: NodeId,
    pub error: NodeId,
    pub control: Control,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Single-line input (text, email, tel, number, file, unknown types)
    Input(NodeId),
    TextArea(NodeId),
    Checkbox(NodeId),
    Radio(Vec<NodeId>),
    Rating {
        kind: RatingKind,
        hidden: NodeId,
        units: Vec<NodeId>,
    },
    /// Display-only block (YouTube)
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingKind {
    /// Units 1..=k light up
    Stars,
    /// Only the chosen unit lights up
    Emoji,
}

/// Render the whole widget. The panel starts closed.
pub fn render(definition: &FormDefinition) -> RenderedWidget {
    let theme = Theme::from_metadata(&definition.metadata);
    let position = &definition.embed_settings.position;
    let metadata = &definition.metadata;
    let mut dom = Dom::new();

    let container = dom.create_element(None, "div");
    dom.set_attr(container, "id", CONTAINER_ID);

    let styles = dom.create_element(Some(container), "style");
    dom.append_markup(styles, WIDGET_STYLES);

    // Bubble
    let bubble = dom.create_element(Some(container), "div");
    dom.add_class(bubble, "snapyforms-bubble");
    dom.set_attr(bubble, "role", "button");
    dom.set_attr(bubble, "aria-label", "Open feedback form");
    dom.set_attr(
        bubble,
        "style",
        style::join_declarations([
            theme.background_css().as_str(),
            style::bubble_position_css(position).as_str(),
        ]),
    );
    let icon = BubbleIcon::from_name(metadata.bubble_icon.as_deref());
    dom.append_markup(bubble, icon.svg());
    dom.listen(bubble, DomEvent::Click, Action::TogglePanel);

    // Panel
    let panel = dom.create_element(Some(container), "div");
    dom.add_class(panel, "snapyforms-form");
    let font_css = theme.font_css().unwrap_or_default();
    dom.set_attr(
        panel,
        "style",
        style::join_declarations([
            style::panel_position_css(position).as_str(),
            font_css.as_str(),
        ]),
    );

    let header = dom.create_element(Some(panel), "div");
    dom.add_class(header, "snapyforms-header");
    dom.set_attr(header, "style", theme.background_css());
    let close = dom.create_element(Some(header), "button");
    dom.add_class(close, "snapyforms-close");
    dom.set_attr(close, "type", "button");
    dom.set_attr(close, "aria-label", "Close");
    dom.append_markup(close, icons::CLOSE);
    dom.listen(close, DomEvent::Click, Action::ClosePanel);
    let heading = dom.create_element(Some(header), "div");
    let title = dom.create_element(Some(heading), "h2");
    dom.append_text(title, metadata.title.clone());
    if let Some(description) = metadata.description.as_deref().filter(|d| !d.is_empty()) {
        let p = dom.create_element(Some(heading), "p");
        dom.append_text(p, description);
    }

    let content = dom.create_element(Some(panel), "div");
    dom.add_class(content, "snapyforms-content");
    let form = dom.create_element(Some(content), "form");
    dom.add_class(form, "snapyforms-form-body");
    dom.set_attr(form, "novalidate", "");
    dom.listen(form, DomEvent::Submit, Action::SubmitForm);

    let blocks = definition
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| render_field(&mut dom, form, index, field))
        .collect();

    let submit_button = dom.create_element(Some(form), "button");
    dom.add_class(submit_button, "snapyforms-submit");
    dom.set_attr(submit_button, "type", "submit");
    dom.set_attr(submit_button, "style", theme.background_css());
    dom.append_text(submit_button, metadata.submit_label());

    let status = dom.create_element(Some(content), "div");
    dom.add_class(status, "snapyforms-status");
    dom.set_attr(status, "role", "status");

    RenderedWidget {
        dom,
        container,
        bubble,
        panel,
        form,
        submit_button,
        status,
        blocks,
    }
}

fn render_field(dom: &mut Dom, form: NodeId, index: usize, field: &Field) -> FieldBlock {
    let wrapper = dom.create_element(Some(form), "div");
    dom.add_class(wrapper, "snapyforms-field");
    dom.set_attr(wrapper, "data-field-id", field.id.clone());

    let label = dom.create_element(Some(wrapper), "label");
    dom.add_class(label, "snapyforms-label");
    dom.append_text(label, field.label.clone());
    if field.required {
        let marker = dom.create_element(Some(label), "span");
        dom.add_class(marker, "snapyforms-required");
        dom.append_text(marker, "*");
    }

    let control = match field.field_type {
        FieldType::Text
        | FieldType::Email
        | FieldType::Tel
        | FieldType::Number
        | FieldType::Unknown => Control::Input(render_text_input(dom, wrapper, field)),
        FieldType::Textarea => {
            let area = dom.create_element(Some(wrapper), "textarea");
            dom.add_class(area, "snapyforms-textarea");
            dom.set_attr(area, "name", field.id.clone());
            set_common_attrs(dom, area, field);
            Control::TextArea(area)
        }
        FieldType::Checkbox => {
            let row = dom.create_element(Some(wrapper), "label");
            dom.add_class(row, "snapyforms-checkbox");
            let input = dom.create_element(Some(row), "input");
            dom.set_attr(input, "type", "checkbox");
            dom.set_attr(input, "name", field.id.clone());
            if field.required {
                dom.set_attr(input, "required", "");
            }
            let text = field
                .placeholder
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(&field.label);
            let span = dom.create_element(Some(row), "span");
            dom.append_text(span, text);
            Control::Checkbox(input)
        }
        FieldType::Radio => {
            let group = dom.create_element(Some(wrapper), "div");
            dom.add_class(group, "snapyforms-radio-group");
            let inputs = field
                .options()
                .iter()
                .map(|option| {
                    let row = dom.create_element(Some(group), "label");
                    dom.add_class(row, "snapyforms-radio");
                    let input = dom.create_element(Some(row), "input");
                    dom.set_attr(input, "type", "radio");
                    dom.set_attr(input, "name", field.id.clone());
                    dom.set_attr(input, "value", option.value.clone());
                    let span = dom.create_element(Some(row), "span");
                    dom.append_text(span, option.label.clone());
                    input
                })
                .collect();
            Control::Radio(inputs)
        }
        FieldType::File => {
            let input = dom.create_element(Some(wrapper), "input");
            dom.add_class(input, "snapyforms-input");
            dom.set_attr(input, "type", "file");
            dom.set_attr(input, "name", field.id.clone());
            if field.required {
                dom.set_attr(input, "required", "");
            }
            Control::Input(input)
        }
        FieldType::StarRating => render_rating(dom, wrapper, index, field, RatingKind::Stars),
        FieldType::EmojiRating => render_rating(dom, wrapper, index, field, RatingKind::Emoji),
        FieldType::Youtube => {
            render_youtube(dom, wrapper, field);
            Control::None
        }
    };

    let error = dom.create_element(Some(wrapper), "div");
    dom.add_class(error, "snapyforms-error");
    if let Some(message) = field.validation_message() {
        dom.append_text(error, message);
    }

    FieldBlock {
        field_id: field.id.clone(),
        field_type: field.field_type,
        wrapper,
        error,
        control,
    }
}

fn render_text_input(dom: &mut Dom, wrapper: NodeId, field: &Field) -> NodeId {
    let input = dom.create_element(Some(wrapper), "input");
    dom.add_class(input, "snapyforms-input");
    dom.set_attr(input, "type", field.field_type.input_type().unwrap_or("text"));
    dom.set_attr(input, "name", field.id.clone());
    set_common_attrs(dom, input, field);
    if let Some(validation) = &field.validation {
        if let Some(pattern) = validation.pattern.as_deref().filter(|p| !p.is_empty()) {
            dom.set_attr(input, "pattern", pattern);
        }
        if let Some(min) = validation.min {
            dom.set_attr(input, "min", format_number(min));
        }
        if let Some(max) = validation.max {
            dom.set_attr(input, "max", format_number(max));
        }
    }
    input
}

fn set_common_attrs(dom: &mut Dom, node: NodeId, field: &Field) {
    if let Some(placeholder) = &field.placeholder {
        dom.set_attr(node, "placeholder", placeholder.clone());
    }
    if field.required {
        dom.set_attr(node, "required", "");
    }
}

fn render_rating(
    dom: &mut Dom,
    wrapper: NodeId,
    index: usize,
    field: &Field,
    kind: RatingKind,
) -> Control {
    let group = dom.create_element(Some(wrapper), "div");
    let count = match kind {
        RatingKind::Stars => {
            dom.add_class(group, "snapyforms-stars");
            field.star_count()
        }
        RatingKind::Emoji => {
            dom.add_class(group, "snapyforms-rating");
            EMOJI_SCALE.len()
        }
    };

    let mut units = Vec::with_capacity(count);
    for i in 0..count {
        let value = (i + 1) as u8;
        let unit = dom.create_element(Some(group), "button");
        dom.set_attr(unit, "type", "button");
        dom.set_attr(unit, "data-value", value.to_string());
        match kind {
            RatingKind::Stars => {
                dom.add_class(unit, "snapyforms-star");
                dom.set_attr(unit, "aria-label", format!("{} of {}", value, count));
                dom.append_markup(unit, icons::STAR);
            }
            RatingKind::Emoji => {
                dom.add_class(unit, "snapyforms-emoji");
                dom.append_text(unit, EMOJI_SCALE[i]);
            }
        }
        dom.listen(unit, DomEvent::Click, Action::Rate { field: index, value });
        units.push(unit);
    }

    let hidden = dom.create_element(Some(group), "input");
    dom.set_attr(hidden, "type", "hidden");
    dom.set_attr(hidden, "name", field.id.clone());
    dom.set_value(hidden, "");

    Control::Rating {
        kind,
        hidden,
        units,
    }
}

fn render_youtube(dom: &mut Dom, wrapper: NodeId, field: &Field) {
    let Some(url) = field.youtube_url.as_deref() else {
        warn!(field = %field.id, "youtube field has no youtubeUrl, skipping frame");
        return;
    };
    let Some(src) = youtube_embed_url(url) else {
        warn!(field = %field.id, url = %url, "unrecognised YouTube URL, skipping frame");
        return;
    };
    let frame_box = dom.create_element(Some(wrapper), "div");
    dom.add_class(frame_box, "snapyforms-youtube");
    let frame = dom.create_element(Some(frame_box), "iframe");
    dom.set_attr(frame, "src", src);
    dom.set_attr(frame, "title", field.label.clone());
    dom.set_attr(
        frame,
        "allow",
        "accelerometer; clipboard-write; encrypted-media; gyroscope; picture-in-picture",
    );
    dom.set_attr(frame, "allowfullscreen", "");
}

/// Normalise watch/share/shorts/embed links to an embed URL with modest branding and no autoplay.
pub fn youtube_embed_url(url: &str) -> Option<String> {
    static YOUTUBE_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = YOUTUBE_ID_REGEX.get_or_init(|| {
        Regex::new(
            r"^(?:https?://)?(?:www\.|m\.)?(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/].*)?$",
        )
        .unwrap()
    });
    let id = re.captures(url.trim())?.get(1)?.as_str();
    Some(format!(
        "https://www.youtube.com/embed/{}?modestbranding=1&rel=0",
        id
    ))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
