//! Forwards `tracing` events from the widget core to the browser console.

use std::fmt::{self, Write};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use wasm_bindgen::JsValue;
use web_sys::console;

/// Install the console layer as the global subscriber. Later calls are no-ops.
pub fn install() {
    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(ConsoleLayer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let line = JsValue::from_str(&format_event(event));
        match *event.metadata().level() {
            Level::ERROR => console::error_1(&line),
            Level::WARN => console::warn_1(&line),
            Level::INFO => console::info_1(&line),
            _ => console::debug_1(&line),
        }
    }
}

/// `SnapyForms: <message> key=value ...`
pub(crate) fn format_event(event: &Event<'_>) -> String {
    let mut visitor = LineVisitor::default();
    event.record(&mut visitor);
    format!("SnapyForms: {}{}", visitor.message, visitor.fields)
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Capture(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(format_event(event));
        }
    }

    #[test]
    fn test_event_line_carries_message_and_fields() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Capture(Arc::clone(&lines)));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(color = %"red;x", "ignoring unsafe themeColor, using default");
            tracing::warn!(rule = "showOn", "invalid URL rule pattern");
        });
        assert_eq!(
            *lines.lock().unwrap(),
            vec![
                "SnapyForms: ignoring unsafe themeColor, using default color=red;x".to_string(),
                "SnapyForms: invalid URL rule pattern rule=showOn".to_string(),
            ]
        );
    }
}
