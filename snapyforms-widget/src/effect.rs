//! Messages exchanged between a widget and the page that hosts it.
//!
//! The widget never touches a real page. Hosts feed it [`PageEvent`]s and drain
//! [`Effect`]s, applying them to whatever document they own.

use serde::Serialize;
use std::time::Duration;

use crate::dom::Patch;

/// One-shot timers a widget asks its host to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Timer {
    /// Delayed auto-open
    AutoOpen,
    /// End of the transient submit-error state
    ClearError,
}

/// Page-level listeners armed by display rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageListener {
    /// `scroll` on the window
    Scroll,
    /// `mouseleave` on the document
    PointerLeave,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Patch { patch: Patch },
    ScheduleTimer { timer: Timer, after: Duration },
    CancelTimer { timer: Timer },
    Listen { listener: PageListener },
    Unlisten { listener: PageListener },
}

/// Page state reported by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    Scroll {
        scroll_y: f64,
        document_height: f64,
        viewport_height: f64,
    },
    /// Pointer left the document; `client_y` is its last vertical coordinate.
    PointerLeave { client_y: f64 },
    TimerElapsed(Timer),
}
