//! Display rules: where the widget may appear and when it opens on its own.

use fancy_regex::Regex;
use tracing::{debug, warn};

use crate::definition::{Trigger, UrlRules};
use crate::effect::{Effect, PageEvent, PageListener, Timer};

/// Compiled `showOn`/`hideOn` patterns.
///
/// Patterns use JavaScript regex syntax, lookarounds included. An entry that
/// fails to compile is kept as `None` so the rule it belongs to still counts.
#[derive(Debug, Clone, Default)]
pub struct UrlMatcher {
    show_on: Vec<Option<Regex>>,
    hide_on: Vec<Option<Regex>>,
}

impl UrlMatcher {
    pub fn compile(rules: &UrlRules) -> Self {
        Self {
            show_on: compile_all(&rules.show_on, "showOn"),
            hide_on: compile_all(&rules.hide_on, "hideOn"),
        }
    }

    /// Whether the widget stays on a page with this path.
    ///
    /// Any `hideOn` match hides it; otherwise a non-empty `showOn` list must match.
    /// A broken `hideOn` entry hides the widget everywhere and a broken `showOn`
    /// entry never matches.
    pub fn is_visible(&self, path: &str) -> bool {
        if self.hide_on.iter().any(|re| matches(re.as_ref(), path, true)) {
            return false;
        }
        self.show_on.is_empty() || self.show_on.iter().any(|re| matches(re.as_ref(), path, false))
    }
}

fn matches(re: Option<&Regex>, path: &str, on_error: bool) -> bool {
    match re.map(|re| re.is_match(path)) {
        Some(Ok(matched)) => matched,
        Some(Err(e)) => {
            warn!(path, error = %e, "URL rule pattern failed to run");
            on_error
        }
        None => on_error,
    }
}

fn compile_all(patterns: &[String], rule: &str) -> Vec<Option<Regex>> {
    patterns
        .iter()
        .map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(rule, pattern = %p, error = %e, "invalid URL rule pattern");
                None
            }
        })
        .collect()
}

/// How far down the page the visitor has scrolled, in percent.
///
/// `None` when the document is not taller than the viewport.
pub fn scroll_percentage(scroll_y: f64, document_height: f64, viewport_height: f64) -> Option<f64> {
    let scrollable = document_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 || !scroll_y.is_finite() {
        return None;
    }
    Some(scroll_y / scrollable * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Armed,
    Fired,
}

/// One-shot auto-open trigger for a single page load
#[derive(Debug, Clone)]
pub struct DisplayRuleEngine {
    trigger: Trigger,
    state: TriggerState,
}

impl DisplayRuleEngine {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            state: TriggerState::Idle,
        }
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Arm the trigger, returning what the host must set up for it.
    pub fn arm(&mut self) -> Vec<Effect> {
        if self.state != TriggerState::Idle {
            return Vec::new();
        }
        let effect = match self.trigger {
            Trigger::Immediate => return Vec::new(),
            Trigger::Delay(after) => Effect::ScheduleTimer {
                timer: Timer::AutoOpen,
                after,
            },
            Trigger::Scroll { .. } => Effect::Listen {
                listener: PageListener::Scroll,
            },
            Trigger::ExitIntent => Effect::Listen {
                listener: PageListener::PointerLeave,
            },
        };
        debug!(trigger = ?self.trigger, "auto-open trigger armed");
        self.state = TriggerState::Armed;
        vec![effect]
    }

    /// Feed a page event. Returns the effects to apply when the trigger fires, `None` otherwise.
    pub fn on_page_event(&mut self, event: &PageEvent) -> Option<Vec<Effect>> {
        if self.state != TriggerState::Armed {
            return None;
        }
        let fired = match (self.trigger, event) {
            (
                Trigger::Scroll { percentage },
                PageEvent::Scroll {
                    scroll_y,
                    document_height,
                    viewport_height,
                },
            ) => scroll_percentage(*scroll_y, *document_height, *viewport_height)
                .is_some_and(|p| p >= percentage),
            (Trigger::ExitIntent, PageEvent::PointerLeave { client_y }) => *client_y <= 0.0,
            (Trigger::Delay(_), PageEvent::TimerElapsed(Timer::AutoOpen)) => true,
            _ => false,
        };
        if !fired {
            return None;
        }
        debug!(trigger = ?self.trigger, "auto-open trigger fired");
        self.state = TriggerState::Fired;
        Some(self.release().into_iter().collect())
    }

    /// Drop whatever the trigger still holds on the page.
    pub fn teardown(&mut self) -> Vec<Effect> {
        if self.state != TriggerState::Armed {
            return Vec::new();
        }
        self.state = TriggerState::Fired;
        match self.trigger {
            Trigger::Delay(_) => vec![Effect::CancelTimer {
                timer: Timer::AutoOpen,
            }],
            _ => self.release().into_iter().collect(),
        }
    }

    fn release(&self) -> Option<Effect> {
        match self.trigger {
            Trigger::Scroll { .. } => Some(Effect::Unlisten {
                listener: PageListener::Scroll,
            }),
            Trigger::ExitIntent => Some(Effect::Unlisten {
                listener: PageListener::PointerLeave,
            }),
            Trigger::Immediate | Trigger::Delay(_) => None,
        }
    }
}
