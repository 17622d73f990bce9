//! Fixed SVG markup for the launcher bubble and panel controls.

const MESSAGE_CIRCLE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M21 11.5a8.38 8.38 0 0 1-.9 3.8 8.5 8.5 0 0 1-7.6 4.7 8.38 8.38 0 0 1-3.8-.9L3 21l1.9-5.7a8.38 8.38 0 0 1-.9-3.8 8.5 8.5 0 0 1 4.7-7.6 8.38 8.38 0 0 1 3.8-.9h.5a8.48 8.48 0 0 1 8 8v.5z"></path></svg>"#;

const MESSAGE_SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M21 15a2 2 0 0 1-2 2H7l-4 4V5a2 2 0 0 1 2-2h14a2 2 0 0 1 2 2z"></path></svg>"#;

const MAIL: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M4 4h16c1.1 0 2 .9 2 2v12c0 1.1-.9 2-2 2H4c-1.1 0-2-.9-2-2V6c0-1.1.9-2 2-2z"></path><polyline points="22,6 12,13 2,6"></polyline></svg>"#;

const HAND_HELPING: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M12 2a10 10 0 0 1 10 10c0 5.52-4.48 10-10 10S2 17.52 2 12 6.48 2 12 2z"/><path d="M12 14v4"/><path d="M12 10V6"/><path d="M16 10h-8"/></svg>"#;

pub const CLOSE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><line x1="18" y1="6" x2="6" y2="18"></line><line x1="6" y1="6" x2="18" y2="18"></line></svg>"#;

pub const STAR: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="currentColor" stroke="currentColor" stroke-width="1" stroke-linejoin="round"><polygon points="12 2 15.09 8.26 22 9.27 17 14.14 18.18 21.02 12 17.77 5.82 21.02 7 14.14 2 9.27 8.91 8.26 12 2"></polygon></svg>"#;

/// Emoji scale for emoji ratings, lowest to highest
pub const EMOJI_SCALE: [&str; 5] = ["😢", "😕", "😐", "🙂", "😊"];

/// Launcher icons selectable through `metadata.bubbleIcon`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BubbleIcon {
    #[default]
    MessageCircle,
    MessageSquare,
    Mail,
    HandHelping,
}

impl BubbleIcon {
    /// Look up an icon by its configured name. Whitespace is ignored; unknown names give the default.
    pub fn from_name(name: Option<&str>) -> Self {
        let compact: String = name
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match compact.as_str() {
            "MessageCircle" => BubbleIcon::MessageCircle,
            "MessageSquare" => BubbleIcon::MessageSquare,
            "Mail" => BubbleIcon::Mail,
            "HandHelping" | "HandHelpingIcon" => BubbleIcon::HandHelping,
            _ => BubbleIcon::default(),
        }
    }

    pub fn svg(&self) -> &'static str {
        match self {
            BubbleIcon::MessageCircle => MESSAGE_CIRCLE,
            BubbleIcon::MessageSquare => MESSAGE_SQUARE,
            BubbleIcon::Mail => MAIL,
            BubbleIcon::HandHelping => HAND_HELPING,
        }
    }
}
