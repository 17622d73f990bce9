use crate::definition::{Position, PositionKind};

/// Companion stylesheet injected as the container's first child.
pub const WIDGET_STYLES: &str = "#snapyforms-container{position:fixed;z-index:2147483000;font-family:system-ui,-apple-system,'Segoe UI',Roboto,sans-serif;}\
.snapyforms-bubble{position:fixed;width:56px;height:56px;border-radius:50%;display:flex;align-items:center;justify-content:center;color:#fff;cursor:pointer;box-shadow:0 4px 12px rgba(0,0,0,0.15);transition:transform 0.2s ease;}\
.snapyforms-bubble:hover{transform:scale(1.05);}\
.snapyforms-form{position:fixed;width:360px;max-width:calc(100vw - 40px);max-height:calc(100vh - 120px);overflow-y:auto;background:#fff;border-radius:12px;box-shadow:0 8px 30px rgba(0,0,0,0.18);opacity:0;visibility:hidden;transform:translateY(16px);transition:opacity 0.2s ease,transform 0.2s ease,visibility 0.2s;}\
.snapyforms-form.open{opacity:1;visibility:visible;transform:translateY(0);}\
.snapyforms-header{position:relative;padding:20px;color:#fff;border-radius:12px 12px 0 0;}\
.snapyforms-header h2{margin:0 0 4px;font-size:18px;}\
.snapyforms-header p{margin:0;font-size:14px;opacity:0.9;}\
.snapyforms-close{position:absolute;top:12px;right:12px;background:none;border:none;color:#fff;cursor:pointer;padding:4px;}\
.snapyforms-content{padding:20px;}\
.snapyforms-field{margin-bottom:16px;}\
.snapyforms-label{display:block;margin-bottom:6px;font-size:14px;font-weight:500;color:#18181b;}\
.snapyforms-required{color:#ef4444;margin-left:2px;}\
.snapyforms-input,.snapyforms-textarea{width:100%;box-sizing:border-box;padding:8px 10px;border:1px solid #d4d4d8;border-radius:6px;font-size:14px;}\
.snapyforms-textarea{min-height:96px;resize:vertical;}\
.snapyforms-checkbox,.snapyforms-radio{display:flex;align-items:center;gap:8px;font-size:14px;margin-bottom:4px;}\
.snapyforms-stars,.snapyforms-rating{display:flex;gap:6px;}\
.snapyforms-star{background:none;border:none;cursor:pointer;color:#d4d4d8;padding:0;}\
.snapyforms-star.active{color:#f59e0b;}\
.snapyforms-emoji{background:none;border:none;cursor:pointer;font-size:24px;transition:transform 0.15s ease;}\
.snapyforms-emoji.active{transform:scale(1.2);}\
.snapyforms-youtube iframe{width:100%;aspect-ratio:16/9;border:0;border-radius:8px;}\
.snapyforms-error{display:none;margin-top:4px;font-size:12px;color:#ef4444;}\
.snapyforms-field.has-error .snapyforms-error{display:block;}\
.snapyforms-field.has-error .snapyforms-input,.snapyforms-field.has-error .snapyforms-textarea{border-color:#ef4444;}\
.snapyforms-submit{width:100%;padding:10px;border:none;border-radius:6px;color:#fff;font-size:15px;cursor:pointer;}\
.snapyforms-submit[disabled]{opacity:0.6;cursor:wait;}\
.snapyforms-status{display:none;margin-top:12px;font-size:14px;text-align:center;}\
.snapyforms-form.submitted .snapyforms-status{display:block;color:#16a34a;}\
.snapyforms-form.error .snapyforms-status{display:block;color:#ef4444;}";

/// Gap between the viewport edge and the bubble, in pixels
const EDGE_OFFSET: f64 = 20.0;
/// Bubble diameter plus spacing; the panel sits above the bubble
const PANEL_OFFSET: f64 = 90.0;

/// Fixed-position CSS for the launcher bubble.
pub fn bubble_position_css(position: &Position) -> String {
    let (side, x, y) = resolve(position);
    format!("{}: {}px; bottom: {}px", side, format_px(x), format_px(y))
}

/// Fixed-position CSS for the panel, anchored on the same side as the bubble.
pub fn panel_position_css(position: &Position) -> String {
    let (side, x, y) = resolve(position);
    format!(
        "{}: {}px; bottom: {}px",
        side,
        format_px(x),
        format_px(y + PANEL_OFFSET - EDGE_OFFSET)
    )
}

fn resolve(position: &Position) -> (&'static str, f64, f64) {
    match position.kind {
        PositionKind::BottomRight => ("right", EDGE_OFFSET, EDGE_OFFSET),
        PositionKind::BottomLeft => ("left", EDGE_OFFSET, EDGE_OFFSET),
        // Custom offsets are measured from the bottom-right corner.
        PositionKind::Custom => (
            "right",
            non_negative(position.custom_x).unwrap_or(EDGE_OFFSET),
            non_negative(position.custom_y).unwrap_or(EDGE_OFFSET),
        ),
    }
}

fn non_negative(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite()).map(|v| v.max(0.0))
}

fn format_px(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}

/// Join declarations into a single `style` attribute value.
pub fn join_declarations<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_position_is_bottom_right() {
        let pos = Position::default();
        assert_eq!(bubble_position_css(&pos), "right: 20px; bottom: 20px");
        assert_eq!(panel_position_css(&pos), "right: 20px; bottom: 90px");
    }

    #[test]
    fn test_bottom_left_position() {
        let pos = Position {
            kind: PositionKind::BottomLeft,
            ..Default::default()
        };
        assert_eq!(bubble_position_css(&pos), "left: 20px; bottom: 20px");
    }

    #[test]
    fn test_custom_position() {
        let pos = Position {
            kind: PositionKind::Custom,
            custom_x: Some(40.0),
            custom_y: Some(-5.0),
        };
        assert_eq!(bubble_position_css(&pos), "right: 40px; bottom: 0px");
        assert_eq!(panel_position_css(&pos), "right: 40px; bottom: 70px");
    }

    #[test]
    fn test_join_declarations_skips_empty() {
        assert_eq!(
            join_declarations(["background-color: #fff", "", "right: 20px"]),
            "background-color: #fff; right: 20px"
        );
    }
}
