//! One-line key hints for the current context.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::events::{get_context_hints, KeyContext};
use crate::ui::theme::theme;

/// Render the hints for `context`, keys highlighted.
pub fn render_context_help(frame: &mut Frame, area: Rect, context: KeyContext) {
    let line = Line::from(hint_spans(get_context_hints(context)));
    frame.render_widget(Paragraph::new(line), area);
}

/// Split `"[k] text [k2] text"` into key and description spans.
fn hint_spans(hints: &str) -> Vec<Span<'static>> {
    let t = theme();
    let key_style = Style::default().fg(t.accent);
    let text_style = Style::default().fg(t.dim);

    let mut spans = Vec::new();
    let mut rest = hints;
    while !rest.is_empty() {
        match (rest.find('['), rest.find(']')) {
            (Some(0), Some(close)) => {
                spans.push(Span::styled(rest[..=close].to_string(), key_style));
                rest = &rest[close + 1..];
            }
            (Some(open), _) if open > 0 => {
                spans.push(Span::styled(rest[..open].to_string(), text_style));
                rest = &rest[open..];
            }
            _ => {
                spans.push(Span::styled(rest.to_string(), text_style));
                break;
            }
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_spans_simple() {
        assert_eq!(hint_spans("[j/k] navigate").len(), 2);
    }

    #[test]
    fn test_hint_spans_multiple_keys() {
        let spans = hint_spans("[a] add  [Enter] apply  [?] help");
        assert_eq!(spans.len(), 6);
        assert_eq!(spans[2].content, "[Enter]");
    }

    #[test]
    fn test_hint_spans_edge_cases() {
        assert!(hint_spans("").is_empty());
        assert_eq!(hint_spans("just text").len(), 1);
        assert_eq!(hint_spans("[unclosed").len(), 1);
    }
}
