//! Toasts: short-lived messages in the top-right corner.
//!
//! Info and success toasts last 3 seconds, warnings and errors 5. At most
//! three are shown; a new one pushes out the oldest.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::ui::theme::theme;

const MAX_TOASTS: usize = 3;
const TOAST_WIDTH: u16 = 44;

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    pub fn icon(&self) -> &'static str {
        match self {
            ToastKind::Info => "ℹ",
            ToastKind::Success => "✓",
            ToastKind::Warning => "⚠",
            ToastKind::Error => "✗",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            ToastKind::Info | ToastKind::Success => Duration::from_secs(3),
            ToastKind::Warning | ToastKind::Error => Duration::from_secs(5),
        }
    }

    fn style(&self) -> Style {
        let t = theme();
        let color = match self {
            ToastKind::Info => t.info,
            ToastKind::Success => t.success,
            ToastKind::Warning => t.warning,
            ToastKind::Error => t.error,
        };
        Style::default().fg(color)
    }
}

/// A single toast.
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
    ttl: Duration,
}

impl Toast {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            shown_at: Instant::now(),
            ttl: kind.duration(),
        }
    }

    /// Override the display time.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= self.ttl
    }

    /// Rows needed at the given inner width, borders included.
    fn height(&self, inner_width: usize) -> u16 {
        let text_width = self.message.chars().count() + 2;
        let lines = if inner_width == 0 {
            1
        } else {
            text_width.div_ceil(inner_width)
        };
        lines as u16 + 2
    }
}

/// The visible toasts, oldest first.
#[derive(Debug, Default)]
pub struct Toasts {
    queue: VecDeque<Toast>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, toast: Toast) {
        self.queue.push_back(toast);
        while self.queue.len() > MAX_TOASTS {
            self.queue.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Toast::new(ToastKind::Info, message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Toast::new(ToastKind::Success, message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Toast::new(ToastKind::Warning, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Toast::new(ToastKind::Error, message));
    }

    /// Drop expired toasts. Called every tick.
    pub fn tick(&mut self) {
        self.queue.retain(|t| !t.is_expired());
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    /// Stack the toasts down from the top-right corner of `area`.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let width = TOAST_WIDTH.min(area.width.saturating_sub(2));
        if width < 6 {
            return;
        }
        let inner_width = width.saturating_sub(2) as usize;
        let x = area.x + area.width.saturating_sub(width + 1);
        let mut y = area.y + 1;
        let bottom = area.y + area.height;

        for toast in &self.queue {
            let height = toast.height(inner_width);
            if y + height > bottom {
                break;
            }
            let rect = Rect::new(x, y, width, height);
            render_toast(toast, frame, rect);
            y += height;
        }
    }
}

fn render_toast(toast: &Toast, frame: &mut Frame, area: Rect) {
    frame.render_widget(Clear, area);
    let style = toast.kind.style();
    let text = Line::from(vec![
        Span::styled(format!("{} ", toast.kind.icon()), style.add_modifier(Modifier::BOLD)),
        Span::styled(toast.message.as_str(), style),
    ]);
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_style(style));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(ToastKind::Info.duration(), Duration::from_secs(3));
        assert_eq!(ToastKind::Success.duration(), Duration::from_secs(3));
        assert_eq!(ToastKind::Warning.duration(), Duration::from_secs(5));
        assert_eq!(ToastKind::Error.duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_at_most_three() {
        let mut toasts = Toasts::new();
        toasts.info("1");
        toasts.success("2");
        toasts.warning("3");
        toasts.error("4");
        assert_eq!(toasts.len(), 3);
        let messages: Vec<&str> = toasts.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_tick_expires() {
        let mut toasts = Toasts::new();
        toasts.push(Toast::new(ToastKind::Info, "gone").with_ttl(Duration::from_millis(1)));
        toasts.info("stays");
        std::thread::sleep(Duration::from_millis(5));
        toasts.tick();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts.iter().next().unwrap().message, "stays");
    }

    #[test]
    fn test_height_wraps() {
        let toast = Toast::new(ToastKind::Info, "x".repeat(30));
        assert_eq!(toast.height(40), 3);
        assert_eq!(toast.height(16), 4);
        assert_eq!(toast.height(0), 3);
    }
}
