//! Modal dialogs: choices, text prompts and the error dialog.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::error::AppError;
use crate::ui::components::TextInput;
use crate::ui::theme::theme;

/// A rectangle of the given size centered in `area`, clipped to it.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

fn dialog_block(title: &str) -> Block<'_> {
    let t = theme();
    Block::default()
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.border_focused))
        .style(Style::default().bg(t.bg))
}

/// Result of a [`ChoiceDialog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceAction<T> {
    Chosen(T),
    Cancel,
}

/// A message and a row of buttons, navigated with Left/Right or Tab.
#[derive(Debug, Clone)]
pub struct ChoiceDialog<T> {
    title: String,
    message: String,
    choices: Vec<(String, T)>,
    highlighted: usize,
}

impl<T: Clone> ChoiceDialog<T> {
    pub fn new(title: impl Into<String>, message: impl Into<String>, choices: Vec<(String, T)>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            choices,
            highlighted: 0,
        }
    }

    /// Start on a choice other than the first.
    pub fn with_highlighted(mut self, index: usize) -> Self {
        if index < self.choices.len() {
            self.highlighted = index;
        }
        self
    }

    pub fn highlighted(&self) -> Option<&T> {
        self.choices.get(self.highlighted).map(|(_, v)| v)
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<ChoiceAction<T>> {
        let len = self.choices.len().max(1);
        match (key.code, key.modifiers) {
            (KeyCode::Right, _) | (KeyCode::Tab, _) | (KeyCode::Char('l'), KeyModifiers::NONE) => {
                self.highlighted = (self.highlighted + 1) % len;
                None
            }
            (KeyCode::Left, _) | (KeyCode::BackTab, _) | (KeyCode::Char('h'), KeyModifiers::NONE) => {
                self.highlighted = (self.highlighted + len - 1) % len;
                None
            }
            (KeyCode::Enter, _) => self.highlighted().cloned().map(ChoiceAction::Chosen),
            (KeyCode::Esc, _) | (KeyCode::Char('q'), KeyModifiers::NONE) => {
                Some(ChoiceAction::Cancel)
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let width = 56.min(area.width.saturating_sub(4));
        let text_lines = (self.message.chars().count() as u16 / width.saturating_sub(4).max(1)) + 1;
        let height = text_lines + 6;
        let rect = centered_rect(area, width, height);
        frame.render_widget(Clear, rect);
        let block = dialog_block(&self.title);
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .margin(1)
            .split(inner);
        frame.render_widget(
            Paragraph::new(self.message.as_str())
                .style(Style::default().fg(t.fg))
                .wrap(Wrap { trim: true }),
            chunks[0],
        );

        let mut buttons = Vec::new();
        for (i, (label, _)) in self.choices.iter().enumerate() {
            let style = if i == self.highlighted {
                Style::default()
                    .fg(t.bg)
                    .bg(t.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(t.fg)
            };
            buttons.push(Span::styled(format!(" {} ", label), style));
            buttons.push(Span::raw("  "));
        }
        frame.render_widget(Paragraph::new(Line::from(buttons)), chunks[1]);
    }
}

/// Yes/No confirmation.
pub fn confirm_dialog(title: impl Into<String>, message: impl Into<String>) -> ChoiceDialog<bool> {
    ChoiceDialog::new(
        title,
        message,
        vec![("Cancel".to_string(), false), ("Confirm".to_string(), true)],
    )
}

/// Result of a [`PromptDialog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAction {
    Submit(String),
    Cancel,
}

/// A single text field, used for file paths.
#[derive(Debug, Clone)]
pub struct PromptDialog {
    title: String,
    hint: String,
    input: TextInput,
}

impl PromptDialog {
    pub fn new(title: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            hint: hint.into(),
            input: TextInput::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.input.set_value(value);
        self
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<PromptAction> {
        match key.code {
            KeyCode::Enter => {
                let value = self.input.value().trim();
                if value.is_empty() {
                    None
                } else {
                    Some(PromptAction::Submit(value.to_string()))
                }
            }
            KeyCode::Esc => Some(PromptAction::Cancel),
            _ => {
                self.input.handle_input(key);
                None
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let rect = centered_rect(area, 64.min(area.width.saturating_sub(4)), 8);
        frame.render_widget(Clear, rect);
        let block = dialog_block(&self.title);
        let inner = block.inner(rect);
        frame.render_widget(block, rect);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(inner);
        frame.render_widget(
            Paragraph::new(self.hint.as_str()).style(Style::default().fg(t.dim)),
            chunks[0],
        );
        self.input.render(frame, chunks[1], "Path", true);
    }
}

/// Dialog for critical errors. Enter or Esc dismisses it.
#[derive(Debug, Default)]
pub struct ErrorDialog {
    content: Option<(String, String, Option<&'static str>)>,
}

impl ErrorDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, error: &AppError) {
        self.content = Some((
            "Error".to_string(),
            error.user_message(),
            error.suggested_action(),
        ));
    }

    pub fn show_message(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.content = Some((title.into(), message.into(), None));
    }

    pub fn dismiss(&mut self) {
        self.content = None;
    }

    pub fn is_visible(&self) -> bool {
        self.content.is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.content.as_ref().map(|(_, m, _)| m.as_str())
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let Some((title, message, hint)) = &self.content else {
            return;
        };
        let t = theme();
        let rect = centered_rect(area, 60.min(area.width.saturating_sub(4)), 10);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(Span::styled(
                format!(" {} ", title),
                Style::default().fg(t.error).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.error))
            .style(Style::default().bg(t.bg));

        let mut lines = vec![Line::from(Span::styled(message.as_str(), Style::default().fg(t.fg))), Line::raw("")];
        if let Some(hint) = hint {
            lines.push(Line::from(Span::styled(*hint, Style::default().fg(t.warning))));
            lines.push(Line::raw(""));
        }
        lines.push(Line::from(Span::styled(
            "Press Enter or Esc to dismiss",
            Style::default().fg(t.dim),
        )));
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            rect,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(area, 50, 10), Rect::new(25, 15, 50, 10));
        assert_eq!(centered_rect(area, 200, 80), area);
    }

    #[test]
    fn test_confirm_defaults_to_cancel() {
        let mut dialog = confirm_dialog("Delete", "Delete row?");
        assert_eq!(dialog.handle_input(key(KeyCode::Enter)), Some(ChoiceAction::Chosen(false)));
        dialog.handle_input(key(KeyCode::Right));
        assert_eq!(dialog.handle_input(key(KeyCode::Enter)), Some(ChoiceAction::Chosen(true)));
    }

    #[test]
    fn test_choice_wraps_and_cancels() {
        let mut dialog = ChoiceDialog::new(
            "Clear",
            "What to clear?",
            vec![("Rows".to_string(), 1), ("All".to_string(), 2), ("Cancel".to_string(), 0)],
        );
        dialog.handle_input(key(KeyCode::Left));
        assert_eq!(dialog.highlighted(), Some(&0));
        assert_eq!(dialog.handle_input(key(KeyCode::Esc)), Some(ChoiceAction::Cancel));
    }

    #[test]
    fn test_prompt_submit_trims() {
        let mut prompt = PromptDialog::new("Upload", "Image path").with_value("  ~/a.png ");
        assert_eq!(
            prompt.handle_input(key(KeyCode::Enter)),
            Some(PromptAction::Submit("~/a.png".to_string()))
        );
    }

    #[test]
    fn test_prompt_empty_does_not_submit() {
        let mut prompt = PromptDialog::new("Upload", "Image path");
        assert_eq!(prompt.handle_input(key(KeyCode::Enter)), None);
        prompt.handle_input(key(KeyCode::Char('x')));
        assert_eq!(prompt.value(), "x");
        assert_eq!(prompt.handle_input(key(KeyCode::Esc)), Some(PromptAction::Cancel));
    }

    #[test]
    fn test_error_dialog() {
        let mut dialog = ErrorDialog::new();
        assert!(!dialog.is_visible());
        dialog.show(&AppError::terminal("boom"));
        assert_eq!(dialog.message(), Some("Terminal error: boom"));
        dialog.dismiss();
        assert!(!dialog.is_visible());
    }
}
