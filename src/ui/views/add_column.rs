//! Dialog for adding a column.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::model::{ColumnType, DEFAULT_COLUMN_WIDTH};
use crate::table::NewColumn;
use crate::ui::components::{centered_rect, Dropdown, TextInput};
use crate::ui::theme::theme;

#[derive(Debug, Clone, PartialEq)]
pub enum AddColumnAction {
    Submit(NewColumn),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Type,
    Width,
    Options,
}

const FIELDS: [Field; 4] = [Field::Title, Field::Type, Field::Width, Field::Options];

pub struct AddColumnView {
    title: TextInput,
    column_type: Dropdown,
    width: TextInput,
    options: TextInput,
    focus: usize,
    error: Option<String>,
}

impl AddColumnView {
    pub fn new() -> Self {
        Self {
            title: TextInput::new().with_placeholder("Column title"),
            column_type: Dropdown::new(
                "Type",
                ColumnType::ALL.iter().map(|t| t.label().to_string()).collect(),
            ),
            width: TextInput::with_value(DEFAULT_COLUMN_WIDTH.to_string()),
            options: TextInput::new().with_placeholder("Option A, Option B"),
            focus: 0,
            error: None,
        }
    }

    fn selected_type(&self) -> ColumnType {
        ColumnType::ALL
            .get(self.column_type.selected_index())
            .copied()
            .unwrap_or_default()
    }

    fn focused(&self) -> Field {
        FIELDS[self.focus]
    }

    /// Fields that apply to the chosen type.
    fn field_enabled(&self, field: Field) -> bool {
        field != Field::Options || self.selected_type() == ColumnType::Select
    }

    fn step_focus(&mut self, forward: bool) {
        let len = FIELDS.len();
        loop {
            self.focus = if forward {
                (self.focus + 1) % len
            } else {
                (self.focus + len - 1) % len
            };
            if self.field_enabled(self.focused()) {
                break;
            }
        }
    }

    /// Validate the form into a new column.
    fn build(&self) -> Result<NewColumn, String> {
        let title = self.title.value().trim();
        if title.is_empty() {
            return Err("Enter a column title.".to_string());
        }
        let width_text = self.width.value().trim();
        let width = if width_text.is_empty() {
            None
        } else {
            Some(
                width_text
                    .parse::<u16>()
                    .map_err(|_| "Width must be a whole number.".to_string())?,
            )
        };
        let column_type = self.selected_type();
        let options: Vec<String> = if column_type == ColumnType::Select {
            self.options
                .value()
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        } else {
            Vec::new()
        };
        if column_type == ColumnType::Select && options.is_empty() {
            return Err("A select column needs at least one option.".to_string());
        }
        Ok(NewColumn {
            title: title.to_string(),
            column_type,
            width,
            options,
        })
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<AddColumnAction> {
        match key.code {
            KeyCode::Esc => return Some(AddColumnAction::Cancel),
            KeyCode::Tab | KeyCode::Down => {
                self.step_focus(true);
                return None;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.step_focus(false);
                return None;
            }
            KeyCode::Enter => {
                return match self.build() {
                    Ok(column) => Some(AddColumnAction::Submit(column)),
                    Err(message) => {
                        self.error = Some(message);
                        None
                    }
                };
            }
            _ => {}
        }

        self.error = None;
        match self.focused() {
            Field::Title => {
                self.title.handle_input(key);
            }
            Field::Type => {
                self.column_type.handle_input(key);
            }
            Field::Width => {
                if let KeyCode::Char(c) = key.code {
                    if !c.is_ascii_digit() {
                        return None;
                    }
                }
                self.width.handle_input(key);
            }
            Field::Options => {
                self.options.handle_input(key);
            }
        }
        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let rect = centered_rect(area, 60.min(area.width.saturating_sub(4)), 17);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(Span::styled(
                " Add column ",
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border_focused))
            .style(Style::default().bg(t.bg));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(inner);
        let focus = self.focused();
        self.title.render(frame, chunks[0], "Title", focus == Field::Title);
        self.column_type.render(frame, chunks[1], focus == Field::Type);
        self.width.render(frame, chunks[2], "Width (px)", focus == Field::Width);
        if self.field_enabled(Field::Options) {
            self.options
                .render(frame, chunks[3], "Options (comma separated)", focus == Field::Options);
        }
        let (text, style) = match &self.error {
            Some(message) => (message.as_str(), Style::default().fg(t.error)),
            None => ("[Tab] next  [←/→] type  [Enter] add  [Esc] cancel", Style::default().fg(t.dim)),
        };
        frame.render_widget(Paragraph::new(text).style(style), chunks[4]);
    }
}

impl Default for AddColumnView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(view: &mut AddColumnView, s: &str) {
        for c in s.chars() {
            view.handle_input(key(KeyCode::Char(c)));
        }
    }

    fn select_type(view: &mut AddColumnView, column_type: ColumnType) {
        let index = ColumnType::ALL.iter().position(|&t| t == column_type).unwrap();
        view.column_type.select(index);
    }

    #[test]
    fn test_title_required() {
        let mut view = AddColumnView::new();
        assert_eq!(view.handle_input(key(KeyCode::Enter)), None);
        assert!(view.error.is_some());
    }

    #[test]
    fn test_submit_text_column() {
        let mut view = AddColumnView::new();
        type_str(&mut view, "Notes");
        match view.handle_input(key(KeyCode::Enter)) {
            Some(AddColumnAction::Submit(column)) => {
                assert_eq!(column.title, "Notes");
                assert_eq!(column.column_type, ColumnType::ALL[0]);
                assert_eq!(column.width, Some(DEFAULT_COLUMN_WIDTH));
                assert!(column.options.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_select_needs_options() {
        let mut view = AddColumnView::new();
        type_str(&mut view, "Level");
        select_type(&mut view, ColumnType::Select);
        assert_eq!(view.handle_input(key(KeyCode::Enter)), None);
        view.focus = 3;
        type_str(&mut view, "Low, ,High");
        match view.handle_input(key(KeyCode::Enter)) {
            Some(AddColumnAction::Submit(column)) => {
                assert_eq!(column.options, vec!["Low".to_string(), "High".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_options_skipped_unless_select() {
        let mut view = AddColumnView::new();
        select_type(&mut view, ColumnType::Number);
        view.handle_input(key(KeyCode::Tab));
        view.handle_input(key(KeyCode::Tab));
        assert_eq!(view.focused(), Field::Width);
        view.handle_input(key(KeyCode::Tab));
        assert_eq!(view.focused(), Field::Title);
    }

    #[test]
    fn test_width_accepts_digits_only() {
        let mut view = AddColumnView::new();
        view.focus = 2;
        view.handle_input(key(KeyCode::Char('x')));
        view.handle_input(key(KeyCode::Char('5')));
        assert_eq!(view.width.value(), "1205");
    }

    #[test]
    fn test_escape_cancels() {
        let mut view = AddColumnView::new();
        assert_eq!(view.handle_input(key(KeyCode::Esc)), Some(AddColumnAction::Cancel));
    }
}
