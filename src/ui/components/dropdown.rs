//! Dropdown for choosing one of a fixed list of options.
//!
//! Collapsed, it shows the current choice; Left/Right (or h/l) cycle through
//! the options and Enter expands the list. Expanded, j/k or the arrows move,
//! Enter picks and Esc closes.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::ui::theme::theme;

const MAX_VISIBLE_ITEMS: usize = 8;

/// Result of dropdown input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropdownAction {
    /// The choice changed to this index.
    Select(usize),
    /// The expanded list was closed without choosing.
    Cancel,
}

#[derive(Debug, Clone)]
pub struct Dropdown {
    label: String,
    items: Vec<String>,
    selected: usize,
    highlighted: usize,
    expanded: bool,
}

impl Dropdown {
    pub fn new(label: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            label: label.into(),
            items,
            selected: 0,
            highlighted: 0,
            expanded: false,
        }
    }

    /// Replace the options. The choice is kept when still in range.
    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
        if self.selected >= self.items.len() {
            self.selected = 0;
        }
        self.highlighted = self.selected;
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }

    pub fn select(&mut self, index: usize) {
        if index < self.items.len() {
            self.selected = index;
            self.highlighted = index;
        }
    }

    /// Select the item equal to `value`, if present.
    pub fn select_value(&mut self, value: &str) {
        if let Some(index) = self.items.iter().position(|i| i == value) {
            self.select(index);
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn expand(&mut self) {
        if !self.items.is_empty() {
            self.expanded = true;
            self.highlighted = self.selected;
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<DropdownAction> {
        if self.expanded {
            self.handle_expanded_input(key)
        } else {
            self.handle_collapsed_input(key)
        }
    }

    fn handle_collapsed_input(&mut self, key: KeyEvent) -> Option<DropdownAction> {
        if self.items.is_empty() {
            return None;
        }
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => {
                self.expand();
                None
            }
            (KeyCode::Left, _) | (KeyCode::Char('h'), KeyModifiers::NONE) if self.selected > 0 => {
                self.select(self.selected - 1);
                Some(DropdownAction::Select(self.selected))
            }
            (KeyCode::Right, _) | (KeyCode::Char('l'), KeyModifiers::NONE)
                if self.selected + 1 < self.items.len() =>
            {
                self.select(self.selected + 1);
                Some(DropdownAction::Select(self.selected))
            }
            _ => None,
        }
    }

    fn handle_expanded_input(&mut self, key: KeyEvent) -> Option<DropdownAction> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
                if self.highlighted + 1 < self.items.len() {
                    self.highlighted += 1;
                }
                None
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
                self.highlighted = self.highlighted.saturating_sub(1);
                None
            }
            (KeyCode::Enter, _) => {
                self.expanded = false;
                self.selected = self.highlighted;
                Some(DropdownAction::Select(self.selected))
            }
            (KeyCode::Esc, _) | (KeyCode::Char('q'), KeyModifiers::NONE) => {
                self.expanded = false;
                self.highlighted = self.selected;
                Some(DropdownAction::Cancel)
            }
            _ => None,
        }
    }

    /// Render the collapsed field.
    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let t = theme();
        let text = match self.selected_item() {
            Some(item) => format!("{} {}", item, if self.expanded { "▲" } else { "▼" }),
            None => "No options".to_string(),
        };
        let (border_style, title_style) = if focused {
            (
                Style::default().fg(t.border_focused),
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
            )
        } else {
            (Style::default().fg(t.border), Style::default().fg(t.fg))
        };
        let block = Block::default()
            .title(Span::styled(format!(" {} ", self.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);
        frame.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(t.input_fg))
                .block(block),
            area,
        );
    }

    /// Render the expanded list below `anchor`, or above it when there is no
    /// room below.
    pub fn render_list(&self, frame: &mut Frame, anchor: Rect, screen: Rect) {
        if !self.expanded || self.items.is_empty() {
            return;
        }
        let t = theme();
        let height = (self.items.len().min(MAX_VISIBLE_ITEMS) + 2) as u16;
        let below = screen.y + screen.height;
        let y = if anchor.y + anchor.height + height <= below {
            anchor.y + anchor.height
        } else {
            anchor.y.saturating_sub(height).max(screen.y)
        };
        let area = Rect::new(anchor.x, y, anchor.width, height.min(screen.height)).intersection(screen);
        frame.render_widget(Clear, area);

        let items: Vec<ListItem> = self
            .items
            .iter()
            .map(|item| ListItem::new(item.as_str()).style(Style::default().fg(t.fg)))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(t.border_focused))
                    .style(Style::default().bg(t.bg)),
            )
            .highlight_style(
                Style::default()
                    .fg(t.bg)
                    .bg(t.accent)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(Some(self.highlighted));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn dropdown() -> Dropdown {
        Dropdown::new(
            "Type",
            vec!["Text".to_string(), "Number".to_string(), "Date".to_string()],
        )
    }

    #[test]
    fn test_cycle_collapsed() {
        let mut d = dropdown();
        assert_eq!(d.handle_input(key(KeyCode::Left)), None);
        assert_eq!(d.handle_input(key(KeyCode::Right)), Some(DropdownAction::Select(1)));
        assert_eq!(d.handle_input(key(KeyCode::Char('l'))), Some(DropdownAction::Select(2)));
        assert_eq!(d.handle_input(key(KeyCode::Right)), None);
        assert_eq!(d.selected_item(), Some("Date"));
    }

    #[test]
    fn test_expand_and_pick() {
        let mut d = dropdown();
        d.handle_input(key(KeyCode::Enter));
        assert!(d.is_expanded());
        d.handle_input(key(KeyCode::Char('j')));
        d.handle_input(key(KeyCode::Down));
        d.handle_input(key(KeyCode::Down));
        assert_eq!(d.handle_input(key(KeyCode::Enter)), Some(DropdownAction::Select(2)));
        assert!(!d.is_expanded());
    }

    #[test]
    fn test_cancel_keeps_choice() {
        let mut d = dropdown();
        d.select(1);
        d.expand();
        d.handle_input(key(KeyCode::Up));
        assert_eq!(d.handle_input(key(KeyCode::Esc)), Some(DropdownAction::Cancel));
        assert_eq!(d.selected_index(), 1);
    }

    #[test]
    fn test_select_value_and_set_items() {
        let mut d = dropdown();
        d.select_value("Date");
        assert_eq!(d.selected_index(), 2);
        d.set_items(vec!["A".to_string()]);
        assert_eq!(d.selected_index(), 0);
        d.select_value("missing");
        assert_eq!(d.selected_item(), Some("A"));
    }

    #[test]
    fn test_empty_dropdown_ignores_input() {
        let mut d = Dropdown::new("Empty", Vec::new());
        d.handle_input(key(KeyCode::Enter));
        assert!(!d.is_expanded());
        assert_eq!(d.selected_item(), None);
    }
}
