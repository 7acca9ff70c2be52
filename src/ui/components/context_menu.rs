//! Context menu for the focused cell.
//!
//! Items depend on where it was opened: image columns get an upload entry,
//! and bulk entries appear once more than one row is selected. Dividers are
//! skipped by navigation.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem},
    Frame,
};

use crate::ui::theme::theme;

/// What a menu entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    EditCell,
    UploadImage,
    ClearImage,
    InsertRow,
    DeleteRow,
    CopyRow,
    ClearSelectedCells,
    DeleteSelectedRows,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Item {
        label: String,
        icon: &'static str,
        action: MenuAction,
    },
    Divider,
}

/// Result of menu input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMenuAction {
    Run(MenuAction),
    Cancel,
}

/// Where the menu was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuTarget {
    pub image_column: bool,
    pub has_image: bool,
    pub editable: bool,
    pub selected_rows: usize,
}

#[derive(Debug, Default)]
pub struct ContextMenu {
    entries: Vec<Entry>,
    highlighted: usize,
    visible: bool,
}

impl ContextMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the entries for `target` and show the menu.
    pub fn show(&mut self, target: MenuTarget) {
        let item = |label: &str, icon: &'static str, action| Entry::Item {
            label: label.to_string(),
            icon,
            action,
        };
        let mut entries = Vec::new();
        if target.image_column {
            entries.push(item("Upload image", "⇪", MenuAction::UploadImage));
            if target.has_image {
                entries.push(item("Remove image", "✗", MenuAction::ClearImage));
            }
        } else if target.editable {
            entries.push(item("Edit cell", "✎", MenuAction::EditCell));
        }
        if !entries.is_empty() {
            entries.push(Entry::Divider);
        }
        entries.push(item("Insert row below", "+", MenuAction::InsertRow));
        entries.push(item("Delete row", "−", MenuAction::DeleteRow));
        entries.push(item("Copy row", "⎘", MenuAction::CopyRow));
        if target.selected_rows > 1 {
            let n = target.selected_rows;
            entries.push(Entry::Divider);
            entries.push(Entry::Item {
                label: format!("Clear this column in {} selected rows", n),
                icon: "⌫",
                action: MenuAction::ClearSelectedCells,
            });
            entries.push(Entry::Item {
                label: format!("Delete {} selected rows", n),
                icon: "−",
                action: MenuAction::DeleteSelectedRows,
            });
        }
        self.entries = entries;
        self.highlighted = 0;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Actions currently offered, in order.
    pub fn actions(&self) -> Vec<MenuAction> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Item { action, .. } => Some(*action),
                Entry::Divider => None,
            })
            .collect()
    }

    fn step(&mut self, forward: bool) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        let mut index = self.highlighted;
        for _ in 0..len {
            index = if forward {
                (index + 1) % len
            } else {
                (index + len - 1) % len
            };
            if matches!(self.entries[index], Entry::Item { .. }) {
                self.highlighted = index;
                return;
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<ContextMenuAction> {
        if !self.visible {
            return None;
        }
        match (key.code, key.modifiers) {
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) | (KeyCode::Tab, _) => {
                self.step(true);
                None
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) | (KeyCode::BackTab, _) => {
                self.step(false);
                None
            }
            (KeyCode::Enter, _) => match self.entries.get(self.highlighted) {
                Some(Entry::Item { action, .. }) => {
                    let action = *action;
                    self.hide();
                    Some(ContextMenuAction::Run(action))
                }
                _ => None,
            },
            (KeyCode::Esc, _) | (KeyCode::Char('q'), KeyModifiers::NONE) | (KeyCode::Char('m'), KeyModifiers::NONE) => {
                self.hide();
                Some(ContextMenuAction::Cancel)
            }
            _ => None,
        }
    }

    /// Render next to `anchor` (the focused cell), kept inside `screen`.
    pub fn render(&self, frame: &mut Frame, anchor: Rect, screen: Rect) {
        if !self.visible {
            return;
        }
        let t = theme();
        let width = self
            .entries
            .iter()
            .map(|e| match e {
                Entry::Item { label, .. } => label.chars().count() as u16 + 6,
                Entry::Divider => 0,
            })
            .max()
            .unwrap_or(20)
            .max(20);
        let height = self.entries.len() as u16 + 2;
        let x = (anchor.x + 2).min((screen.x + screen.width).saturating_sub(width));
        let y = (anchor.y + 1).min((screen.y + screen.height).saturating_sub(height));
        let area = Rect::new(x, y, width, height).intersection(screen);
        frame.render_widget(Clear, area);

        let inner_width = area.width.saturating_sub(2) as usize;
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| match entry {
                Entry::Divider => ListItem::new(Line::from(Span::styled(
                    "─".repeat(inner_width),
                    Style::default().fg(t.dim),
                ))),
                Entry::Item { label, icon, .. } => {
                    let style = if i == self.highlighted {
                        Style::default()
                            .fg(t.bg)
                            .bg(t.accent)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(t.fg)
                    };
                    ListItem::new(Line::from(format!(" {} {}", icon, label))).style(style)
                }
            })
            .collect();
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(t.border_focused))
                .style(Style::default().bg(t.bg)),
        );
        frame.render_widget(list, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn target(selected_rows: usize) -> MenuTarget {
        MenuTarget {
            image_column: false,
            has_image: false,
            editable: true,
            selected_rows,
        }
    }

    #[test]
    fn test_basic_entries() {
        let mut menu = ContextMenu::new();
        menu.show(target(0));
        assert_eq!(
            menu.actions(),
            vec![
                MenuAction::EditCell,
                MenuAction::InsertRow,
                MenuAction::DeleteRow,
                MenuAction::CopyRow
            ]
        );
    }

    #[test]
    fn test_bulk_entries_need_two_rows() {
        let mut menu = ContextMenu::new();
        menu.show(target(1));
        assert!(!menu.actions().contains(&MenuAction::DeleteSelectedRows));
        menu.show(target(3));
        assert!(menu.actions().contains(&MenuAction::ClearSelectedCells));
        assert!(menu.actions().contains(&MenuAction::DeleteSelectedRows));
    }

    #[test]
    fn test_image_column_entries() {
        let mut menu = ContextMenu::new();
        menu.show(MenuTarget {
            image_column: true,
            has_image: true,
            editable: true,
            selected_rows: 0,
        });
        let actions = menu.actions();
        assert_eq!(actions[0], MenuAction::UploadImage);
        assert_eq!(actions[1], MenuAction::ClearImage);
        assert!(!actions.contains(&MenuAction::EditCell));
    }

    #[test]
    fn test_read_only_column_has_no_edit() {
        let mut menu = ContextMenu::new();
        menu.show(MenuTarget {
            editable: false,
            ..target(0)
        });
        assert_eq!(menu.actions()[0], MenuAction::InsertRow);
    }

    #[test]
    fn test_navigation_skips_dividers() {
        let mut menu = ContextMenu::new();
        menu.show(target(0));
        menu.handle_input(key(KeyCode::Down));
        assert_eq!(
            menu.handle_input(key(KeyCode::Enter)),
            Some(ContextMenuAction::Run(MenuAction::InsertRow))
        );
        assert!(!menu.is_visible());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut menu = ContextMenu::new();
        menu.show(target(0));
        menu.handle_input(key(KeyCode::Up));
        assert_eq!(
            menu.handle_input(key(KeyCode::Enter)),
            Some(ContextMenuAction::Run(MenuAction::CopyRow))
        );
    }

    #[test]
    fn test_escape_cancels() {
        let mut menu = ContextMenu::new();
        menu.show(target(0));
        assert_eq!(menu.handle_input(key(KeyCode::Esc)), Some(ContextMenuAction::Cancel));
        assert_eq!(menu.handle_input(key(KeyCode::Enter)), None);
    }
}
