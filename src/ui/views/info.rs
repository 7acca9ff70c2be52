//! Data info dialog: table and storage statistics, and the reset entry point.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::storage::{format_size, StorageUsage};
use crate::ui::components::centered_rect;
use crate::ui::theme::theme;

/// Figures shown in the dialog, gathered by the app when it opens.
#[derive(Debug, Clone, PartialEq)]
pub struct DataInfo {
    pub rows: usize,
    pub columns: usize,
    pub visible_rows: usize,
    pub selected_rows: usize,
    pub images: usize,
    pub filters: usize,
    pub group_field: Option<String>,
    pub usage: StorageUsage,
    pub last_saved: Option<DateTime<Local>>,
    pub data_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl DataInfo {
    /// `(label, value)` pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("Records", self.rows.to_string()),
            ("Columns", self.columns.to_string()),
            ("Visible", self.visible_rows.to_string()),
            ("Selected", self.selected_rows.to_string()),
            ("Images", self.images.to_string()),
            ("Filters", self.filters.to_string()),
            (
                "Grouped by",
                self.group_field.clone().unwrap_or_else(|| "-".to_string()),
            ),
            ("Table data", format_size(self.usage.table_bytes)),
            ("App state", format_size(self.usage.state_bytes)),
            (
                "Quota",
                format!(
                    "{} ({:.1}% used)",
                    format_size(self.usage.quota_bytes),
                    self.usage.usage_percent()
                ),
            ),
            (
                "Last saved",
                self.last_saved
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            ),
            ("Data dir", self.data_dir.display().to_string()),
        ];
        if let Some(dir) = &self.log_dir {
            entries.push(("Log dir", dir.display().to_string()));
        }
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoAction {
    /// Ask to delete all stored data.
    Reset,
    Close,
}

pub struct InfoView {
    info: DataInfo,
}

impl InfoView {
    pub fn new(info: DataInfo) -> Self {
        Self { info }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<InfoAction> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('R'), _) => Some(InfoAction::Reset),
            (KeyCode::Esc, _)
            | (KeyCode::Enter, _)
            | (KeyCode::Char('q'), KeyModifiers::NONE)
            | (KeyCode::Char('I'), _) => Some(InfoAction::Close),
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let entries = self.info.entries();
        let rect = centered_rect(area, 70.min(area.width.saturating_sub(4)), entries.len() as u16 + 4);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(Span::styled(
                " Data info ",
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border_focused))
            .style(Style::default().bg(t.bg));

        let mut lines: Vec<Line> = entries
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{:>12}  ", label), Style::default().fg(t.dim)),
                    Span::styled(value, Style::default().fg(t.fg)),
                ])
            })
            .collect();
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            "[R] reset all data  [Esc] close",
            Style::default().fg(t.warning),
        )));
        frame.render_widget(Paragraph::new(lines).block(block), rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> DataInfo {
        DataInfo {
            rows: 50,
            columns: 8,
            visible_rows: 12,
            selected_rows: 0,
            images: 3,
            filters: 1,
            group_field: None,
            usage: StorageUsage {
                table_bytes: 1536,
                state_bytes: 0,
                quota_bytes: 5 * 1024 * 1024,
            },
            last_saved: None,
            data_dir: PathBuf::from("/tmp/lazytable"),
            log_dir: None,
        }
    }

    #[test]
    fn test_entries() {
        let entries = info().entries();
        let get = |label: &str| {
            entries
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("Records"), "50");
        assert_eq!(get("Table data"), "1.5 KB");
        assert_eq!(get("Grouped by"), "-");
        assert_eq!(get("Last saved"), "never");
        assert!(get("Quota").starts_with("5 MB"));
        assert!(!entries.iter().any(|(l, _)| *l == "Log dir"));
    }

    #[test]
    fn test_keys() {
        let mut view = InfoView::new(info());
        assert_eq!(
            view.handle_input(KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            Some(InfoAction::Reset)
        );
        assert_eq!(
            view.handle_input(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            Some(InfoAction::Close)
        );
        assert_eq!(view.handle_input(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)), None);
    }
}
