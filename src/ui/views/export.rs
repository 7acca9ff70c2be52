//! Export dialog: pick what to write into the output directory.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::export::ExportFormat;
use crate::ui::components::centered_rect;
use crate::ui::theme::theme;

/// Something that can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// The visible rows in a table format.
    Table(ExportFormat),
    Filters,
    Grouped,
    GroupSummary,
    Images,
}

impl ExportKind {
    pub const ALL: [ExportKind; 7] = [
        ExportKind::Table(ExportFormat::Json),
        ExportKind::Table(ExportFormat::Csv),
        ExportKind::Table(ExportFormat::Excel),
        ExportKind::Filters,
        ExportKind::Grouped,
        ExportKind::GroupSummary,
        ExportKind::Images,
    ];

    pub fn label(&self) -> String {
        match self {
            ExportKind::Table(format) => format!("Table as {} ({})", format.label(), format.file_name()),
            ExportKind::Filters => "Filter conditions (filter_conditions.json)".to_string(),
            ExportKind::Grouped => "Grouped data (grouped_data.json)".to_string(),
            ExportKind::GroupSummary => "Group summary (group_summary.json)".to_string(),
            ExportKind::Images => "Image list (images_data.json)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportAction {
    Export(ExportKind),
    Cancel,
}

pub struct ExportView {
    dir: PathBuf,
    highlighted: usize,
}

impl ExportView {
    /// Files are written into `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, highlighted: 0 }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<ExportAction> {
        let len = ExportKind::ALL.len();
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) | (KeyCode::Char('q'), KeyModifiers::NONE) => Some(ExportAction::Cancel),
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) | (KeyCode::Tab, _) => {
                self.highlighted = (self.highlighted + 1) % len;
                None
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) | (KeyCode::BackTab, _) => {
                self.highlighted = (self.highlighted + len - 1) % len;
                None
            }
            (KeyCode::Enter, _) => Some(ExportAction::Export(ExportKind::ALL[self.highlighted])),
            (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                let index = c.to_digit(10)? as usize;
                (1..=len)
                    .contains(&index)
                    .then(|| ExportAction::Export(ExportKind::ALL[index - 1]))
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let rect = centered_rect(area, 64.min(area.width.saturating_sub(4)), 14);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(Span::styled(
                " Export ",
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border_focused))
            .style(Style::default().bg(t.bg));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);
        let items: Vec<ListItem> = ExportKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| ListItem::new(Line::from(format!("{}. {}", i + 1, kind.label()))))
            .collect();
        let mut state = ListState::default();
        state.select(Some(self.highlighted));
        frame.render_stateful_widget(
            List::new(items)
                .style(Style::default().fg(t.fg))
                .highlight_style(Style::default().fg(t.bg).bg(t.accent)),
            chunks[0],
            &mut state,
        );
        frame.render_widget(
            Paragraph::new(format!("Into {}", self.dir.display())).style(Style::default().fg(t.dim)),
            chunks[1],
        );
    }
}
