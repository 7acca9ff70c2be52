//! CSV import dialog.
//!
//! The user enters a path and chooses whether the first line is a header and
//! whether to replace the table. The file is read in the background; once it
//! arrives the first rows are previewed and Enter imports them.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row as TableRow, Table as TableWidget},
    Frame,
};

use crate::config::CsvSettings;
use crate::csv::{CsvDocument, CsvPreview};
use crate::ui::components::{centered_rect, TextInput};
use crate::ui::theme::theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportAction {
    /// Read this file in the background.
    Load { path: PathBuf, has_header: bool },
    /// Import the previewed document.
    Confirm { document: CsvDocument, replace: bool },
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Path,
    Header,
    Replace,
}

#[derive(Debug, Clone)]
enum Stage {
    Path,
    Loading(PathBuf),
    Preview {
        document: CsvDocument,
        preview: CsvPreview,
    },
}

pub struct ImportView {
    path: TextInput,
    has_header: bool,
    replace: bool,
    focus: Focus,
    stage: Stage,
    error: Option<String>,
}

impl ImportView {
    pub fn new(settings: &CsvSettings) -> Self {
        Self {
            path: TextInput::new().with_placeholder("~/data/people.csv"),
            has_header: settings.has_header,
            replace: settings.replace_existing,
            focus: Focus::Path,
            stage: Stage::Path,
            error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.stage, Stage::Loading(_))
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self.stage, Stage::Preview { .. })
    }

    /// Whether `path` is the file this dialog is waiting for.
    pub fn awaits(&self, path: &std::path::Path) -> bool {
        matches!(&self.stage, Stage::Loading(p) if p == path)
    }

    /// Result of the background read.
    pub fn loaded(&mut self, result: Result<CsvDocument, String>) {
        match result {
            Ok(document) => {
                let preview = document.preview();
                self.stage = Stage::Preview { document, preview };
                self.error = None;
            }
            Err(message) => {
                self.stage = Stage::Path;
                self.error = Some(message);
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<ImportAction> {
        if key.code == KeyCode::Esc {
            return Some(ImportAction::Cancel);
        }
        match &self.stage {
            Stage::Path => self.handle_path_input(key),
            Stage::Loading(_) => None,
            Stage::Preview { .. } => self.handle_preview_input(key),
        }
    }

    fn handle_path_input(&mut self, key: KeyEvent) -> Option<ImportAction> {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.focus = match self.focus {
                    Focus::Path => Focus::Header,
                    Focus::Header => Focus::Replace,
                    Focus::Replace => Focus::Path,
                };
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = match self.focus {
                    Focus::Path => Focus::Replace,
                    Focus::Header => Focus::Path,
                    Focus::Replace => Focus::Header,
                };
                None
            }
            KeyCode::Enter => {
                let raw = self.path.value().trim();
                if raw.is_empty() {
                    self.error = Some("Enter the path of a .csv file.".to_string());
                    return None;
                }
                let path = expand_home(raw);
                self.stage = Stage::Loading(path.clone());
                self.error = None;
                Some(ImportAction::Load {
                    path,
                    has_header: self.has_header,
                })
            }
            KeyCode::Char(' ') if self.focus != Focus::Path => {
                match self.focus {
                    Focus::Header => self.has_header = !self.has_header,
                    Focus::Replace => self.replace = !self.replace,
                    Focus::Path => {}
                }
                None
            }
            _ => {
                if self.focus == Focus::Path {
                    self.path.handle_input(key);
                    self.error = None;
                }
                None
            }
        }
    }

    fn handle_preview_input(&mut self, key: KeyEvent) -> Option<ImportAction> {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => match std::mem::replace(&mut self.stage, Stage::Path) {
                Stage::Preview { document, .. } => Some(ImportAction::Confirm {
                    document,
                    replace: self.replace,
                }),
                other => {
                    self.stage = other;
                    None
                }
            },
            (KeyCode::Char('r'), KeyModifiers::NONE) => {
                self.replace = !self.replace;
                None
            }
            (KeyCode::Char('b'), KeyModifiers::NONE) | (KeyCode::Backspace, _) => {
                self.stage = Stage::Path;
                None
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let rect = centered_rect(area, 90.min(area.width.saturating_sub(4)), 18);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(Span::styled(
                " Import CSV ",
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border_focused))
            .style(Style::default().bg(t.bg));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        match &self.stage {
            Stage::Path => self.render_path(frame, inner),
            Stage::Loading(path) => {
                frame.render_widget(
                    Paragraph::new(format!("Reading {}…", path.display()))
                        .style(Style::default().fg(t.info)),
                    inner,
                );
            }
            Stage::Preview { preview, .. } => self.render_preview(frame, inner, preview),
        }
    }

    fn render_path(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(area);
        self.path.render(frame, chunks[0], "CSV file", self.focus == Focus::Path);

        let checkbox = |checked: bool, label: &str, focused: bool| {
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if focused {
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(t.fg)
            };
            Paragraph::new(Line::from(Span::styled(format!("{} {}", mark, label), style)))
        };
        frame.render_widget(
            checkbox(self.has_header, "First line is a header", self.focus == Focus::Header),
            chunks[1],
        );
        frame.render_widget(
            checkbox(self.replace, "Replace existing data", self.focus == Focus::Replace),
            chunks[2],
        );

        let (text, style) = match &self.error {
            Some(message) => (message.as_str(), Style::default().fg(t.error)),
            None => (
                "[Tab] next  [Space] toggle  [Enter] load  [Esc] cancel",
                Style::default().fg(t.dim),
            ),
        };
        frame.render_widget(Paragraph::new(text).style(style), chunks[4]);
    }

    fn render_preview(&self, frame: &mut Frame, area: Rect, preview: &CsvPreview) {
        let t = theme();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let header = TableRow::new(
            preview
                .headers
                .iter()
                .map(|h| Cell::from(h.clone())),
        )
        .style(Style::default().bg(t.header_bg).add_modifier(Modifier::BOLD));
        let rows = preview
            .rows
            .iter()
            .map(|r| TableRow::new(r.iter().map(|v| Cell::from(v.clone()))));
        let count = preview.headers.len().max(1) as u32;
        let widths = vec![Constraint::Ratio(1, count); count as usize];
        frame.render_widget(
            TableWidget::new(rows, widths)
                .header(header)
                .style(Style::default().fg(t.fg)),
            chunks[0],
        );

        let more = if preview.is_truncated() {
            format!("Showing {} of {} rows", preview.rows.len(), preview.total_rows)
        } else {
            format!("{} rows", preview.total_rows)
        };
        let mode = if self.replace { "replace" } else { "append" };
        frame.render_widget(
            Paragraph::new(format!("{}, {} columns, mode: {}", more, preview.headers.len(), mode))
                .style(Style::default().fg(t.info)),
            chunks[1],
        );
        frame.render_widget(
            Paragraph::new("[Enter] import  [r] toggle replace  [b] back  [Esc] cancel")
                .style(Style::default().fg(t.dim)),
            chunks[2],
        );
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
