//! Group panel: choose the grouping column and key order, and see the
//! groups of the active grouping.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::group::{groupable_columns, GroupStats};
use crate::model::{ColumnDef, GroupConfig, SortDirection};
use crate::ui::components::centered_rect;
use crate::ui::theme::theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupPanelAction {
    Apply(GroupConfig),
    Clear,
    ExpandAll,
    CollapseAll,
    ExportGrouped,
    ExportSummary,
    Cancel,
}

pub struct GroupPanelView {
    /// (field, title) of every groupable column.
    fields: Vec<(String, String)>,
    active: Option<String>,
    highlighted: usize,
    sort: SortDirection,
}

impl GroupPanelView {
    pub fn new(columns: &[ColumnDef], current: Option<&GroupConfig>) -> Self {
        let fields: Vec<(String, String)> = groupable_columns(columns)
            .into_iter()
            .map(|c| (c.field.clone(), c.title.clone()))
            .collect();
        let highlighted = current
            .and_then(|g| fields.iter().position(|(f, _)| *f == g.field))
            .unwrap_or(0);
        Self {
            fields,
            active: current.map(|g| g.field.clone()),
            highlighted,
            sort: current.map(|g| g.sort).unwrap_or_default(),
        }
    }

    pub fn sort(&self) -> SortDirection {
        self.sort
    }

    pub fn highlighted_field(&self) -> Option<&str> {
        self.fields.get(self.highlighted).map(|(f, _)| f.as_str())
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<GroupPanelAction> {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) | (KeyCode::Char('q'), KeyModifiers::NONE) => Some(GroupPanelAction::Cancel),
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
                if self.highlighted + 1 < self.fields.len() {
                    self.highlighted += 1;
                }
                None
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
                self.highlighted = self.highlighted.saturating_sub(1);
                None
            }
            (KeyCode::Char('s'), KeyModifiers::NONE) => {
                self.sort = self.sort.toggle();
                None
            }
            (KeyCode::Enter, _) => self
                .highlighted_field()
                .map(|field| GroupPanelAction::Apply(GroupConfig::new(field, self.sort))),
            (KeyCode::Char('c'), KeyModifiers::NONE) => Some(GroupPanelAction::Clear),
            (KeyCode::Char('+'), _) => Some(GroupPanelAction::ExpandAll),
            (KeyCode::Char('-'), _) => Some(GroupPanelAction::CollapseAll),
            (KeyCode::Char('x'), KeyModifiers::NONE) => Some(GroupPanelAction::ExportGrouped),
            (KeyCode::Char('y'), KeyModifiers::NONE) => Some(GroupPanelAction::ExportSummary),
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, stats: Option<&GroupStats>) {
        let t = theme();
        let rect = centered_rect(area, 72.min(area.width.saturating_sub(4)), 20);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(Span::styled(" Group by ", Style::default().fg(t.accent)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border_focused))
            .style(Style::default().bg(t.bg));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(inner);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(chunks[0]);

        let items: Vec<ListItem> = self
            .fields
            .iter()
            .map(|(field, title)| {
                let radio = if self.active.as_deref() == Some(field.as_str()) {
                    "(●) "
                } else {
                    "( ) "
                };
                ListItem::new(Line::from(format!("{}{}", radio, title)))
            })
            .collect();
        let mut state = ListState::default();
        if !self.fields.is_empty() {
            state.select(Some(self.highlighted));
        }
        let list = List::new(items)
            .highlight_style(
                Style::default()
                    .fg(t.bg)
                    .bg(t.accent)
                    .add_modifier(Modifier::BOLD),
            )
            .style(Style::default().fg(t.fg));
        frame.render_stateful_widget(list, left[0], &mut state);
        frame.render_widget(
            Paragraph::new(format!("Order: {} {}", self.sort.label(), self.sort.arrow()))
                .style(Style::default().fg(t.info)),
            left[1],
        );

        let mut lines = Vec::new();
        match stats {
            Some(stats) => {
                lines.push(Line::from(Span::styled(
                    format!("{} groups, {} records", stats.group_count, stats.total_records),
                    Style::default().fg(t.group_fg).add_modifier(Modifier::BOLD),
                )));
                for group in &stats.groups {
                    lines.push(Line::from(vec![
                        Span::styled(group.name.clone(), Style::default().fg(t.fg)),
                        Span::styled(format!("  {}", group.count), Style::default().fg(t.dim)),
                    ]));
                }
            }
            None => lines.push(Line::from(Span::styled(
                "Not grouped",
                Style::default().fg(t.dim),
            ))),
        }
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::LEFT).border_style(Style::default().fg(t.border))),
            chunks[1],
        );
    }
}
