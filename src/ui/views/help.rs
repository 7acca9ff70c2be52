//! Keyboard reference, opened with `?`.
//!
//! Sections are listed on the left; the bindings of the chosen section are
//! shown as a table on the right.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row as TableRow, Table,
        TableState,
    },
    Frame,
};

use crate::events::{get_keybindings_grouped, KeyContext, Keybinding};
use crate::ui::components::centered_rect;
use crate::ui::theme::theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpAction {
    Close,
}

pub struct HelpView {
    sections: Vec<(KeyContext, Vec<Keybinding>)>,
    section: usize,
    /// First visible binding of the current section.
    offset: usize,
}

impl HelpView {
    /// Open on the section for `context`.
    pub fn new(context: KeyContext) -> Self {
        let sections = get_keybindings_grouped();
        let section = sections
            .iter()
            .position(|(c, _)| *c == context)
            .unwrap_or(0);
        Self {
            sections,
            section,
            offset: 0,
        }
    }

    pub fn current_context(&self) -> Option<KeyContext> {
        self.sections.get(self.section).map(|(c, _)| *c)
    }

    fn bindings(&self) -> &[Keybinding] {
        self.sections
            .get(self.section)
            .map_or(&[][..], |(_, b)| b.as_slice())
    }

    fn select_section(&mut self, forward: bool) {
        let len = self.sections.len().max(1);
        self.section = if forward {
            (self.section + 1) % len
        } else {
            (self.section + len - 1) % len
        };
        self.offset = 0;
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<HelpAction> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('?'), _) | (KeyCode::Char('q'), KeyModifiers::NONE) | (KeyCode::Esc, _) => {
                return Some(HelpAction::Close)
            }
            (KeyCode::Tab, _) | (KeyCode::Right, _) | (KeyCode::Char('l'), KeyModifiers::NONE) => {
                self.select_section(true)
            }
            (KeyCode::BackTab, _) | (KeyCode::Left, _) | (KeyCode::Char('h'), KeyModifiers::NONE) => {
                self.select_section(false)
            }
            (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => {
                let last = self.bindings().len().saturating_sub(1);
                self.offset = (self.offset + 1).min(last);
            }
            (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => {
                self.offset = self.offset.saturating_sub(1);
            }
            _ => {}
        }
        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let rect = centered_rect(area, 84.min(area.width.saturating_sub(2)), 24.min(area.height));
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(Span::styled(
                " Keyboard shortcuts ",
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.accent))
            .style(Style::default().bg(t.bg));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(inner);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(18), Constraint::Min(20)])
            .split(rows[0]);

        let items: Vec<ListItem> = self
            .sections
            .iter()
            .map(|(context, _)| ListItem::new(context.display()))
            .collect();
        let mut list_state = ListState::default();
        list_state.select(Some(self.section));
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::default().borders(Borders::RIGHT).border_style(Style::default().fg(t.border)))
                .style(Style::default().fg(t.fg))
                .highlight_style(Style::default().fg(t.bg).bg(t.accent)),
            panes[0],
            &mut list_state,
        );

        let table_rows = self.bindings().iter().map(|binding| {
            TableRow::new(vec![
                Cell::from(binding.key)
                    .style(Style::default().fg(t.success).add_modifier(Modifier::BOLD)),
                Cell::from(binding.description),
            ])
        });
        let mut table_state = TableState::default().with_offset(self.offset);
        frame.render_stateful_widget(
            Table::new(table_rows, [Constraint::Length(16), Constraint::Min(10)])
                .column_spacing(2)
                .style(Style::default().fg(t.fg)),
            panes[1],
            &mut table_state,
        );

        frame.render_widget(
            Paragraph::new("[Tab/←/→] section  [j/k] scroll  [?/q/Esc] close")
                .style(Style::default().fg(t.dim)),
            rows[1],
        );
    }
}
