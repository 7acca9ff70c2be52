//! Filter panel.
//!
//! Each condition is a row of three fields: column, operator and value. The
//! operator list depends on the column type. Letter commands act only while
//! the value field is not focused, so values can contain any character.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::filter;
use crate::model::{ColumnDef, ColumnType, FilterCondition, FilterOperator};
use crate::ui::components::{centered_rect, Dropdown, TextInput};
use crate::ui::theme::theme;

/// Actions returned from the filter panel.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPanelAction {
    /// Apply these (complete) conditions and close.
    Apply(Vec<FilterCondition>),
    /// Remove every condition and close.
    Clear,
    /// Write the current conditions to a file.
    Export(Vec<FilterCondition>),
    /// Ask for a conditions file to load.
    Import,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Field,
    Operator,
    Value,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Field => Focus::Operator,
            Focus::Operator => Focus::Value,
            Focus::Value => Focus::Field,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Field => Focus::Value,
            Focus::Operator => Focus::Field,
            Focus::Value => Focus::Operator,
        }
    }
}

#[derive(Debug, Clone)]
struct ConditionDraft {
    field: Dropdown,
    operator: Dropdown,
    operators: &'static [FilterOperator],
    value: TextInput,
}

/// A column as the panel sees it.
#[derive(Debug, Clone)]
struct FieldChoice {
    field: String,
    column_type: ColumnType,
}

pub struct FilterPanelView {
    fields: Vec<FieldChoice>,
    titles: Vec<String>,
    drafts: Vec<ConditionDraft>,
    selected: usize,
    focus: Focus,
}

impl FilterPanelView {
    /// Open the panel on the active conditions, or one blank condition.
    pub fn new(columns: &[ColumnDef], conditions: &[FilterCondition]) -> Self {
        let mut view = Self {
            fields: columns
                .iter()
                .map(|c| FieldChoice {
                    field: c.field.clone(),
                    column_type: c.column_type,
                })
                .collect(),
            titles: columns.iter().map(|c| c.title.clone()).collect(),
            drafts: Vec::new(),
            selected: 0,
            focus: Focus::Field,
        };
        for condition in conditions {
            view.push_draft(Some(condition));
        }
        if view.drafts.is_empty() {
            view.push_draft(None);
        }
        view
    }

    fn push_draft(&mut self, condition: Option<&FilterCondition>) {
        let mut field = Dropdown::new("Column", self.titles.clone());
        if let Some(c) = condition {
            if let Some(index) = self.fields.iter().position(|f| f.field == c.field) {
                field.select(index);
            }
        }
        let mut draft = ConditionDraft {
            field,
            operator: Dropdown::new("Operator", Vec::new()),
            operators: &[],
            value: TextInput::new().with_placeholder("value"),
        };
        self.refresh_operators(&mut draft);
        if let Some(c) = condition {
            if let Some(index) = draft.operators.iter().position(|&op| op == c.operator) {
                draft.operator.select(index);
            }
            draft.value.set_value(c.value.clone());
        }
        self.drafts.push(draft);
    }

    /// Rebuild the operator list after the column changes.
    fn refresh_operators(&self, draft: &mut ConditionDraft) {
        let column_type = self
            .fields
            .get(draft.field.selected_index())
            .map(|f| f.column_type)
            .unwrap_or_default();
        draft.operators = FilterOperator::for_column_type(column_type);
        let labels = draft
            .operators
            .iter()
            .map(|op| {
                if column_type == ColumnType::Image {
                    op.image_label().to_string()
                } else {
                    op.label().to_string()
                }
            })
            .collect();
        draft.operator.set_items(labels);
        draft.operator.select(0);
    }

    /// Conditions as currently entered, incomplete ones dropped.
    pub fn conditions(&self) -> Vec<FilterCondition> {
        let all: Vec<FilterCondition> = self
            .drafts
            .iter()
            .filter_map(|d| {
                let field = self.fields.get(d.field.selected_index())?;
                let operator = *d.operators.get(d.operator.selected_index())?;
                Some(FilterCondition::new(
                    field.field.clone(),
                    operator,
                    d.value.value().trim(),
                ))
            })
            .collect();
        filter::collect(&all)
    }

    pub fn condition_count(&self) -> usize {
        self.drafts.len()
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<FilterPanelAction> {
        if self.fields.is_empty() {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Some(FilterPanelAction::Cancel),
                _ => None,
            };
        }

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => return Some(FilterPanelAction::Cancel),
            (KeyCode::Enter, _) => return Some(FilterPanelAction::Apply(self.conditions())),
            (KeyCode::Tab, _) => {
                self.focus = self.focus.next();
                return None;
            }
            (KeyCode::BackTab, _) => {
                self.focus = self.focus.prev();
                return None;
            }
            (KeyCode::Down, _) => {
                self.selected = (self.selected + 1).min(self.drafts.len().saturating_sub(1));
                return None;
            }
            (KeyCode::Up, _) => {
                self.selected = self.selected.saturating_sub(1);
                return None;
            }
            _ => {}
        }

        if self.focus == Focus::Value {
            if let Some(draft) = self.drafts.get_mut(self.selected) {
                draft.value.handle_input(key);
            }
            return None;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('q'), KeyModifiers::NONE) => Some(FilterPanelAction::Cancel),
            (KeyCode::Char('j'), KeyModifiers::NONE) => {
                self.selected = (self.selected + 1).min(self.drafts.len().saturating_sub(1));
                None
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            (KeyCode::Char('a'), KeyModifiers::NONE) => {
                self.push_draft(None);
                self.selected = self.drafts.len() - 1;
                self.focus = Focus::Field;
                None
            }
            (KeyCode::Char('d'), KeyModifiers::NONE) => {
                if self.selected < self.drafts.len() {
                    self.drafts.remove(self.selected);
                }
                if self.drafts.is_empty() {
                    self.push_draft(None);
                }
                self.selected = self.selected.min(self.drafts.len() - 1);
                None
            }
            (KeyCode::Char('c'), KeyModifiers::NONE) => Some(FilterPanelAction::Clear),
            (KeyCode::Char('x'), KeyModifiers::NONE) => Some(FilterPanelAction::Export(self.conditions())),
            (KeyCode::Char('o'), KeyModifiers::NONE) => Some(FilterPanelAction::Import),
            _ => {
                self.cycle_dropdown(key);
                None
            }
        }
    }

    /// Left/Right (h/l) step the focused dropdown.
    fn cycle_dropdown(&mut self, key: KeyEvent) {
        let focus = self.focus;
        let Some(mut draft) = self.drafts.get(self.selected).cloned() else {
            return;
        };
        match focus {
            Focus::Field => {
                if draft.field.handle_input(key).is_some() {
                    self.refresh_operators(&mut draft);
                }
            }
            Focus::Operator => {
                draft.operator.handle_input(key);
            }
            Focus::Value => return,
        }
        // Enter is handled above, so the dropdowns never stay expanded.
        self.drafts[self.selected] = draft;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let height = (self.drafts.len() as u16 * 3 + 5).min(area.height.saturating_sub(2));
        let rect = centered_rect(area, 90.min(area.width.saturating_sub(4)), height);
        frame.render_widget(Clear, rect);
        let active = self.conditions().len();
        let block = Block::default()
            .title(Span::styled(
                format!(" Filter ({} active) ", active),
                Style::default().fg(t.accent),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border_focused))
            .style(Style::default().bg(t.bg));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        if self.fields.is_empty() {
            frame.render_widget(
                Paragraph::new("No columns to filter on.").style(Style::default().fg(t.dim)),
                inner,
            );
            return;
        }

        let visible = (inner.height.saturating_sub(1) / 3).max(1) as usize;
        let first = self.selected.saturating_sub(visible - 1);
        for (slot, (index, draft)) in self
            .drafts
            .iter()
            .enumerate()
            .skip(first)
            .take(visible)
            .enumerate()
        {
            let row = Rect::new(inner.x, inner.y + slot as u16 * 3, inner.width, 3);
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(2),
                    Constraint::Percentage(32),
                    Constraint::Percentage(30),
                    Constraint::Min(10),
                ])
                .split(row);
            let current = index == self.selected;
            let marker = if current { "▸" } else { " " };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(marker, Style::default().fg(t.accent)))),
                Rect::new(chunks[0].x, chunks[0].y + 1, 1, 1),
            );
            draft.field.render(frame, chunks[1], current && self.focus == Focus::Field);
            draft.operator.render(frame, chunks[2], current && self.focus == Focus::Operator);
            let needs_value = draft
                .operators
                .get(draft.operator.selected_index())
                .is_some_and(FilterOperator::needs_value);
            let label = if needs_value { "Value" } else { "Value (unused)" };
            draft
                .value
                .render(frame, chunks[3], label, current && self.focus == Focus::Value);
        }

        let footer = Rect::new(inner.x, inner.y + inner.height.saturating_sub(1), inner.width, 1);
        frame.render_widget(
            Paragraph::new(format!(
                "{} condition(s)  ←/→ change  Tab next field",
                self.drafts.len()
            ))
            .style(Style::default().fg(t.dim)),
            footer,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::default_columns;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn field_index(columns: &[ColumnDef], field: &str) -> usize {
        columns.iter().position(|c| c.field == field).unwrap()
    }

    #[test]
    fn test_blank_panel_applies_nothing() {
        let view = FilterPanelView::new(&default_columns(), &[]);
        assert_eq!(view.condition_count(), 1);
        // A blank value with a comparing operator is incomplete.
        assert!(view.conditions().is_empty());
    }

    #[test]
    fn test_loads_existing_conditions() {
        let columns = default_columns();
        let existing = vec![
            FilterCondition::new("name", FilterOperator::Contains, "ali"),
            FilterCondition::new("avatar", FilterOperator::IsNotEmpty, ""),
        ];
        let mut view = FilterPanelView::new(&columns, &existing);
        assert_eq!(view.conditions(), existing);
        assert_eq!(
            view.handle_input(key(KeyCode::Enter)),
            Some(FilterPanelAction::Apply(existing))
        );
    }

    #[test]
    fn test_typing_a_value() {
        let columns = default_columns();
        let mut view = FilterPanelView::new(&columns, &[]);
        view.handle_input(key(KeyCode::Tab));
        view.handle_input(key(KeyCode::Tab));
        for c in "qa".chars() {
            view.handle_input(key(KeyCode::Char(c)));
        }
        let conditions = view.conditions();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].value, "qa");
        assert_eq!(conditions[0].field, columns[0].field);
    }

    #[test]
    fn test_changing_column_resets_operators() {
        let columns = default_columns();
        let avatar = field_index(&columns, "avatar");
        let mut view = FilterPanelView::new(&columns, &[]);
        for _ in 0..avatar {
            view.handle_input(key(KeyCode::Right));
        }
        assert_eq!(view.drafts[0].operators, &[FilterOperator::IsEmpty, FilterOperator::IsNotEmpty]);
        // An emptiness check needs no value.
        assert_eq!(view.conditions().len(), 1);
        assert_eq!(view.conditions()[0].operator, FilterOperator::IsEmpty);
    }

    #[test]
    fn test_add_and_remove_conditions() {
        let mut view = FilterPanelView::new(&default_columns(), &[]);
        view.handle_input(key(KeyCode::Char('a')));
        view.handle_input(key(KeyCode::Char('a')));
        assert_eq!(view.condition_count(), 3);
        assert_eq!(view.selected, 2);
        view.handle_input(key(KeyCode::Char('d')));
        view.handle_input(key(KeyCode::Char('d')));
        view.handle_input(key(KeyCode::Char('d')));
        assert_eq!(view.condition_count(), 1);
    }

    #[test]
    fn test_commands_are_text_in_value_field() {
        let mut view = FilterPanelView::new(&default_columns(), &[]);
        assert_eq!(view.handle_input(key(KeyCode::Char('c'))), Some(FilterPanelAction::Clear));
        view.handle_input(key(KeyCode::BackTab));
        assert_eq!(view.handle_input(key(KeyCode::Char('c'))), None);
        assert_eq!(view.handle_input(key(KeyCode::Char('q'))), None);
        assert_eq!(view.drafts[0].value.value(), "cq");
        assert_eq!(view.handle_input(key(KeyCode::Esc)), Some(FilterPanelAction::Cancel));
    }

    #[test]
    fn test_export_and_import_keys() {
        let mut view = FilterPanelView::new(&default_columns(), &[]);
        assert_eq!(view.handle_input(key(KeyCode::Char('x'))), Some(FilterPanelAction::Export(vec![])));
        assert_eq!(view.handle_input(key(KeyCode::Char('o'))), Some(FilterPanelAction::Import));
    }
}
