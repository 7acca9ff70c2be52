//! The table grid.
//!
//! The grid is redrawn from the table on every frame. It owns only view
//! state: the cursor, the scroll offsets and an in-progress cell edit. Keys
//! that change data come back to the app as [`GridAction`]s.

use std::collections::{HashMap, HashSet};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::group::{GroupLine, Grouping};
use crate::imaging;
use crate::model::{ColumnDef, ColumnType, Row};
use crate::table::Table;
use crate::ui::components::{Dropdown, DropdownAction, TextInput};
use crate::ui::theme::{tag_style, theme};

/// Columns resize in steps of this many pixels.
pub const RESIZE_STEP: i32 = 20;

const MARKER_WIDTH: u16 = 2;
const EMPTY_OPTION: &str = "(empty)";

/// Requests from the grid to the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridAction {
    /// Enter on the cursor line: edit the cell or toggle the group.
    Activate,
    ToggleSelect,
    RangeSelect,
    SelectAll,
    ClearSelection,
    Sort,
    Resize(i32),
    OpenMenu,
    AddRow,
    AddColumn,
    DeleteSelected,
    Import,
    Export,
    OpenFilter,
    OpenGroup,
    ClearData,
    Info,
    Help,
    Save,
    Quit,
    /// A cell edit was confirmed.
    Commit {
        row: usize,
        field: String,
        value: String,
    },
    CancelEdit,
}

#[derive(Debug, Clone)]
enum Editor {
    Text(TextInput),
    Select(Dropdown),
}

#[derive(Debug, Clone)]
struct CellEdit {
    row: usize,
    field: String,
    title: String,
    editor: Editor,
}

/// What the grid draws.
pub struct GridData<'a> {
    pub table: &'a Table,
    pub lines: &'a [GroupLine],
    pub grouping: Option<&'a Grouping>,
}

/// Grid view state.
#[derive(Debug)]
pub struct TableView {
    cursor: usize,
    column: usize,
    row_offset: usize,
    col_offset: usize,
    page_size: usize,
    vim_mode: bool,
    edit: Option<CellEdit>,
    cursor_rect: Rect,
    /// Decoded image sizes by (row id, field), tagged with the data length.
    image_sizes: HashMap<(Option<u64>, String), (usize, Option<(u32, u32)>)>,
}

impl TableView {
    pub fn new(vim_mode: bool) -> Self {
        Self {
            cursor: 0,
            column: 0,
            row_offset: 0,
            col_offset: 0,
            page_size: 10,
            vim_mode,
            edit: None,
            cursor_rect: Rect::default(),
            image_sizes: HashMap::new(),
        }
    }

    /// Index of the cursor line.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index of the cursor column.
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn set_cursor(&mut self, line: usize, column: usize) {
        self.cursor = line;
        self.column = column;
    }

    /// Keep the cursor inside the grid after rows or columns change.
    pub fn clamp(&mut self, lines: usize, columns: usize) {
        self.cursor = self.cursor.min(lines.saturating_sub(1));
        self.column = self.column.min(columns.saturating_sub(1));
    }

    /// Screen position of the cursor cell from the last draw.
    pub fn cursor_rect(&self) -> Rect {
        self.cursor_rect
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    pub fn start_text_edit(&mut self, row: usize, column: &ColumnDef, current: &str) {
        self.edit = Some(CellEdit {
            row,
            field: column.field.clone(),
            title: column.title.clone(),
            editor: Editor::Text(TextInput::with_value(current)),
        });
    }

    /// Edit a select cell with a dropdown of its options plus an empty entry.
    pub fn start_select_edit(&mut self, row: usize, column: &ColumnDef, current: &str) {
        let mut items = vec![EMPTY_OPTION.to_string()];
        items.extend(column.options.iter().cloned());
        let mut dropdown = Dropdown::new(column.title.clone(), items);
        dropdown.select_value(current);
        dropdown.expand();
        self.edit = Some(CellEdit {
            row,
            field: column.field.clone(),
            title: column.title.clone(),
            editor: Editor::Select(dropdown),
        });
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    pub fn handle_input(&mut self, key: KeyEvent, lines: usize, columns: usize) -> Option<GridAction> {
        if self.edit.is_some() {
            return self.handle_edit_input(key);
        }
        let last_line = lines.saturating_sub(1);
        let last_column = columns.saturating_sub(1);
        let vim = self.vim_mode;

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), KeyModifiers::NONE) => {
                Some(GridAction::Quit)
            }
            (KeyCode::Char('s'), KeyModifiers::CONTROL) => Some(GridAction::Save),
            (KeyCode::Char('a'), KeyModifiers::CONTROL) => Some(GridAction::SelectAll),
            (KeyCode::Char('n'), KeyModifiers::CONTROL) => Some(GridAction::AddRow),
            (KeyCode::Char('f'), KeyModifiers::CONTROL) => Some(GridAction::OpenFilter),
            (KeyCode::Char('g'), KeyModifiers::CONTROL) => Some(GridAction::OpenGroup),
            (KeyCode::Char('d'), KeyModifiers::CONTROL) | (KeyCode::PageDown, _) => {
                self.cursor = (self.cursor + self.page_size).min(last_line);
                None
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) | (KeyCode::PageUp, _) => {
                self.cursor = self.cursor.saturating_sub(self.page_size);
                None
            }
            (KeyCode::Down, _) => {
                self.cursor = (self.cursor + 1).min(last_line);
                None
            }
            (KeyCode::Char('j'), KeyModifiers::NONE) if vim => {
                self.cursor = (self.cursor + 1).min(last_line);
                None
            }
            (KeyCode::Up, _) => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) if vim => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            }
            (KeyCode::Right, _) | (KeyCode::Tab, _) => {
                self.column = (self.column + 1).min(last_column);
                None
            }
            (KeyCode::Char('l'), KeyModifiers::NONE) if vim => {
                self.column = (self.column + 1).min(last_column);
                None
            }
            (KeyCode::Left, _) | (KeyCode::BackTab, _) => {
                self.column = self.column.saturating_sub(1);
                None
            }
            (KeyCode::Char('h'), KeyModifiers::NONE) if vim => {
                self.column = self.column.saturating_sub(1);
                None
            }
            (KeyCode::Home, _) => {
                self.cursor = 0;
                None
            }
            (KeyCode::End, _) | (KeyCode::Char('G'), _) => {
                self.cursor = last_line;
                None
            }
            (KeyCode::Enter, _) => Some(GridAction::Activate),
            (KeyCode::Char(' '), _) => Some(GridAction::ToggleSelect),
            (KeyCode::Char('V'), _) => Some(GridAction::RangeSelect),
            (KeyCode::Esc, _) => Some(GridAction::ClearSelection),
            (KeyCode::Char('s'), KeyModifiers::NONE) => Some(GridAction::Sort),
            (KeyCode::Char('<'), _) => Some(GridAction::Resize(-RESIZE_STEP)),
            (KeyCode::Char('>'), _) => Some(GridAction::Resize(RESIZE_STEP)),
            (KeyCode::Char('m'), KeyModifiers::NONE) => Some(GridAction::OpenMenu),
            (KeyCode::Char('a'), KeyModifiers::NONE) => Some(GridAction::AddRow),
            (KeyCode::Char('C'), _) => Some(GridAction::AddColumn),
            (KeyCode::Char('D'), _) => Some(GridAction::DeleteSelected),
            (KeyCode::Char('i'), KeyModifiers::NONE) => Some(GridAction::Import),
            (KeyCode::Char('e'), KeyModifiers::NONE) => Some(GridAction::Export),
            (KeyCode::Char('f'), KeyModifiers::NONE) => Some(GridAction::OpenFilter),
            (KeyCode::Char('g'), KeyModifiers::NONE) => Some(GridAction::OpenGroup),
            (KeyCode::Char('X'), _) => Some(GridAction::ClearData),
            (KeyCode::Char('I'), _) => Some(GridAction::Info),
            (KeyCode::Char('?'), _) => Some(GridAction::Help),
            _ => None,
        }
    }

    fn handle_edit_input(&mut self, key: KeyEvent) -> Option<GridAction> {
        enum Outcome {
            Commit(String),
            Cancel,
            Continue,
        }

        let edit = self.edit.as_mut()?;
        let outcome = match &mut edit.editor {
            Editor::Text(input) => match key.code {
                KeyCode::Enter => Outcome::Commit(input.value().to_string()),
                KeyCode::Esc => Outcome::Cancel,
                _ => {
                    input.handle_input(key);
                    Outcome::Continue
                }
            },
            Editor::Select(dropdown) => match dropdown.handle_input(key) {
                Some(DropdownAction::Select(index)) if !dropdown.is_expanded() => {
                    if index == 0 {
                        Outcome::Commit(String::new())
                    } else {
                        Outcome::Commit(dropdown.items().get(index).cloned().unwrap_or_default())
                    }
                }
                Some(DropdownAction::Cancel) => Outcome::Cancel,
                _ => {
                    dropdown.expand();
                    Outcome::Continue
                }
            },
        };

        match outcome {
            Outcome::Continue => None,
            Outcome::Cancel => {
                self.edit = None;
                Some(GridAction::CancelEdit)
            }
            Outcome::Commit(value) => {
                let edit = self.edit.take()?;
                Some(GridAction::Commit {
                    row: edit.row,
                    field: edit.field,
                    value,
                })
            }
        }
    }

    /// Widths of the given columns in terminal cells.
    fn widths(columns: &[ColumnDef]) -> Vec<u16> {
        columns.iter().map(ColumnDef::char_width).collect()
    }

    /// Scroll so the cursor line and column are on screen.
    fn scroll_into_view(&mut self, body_height: usize, widths: &[u16], available: u16) {
        if self.cursor < self.row_offset {
            self.row_offset = self.cursor;
        } else if body_height > 0 && self.cursor >= self.row_offset + body_height {
            self.row_offset = self.cursor + 1 - body_height;
        }

        if self.column < self.col_offset {
            self.col_offset = self.column;
        }
        while self.col_offset < self.column {
            let used: u16 = widths[self.col_offset..=self.column.min(widths.len() - 1)]
                .iter()
                .sum();
            if used <= available {
                break;
            }
            self.col_offset += 1;
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, data: &GridData) {
        let t = theme();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border))
            .title(Span::styled(" LazyTable ", Style::default().fg(t.accent).add_modifier(Modifier::BOLD)));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let columns = data.table.columns();
        if columns.is_empty() || data.lines.is_empty() {
            let message = if columns.is_empty() {
                "No columns. Press C to add one."
            } else if data.table.is_empty() {
                "No rows. Press a to add one or i to import a CSV file."
            } else {
                "No rows match the current filters."
            };
            let paragraph = Paragraph::new(message)
                .style(Style::default().fg(t.dim))
                .alignment(Alignment::Center);
            let y = inner.y + inner.height / 2;
            frame.render_widget(paragraph, Rect::new(inner.x, y, inner.width, 1).intersection(inner));
            self.cursor_rect = Rect::new(inner.x, inner.y, 0, 1);
            return;
        }

        let widths = Self::widths(columns);
        let available = inner.width.saturating_sub(MARKER_WIDTH);
        let body_height = inner.height.saturating_sub(1) as usize;
        self.page_size = body_height.max(1);
        self.clamp(data.lines.len(), columns.len());
        self.scroll_into_view(body_height, &widths, available);

        // Columns that fit from the horizontal offset.
        let mut visible = Vec::new();
        let mut used = 0u16;
        for (i, &w) in widths.iter().enumerate().skip(self.col_offset) {
            if used + w > available && !visible.is_empty() {
                break;
            }
            visible.push(i);
            used += w;
        }

        let mut lines = Vec::with_capacity(body_height + 1);
        lines.push(self.header_line(columns, &visible, &widths, data.table));

        let end = (self.row_offset + body_height).min(data.lines.len());
        for (line_index, line) in data.lines[self.row_offset..end].iter().enumerate() {
            let line_index = self.row_offset + line_index;
            let is_cursor = line_index == self.cursor;
            let rendered = match *line {
                GroupLine::Header(g) => group_header_line(data.grouping, columns, g, is_cursor, inner.width),
                GroupLine::Row(row) => self.row_line(data.table, row, &visible, &widths, is_cursor),
            };
            lines.push(rendered);
        }
        frame.render_widget(Paragraph::new(lines), inner);

        let x_offset: u16 = visible
            .iter()
            .take_while(|&&c| c != self.column)
            .map(|&c| widths[c])
            .sum();
        self.cursor_rect = Rect::new(
            inner.x + MARKER_WIDTH + x_offset,
            inner.y + 1 + (self.cursor - self.row_offset) as u16,
            widths.get(self.column).copied().unwrap_or(1),
            1,
        )
        .intersection(inner);

        self.render_editor(frame, area);
    }

    fn header_line(&self, columns: &[ColumnDef], visible: &[usize], widths: &[u16], table: &Table) -> Line<'static> {
        let t = theme();
        let base = Style::default().bg(t.header_bg).fg(t.fg).add_modifier(Modifier::BOLD);
        let mut spans = vec![Span::styled(" ".repeat(MARKER_WIDTH as usize), base)];
        for &c in visible {
            let column = &columns[c];
            let mut title = column.title.clone();
            if let Some(direction) = table.sort_direction(&column.field) {
                title.push(' ');
                title.push_str(direction.arrow());
            }
            let style = if c == self.column { base.fg(t.accent) } else { base };
            spans.push(Span::styled(fit(&title, widths[c]), style));
        }
        Line::from(spans)
    }

    fn row_line(&mut self, table: &Table, index: usize, visible: &[usize], widths: &[u16], is_cursor: bool) -> Line<'static> {
        let t = theme();
        let selected = table.is_selected(index);
        let mut base = Style::default().fg(t.fg);
        if selected {
            base = base.bg(t.selection_bg);
        }
        let Some(row) = table.row(index) else {
            return Line::raw("");
        };
        let columns = table.columns();
        let marker = if selected { "● " } else { "  " };
        let mut spans = vec![Span::styled(marker.to_string(), base.fg(t.accent))];

        for &c in visible {
            let column = &columns[c];
            let width = widths[c];
            let mut style = base;
            if is_cursor && c == self.column {
                style = style.bg(t.cursor_bg).add_modifier(Modifier::BOLD);
            } else if is_cursor {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            spans.extend(self.cell_spans(row, column, width, style));
        }
        Line::from(spans)
    }

    fn cell_spans(&mut self, row: &Row, column: &ColumnDef, width: u16, style: Style) -> Vec<Span<'static>> {
        let t = theme();
        let text = row.display(&column.field);
        match column.column_type {
            ColumnType::Select if !text.is_empty() => {
                let tag = fit_tag(&text, width);
                let pad = (width as usize).saturating_sub(tag.chars().count());
                vec![
                    Span::styled(tag, tag_style(&text)),
                    Span::styled(" ".repeat(pad), style),
                ]
            }
            ColumnType::Image => {
                let label = if row.get(&column.field).is_some_and(|v| v.is_image()) {
                    match self.image_size(row, &column.field, &text) {
                        Some((w, h)) => format!("[img {}x{}]", w, h),
                        None => "[img ?]".to_string(),
                    }
                } else {
                    "upload".to_string()
                };
                let fg = if text.is_empty() { t.dim } else { t.accent };
                vec![Span::styled(fit(&label, width), style.fg(fg))]
            }
            _ => vec![Span::styled(fit(&text, width), style)],
        }
    }

    /// Drop cached image sizes of rows and columns that no longer exist.
    pub fn forget_removed(&mut self, rows: &[Row], columns: &[ColumnDef]) {
        if self.image_sizes.is_empty() {
            return;
        }
        let ids: HashSet<Option<u64>> = rows.iter().map(Row::id).collect();
        self.image_sizes
            .retain(|(id, field), _| ids.contains(id) && columns.iter().any(|c| c.field == *field));
    }

    fn image_size(&mut self, row: &Row, field: &str, data_uri: &str) -> Option<(u32, u32)> {
        let key = (row.id(), field.to_string());
        if let Some((len, size)) = self.image_sizes.get(&key) {
            if *len == data_uri.len() {
                return *size;
            }
        }
        let size = imaging::inspect(data_uri).ok().map(|info| (info.width, info.height));
        self.image_sizes.insert(key, (data_uri.len(), size));
        size
    }

    fn render_editor(&self, frame: &mut Frame, screen: Rect) {
        let Some(edit) = &self.edit else {
            return;
        };
        let cell = self.cursor_rect;
        let width = (cell.width + 2).max(30);
        let x = cell.x.saturating_sub(1).min((screen.x + screen.width).saturating_sub(width));
        let y = cell.y.saturating_sub(1);
        let rect = Rect::new(x, y, width, 3).intersection(screen);
        frame.render_widget(Clear, rect);
        match &edit.editor {
            Editor::Text(input) => input.render(frame, rect, &edit.title, true),
            Editor::Select(dropdown) => {
                dropdown.render(frame, rect, true);
                dropdown.render_list(frame, rect, screen);
            }
        }
    }
}

fn group_header_line(grouping: Option<&Grouping>, columns: &[ColumnDef], index: usize, is_cursor: bool, width: u16) -> Line<'static> {
    let t = theme();
    let Some(grouping) = grouping else {
        return Line::raw("");
    };
    let Some(group) = grouping.groups.get(index) else {
        return Line::raw("");
    };
    let title = columns
        .iter()
        .find(|c| c.field == grouping.config.field)
        .map_or(grouping.config.field.as_str(), |c| c.title.as_str());
    let arrow = if group.expanded { "▼" } else { "▶" };
    let text = format!(
        "{} {}: {} ({} records)",
        arrow,
        title,
        group.key,
        group.rows.len()
    );
    let mut style = Style::default().fg(t.group_fg).add_modifier(Modifier::BOLD);
    if is_cursor {
        style = style.bg(t.cursor_bg);
    }
    Line::from(Span::styled(fit(&text, width), style))
}

/// Truncate or pad to exactly `width` cells, keeping one trailing space as
/// the column gap.
fn fit(text: &str, width: u16) -> String {
    let width = width as usize;
    if width == 0 {
        return String::new();
    }
    let room = width - 1;
    let count = text.chars().count();
    let mut out: String = if count > room {
        let mut s: String = text.chars().take(room.saturating_sub(1)).collect();
        s.push('…');
        s
    } else {
        text.to_string()
    };
    let len = out.chars().count();
    out.push_str(&" ".repeat(width - len));
    out
}

/// A select value as ` value `, cut to leave the column gap.
fn fit_tag(text: &str, width: u16) -> String {
    let room = (width as usize).saturating_sub(3);
    let count = text.chars().count();
    let inner: String = if count > room {
        let mut s: String = text.chars().take(room.saturating_sub(1)).collect();
        s.push('…');
        s
    } else {
        text.to_string()
    };
    format!(" {} ", inner)
}
