//! Main application state and event handling.
//!
//! This module implements The Elm Architecture (TEA): [`App`] is the model,
//! [`App::update`] applies events and [`App::view`] draws the current state.
//! Every mutation of the table goes through here, followed by a refresh of
//! the filtered and grouped view and, with autosave on, a save.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::csv;
use crate::error::AppError;
use crate::events::{Event, KeyContext};
use crate::export::{self, ExportFile};
use crate::filter;
use crate::group::{GroupLine, Grouping};
use crate::imaging;
use crate::logging;
use crate::model::{AppStateSnapshot, ColumnType, FilterCondition, GroupConfig, Row};
use crate::storage::{resolve_table, StorageManager};
use crate::table::{default_columns, Table};
use crate::tasks::{self, TaskMessage, TaskSpawner};
use crate::ui::components::{
    confirm_dialog, render_context_help, ChoiceAction, ChoiceDialog, ContextMenu,
    ContextMenuAction, ErrorDialog, MenuAction, MenuTarget, PromptAction, PromptDialog, Toasts,
};
use crate::ui::theme::theme;
use crate::ui::views::{
    AddColumnAction, AddColumnView, DataInfo, ExportAction, ExportKind, ExportView,
    FilterPanelAction, FilterPanelView, GridAction, GridData, GroupPanelAction, GroupPanelView,
    HelpAction, HelpView, ImportAction, ImportView, InfoAction, InfoView, TableView,
};

/// What a confirmation dialog is confirming.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfirmPurpose {
    DeleteRow(usize),
    DeleteSelected,
    ResetStorage,
    QuitUnsaved,
}

/// Choices of the clear-data dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClearChoice {
    RowsOnly,
    Everything,
    Cancel,
}

/// What a path prompt is for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptPurpose {
    UploadImage { row_id: u64, field: String },
    ImportFilters,
}

/// The surface on top of the grid that receives keys.
enum Overlay {
    None,
    Menu,
    Filter(FilterPanelView),
    Group(GroupPanelView),
    Help(HelpView),
    AddColumn(AddColumnView),
    Import(ImportView),
    Export(ExportView),
    Info(InfoView),
    Confirm(ConfirmPurpose, ChoiceDialog<bool>),
    ClearData(ChoiceDialog<ClearChoice>),
    Prompt(PromptPurpose, PromptDialog),
}

/// The main application struct that holds all state.
pub struct App {
    config: Config,
    storage: StorageManager,
    spawner: Option<TaskSpawner>,
    table: Table,
    filters: Vec<FilterCondition>,
    /// Indices of the rows that pass the filter.
    visible: Vec<usize>,
    grouping: Option<Grouping>,
    /// Lines of the grid: rows, or group headers and rows.
    lines: Vec<GroupLine>,
    grid: TableView,
    menu: ContextMenu,
    overlay: Overlay,
    toasts: Toasts,
    error_dialog: ErrorDialog,
    export_dir: PathBuf,
    last_saved: Option<DateTime<Local>>,
    /// Unsaved changes, tracked when autosave is off.
    dirty: bool,
    should_quit: bool,
}

impl App {
    /// Load the saved table and view state, or start from sample data.
    pub fn new(config: Config, storage: StorageManager) -> Self {
        let (table, fresh) = match resolve_table(storage.load_table(), default_columns) {
            Some((columns, rows)) => (Table::new(columns, rows), false),
            None => {
                let mut table = Table::with_defaults();
                table.generate_sample_rows(config.sample_rows);
                info!(rows = table.len(), "No saved table, generated sample data");
                (table, true)
            }
        };
        let state = storage.load_app_state().unwrap_or_default();
        debug!(
            rows = table.len(),
            filters = state.filters.len(),
            grouped = state.group.is_some(),
            "Creating application"
        );

        let mut app = Self {
            grid: TableView::new(config.vim_mode),
            config,
            storage,
            spawner: None,
            table,
            filters: filter::collect(&state.filters),
            visible: Vec::new(),
            grouping: None,
            lines: Vec::new(),
            menu: ContextMenu::new(),
            overlay: Overlay::None,
            toasts: Toasts::new(),
            error_dialog: ErrorDialog::new(),
            export_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            last_saved: None,
            dirty: false,
            should_quit: false,
        };
        if let Some(group) = state.group {
            if app.table.column(&group.field).is_some() {
                app.grouping = Some(Grouping::build(app.table.rows(), &[], group));
            }
        }
        app.refresh_view();
        if fresh && app.config.autosave {
            app.save_table();
        }
        app
    }

    /// Run file reads and image work in the background.
    pub fn with_spawner(mut self, spawner: TaskSpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Directory that exports are written to.
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn filters(&self) -> &[FilterCondition] {
        &self.filters
    }

    pub fn grouping(&self) -> Option<&Grouping> {
        self.grouping.as_ref()
    }

    /// Indices of the rows that pass the filter, in table order.
    pub fn visible_rows(&self) -> &[usize] {
        &self.visible
    }

    pub fn lines(&self) -> &[GroupLine] {
        &self.lines
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn is_error_dialog_visible(&self) -> bool {
        self.error_dialog.is_visible()
    }

    /// Show an error: critical ones in a dialog, the rest as a toast.
    pub fn handle_error(&mut self, error: &AppError) {
        if error.is_critical() {
            warn!(error = %error, "Critical error occurred");
            self.error_dialog.show(error);
        } else {
            warn!(error = %error, "Operation failed");
            self.toasts.error(error.user_message());
        }
    }

    // ========================================================================
    // View state
    // ========================================================================

    /// Recompute the filtered rows and the grid lines after any change.
    fn refresh_view(&mut self) {
        let before = self.filters.len();
        let table = &self.table;
        self.filters.retain(|c| table.column(&c.field).is_some());
        if self.filters.len() != before {
            warn!(dropped = before - self.filters.len(), "Dropped filters on removed columns");
        }
        if let Some(grouping) = &self.grouping {
            if self.table.column(&grouping.config.field).is_none() {
                warn!(field = %grouping.config.field, "Grouping column is gone, ungrouping");
                self.grouping = None;
            }
        }

        self.visible = filter::apply(self.table.rows(), self.table.columns(), &self.filters);
        self.table.retain_selection(&self.visible);
        self.lines = match &mut self.grouping {
            Some(grouping) => {
                grouping.rebuild(self.table.rows(), &self.visible);
                grouping.flatten()
            }
            None => self.visible.iter().map(|&i| GroupLine::Row(i)).collect(),
        };
        self.grid.clamp(self.lines.len(), self.table.columns().len());
        self.grid.forget_removed(self.table.rows(), self.table.columns());
    }

    /// The table changed: refresh and persist.
    fn changed(&mut self) {
        self.refresh_view();
        if self.config.autosave {
            self.save_table();
        } else {
            self.dirty = true;
        }
    }

    fn save_table(&mut self) -> bool {
        match self.storage.save_table(&self.table.snapshot()) {
            Ok(()) => {
                self.last_saved = Some(Local::now());
                self.dirty = false;
                true
            }
            Err(e) => {
                self.handle_error(&e.into());
                false
            }
        }
    }

    fn save_state(&mut self) -> bool {
        let state = AppStateSnapshot::now(
            self.filters.clone(),
            self.grouping.as_ref().map(|g| g.config.clone()),
        );
        match self.storage.save_app_state(&state) {
            Ok(()) => true,
            Err(e) => {
                self.handle_error(&e.into());
                false
            }
        }
    }

    /// Row index under the cursor, if the cursor is on a row.
    fn current_row(&self) -> Option<usize> {
        match self.lines.get(self.grid.cursor()) {
            Some(GroupLine::Row(index)) => Some(*index),
            _ => None,
        }
    }

    fn current_field(&self) -> Option<String> {
        self.table
            .columns()
            .get(self.grid.column())
            .map(|c| c.field.clone())
    }

    /// Put the cursor on a row if it is visible.
    fn focus_row(&mut self, index: usize) {
        if let Some(line) = self.lines.iter().position(|l| *l == GroupLine::Row(index)) {
            self.grid.set_cursor(line, self.grid.column());
        } else {
            self.toasts.info("The row is hidden by the current filter");
        }
    }

    fn key_context(&self) -> KeyContext {
        match &self.overlay {
            Overlay::None if self.grid.is_editing() => KeyContext::Editing,
            Overlay::None => KeyContext::Grid,
            Overlay::Menu => KeyContext::ContextMenu,
            Overlay::Filter(_) => KeyContext::FilterPanel,
            Overlay::Group(_) => KeyContext::GroupPanel,
            Overlay::Help(_) => KeyContext::Help,
            _ => KeyContext::Dialog,
        }
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Update the application state based on an event.
    pub fn update(&mut self, event: Event) {
        match event {
            Event::Quit => {
                info!("Quit event received");
                self.should_quit = true;
            }
            Event::Key(key) => {
                trace!(key = ?key.code, modifiers = ?key.modifiers, "Key event");
                self.handle_key_event(key);
            }
            Event::Resize(width, height) => {
                trace!(width, height, "Terminal resize event");
            }
            Event::Tick => self.toasts.tick(),
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        // The error dialog blocks all other input.
        if self.error_dialog.is_visible() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_dialog.dismiss();
            }
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            self.quit(true);
            return;
        }

        let overlay = std::mem::replace(&mut self.overlay, Overlay::None);
        if matches!(overlay, Overlay::None) {
            if let Some(action) = self
                .grid
                .handle_input(key, self.lines.len(), self.table.columns().len())
            {
                self.handle_grid_action(action);
            }
        } else {
            let next = self.handle_overlay_key(overlay, key);
            // An action may already have opened another surface.
            if matches!(self.overlay, Overlay::None) {
                self.overlay = next;
            }
        }
    }

    fn handle_grid_action(&mut self, action: GridAction) {
        match action {
            GridAction::Activate => self.activate(),
            GridAction::Commit { row, field, value } => {
                match self.table.set_cell(row, &field, &value) {
                    Ok(()) => self.changed(),
                    Err(e) => self.handle_error(&e.into()),
                }
            }
            GridAction::CancelEdit => {}
            GridAction::ToggleSelect => {
                if let Some(row) = self.current_row() {
                    self.table.toggle_row(row);
                }
            }
            GridAction::RangeSelect => {
                if let Some(row) = self.current_row() {
                    let order: Vec<usize> = self
                        .lines
                        .iter()
                        .filter_map(|line| match line {
                            GroupLine::Row(index) => Some(*index),
                            GroupLine::Header(_) => None,
                        })
                        .collect();
                    self.table.select_range(row, &order);
                }
            }
            GridAction::SelectAll => self.table.select_all(&self.visible),
            GridAction::ClearSelection => self.table.clear_selection(),
            GridAction::Sort => self.sort_current_column(),
            GridAction::Resize(delta) => {
                if let Some(field) = self.current_field() {
                    match self.table.resize_column(&field, delta) {
                        Ok(_) => self.changed(),
                        Err(e) => self.handle_error(&e.into()),
                    }
                }
            }
            GridAction::OpenMenu => self.open_menu(),
            GridAction::AddRow => {
                let index = self.table.add_row();
                self.changed();
                self.focus_row(index);
                self.toasts.success("Row added");
            }
            GridAction::AddColumn => self.overlay = Overlay::AddColumn(AddColumnView::new()),
            GridAction::DeleteSelected => {
                let count = self.table.selected_count();
                if count == 0 {
                    self.toasts.warning("No rows selected");
                } else {
                    self.overlay = Overlay::Confirm(
                        ConfirmPurpose::DeleteSelected,
                        confirm_dialog("Delete rows", format!("Delete {} selected rows?", count)),
                    );
                }
            }
            GridAction::Import => self.overlay = Overlay::Import(ImportView::new(&self.config.csv)),
            GridAction::Export => {
                self.overlay = Overlay::Export(ExportView::new(self.export_dir.clone()))
            }
            GridAction::OpenFilter => {
                self.overlay =
                    Overlay::Filter(FilterPanelView::new(self.table.columns(), &self.filters))
            }
            GridAction::OpenGroup => {
                self.overlay = Overlay::Group(GroupPanelView::new(
                    self.table.columns(),
                    self.grouping.as_ref().map(|g| &g.config),
                ))
            }
            GridAction::ClearData => {
                self.overlay = Overlay::ClearData(ChoiceDialog::new(
                    "Clear data",
                    "Clear all rows, or reset columns and data to the defaults?",
                    vec![
                        ("Clear rows".to_string(), ClearChoice::RowsOnly),
                        ("Reset everything".to_string(), ClearChoice::Everything),
                        ("Cancel".to_string(), ClearChoice::Cancel),
                    ],
                ))
            }
            GridAction::Info => self.overlay = Overlay::Info(InfoView::new(self.data_info())),
            GridAction::Help => self.overlay = Overlay::Help(HelpView::new(self.key_context())),
            GridAction::Save => {
                if self.save_table() && self.save_state() {
                    info!(rows = self.table.len(), "Saved on request");
                    self.toasts.success("Saved");
                }
            }
            GridAction::Quit => self.quit(false),
        }
    }

    fn quit(&mut self, force: bool) {
        if self.dirty && !force {
            self.overlay = Overlay::Confirm(
                ConfirmPurpose::QuitUnsaved,
                confirm_dialog("Quit", "There are unsaved changes. Quit anyway?"),
            );
            return;
        }
        if self.config.autosave {
            self.save_state();
        }
        info!("Quitting");
        self.should_quit = true;
    }

    /// Enter on the cursor line.
    fn activate(&mut self) {
        match self.lines.get(self.grid.cursor()).copied() {
            Some(GroupLine::Header(group)) => {
                if let Some(grouping) = &mut self.grouping {
                    grouping.toggle(group);
                    self.lines = grouping.flatten();
                }
            }
            Some(GroupLine::Row(row)) => self.edit_cell(row),
            None => {}
        }
    }

    fn edit_cell(&mut self, row: usize) {
        let Some(column) = self.table.columns().get(self.grid.column()).cloned() else {
            return;
        };
        if column.column_type == ColumnType::Image {
            self.open_upload_prompt(row, column.field);
            return;
        }
        if !column.editable {
            self.toasts.warning(format!("Column '{}' is read-only", column.title));
            return;
        }
        let current = self
            .table
            .row(row)
            .map(|r| r.display(&column.field))
            .unwrap_or_default();
        if column.column_type == ColumnType::Select {
            self.grid.start_select_edit(row, &column, &current);
        } else {
            self.grid.start_text_edit(row, &column, &current);
        }
    }

    fn open_upload_prompt(&mut self, row: usize, field: String) {
        let Some(row_id) = self.table.row(row).and_then(Row::id) else {
            self.toasts.warning("This row has no id, images cannot be attached");
            return;
        };
        self.overlay = Overlay::Prompt(
            PromptPurpose::UploadImage { row_id, field },
            PromptDialog::new(
                "Upload image",
                format!(
                    "Path to a JPG, PNG, GIF, BMP or WEBP file (max {})",
                    crate::storage::format_size(self.config.image.max_file_bytes)
                ),
            ),
        );
    }

    fn sort_current_column(&mut self) {
        let Some(column) = self.table.columns().get(self.grid.column()).cloned() else {
            return;
        };
        match self.table.sort_by_column(&column.field) {
            Ok(direction) => {
                self.changed();
                self.toasts
                    .info(format!("Sorted by {} ({})", column.title, direction.label()));
            }
            Err(e) => self.handle_error(&e.into()),
        }
    }

    fn open_menu(&mut self) {
        let Some(row) = self.current_row() else {
            return;
        };
        let Some(column) = self.table.columns().get(self.grid.column()) else {
            return;
        };
        let has_image = self
            .table
            .row(row)
            .and_then(|r| r.get(&column.field))
            .is_some_and(|v| v.is_image());
        self.menu.show(MenuTarget {
            image_column: column.column_type == ColumnType::Image,
            has_image,
            editable: column.editable,
            selected_rows: self.table.selected_count(),
        });
        self.overlay = Overlay::Menu;
    }

    fn handle_menu_action(&mut self, action: MenuAction) {
        let Some(row) = self.current_row() else {
            return;
        };
        match action {
            MenuAction::EditCell => self.edit_cell(row),
            MenuAction::UploadImage => {
                if let Some(field) = self.current_field() {
                    self.open_upload_prompt(row, field);
                }
            }
            MenuAction::ClearImage => {
                if let Some(field) = self.current_field() {
                    if self.table.clear_cells(&[(row, field)]) > 0 {
                        self.changed();
                        self.toasts.success("Image removed");
                    }
                }
            }
            MenuAction::InsertRow => match self.table.insert_row(row) {
                Ok(index) => {
                    self.changed();
                    self.focus_row(index);
                    self.toasts.success("Row inserted");
                }
                Err(e) => self.handle_error(&e.into()),
            },
            MenuAction::DeleteRow => {
                self.overlay = Overlay::Confirm(
                    ConfirmPurpose::DeleteRow(row),
                    confirm_dialog("Delete row", "Delete this row?"),
                );
            }
            MenuAction::CopyRow => match self.table.copy_row(row) {
                Ok(index) => {
                    self.changed();
                    self.focus_row(index);
                    self.toasts.success("Row copied");
                }
                Err(e) => self.handle_error(&e.into()),
            },
            MenuAction::ClearSelectedCells => {
                if let Some(field) = self.current_field() {
                    let cells: Vec<(usize, String)> = self
                        .table
                        .selected_rows()
                        .into_iter()
                        .map(|i| (i, field.clone()))
                        .collect();
                    let cleared = self.table.clear_cells(&cells);
                    self.changed();
                    self.toasts.success(format!("Cleared {} cells", cleared));
                }
            }
            MenuAction::DeleteSelectedRows => {
                self.overlay = Overlay::Confirm(
                    ConfirmPurpose::DeleteSelected,
                    confirm_dialog(
                        "Delete rows",
                        format!("Delete {} selected rows?", self.table.selected_count()),
                    ),
                );
            }
        }
    }

    /// Route a key to the open overlay. Returns the overlay to show next.
    fn handle_overlay_key(&mut self, overlay: Overlay, key: KeyEvent) -> Overlay {
        match overlay {
            Overlay::None => Overlay::None,
            Overlay::Menu => match self.menu.handle_input(key) {
                Some(ContextMenuAction::Run(action)) => {
                    self.handle_menu_action(action);
                    Overlay::None
                }
                Some(ContextMenuAction::Cancel) => Overlay::None,
                None => Overlay::Menu,
            },
            Overlay::Filter(mut view) => match view.handle_input(key) {
                None => Overlay::Filter(view),
                Some(action) => self.handle_filter_action(action, view),
            },
            Overlay::Group(mut view) => match view.handle_input(key) {
                None => Overlay::Group(view),
                Some(action) => self.handle_group_action(action, view),
            },
            Overlay::Help(mut view) => match view.handle_input(key) {
                Some(HelpAction::Close) => Overlay::None,
                None => Overlay::Help(view),
            },
            Overlay::AddColumn(mut view) => match view.handle_input(key) {
                None => Overlay::AddColumn(view),
                Some(AddColumnAction::Cancel) => Overlay::None,
                Some(AddColumnAction::Submit(new_column)) => match self.table.add_column(new_column) {
                    Ok(field) => {
                        self.changed();
                        let title = self.table.column(&field).map(|c| c.title.clone());
                        let last = self.table.columns().len().saturating_sub(1);
                        self.grid.set_cursor(self.grid.cursor(), last);
                        self.toasts
                            .success(format!("Added column {}", title.unwrap_or(field)));
                        Overlay::None
                    }
                    Err(e) => {
                        self.handle_error(&e.into());
                        Overlay::AddColumn(view)
                    }
                },
            },
            Overlay::Import(mut view) => match view.handle_input(key) {
                None => Overlay::Import(view),
                Some(ImportAction::Cancel) => Overlay::None,
                Some(ImportAction::Load { path, has_header }) => {
                    match &self.spawner {
                        Some(spawner) => spawner.spawn_read_csv(path, has_header),
                        None => view.loaded(tasks::load_csv(&path, has_header)),
                    }
                    Overlay::Import(view)
                }
                Some(ImportAction::Confirm { document, replace }) => {
                    self.import_document(&document, replace);
                    Overlay::None
                }
            },
            Overlay::Export(mut view) => match view.handle_input(key) {
                None => Overlay::Export(view),
                Some(ExportAction::Cancel) => Overlay::None,
                Some(ExportAction::Export(kind)) => {
                    let dir = view.dir().to_path_buf();
                    if self.export(kind, &dir) {
                        Overlay::None
                    } else {
                        Overlay::Export(view)
                    }
                }
            },
            Overlay::Info(mut view) => match view.handle_input(key) {
                None => Overlay::Info(view),
                Some(InfoAction::Close) => Overlay::None,
                Some(InfoAction::Reset) => Overlay::Confirm(
                    ConfirmPurpose::ResetStorage,
                    confirm_dialog(
                        "Reset",
                        "Delete all saved data and start over with sample rows?",
                    ),
                ),
            },
            Overlay::Confirm(purpose, mut dialog) => match dialog.handle_input(key) {
                None => Overlay::Confirm(purpose, dialog),
                Some(ChoiceAction::Chosen(true)) => {
                    self.confirmed(purpose);
                    Overlay::None
                }
                Some(_) => Overlay::None,
            },
            Overlay::ClearData(mut dialog) => match dialog.handle_input(key) {
                None => Overlay::ClearData(dialog),
                Some(ChoiceAction::Chosen(choice)) => {
                    self.clear_data(choice);
                    Overlay::None
                }
                Some(ChoiceAction::Cancel) => Overlay::None,
            },
            Overlay::Prompt(purpose, mut dialog) => match dialog.handle_input(key) {
                None => Overlay::Prompt(purpose, dialog),
                Some(PromptAction::Cancel) => Overlay::None,
                Some(PromptAction::Submit(value)) => {
                    self.prompt_submitted(purpose, &value);
                    Overlay::None
                }
            },
        }
    }

    fn handle_filter_action(&mut self, action: FilterPanelAction, view: FilterPanelView) -> Overlay {
        match action {
            FilterPanelAction::Apply(conditions) => {
                self.set_filters(conditions);
                let shown = self.visible.len();
                self.toasts
                    .info(format!("Showing {} of {} records", shown, self.table.len()));
                Overlay::None
            }
            FilterPanelAction::Clear => {
                self.set_filters(Vec::new());
                self.toasts.info("Filters cleared");
                Overlay::None
            }
            FilterPanelAction::Export(conditions) => {
                let dir = self.export_dir.clone();
                self.write_export(export::export_filters(&conditions), &dir);
                Overlay::Filter(view)
            }
            FilterPanelAction::Import => Overlay::Prompt(
                PromptPurpose::ImportFilters,
                PromptDialog::new("Load filters", "Path to a JSON file of filter conditions"),
            ),
            FilterPanelAction::Cancel => Overlay::None,
        }
    }

    fn handle_group_action(&mut self, action: GroupPanelAction, view: GroupPanelView) -> Overlay {
        match action {
            GroupPanelAction::Apply(config) => {
                self.set_grouping(Some(config));
                if let Some(grouping) = &self.grouping {
                    self.toasts
                        .info(format!("{} groups", grouping.groups.len()));
                }
                Overlay::None
            }
            GroupPanelAction::Clear => {
                self.set_grouping(None);
                self.toasts.info("Grouping removed");
                Overlay::None
            }
            GroupPanelAction::ExpandAll | GroupPanelAction::CollapseAll => {
                let expanded = action == GroupPanelAction::ExpandAll;
                if let Some(grouping) = &mut self.grouping {
                    grouping.set_all_expanded(expanded);
                    self.lines = grouping.flatten();
                    self.grid.clamp(self.lines.len(), self.table.columns().len());
                }
                Overlay::Group(view)
            }
            GroupPanelAction::ExportGrouped => {
                let dir = self.export_dir.clone();
                let file = export::export_grouped(self.grouping.as_ref(), self.table.rows());
                self.write_export(file, &dir);
                Overlay::Group(view)
            }
            GroupPanelAction::ExportSummary => {
                let dir = self.export_dir.clone();
                let file = export::export_group_summary(
                    self.grouping.as_ref(),
                    self.table.rows(),
                    self.table.columns(),
                );
                self.write_export(file, &dir);
                Overlay::Group(view)
            }
            GroupPanelAction::Cancel => Overlay::None,
        }
    }

    /// Replace the active filter.
    pub fn set_filters(&mut self, conditions: Vec<FilterCondition>) {
        self.filters = filter::collect(&conditions);
        debug!(count = self.filters.len(), "Set filters");
        self.refresh_view();
        self.grid.set_cursor(0, self.grid.column());
        self.save_state();
    }

    /// Group by a column, or ungroup.
    pub fn set_grouping(&mut self, config: Option<GroupConfig>) {
        self.grouping = config.map(|c| Grouping::build(self.table.rows(), &self.visible, c));
        self.refresh_view();
        self.grid.set_cursor(0, self.grid.column());
        self.save_state();
    }

    fn confirmed(&mut self, purpose: ConfirmPurpose) {
        match purpose {
            ConfirmPurpose::DeleteRow(row) => match self.table.delete_row(row) {
                Ok(_) => {
                    self.changed();
                    self.toasts.success("Row deleted");
                }
                Err(e) => self.handle_error(&e.into()),
            },
            ConfirmPurpose::DeleteSelected => {
                let count = self.table.delete_selected_rows();
                self.changed();
                self.toasts.success(format!("Deleted {} rows", count));
            }
            ConfirmPurpose::ResetStorage => {
                if let Err(e) = self.storage.reset() {
                    self.handle_error(&e.into());
                    return;
                }
                self.table.clear_all(self.config.sample_rows);
                self.filters.clear();
                self.grouping = None;
                self.changed();
                self.save_state();
                info!("Storage reset");
                self.toasts.success("All data reset");
            }
            ConfirmPurpose::QuitUnsaved => {
                info!("Quitting without saving");
                self.should_quit = true;
            }
        }
    }

    fn clear_data(&mut self, choice: ClearChoice) {
        match choice {
            ClearChoice::RowsOnly => {
                self.table.clear_rows();
                self.changed();
                self.toasts.success("All rows cleared");
            }
            ClearChoice::Everything => {
                self.table.clear_all(self.config.sample_rows);
                self.filters.clear();
                self.grouping = None;
                self.changed();
                self.save_state();
                self.toasts.success("Table reset to defaults");
            }
            ClearChoice::Cancel => {}
        }
    }

    fn prompt_submitted(&mut self, purpose: PromptPurpose, value: &str) {
        let path = expand_home(value);
        match purpose {
            PromptPurpose::UploadImage { row_id, field } => {
                if !imaging::is_image_file(&path) {
                    self.toasts.error("Please choose an image file.");
                    return;
                }
                match self.spawner.clone() {
                    Some(spawner) => {
                        spawner.spawn_process_image(row_id, field, path, self.config.image.clone());
                        self.toasts.info("Processing image...");
                    }
                    None => {
                        let result = tasks::load_image(&path, &self.config.image);
                        self.handle_task_message(TaskMessage::ImageProcessed {
                            row_id,
                            field,
                            result,
                        });
                    }
                }
            }
            PromptPurpose::ImportFilters => {
                let parsed = std::fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|text| filter::parse_conditions(&text).map_err(|e| e.to_string()));
                match parsed {
                    Ok(conditions) => {
                        self.set_filters(conditions);
                        self.toasts
                            .success(format!("Loaded {} filter conditions", self.filters.len()));
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Could not load filters");
                        self.toasts.error("Could not read the filter file.");
                    }
                }
            }
        }
    }

    fn import_document(&mut self, document: &csv::CsvDocument, replace: bool) {
        let (columns, rows) = document.to_table();
        let outcome = self.table.import_csv(columns, rows, replace);
        self.changed();
        info!(rows = outcome.rows, columns = outcome.columns, replace, "Imported CSV");
        self.toasts
            .success(format!("Imported {} rows", outcome.rows));
    }

    /// Write an export. Returns whether it succeeded.
    fn export(&mut self, kind: ExportKind, dir: &Path) -> bool {
        let file = match kind {
            ExportKind::Table(format) => {
                let rows: Vec<&Row> = self
                    .visible
                    .iter()
                    .filter_map(|&i| self.table.row(i))
                    .collect();
                export::export_table(format, self.table.columns(), &rows)
            }
            ExportKind::Filters => export::export_filters(&self.filters),
            ExportKind::Grouped => export::export_grouped(self.grouping.as_ref(), self.table.rows()),
            ExportKind::GroupSummary => export::export_group_summary(
                self.grouping.as_ref(),
                self.table.rows(),
                self.table.columns(),
            ),
            ExportKind::Images => export::export_images(self.table.rows(), self.table.columns()),
        };
        self.write_export(file, dir)
    }

    fn write_export(&mut self, file: export::Result<ExportFile>, dir: &Path) -> bool {
        match file.and_then(|f| f.write_to(dir).map(|path| (f.note, path))) {
            Ok((note, path)) => {
                let mut message = format!("Exported to {}", path.display());
                if let Some(note) = note {
                    message = format!("{}. {}", note, message);
                }
                self.toasts.success(message);
                true
            }
            Err(e) => {
                self.handle_error(&e.into());
                false
            }
        }
    }

    /// Apply a result from a background task.
    pub fn handle_task_message(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::CsvLoaded { path, result } => {
                if let Err(e) = &result {
                    warn!(path = %path.display(), error = %e, "CSV read failed");
                }
                match &mut self.overlay {
                    Overlay::Import(view) if view.awaits(&path) => view.loaded(result),
                    _ => debug!(path = %path.display(), "CSV result arrived after the dialog closed"),
                }
            }
            TaskMessage::ImageProcessed {
                row_id,
                field,
                result,
            } => match result {
                Ok(image) => {
                    let (width, height) = (image.width, image.height);
                    match self.table.set_image(row_id, &field, image.data_uri) {
                        Ok(true) => {
                            self.changed();
                            self.toasts
                                .success(format!("Image uploaded ({}x{})", width, height));
                        }
                        Ok(false) => {
                            warn!(row_id, "Image arrived for a deleted row");
                            self.toasts.warning("The row was deleted before the image was ready");
                        }
                        Err(e) => self.handle_error(&e.into()),
                    }
                }
                Err(message) => {
                    warn!(row_id, error = %message, "Image processing failed");
                    self.toasts.error(message);
                }
            },
        }
    }

    fn data_info(&self) -> DataInfo {
        DataInfo {
            rows: self.table.len(),
            columns: self.table.columns().len(),
            visible_rows: self.visible.len(),
            selected_rows: self.table.selected_count(),
            images: imaging::collect_images(self.table.rows(), self.table.columns()).len(),
            filters: self.filters.len(),
            group_field: self.grouping.as_ref().map(|g| g.config.field.clone()),
            usage: self.storage.usage(),
            last_saved: self.last_saved,
            data_dir: self.storage.base_dir().to_path_buf(),
            log_dir: logging::log_directory(),
        }
    }

    // ========================================================================
    // View
    // ========================================================================

    /// Render the application UI.
    pub fn view(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let data = GridData {
            table: &self.table,
            lines: &self.lines,
            grouping: self.grouping.as_ref(),
        };
        self.grid.render(frame, chunks[0], &data);
        self.render_status_bar(frame, chunks[1]);
        render_context_help(frame, chunks[2], self.key_context());

        let stats = self.grouping.as_ref().map(Grouping::stats);
        match &mut self.overlay {
            Overlay::None => {}
            Overlay::Menu => self.menu.render(frame, self.grid.cursor_rect(), area),
            Overlay::Filter(view) => view.render(frame, area),
            Overlay::Group(view) => view.render(frame, area, stats.as_ref()),
            Overlay::Help(view) => view.render(frame, area),
            Overlay::AddColumn(view) => view.render(frame, area),
            Overlay::Import(view) => view.render(frame, area),
            Overlay::Export(view) => view.render(frame, area),
            Overlay::Info(view) => view.render(frame, area),
            Overlay::Confirm(_, dialog) => dialog.render(frame, area),
            Overlay::ClearData(dialog) => dialog.render(frame, area),
            Overlay::Prompt(_, dialog) => dialog.render(frame, area),
        }

        self.toasts.render(frame, area);
        self.error_dialog.render(frame, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let separator = Span::styled("  │  ", Style::default().fg(t.border));
        let mut spans = vec![Span::styled(
            self.table.record_count_label(),
            Style::default().fg(t.fg),
        )];

        let stats = filter::stats(self.table.len(), self.visible.len(), &self.filters);
        if stats.has_filters {
            spans.push(separator.clone());
            spans.push(Span::styled(
                format!(
                    "Filter: {} of {} ({} hidden)",
                    stats.filtered, stats.total, stats.hidden
                ),
                Style::default().fg(t.warning),
            ));
        }
        if let Some(grouping) = &self.grouping {
            let title = self
                .table
                .column(&grouping.config.field)
                .map_or(grouping.config.field.as_str(), |c| c.title.as_str());
            spans.push(separator.clone());
            spans.push(Span::styled(
                format!("Grouped by {} ({} groups)", title, grouping.groups.len()),
                Style::default().fg(t.group_fg),
            ));
        }
        spans.push(separator);
        let saved = match (self.last_saved, self.dirty) {
            (_, true) => Span::styled("Unsaved changes", Style::default().fg(t.warning)),
            (Some(at), false) => Span::styled(
                format!("Saved {}", at.format("%H:%M:%S")),
                Style::default().fg(t.dim),
            ),
            (None, false) => Span::styled("Not saved yet", Style::default().fg(t.dim)),
        };
        spans.push(saved);
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, FilterOperator, SortDirection};
    use image::{ImageFormat, RgbImage};
    use tempfile::TempDir;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.update(key(KeyCode::Char(c)));
        }
    }

    fn config() -> Config {
        Config {
            sample_rows: 10,
            ..Config::default()
        }
    }

    fn create_app(dir: &TempDir) -> App {
        let storage = StorageManager::with_dir(dir.path().join("data"), config().storage_quota_bytes);
        App::new(config(), storage).with_export_dir(dir.path().join("exports"))
    }

    fn column_index(app: &App, field: &str) -> usize {
        app.table().columns().iter().position(|c| c.field == field).unwrap()
    }

    fn move_to_column(app: &mut App, field: &str) {
        for _ in 0..column_index(app, field) {
            app.update(key(KeyCode::Right));
        }
    }

    #[test]
    fn test_new_generates_and_saves_sample_rows() {
        let dir = TempDir::new().unwrap();
        let app = create_app(&dir);
        assert_eq!(app.table().len(), 10);
        assert_eq!(app.visible_rows().len(), 10);
        assert!(dir.path().join("data").join("tableData.json").exists());
    }

    #[test]
    fn test_reload_restores_table_and_state() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('a')));
        app.set_filters(vec![FilterCondition::new("id", FilterOperator::LessEqual, "3")]);
        app.set_grouping(Some(GroupConfig::new("status", SortDirection::Asc)));

        let app = create_app(&dir);
        assert_eq!(app.table().len(), 11);
        assert_eq!(app.filters().len(), 1);
        assert_eq!(app.visible_rows(), &[0, 1, 2]);
        assert_eq!(app.grouping().unwrap().config.field, "status");
        assert_eq!(app.grouping().unwrap().total_rows(), 3);
    }

    #[test]
    fn test_quit_on_q() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('q')));
        assert!(app.should_quit());
    }

    #[test]
    fn test_quit_asks_when_unsaved() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::with_dir(dir.path().join("data"), config().storage_quota_bytes);
        let mut app = App::new(
            Config {
                autosave: false,
                ..config()
            },
            storage,
        );
        app.update(key(KeyCode::Char('a')));
        app.update(key(KeyCode::Char('q')));
        assert!(!app.should_quit());
        app.update(key(KeyCode::Right));
        app.update(key(KeyCode::Enter));
        assert!(app.should_quit());
    }

    #[test]
    fn test_edit_text_cell() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        move_to_column(&mut app, "name");
        app.update(key(KeyCode::Enter));
        app.update(ctrl('u'));
        type_str(&mut app, "Zed");
        app.update(key(KeyCode::Enter));
        assert_eq!(app.table().row(0).unwrap().display("name"), "Zed");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        move_to_column(&mut app, "age");
        let before = app.table().row(0).unwrap().display("age");
        app.update(key(KeyCode::Enter));
        app.update(ctrl('u'));
        type_str(&mut app, "abc");
        app.update(key(KeyCode::Enter));
        assert_eq!(app.table().row(0).unwrap().display("age"), before);
        assert_eq!(app.toasts().len(), 1);
    }

    #[test]
    fn test_read_only_column_is_not_edited() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Enter));
        assert!(!app.grid.is_editing());
        assert_eq!(app.toasts().len(), 1);
    }

    #[test]
    fn test_delete_selected_rows_with_confirm() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char(' ')));
        app.update(key(KeyCode::Down));
        app.update(key(KeyCode::Char(' ')));
        app.update(key(KeyCode::Char('D')));
        // Cancel is highlighted first.
        app.update(key(KeyCode::Right));
        app.update(key(KeyCode::Enter));
        assert_eq!(app.table().len(), 8);
        assert_eq!(app.table().selected_count(), 0);
    }

    #[test]
    fn test_select_all_and_delete_under_filter() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.set_filters(vec![FilterCondition::new("id", FilterOperator::LessEqual, "2")]);
        assert_eq!(app.visible_rows().len(), 2);

        app.update(ctrl('a'));
        assert_eq!(app.table().selected_count(), 2);
        app.update(key(KeyCode::Char('D')));
        app.update(key(KeyCode::Right));
        app.update(key(KeyCode::Enter));

        assert_eq!(app.table().len(), 8);
        assert!(app.table().rows().iter().all(|r| r.id() > Some(2)));
    }

    #[test]
    fn test_filter_drops_hidden_rows_from_selection() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char(' ')));
        app.update(key(KeyCode::Down));
        app.update(key(KeyCode::Char(' ')));
        assert_eq!(app.table().selected_count(), 2);

        app.set_filters(vec![FilterCondition::new("id", FilterOperator::Equals, "2")]);
        assert_eq!(app.table().selected_rows(), vec![1]);
    }

    #[test]
    fn test_range_select_stays_inside_displayed_rows() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.set_filters(vec![FilterCondition::new("id", FilterOperator::GreaterThan, "8")]);
        app.update(key(KeyCode::Char(' ')));
        app.update(key(KeyCode::Down));
        app.update(key(KeyCode::Char('V')));
        assert_eq!(app.table().selected_rows(), vec![8, 9]);
    }

    #[test]
    fn test_delete_selected_without_selection_warns() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('D')));
        assert!(matches!(app.overlay, Overlay::None));
        assert_eq!(app.toasts().len(), 1);
    }

    #[test]
    fn test_context_menu_copy_row() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('m')));
        assert_eq!(app.key_context(), KeyContext::ContextMenu);
        // The id column is read-only: insert, delete, copy.
        for _ in 0..2 {
            app.update(key(KeyCode::Down));
        }
        app.update(key(KeyCode::Enter));
        assert_eq!(app.table().len(), 11);
        let original = app.table().row(0).unwrap().display("name");
        assert_eq!(app.table().row(1).unwrap().display("name"), original);
        assert_eq!(app.table().row(1).unwrap().id(), Some(11));
    }

    #[test]
    fn test_group_header_toggles() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.set_grouping(Some(GroupConfig::new("status", SortDirection::Asc)));
        assert!(matches!(app.lines()[0], GroupLine::Header(0)));
        let expanded = app.lines().len();
        app.update(key(KeyCode::Enter));
        assert!(app.lines().len() < expanded);
        app.update(key(KeyCode::Enter));
        assert_eq!(app.lines().len(), expanded);
    }

    #[test]
    fn test_filter_panel_apply() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('f')));
        assert_eq!(app.key_context(), KeyContext::FilterPanel);
        // id, equals, value "1"
        app.update(key(KeyCode::Tab));
        app.update(key(KeyCode::Tab));
        type_str(&mut app, "1");
        app.update(key(KeyCode::Enter));
        assert_eq!(app.visible_rows(), &[0]);
        assert_eq!(app.lines().len(), 1);
    }

    #[test]
    fn test_sort_toggles() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('s')));
        assert_eq!(app.table().sort_direction("id"), Some(SortDirection::Asc));
        app.update(key(KeyCode::Char('s')));
        assert_eq!(app.table().sort_direction("id"), Some(SortDirection::Desc));
        assert_eq!(app.table().row(0).unwrap().id(), Some(10));
    }

    #[test]
    fn test_clear_rows_only() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('X')));
        app.update(key(KeyCode::Enter));
        assert!(app.table().is_empty());
        assert!(app.lines().is_empty());
        app.update(key(KeyCode::Char('a')));
        assert_eq!(app.table().row(0).unwrap().id(), Some(1));
    }

    #[test]
    fn test_csv_import_appends() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("people.csv");
        std::fs::write(&csv_path, "name,city\nAnn,Oslo\nBob,Rome\n").unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('i')));
        type_str(&mut app, csv_path.to_str().unwrap());
        app.update(key(KeyCode::Enter));
        app.update(key(KeyCode::Enter));
        assert!(matches!(app.overlay, Overlay::None));
        assert_eq!(app.table().len(), 12);
        let imported = app.table().column("col_0").unwrap();
        assert_eq!(imported.title, "name");
        assert_eq!(app.table().row(0).unwrap().display("col_0"), "");
        assert_eq!(app.table().row(10).unwrap().display("col_1"), "Oslo");
    }

    #[test]
    fn test_csv_import_error_stays_in_dialog() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.update(key(KeyCode::Char('i')));
        type_str(&mut app, "notes.txt");
        app.update(key(KeyCode::Enter));
        assert!(matches!(app.overlay, Overlay::Import(_)));
        assert_eq!(app.table().len(), 10);
    }

    #[test]
    fn test_image_upload() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("avatar.png");
        RgbImage::new(40, 20)
            .save_with_format(&image_path, ImageFormat::Png)
            .unwrap();
        let mut app = create_app(&dir);
        move_to_column(&mut app, "avatar");
        app.update(key(KeyCode::Enter));
        assert_eq!(app.key_context(), KeyContext::Dialog);
        type_str(&mut app, image_path.to_str().unwrap());
        app.update(key(KeyCode::Enter));
        let cell = app.table().row(0).unwrap().get("avatar").cloned();
        assert!(cell.is_some_and(|v| v.is_image()));
    }

    #[test]
    fn test_image_for_deleted_row_is_dropped() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.handle_task_message(TaskMessage::ImageProcessed {
            row_id: 999,
            field: "avatar".to_string(),
            result: Ok(imaging::ProcessedImage {
                data_uri: "data:image/jpeg;base64,AAAA".to_string(),
                width: 1,
                height: 1,
                original_width: 1,
                original_height: 1,
                bytes: 3,
            }),
        });
        assert_eq!(app.toasts().len(), 1);
        assert!(app
            .table()
            .rows()
            .iter()
            .all(|r| r.get("avatar") != Some(&CellValue::text("data:image/jpeg;base64,AAAA"))));
    }

    #[test]
    fn test_export_visible_rows_as_csv() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.set_filters(vec![FilterCondition::new("id", FilterOperator::LessEqual, "2")]);
        app.update(key(KeyCode::Char('e')));
        app.update(key(KeyCode::Char('2')));
        let written = std::fs::read_to_string(dir.path().join("exports").join("table-data.csv")).unwrap();
        assert_eq!(written.lines().count(), 3);
    }

    #[test]
    fn test_error_dialog_blocks_input() {
        let dir = TempDir::new().unwrap();
        let mut app = create_app(&dir);
        app.handle_error(&AppError::terminal("boom"));
        assert!(app.is_error_dialog_visible());
        app.update(key(KeyCode::Char('q')));
        assert!(!app.should_quit());
        app.update(key(KeyCode::Esc));
        assert!(!app.is_error_dialog_visible());
    }
}
