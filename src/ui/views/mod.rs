//! Application views: the grid and the dialogs opened over it.

mod add_column;
mod export;
mod filter;
mod grid;
mod group;
mod help;
mod import;
mod info;

pub use add_column::{AddColumnAction, AddColumnView};
pub use export::{ExportAction, ExportKind, ExportView};
pub use filter::{FilterPanelAction, FilterPanelView};
pub use grid::{GridAction, GridData, TableView};
pub use group::{GroupPanelAction, GroupPanelView};
pub use help::{HelpAction, HelpView};
pub use import::{ImportAction, ImportView};
pub use info::{DataInfo, InfoAction, InfoView};
