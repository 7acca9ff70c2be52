//! User interface components and views.
//!
//! This module contains all TUI rendering logic: the grid and its dialogs in
//! `views`, and the reusable widgets they are built from in `components`.

pub mod components;
pub mod theme;
pub mod views;

pub use components::{render_context_help, ErrorDialog, Toasts};
pub use theme::theme;
pub use views::{GridAction, TableView};
