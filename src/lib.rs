//! LazyTable - a spreadsheet-style data editor for the terminal.
//!
//! The table, its filter and grouping, CSV and image handling and the
//! file-backed storage are plain library modules; [`app::App`] ties them to
//! the ratatui interface.

pub mod app;
pub mod config;
pub mod csv;
pub mod error;
pub mod events;
pub mod export;
pub mod filter;
pub mod group;
pub mod imaging;
pub mod logging;
pub mod model;
pub mod storage;
pub mod table;
pub mod tasks;
pub mod ui;

pub use app::App;
pub use error::{AppError, Result};
