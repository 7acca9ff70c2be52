//! Reusable UI components.

mod context_menu;
mod dialog;
mod dropdown;
mod help_bar;
mod input;
mod toast;

pub use context_menu::{ContextMenu, ContextMenuAction, MenuAction, MenuTarget};
pub use dialog::{
    centered_rect, confirm_dialog, ChoiceAction, ChoiceDialog, ErrorDialog, PromptAction,
    PromptDialog,
};
pub use dropdown::{Dropdown, DropdownAction};
pub use help_bar::render_context_help;
pub use input::TextInput;
pub use toast::{Toast, ToastKind, Toasts};
