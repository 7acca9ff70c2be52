//! Terminal events.
//!
//! Keyboard input and resizes are polled from crossterm; a tick is emitted
//! when nothing arrives within the tick rate so toasts can expire.

mod handler;
mod keys;

use crossterm::event::KeyEvent;

pub use handler::EventHandler;
pub use keys::{get_context_hints, get_keybindings, get_keybindings_grouped, KeyContext, Keybinding};

/// Events consumed by [`crate::app::App::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// The terminal was resized.
    Resize(u16, u16),
    /// Nothing happened within the tick rate.
    Tick,
    /// Leave the application.
    Quit,
}
