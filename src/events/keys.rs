//! Key binding reference.
//!
//! The bindings here feed the help screen and the hint line at the bottom of
//! the screen; the actual dispatch lives in the views' `handle_input`.

/// Where a binding applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    Grid,
    Editing,
    ContextMenu,
    FilterPanel,
    GroupPanel,
    Dialog,
    Help,
}

impl KeyContext {
    pub fn display(&self) -> &'static str {
        match self {
            KeyContext::Global => "Global",
            KeyContext::Grid => "Table",
            KeyContext::Editing => "Cell editing",
            KeyContext::ContextMenu => "Context menu",
            KeyContext::FilterPanel => "Filter panel",
            KeyContext::GroupPanel => "Group panel",
            KeyContext::Dialog => "Dialogs",
            KeyContext::Help => "Help",
        }
    }
}

/// One documented binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybinding {
    pub key: &'static str,
    pub description: &'static str,
    pub context: KeyContext,
}

const fn bind(key: &'static str, description: &'static str, context: KeyContext) -> Keybinding {
    Keybinding {
        key,
        description,
        context,
    }
}

const CONTEXT_ORDER: [KeyContext; 8] = [
    KeyContext::Global,
    KeyContext::Grid,
    KeyContext::Editing,
    KeyContext::ContextMenu,
    KeyContext::FilterPanel,
    KeyContext::GroupPanel,
    KeyContext::Dialog,
    KeyContext::Help,
];

/// All bindings.
pub fn get_keybindings() -> Vec<Keybinding> {
    use KeyContext::*;
    vec![
        bind("Ctrl+S", "Save table and filter state", Global),
        bind("?", "Show help", Global),
        bind("q", "Quit", Global),
        bind("Ctrl+C", "Quit without prompting", Global),
        bind("j / ↓", "Next row", Grid),
        bind("k / ↑", "Previous row", Grid),
        bind("h / ←", "Previous column", Grid),
        bind("l / →", "Next column", Grid),
        bind("Home / End", "First / last row", Grid),
        bind("Enter", "Edit cell, or toggle group", Grid),
        bind("Space", "Toggle row selection", Grid),
        bind("V", "Select range from anchor", Grid),
        bind("Ctrl+A", "Select all rows", Grid),
        bind("Esc", "Clear selection", Grid),
        bind("s", "Sort by column", Grid),
        bind("< / >", "Narrow / widen column", Grid),
        bind("m", "Open context menu", Grid),
        bind("a / Ctrl+N", "Add row", Grid),
        bind("C", "Add column", Grid),
        bind("D", "Delete selected rows", Grid),
        bind("i", "Import CSV", Grid),
        bind("e", "Export", Grid),
        bind("f / Ctrl+F", "Filter panel", Grid),
        bind("g / Ctrl+G", "Group panel", Grid),
        bind("X", "Clear data", Grid),
        bind("I", "Data info", Grid),
        bind("Enter", "Save value", Editing),
        bind("Esc", "Cancel edit", Editing),
        bind("Ctrl+U", "Clear input", Editing),
        bind("j / k", "Move", ContextMenu),
        bind("Enter", "Run item", ContextMenu),
        bind("Esc", "Close", ContextMenu),
        bind("Tab", "Next field", FilterPanel),
        bind("a", "Add condition", FilterPanel),
        bind("d", "Remove condition", FilterPanel),
        bind("Enter", "Apply", FilterPanel),
        bind("c", "Clear filters", FilterPanel),
        bind("x", "Export conditions", FilterPanel),
        bind("o", "Load conditions from file", FilterPanel),
        bind("j / k", "Choose field", GroupPanel),
        bind("s", "Toggle sort", GroupPanel),
        bind("Enter", "Apply grouping", GroupPanel),
        bind("c", "Remove grouping", GroupPanel),
        bind("+ / -", "Expand / collapse all", GroupPanel),
        bind("x / y", "Export grouped data / summary", GroupPanel),
        bind("Tab", "Next field", Dialog),
        bind("Enter", "Confirm", Dialog),
        bind("Esc", "Cancel", Dialog),
        bind("Tab / ← / →", "Switch section", Help),
        bind("j / k", "Scroll", Help),
        bind("? / q / Esc", "Close help", Help),
    ]
}

/// Bindings grouped by context, in display order.
pub fn get_keybindings_grouped() -> Vec<(KeyContext, Vec<Keybinding>)> {
    let bindings = get_keybindings();
    CONTEXT_ORDER
        .iter()
        .map(|&context| {
            let group: Vec<Keybinding> = bindings
                .iter()
                .filter(|b| b.context == context)
                .cloned()
                .collect();
            (context, group)
        })
        .filter(|(_, group)| !group.is_empty())
        .collect()
}

/// The one-line hint for a context. Keys are in brackets.
pub fn get_context_hints(context: KeyContext) -> &'static str {
    match context {
        KeyContext::Global | KeyContext::Grid => {
            "[Enter] edit  [a] add row  [C] add column  [f] filter  [g] group  [s] sort  [m] menu  [e] export  [?] help  [q] quit"
        }
        KeyContext::Editing => "[Enter] save  [Esc] cancel",
        KeyContext::ContextMenu => "[j/k] move  [Enter] run  [Esc] close",
        KeyContext::FilterPanel => {
            "[Tab] field  [a] add  [d] remove  [Enter] apply  [c] clear  [x] export  [o] load  [Esc] close"
        }
        KeyContext::GroupPanel => {
            "[j/k] field  [s] sort  [Enter] apply  [c] remove  [+/-] expand/collapse  [x/y] export  [Esc] close"
        }
        KeyContext::Dialog => "[Tab] next  [Enter] confirm  [Esc] cancel",
        KeyContext::Help => "[Tab] section  [j/k] scroll  [Esc] close",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_covers_all_bindings() {
        let total: usize = get_keybindings_grouped().iter().map(|(_, b)| b.len()).sum();
        assert_eq!(total, get_keybindings().len());
    }

    #[test]
    fn test_grouped_order_starts_with_global() {
        let grouped = get_keybindings_grouped();
        assert_eq!(grouped[0].0, KeyContext::Global);
        assert_eq!(grouped.last().unwrap().0, KeyContext::Help);
    }

    #[test]
    fn test_context_hints_use_brackets() {
        for context in CONTEXT_ORDER {
            assert!(get_context_hints(context).starts_with('['));
        }
    }
}
