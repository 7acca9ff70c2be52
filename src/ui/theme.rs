//! Theme and styling.
//!
//! A single dark theme is used. Select values get a tag color picked from a
//! ten-entry palette by hashing the value, so the same value always has the
//! same color.

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the application.
#[derive(Debug, Clone)]
pub struct Theme {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub dim: Color,
    pub border: Color,
    pub border_focused: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub input_fg: Color,
    pub input_placeholder: Color,
    /// Column header row.
    pub header_bg: Color,
    /// Selected rows.
    pub selection_bg: Color,
    /// Cell under the cursor.
    pub cursor_bg: Color,
    /// Group header lines.
    pub group_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::White,
            bg: Color::Black,
            accent: Color::Cyan,
            dim: Color::DarkGray,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Blue,
            input_fg: Color::White,
            input_placeholder: Color::DarkGray,
            header_bg: Color::Rgb(38, 50, 56),
            selection_bg: Color::Rgb(25, 60, 100),
            cursor_bg: Color::Rgb(70, 70, 90),
            group_fg: Color::Magenta,
        }
    }
}

static THEME: OnceLock<Theme> = OnceLock::new();

/// The active theme.
pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

/// Tag colors as `(text, background)` pairs.
const TAG_PALETTE: [(Color, Color); 10] = [
    (Color::Rgb(0x19, 0x76, 0xd2), Color::Rgb(0xe3, 0xf2, 0xfd)),
    (Color::Rgb(0x7b, 0x1f, 0xa2), Color::Rgb(0xf3, 0xe5, 0xf5)),
    (Color::Rgb(0x38, 0x8e, 0x3c), Color::Rgb(0xe8, 0xf5, 0xe8)),
    (Color::Rgb(0xf5, 0x7c, 0x00), Color::Rgb(0xff, 0xf3, 0xe0)),
    (Color::Rgb(0xc2, 0x18, 0x5b), Color::Rgb(0xfc, 0xe4, 0xec)),
    (Color::Rgb(0x00, 0x69, 0x5c), Color::Rgb(0xe0, 0xf2, 0xf1)),
    (Color::Rgb(0x55, 0x8b, 0x2f), Color::Rgb(0xf1, 0xf8, 0xe9)),
    (Color::Rgb(0xff, 0x8f, 0x00), Color::Rgb(0xff, 0xf8, 0xe1)),
    (Color::Rgb(0x42, 0x42, 0x42), Color::Rgb(0xfa, 0xfa, 0xfa)),
    (Color::Rgb(0xd3, 0x2f, 0x2f), Color::Rgb(0xff, 0xeb, 0xee)),
];

/// 32-bit string hash over UTF-16 code units: `h = h * 31 + unit`, wrapping.
pub fn string_hash(value: &str) -> i32 {
    value.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Palette index for a select value.
pub fn tag_index(value: &str) -> usize {
    (i64::from(string_hash(value)).unsigned_abs() % TAG_PALETTE.len() as u64) as usize
}

/// Style of a select value tag.
pub fn tag_style(value: &str) -> Style {
    let (fg, bg) = TAG_PALETTE[tag_index(value)];
    Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_hash() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("Active"), 1_955_883_814);
        assert_eq!(string_hash("Engineering"), -920_488_205);
        assert_eq!(string_hash("中文"), 646_394);
    }

    #[test]
    fn test_tag_index() {
        assert_eq!(tag_index("a"), 7);
        assert_eq!(tag_index("Active"), 4);
        assert_eq!(tag_index("Engineering"), 5);
        assert_eq!(tag_index("On leave"), 2);
    }

    #[test]
    fn test_tag_style_is_stable() {
        assert_eq!(tag_style("Design"), tag_style("Design"));
        assert_eq!(tag_style("Design").fg, Some(TAG_PALETTE[2].0));
    }

    #[test]
    fn test_theme_is_shared() {
        assert!(std::ptr::eq(theme(), theme()));
    }
}
