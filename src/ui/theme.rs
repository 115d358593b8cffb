//! Color palette and style helpers
//!
//! 256-color indexes so the palette looks the same on any terminal that
//! supports them, without asking for truecolor.

use ratatui::style::{Color, Modifier, Style};

/// Palette for every screen
pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // CORE PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// Headers: deep pink
    pub const HEADER: Color = Color::Indexed(161);

    /// Torrent and file titles: teal
    pub const TITLE: Color = Color::Indexed(43);

    /// Command keys: gold
    pub const KEY: Color = Color::Indexed(220);

    /// Secondary info (size, date, seeders)
    pub const INFO: Color = Color::Indexed(245);

    /// Notices after a failed action
    pub const NOTICE: Color = Color::Indexed(203);

    /// Progress messages while waiting on the network
    pub const STATUS: Color = Color::Indexed(109);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    /// Screen header
    pub fn header() -> Style {
        Style::default()
            .fg(Self::HEADER)
            .add_modifier(Modifier::BOLD)
    }

    /// Listed item name
    pub fn title() -> Style {
        Style::default().fg(Self::TITLE)
    }

    /// Keybinding hint, e.g. the `[b]` in `[b]ack`
    pub fn keybind() -> Style {
        Style::default()
            .fg(Self::KEY)
            .add_modifier(Modifier::BOLD)
    }

    /// Keybinding description following the hint
    pub fn keybind_desc() -> Style {
        Style::default()
    }

    /// Dimmed detail line
    pub fn dimmed() -> Style {
        Style::default().fg(Self::INFO)
    }

    /// Recoverable error shown under the list
    pub fn notice() -> Style {
        Style::default()
            .fg(Self::NOTICE)
            .add_modifier(Modifier::BOLD)
    }

    /// Loading message
    pub fn loading() -> Style {
        Style::default()
            .fg(Self::STATUS)
            .add_modifier(Modifier::ITALIC)
    }
}
