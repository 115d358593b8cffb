//! Terminal UI
//!
//! Built with ratatui. One screen per navigation stage, redrawn after
//! every line of input.

pub mod screen;
pub mod terminal;
pub mod theme;

pub use terminal::TerminalConsole;
pub use theme::Theme;
