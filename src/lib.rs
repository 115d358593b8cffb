//! nyaastream - search nyaa.si and stream torrents from the terminal
//!
//! A line-oriented terminal navigator: search a torrent index, pick a
//! torrent, pick a file, and hand it to webtorrent-cli and a local player.
//!
//! # Modules
//!
//! - `models` - Listing entries, manifest references, files, history records
//! - `api` - nyaa.si listing client
//! - `stream` - Manifest resolution, playback, transient workspace
//! - `history` - Watch history log
//! - `app` - Session state and the navigation state machine
//! - `navigator` - Drives the session against the services
//! - `ui` - Terminal rendering
//! - `config` / `cli` - Settings file and command line

pub mod models;
pub mod api;
pub mod stream;
pub mod history;
pub mod app;
pub mod navigator;
pub mod ui;
pub mod config;
pub mod cli;

// Re-export commonly used types
pub use models::{Entry, FileEntry, HistoryRecord, ManifestRef};

pub use api::{ListingProvider, NyaaClient};
pub use app::{transition, Effect, Mode, SessionState, Stage};
pub use navigator::{Console, Exit, Navigator, Services};
