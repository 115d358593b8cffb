//! CLI - Command Line Interface for nyaastream
//!
//! Every mode is interactive; the subcommand only picks where the session
//! starts.
//!
//! # Examples
//!
//! ```bash
//! # Search nyaa.si, pick a torrent, pick a file
//! nyaastream
//!
//! # Paste a .torrent URL or magnet link and pick files from it
//! nyaastream link
//!
//! # Paste a link and stream the whole thing
//! nyaastream stream --config ~/nyaastream.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::app::Mode;

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Normal quit, end of input, or Ctrl-C
    Success = 0,
    /// Unrecovered failure
    Error = 1,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// nyaastream - stream anime torrents from nyaa.si in your terminal
///
/// Run without arguments to search nyaa.si.
#[derive(Parser, Debug)]
#[command(
    name = "nyaastream",
    version,
    about = "Search nyaa.si and stream torrents through webtorrent",
    long_about = "Search nyaa.si, pick a torrent and a file, and stream it \
                  to a local player through webtorrent-cli.\n\n\
                  Run without arguments to start a search.\n\
                  Requires webtorrent-cli (npm install -g webtorrent-cli).",
    after_help = "EXAMPLES:\n\
                  nyaastream                      Search nyaa.si\n\
                  nyaastream link                 Pick files from a torrent or magnet link\n\
                  nyaastream stream               Stream a whole torrent or magnet link"
)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Entry point (omit to search nyaa.si)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Session mode selected on the command line
    pub fn mode(&self) -> Mode {
        match self.command {
            None => Mode::Search,
            Some(Command::Link) => Mode::Link,
            Some(Command::Stream) => Mode::Stream,
        }
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enter a .torrent URL or magnet link and choose files from it
    #[command(visible_alias = "l")]
    Link,

    /// Enter a .torrent URL or magnet link and stream all of it
    #[command(visible_alias = "s")]
    Stream,
}
