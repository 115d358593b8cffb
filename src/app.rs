//! Session state and the navigation state machine
//!
//! `transition` is pure: it maps the current state and one line of user
//! input to the next state plus at most one [`Effect`] for the navigator to
//! carry out. Effects that succeed feed their results back through the
//! `show_*` methods.

use crate::models::{Entry, FileEntry, HistoryRecord};

/// Rows reserved above the results list
pub const RESULTS_HEADER_ALLOWANCE: usize = 2;

/// Screen rows the list never gets: header, blank, notice, prompt
pub const FRAME_ROWS: usize = 4;

/// Inputs that open the watch history from the search prompt
pub const HISTORY_TOKENS: &[&str] = &["h", "H", "history"];

// =============================================================================
// Stage & Mode
// =============================================================================

/// Current modal screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Query or link prompt
    #[default]
    Search,
    /// Search results
    Results,
    /// Files inside the selected manifest
    Files,
    /// Watch history
    History,
}

impl Stage {
    /// Screen lines one list item takes
    pub fn lines_per_item(self) -> usize {
        match self {
            Stage::Results | Stage::History => 2,
            Stage::Search | Stage::Files => 1,
        }
    }
}

/// Entry point the session was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Search nyaa.si, pick a torrent, pick a file
    #[default]
    Search,
    /// Paste a link, pick a file (or `a` for everything)
    Link,
    /// Paste a link and stream the whole thing right away
    Stream,
}

// =============================================================================
// Effects
// =============================================================================

/// A manifest the navigator should resolve into files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Known title, `None` for pasted links
    pub title: Option<String>,
    pub manifest: String,
    /// Where `b` returns to from the file list
    pub origin: Stage,
    /// File to suggest in the prompt
    pub last_picked: Option<u32>,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Search(String),
    LoadHistory,
    Resolve(ResolveRequest),
    /// Record and play one file of the active manifest
    Play(FileEntry),
    /// Stream the whole active manifest with subtitles
    PlayAll,
    /// Stream a pasted link without listing it
    StreamLink(String),
}

// =============================================================================
// Session State
// =============================================================================

/// The manifest whose files are being shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveManifest {
    pub title: String,
    /// Reference as given (listing link, history record or pasted link)
    pub manifest: String,
    /// What the player is pointed at after resolution
    pub target: String,
}

/// Live navigator state, owned by the navigator for the whole run
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub mode: Mode,
    pub stage: Stage,
    pub query: String,
    pub entries: Vec<Entry>,
    pub selected_entry: Option<usize>,
    pub files: Vec<FileEntry>,
    /// Last picked file, shown in the prompt
    pub file_index: Option<u32>,
    pub show_all_entries: bool,
    pub show_all_files: bool,
    pub history: Vec<HistoryRecord>,
    pub manifest: Option<ActiveManifest>,
    /// Stage `b` returns to from the file list
    pub files_origin: Stage,
    /// One-shot message shown under the list
    pub notice: Option<String>,
    /// Recognised media extensions
    pub formats: Vec<String>,
    /// First list item on screen
    pub scroll: usize,
    /// Terminal height the last screen was drawn at; paging steps by what
    /// fit on it
    pub rows: usize,
}

impl SessionState {
    pub fn new(mode: Mode, formats: Vec<String>) -> Self {
        Self {
            mode,
            formats,
            ..Self::default()
        }
    }

    /// Search results arrived
    pub fn show_results(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
        self.selected_entry = None;
        self.stage = Stage::Results;
        self.scroll = 0;
    }

    /// A manifest resolved into files
    pub fn show_files(
        &mut self,
        manifest: ActiveManifest,
        files: Vec<FileEntry>,
        origin: Stage,
        last_picked: Option<u32>,
    ) {
        self.manifest = Some(manifest);
        self.files = files;
        self.files_origin = origin;
        self.file_index = last_picked;
        self.stage = Stage::Files;
        self.scroll = 0;
    }

    /// History records loaded
    pub fn show_history(&mut self, records: Vec<HistoryRecord>) {
        self.history = records;
        self.stage = Stage::History;
        self.scroll = 0;
    }

    /// Report a recoverable problem and stay where we are
    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    /// Results shown for a terminal `rows` tall
    pub fn visible_entries(&self, rows: usize) -> &[Entry] {
        if self.show_all_entries {
            &self.entries
        } else {
            let fit = (rows / 2).saturating_sub(RESULTS_HEADER_ALLOWANCE);
            &self.entries[..fit.min(self.entries.len())]
        }
    }

    /// Files shown: media only unless `show_all_files`
    pub fn visible_files(&self) -> Vec<&FileEntry> {
        self.files
            .iter()
            .filter(|f| self.show_all_files || f.is_media(&self.formats))
            .collect()
    }

    /// Length of the list the current stage shows
    pub fn list_len(&self, rows: usize) -> usize {
        match self.stage {
            Stage::Search => 0,
            Stage::Results => self.visible_entries(rows).len(),
            Stage::Files => self.visible_files().len(),
            Stage::History => self.history.len(),
        }
    }

    /// List items that fit on one screen `rows` tall (at least one)
    pub fn page_len(&self, rows: usize) -> usize {
        (rows.saturating_sub(FRAME_ROWS) / self.stage.lines_per_item()).max(1)
    }

    /// First item to draw, clamped so the last page is never empty
    pub fn page_start(&self, rows: usize) -> usize {
        let per_page = self.page_len(rows);
        let last_page = self.list_len(rows).saturating_sub(1) / per_page * per_page;
        self.scroll.min(last_page)
    }

    /// Whether items follow the current page
    pub fn has_next_page(&self, rows: usize) -> bool {
        self.page_start(rows) + self.page_len(rows) < self.list_len(rows)
    }

    /// Whether items precede the current page
    pub fn has_prev_page(&self, rows: usize) -> bool {
        self.page_start(rows) > 0
    }

    /// Handle `n`/`p`. Returns false for any other input.
    fn page(&mut self, input: &str) -> bool {
        let rows = self.rows;
        let start = self.page_start(rows);
        let per_page = self.page_len(rows);
        match input {
            "n" => {
                if self.has_next_page(rows) {
                    self.scroll = start + per_page;
                }
                true
            }
            "p" => {
                self.scroll = start.saturating_sub(per_page);
                true
            }
            _ => false,
        }
    }

    fn on_search(&mut self, input: &str) -> Option<Effect> {
        if input.is_empty() {
            return None;
        }
        if HISTORY_TOKENS.contains(&input) {
            return Some(Effect::LoadHistory);
        }

        match self.mode {
            Mode::Search => {
                self.query = input.to_string();
                Some(Effect::Search(input.to_string()))
            }
            Mode::Link => Some(Effect::Resolve(ResolveRequest {
                title: None,
                manifest: input.to_string(),
                origin: Stage::Search,
                last_picked: None,
            })),
            Mode::Stream => Some(Effect::StreamLink(input.to_string())),
        }
    }

    fn on_results(&mut self, input: &str) -> Option<Effect> {
        match input {
            "b" => {
                self.stage = Stage::Search;
                None
            }
            "s" => {
                self.show_all_entries = !self.show_all_entries;
                self.scroll = 0;
                None
            }
            _ => {
                let index = parse_index(input, self.entries.len())?;
                let entry = &self.entries[index];
                self.selected_entry = Some(index);
                Some(Effect::Resolve(ResolveRequest {
                    title: Some(entry.title.clone()),
                    manifest: entry.manifest.clone(),
                    origin: Stage::Results,
                    last_picked: None,
                }))
            }
        }
    }

    fn on_files(&mut self, input: &str) -> Option<Effect> {
        match input {
            "b" => {
                self.file_index = None;
                self.stage = self.files_origin;
                self.scroll = 0;
                None
            }
            "s" => {
                self.show_all_files = !self.show_all_files;
                self.scroll = 0;
                None
            }
            "a" if self.mode == Mode::Link => Some(Effect::PlayAll),
            _ => {
                let index = parse_index(input, self.files.len())?;
                let file = self
                    .files
                    .iter()
                    .find(|f| f.index as usize == index)?
                    .clone();
                self.file_index = Some(file.index);
                Some(Effect::Play(file))
            }
        }
    }

    fn on_history(&mut self, input: &str) -> Option<Effect> {
        if input == "b" {
            self.stage = Stage::Search;
            return None;
        }

        let record = &self.history[parse_index(input, self.history.len())?];
        Some(Effect::Resolve(ResolveRequest {
            title: Some(record.title.clone()),
            manifest: record.manifest.clone(),
            origin: Stage::History,
            last_picked: record.file_index(),
        }))
    }
}

/// Accept only plain non-negative integers below `len`
pub fn parse_index(input: &str, len: usize) -> Option<usize> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    input.parse().ok().filter(|&i| i < len)
}

/// Apply one line of user input.
///
/// Unrecognised input leaves the state untouched (apart from clearing the
/// previous notice) and requests nothing.
pub fn transition(mut state: SessionState, input: &str) -> (SessionState, Option<Effect>) {
    state.notice = None;
    let input = input.trim();

    if state.stage != Stage::Search && state.page(input) {
        return (state, None);
    }

    let effect = match state.stage {
        Stage::Search => state.on_search(input),
        Stage::Results => state.on_results(input),
        Stage::Files => state.on_files(input),
        Stage::History => state.on_history(input),
    };

    (state, effect)
}

// =============================================================================
// Tests
// =============================================================================
