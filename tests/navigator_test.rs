//! Navigator scenarios with scripted input and fake services
//!
//! Every capability is replaced by an in-memory fake that records what the
//! navigator asked of it, so each test can check both the final state and
//! the side effects (searches, resolutions, launches, history records).

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use nyaastream::api::{ListingProvider, SearchError};
use nyaastream::app::{Mode, SessionState, Stage};
use nyaastream::history::{HistoryError, HistoryLog, HistoryStore};
use nyaastream::models::{Entry, FileEntry, HistoryRecord, ManifestRef};
use nyaastream::navigator::{Console, Exit, NavError, Navigator, Outcome, Services};
use nyaastream::stream::{
    ManifestResolver, PlayError, PlayRequest, Playback, PlaybackInvoker, PlaybackMode, Resolution,
    ResolveError,
};

// =============================================================================
// Fakes
// =============================================================================

type SearchFn = dyn Fn(&str) -> Result<Vec<Entry>, SearchError> + Send + Sync;

struct FakeListing {
    respond: Box<SearchFn>,
    queries: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ListingProvider for FakeListing {
    async fn search(&self, query: &str) -> Result<Vec<Entry>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        (self.respond)(query)
    }
}

struct FakeResolver {
    files: Vec<FileEntry>,
    resolved: Arc<Mutex<Vec<ManifestRef>>>,
}

#[async_trait]
impl ManifestResolver for FakeResolver {
    async fn resolve(&self, manifest: &ManifestRef) -> Result<Resolution, ResolveError> {
        self.resolved.lock().unwrap().push(manifest.clone());
        Ok(Resolution {
            target: format!("resolved:{}", manifest),
            files: self.files.clone(),
        })
    }
}

/// What a fake playback does once started
#[derive(Clone, Copy)]
enum PlayBehavior {
    /// Exits immediately
    Finish,
    /// Fails to launch
    Fail,
    /// Runs until interrupted; the fake raises the interrupt itself
    HangUntilInterrupted,
}

struct FakePlayer {
    behavior: PlayBehavior,
    requests: Arc<Mutex<Vec<PlayRequest>>>,
    interrupt: mpsc::UnboundedSender<()>,
    stopped: Arc<AtomicBool>,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlaybackInvoker for FakePlayer {
    async fn start(&self, request: &PlayRequest) -> Result<Playback, PlayError> {
        match self.behavior {
            PlayBehavior::Fail => Err(PlayError::ToolNotFound),
            PlayBehavior::Finish => {
                self.requests.lock().unwrap().push(request.clone());
                Ok(Playback::finished())
            }
            PlayBehavior::HangUntilInterrupted => {
                self.requests.lock().unwrap().push(request.clone());
                let flag = SetOnDrop(self.stopped.clone());
                let _ = self.interrupt.send(());
                Ok(Playback::from_future(async move {
                    let _flag = flag;
                    std::future::pending::<()>().await
                }))
            }
        }
    }
}

struct FakeHistory {
    records: Arc<Mutex<Vec<HistoryRecord>>>,
    fail_append: bool,
}

impl HistoryStore for FakeHistory {
    fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        if self.fail_append {
            return Err(HistoryError::Io {
                path: "history.txt".into(),
                source: io::Error::other("disk full"),
            });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        Ok(self.records.lock().unwrap().clone())
    }
}

struct ScriptedConsole {
    lines: VecDeque<String>,
    screens: Arc<Mutex<Vec<SessionState>>>,
    statuses: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Console for ScriptedConsole {
    fn rows(&self) -> io::Result<u16> {
        Ok(24)
    }

    fn render(&mut self, state: &SessionState) -> io::Result<()> {
        self.screens.lock().unwrap().push(state.clone());
        Ok(())
    }

    fn status(&mut self, message: &str) -> io::Result<()> {
        self.statuses.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

// =============================================================================
// Harness
// =============================================================================

fn entry(title: &str, seeders: u32) -> Entry {
    Entry {
        link: format!("https://nyaa.si/view/{}", title),
        title: title.to_string(),
        manifest: format!("https://nyaa.si/download/{}.torrent", title),
        size: "1 GiB".to_string(),
        date: "2024-01-01".to_string(),
        seeders,
    }
}

fn formats() -> Vec<String> {
    vec![".mkv".to_string(), ".mp4".to_string()]
}

/// Scenario B's listing
fn scenario_b_files() -> Vec<FileEntry> {
    FileEntry::parse_listing("1 movie.mkv\ngarbage\n2 subs.srt\n")
}

struct Harness {
    mode: Mode,
    respond: Box<SearchFn>,
    files: Vec<FileEntry>,
    play: PlayBehavior,
    history: Option<Box<dyn HistoryStore>>,
    fail_append: bool,
    seeded_history: Vec<HistoryRecord>,

    queries: Arc<Mutex<Vec<String>>>,
    resolved: Arc<Mutex<Vec<ManifestRef>>>,
    requests: Arc<Mutex<Vec<PlayRequest>>>,
    records: Arc<Mutex<Vec<HistoryRecord>>>,
    screens: Arc<Mutex<Vec<SessionState>>>,
    statuses: Arc<Mutex<Vec<String>>>,
    stopped: Arc<AtomicBool>,
}

impl Harness {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            respond: Box::new(|_| {
                Ok(vec![entry("zero", 0), entry("five", 5), entry("two", 2)])
            }),
            files: vec![FileEntry::new(0, "ep01.mkv"), FileEntry::new(1, "readme.txt")],
            play: PlayBehavior::Finish,
            history: None,
            fail_append: false,
            seeded_history: Vec::new(),
            queries: Arc::default(),
            resolved: Arc::default(),
            requests: Arc::default(),
            records: Arc::default(),
            screens: Arc::default(),
            statuses: Arc::default(),
            stopped: Arc::default(),
        }
    }

    async fn run(mut self, lines: &[&str]) -> (Result<Outcome, NavError>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.records
            .lock()
            .unwrap()
            .extend(self.seeded_history.iter().cloned());

        let history: Box<dyn HistoryStore> = match self.history.take() {
            Some(history) => history,
            None => Box::new(FakeHistory {
                records: self.records.clone(),
                fail_append: self.fail_append,
            }),
        };
        let respond = std::mem::replace(&mut self.respond, Box::new(|_| Ok(Vec::new())));

        let services = Services {
            listing: Box::new(FakeListing {
                respond,
                queries: self.queries.clone(),
            }),
            resolver: Box::new(FakeResolver {
                files: self.files.clone(),
                resolved: self.resolved.clone(),
            }),
            player: Box::new(FakePlayer {
                behavior: self.play,
                requests: self.requests.clone(),
                interrupt: tx,
                stopped: self.stopped.clone(),
            }),
            history,
        };
        let console = ScriptedConsole {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            screens: self.screens.clone(),
            statuses: self.statuses.clone(),
        };

        let state = SessionState::new(self.mode, formats());
        let outcome = Navigator::new(services, console, rx).run(state).await;
        (outcome, self)
    }

    fn last_screen(&self) -> SessionState {
        self.screens.lock().unwrap().last().cloned().unwrap()
    }

    fn plays(&self) -> Vec<PlayRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().unwrap().clone()
    }
}

// =============================================================================
// Search flow
// =============================================================================

/// Scenario A: zero-seeder rows are dropped, order is kept
#[tokio::test]
async fn test_search_keeps_seeded_entries_in_order() {
    let (outcome, h) = Harness::new(Mode::Search).run(&["example"]).await;

    let outcome = outcome.unwrap();
    assert_eq!(outcome.exit, Exit::Quit);
    assert_eq!(outcome.state.stage, Stage::Results);
    let seeders: Vec<u32> = outcome.state.entries.iter().map(|e| e.seeders).collect();
    assert_eq!(seeders, [5, 2]);
    assert_eq!(*h.queries.lock().unwrap(), ["example"]);
}

#[tokio::test]
async fn test_full_search_to_playback() {
    let (outcome, h) = Harness::new(Mode::Search)
        .run(&["example", "0", "0"])
        .await;

    let state = outcome.unwrap().state;
    assert_eq!(state.stage, Stage::Files);
    assert_eq!(state.file_index, Some(0));

    assert_eq!(
        *h.resolved.lock().unwrap(),
        [ManifestRef::Direct("https://nyaa.si/download/five.torrent".into())]
    );
    assert_eq!(
        h.plays(),
        [PlayRequest::file(
            "resolved:https://nyaa.si/download/five.torrent",
            0,
            PlaybackMode::Stream
        )]
    );
    assert_eq!(
        h.records(),
        [HistoryRecord::new(
            "five",
            "https://nyaa.si/download/five.torrent",
            &FileEntry::new(0, "ep01.mkv")
        )]
    );
}

#[tokio::test]
async fn test_non_media_file_is_downloaded() {
    let (_, h) = Harness::new(Mode::Search)
        .run(&["example", "0", "1"])
        .await;

    assert_eq!(h.plays()[0].mode, PlaybackMode::Download);
}

#[tokio::test]
async fn test_all_zero_seeders_stays_in_search() {
    let mut harness = Harness::new(Mode::Search);
    harness.respond = Box::new(|_| Ok(vec![entry("dead", 0)]));

    let (outcome, h) = harness.run(&["example"]).await;

    let state = outcome.unwrap().state;
    assert_eq!(state.stage, Stage::Search);
    assert!(state.entries.is_empty());
    assert!(h.last_screen().notice.is_some());
}

#[tokio::test]
async fn test_no_results_is_recoverable() {
    let mut harness = Harness::new(Mode::Search);
    harness.respond = Box::new(|q| Err(SearchError::NoResults(q.to_string())));

    let (outcome, h) = harness.run(&["nothing", "h"]).await;

    assert_eq!(outcome.unwrap().exit, Exit::Quit);
    assert_eq!(h.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_listing_is_fatal() {
    let mut harness = Harness::new(Mode::Search);
    harness.respond = Box::new(|_| {
        Err(SearchError::MalformedRow {
            row: 0,
            field: "seeders",
        })
    });

    let (outcome, h) = harness.run(&["example", "never read"]).await;

    assert!(matches!(outcome, Err(NavError::Listing(_))));
    assert!(h.plays().is_empty());
}

#[tokio::test]
async fn test_toggle_keeps_all_entries() {
    let mut harness = Harness::new(Mode::Search);
    harness.respond = Box::new(|_| Ok((1..=40).map(|i| entry(&format!("t{}", i), i)).collect()));

    let (outcome, _) = harness.run(&["example", "s", "s", "s", "s"]).await;

    let state = outcome.unwrap().state;
    assert_eq!(state.entries.len(), 40);
    assert!(!state.show_all_entries);
    assert_eq!(state.stage, Stage::Results);
}

fn forty_results(harness: &mut Harness) {
    harness.respond = Box::new(|_| Ok((1..=40).map(|i| entry(&format!("t{}", i), i)).collect()));
}

#[tokio::test]
async fn test_show_all_pages_to_the_last_result() {
    let mut harness = Harness::new(Mode::Search);
    forty_results(&mut harness);

    let (outcome, _) = harness.run(&["example", "s", "n", "n", "n", "n"]).await;

    // 24 rows: ten results per page
    let state = outcome.unwrap().state;
    assert_eq!(state.rows, 24);
    assert_eq!(state.page_start(24), 30);
    assert!(!state.has_next_page(24));
}

#[tokio::test]
async fn test_selection_on_later_page_is_absolute() {
    let mut harness = Harness::new(Mode::Search);
    forty_results(&mut harness);

    let (outcome, h) = harness.run(&["example", "s", "n", "n", "35"]).await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Files);
    assert_eq!(
        *h.resolved.lock().unwrap(),
        [ManifestRef::Direct("https://nyaa.si/download/t36.torrent".into())]
    );
}

#[tokio::test]
async fn test_out_of_range_result_does_nothing() {
    let (outcome, h) = Harness::new(Mode::Search)
        .run(&["example", "2", "-1", "abc"])
        .await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Results);
    assert!(h.resolved.lock().unwrap().is_empty());
}

// =============================================================================
// File selection
// =============================================================================

/// Scenario C: index equal to the list length is ignored
#[tokio::test]
async fn test_file_index_equal_to_len_is_ignored() {
    let mut harness = Harness::new(Mode::Search);
    harness.files = scenario_b_files();

    let (outcome, h) = harness.run(&["example", "0", "2"]).await;

    let state = outcome.unwrap().state;
    assert_eq!(state.stage, Stage::Files);
    assert_eq!(state.file_index, None);
    assert!(h.plays().is_empty());
    assert!(h.records().is_empty());
}

#[tokio::test]
async fn test_back_from_files_returns_to_results() {
    let (outcome, _) = Harness::new(Mode::Search)
        .run(&["example", "0", "0", "b"])
        .await;

    let state = outcome.unwrap().state;
    assert_eq!(state.stage, Stage::Results);
    assert_eq!(state.file_index, None);
}

#[tokio::test]
async fn test_select_all_ignored_outside_link_mode() {
    let (outcome, h) = Harness::new(Mode::Search)
        .run(&["example", "0", "a"])
        .await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Files);
    assert!(h.plays().is_empty());
}

#[tokio::test]
async fn test_launch_failure_records_nothing() {
    let mut harness = Harness::new(Mode::Search);
    harness.play = PlayBehavior::Fail;

    let (outcome, h) = harness.run(&["example", "0", "0"]).await;

    let state = outcome.unwrap().state;
    assert_eq!(state.stage, Stage::Files);
    assert!(h.records().is_empty());
    assert!(h.last_screen().notice.unwrap().contains("webtorrent"));
}

#[tokio::test]
async fn test_history_write_failure_still_plays() {
    let mut harness = Harness::new(Mode::Search);
    harness.fail_append = true;

    let (outcome, h) = harness.run(&["example", "0", "0"]).await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Files);
    assert_eq!(h.plays().len(), 1);
    assert!(h
        .last_screen()
        .notice
        .unwrap()
        .starts_with("Could not record history"));
}

/// Scenario D: recording disabled leaves the file untouched
#[tokio::test]
async fn test_disabled_history_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.txt");
    std::fs::write(&path, "old||magnet:?xt=1||0 a.mkv\n").unwrap();
    let before = std::fs::read(&path).unwrap();

    let mut harness = Harness::new(Mode::Search);
    harness.history = Some(Box::new(HistoryLog::open(&path, false).unwrap()));

    let (outcome, h) = harness.run(&["example", "0", "0"]).await;

    assert_eq!(outcome.unwrap().state.file_index, Some(0));
    assert_eq!(h.plays().len(), 1);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

// =============================================================================
// Interrupts
// =============================================================================

#[tokio::test]
async fn test_interrupt_during_playback_returns_to_files() {
    let mut harness = Harness::new(Mode::Search);
    harness.play = PlayBehavior::HangUntilInterrupted;

    let (outcome, h) = harness.run(&["example", "0", "0"]).await;

    let outcome = outcome.unwrap();
    assert_eq!(outcome.exit, Exit::Quit);
    assert_eq!(outcome.state.stage, Stage::Files);
    assert!(h.stopped.load(Ordering::SeqCst));
    assert_eq!(*h.statuses.lock().unwrap().last().unwrap(), "Stopping stream");
    assert_eq!(h.records().len(), 1);
}

#[tokio::test]
async fn test_interrupt_at_prompt_ends_session() {
    struct Interrupting(mpsc::UnboundedSender<()>);

    #[async_trait]
    impl Console for Interrupting {
        fn rows(&self) -> io::Result<u16> {
            Ok(24)
        }
        fn render(&mut self, _state: &SessionState) -> io::Result<()> {
            Ok(())
        }
        fn status(&mut self, _message: &str) -> io::Result<()> {
            Ok(())
        }
        fn release(&mut self) -> io::Result<()> {
            Ok(())
        }
        async fn read_line(&mut self) -> io::Result<Option<String>> {
            let _ = self.0.send(());
            std::future::pending().await
        }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let records = Arc::new(Mutex::new(Vec::new()));
    let services = Services {
        listing: Box::new(FakeListing {
            respond: Box::new(|_| Ok(Vec::new())),
            queries: Arc::default(),
        }),
        resolver: Box::new(FakeResolver {
            files: Vec::new(),
            resolved: Arc::default(),
        }),
        player: Box::new(FakePlayer {
            behavior: PlayBehavior::Finish,
            requests: Arc::default(),
            interrupt: tx.clone(),
            stopped: Arc::default(),
        }),
        history: Box::new(FakeHistory {
            records,
            fail_append: false,
        }),
    };

    let outcome = Navigator::new(services, Interrupting(tx), rx)
        .run(SessionState::new(Mode::Search, formats()))
        .await
        .unwrap();

    assert_eq!(outcome.exit, Exit::Interrupted);
    assert_eq!(outcome.state.stage, Stage::Search);
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_empty_history_stays_in_search() {
    let (outcome, h) = Harness::new(Mode::Search).run(&["history"]).await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Search);
    assert_eq!(
        h.last_screen().notice.as_deref(),
        Some("No watch history yet")
    );
}

#[tokio::test]
async fn test_history_replay_resolves_and_suggests_last_file() {
    let mut harness = Harness::new(Mode::Search);
    harness.seeded_history = vec![HistoryRecord::new(
        "Frieren",
        "magnet:?xt=urn:btih:abc",
        &FileEntry::new(1, "readme.txt"),
    )];

    let (outcome, h) = harness.run(&["h", "0"]).await;

    let state = outcome.unwrap().state;
    assert_eq!(state.stage, Stage::Files);
    assert_eq!(state.file_index, Some(1));
    assert_eq!(state.files_origin, Stage::History);
    assert_eq!(
        *h.resolved.lock().unwrap(),
        [ManifestRef::Magnet("magnet:?xt=urn:btih:abc".into())]
    );
}

#[tokio::test]
async fn test_back_from_replayed_files_returns_to_history() {
    let mut harness = Harness::new(Mode::Search);
    harness.seeded_history = vec![HistoryRecord::new(
        "Frieren",
        "magnet:?xt=urn:btih:abc",
        &FileEntry::new(0, "ep01.mkv"),
    )];

    let (outcome, _) = harness.run(&["H", "0", "b", "b"]).await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Search);
}

// =============================================================================
// Direct link modes
// =============================================================================

/// Scenario E: magnets go to the resolver untouched
#[tokio::test]
async fn test_link_mode_magnet_resolved_unchanged() {
    let magnet = "magnet:?xt=urn:btih:deadbeef&dn=Some+Show";
    let (outcome, h) = Harness::new(Mode::Link).run(&[magnet]).await;

    let state = outcome.unwrap().state;
    assert_eq!(state.stage, Stage::Files);
    assert_eq!(state.manifest.unwrap().title, "Some Show");
    assert_eq!(*h.resolved.lock().unwrap(), [ManifestRef::Magnet(magnet.into())]);
}

#[tokio::test]
async fn test_link_mode_rejects_other_references() {
    let (outcome, h) = Harness::new(Mode::Link)
        .run(&["https://example.com/page.html"])
        .await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Search);
    assert!(h.resolved.lock().unwrap().is_empty());
    assert!(h.last_screen().notice.unwrap().contains("Try again"));
}

#[tokio::test]
async fn test_link_mode_select_all_streams_with_subtitles() {
    let (outcome, h) = Harness::new(Mode::Link)
        .run(&["magnet:?xt=urn:btih:1", "a"])
        .await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Files);
    assert_eq!(
        h.plays(),
        [PlayRequest::all("resolved:magnet:?xt=urn:btih:1")]
    );
    assert!(h.records().is_empty());
}

#[tokio::test]
async fn test_link_mode_back_returns_to_search() {
    let (outcome, _) = Harness::new(Mode::Link)
        .run(&["magnet:?xt=urn:btih:1", "b"])
        .await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Search);
}

#[tokio::test]
async fn test_stream_mode_plays_link_directly() {
    let (outcome, h) = Harness::new(Mode::Stream)
        .run(&["https://nyaa.si/download/9.torrent"])
        .await;

    assert_eq!(outcome.unwrap().state.stage, Stage::Search);
    assert!(h.resolved.lock().unwrap().is_empty());
    assert_eq!(
        h.plays(),
        [PlayRequest::all("https://nyaa.si/download/9.torrent")]
    );
}
