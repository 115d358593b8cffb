//! Interactive session driver
//!
//! Owns the [`SessionState`], feeds each input line through
//! [`transition`], and carries out the returned [`Effect`] against the
//! injected services. Ctrl-C arrives on an mpsc channel: during playback it
//! stops the stream and returns to the file list, anywhere else it ends the
//! session.

use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::{ListingProvider, SearchError};
use crate::app::{transition, ActiveManifest, Effect, ResolveRequest, SessionState};
use crate::history::HistoryStore;
use crate::models::{retain_seeded, FileEntry, HistoryRecord, ManifestRef};
use crate::stream::{ManifestResolver, PlayRequest, PlaybackInvoker, PlaybackMode};

/// Delay before discarding interrupts that raced playback exit
const INTERRUPT_SETTLE: Duration = Duration::from_millis(100);

/// Receiving end of the Ctrl-C forwarder
pub type Interrupts = mpsc::UnboundedReceiver<()>;

/// Where the user talks to the navigator
#[async_trait]
pub trait Console: Send {
    /// Terminal height in rows
    fn rows(&self) -> io::Result<u16>;

    /// Redraw the screen for `state`
    fn render(&mut self, state: &SessionState) -> io::Result<()>;

    /// Show a transient message while something slow runs
    fn status(&mut self, message: &str) -> io::Result<()>;

    /// Hand the terminal to a child process
    fn release(&mut self) -> io::Result<()>;

    /// Next input line, `None` at end of input
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// External capabilities the navigator drives
pub struct Services {
    pub listing: Box<dyn ListingProvider>,
    pub resolver: Box<dyn ManifestResolver>,
    pub player: Box<dyn PlaybackInvoker>,
    pub history: Box<dyn HistoryStore>,
}

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// End of input
    Quit,
    /// Ctrl-C outside playback
    Interrupted,
}

/// Final exit reason plus the state at that point
#[derive(Debug)]
pub struct Outcome {
    pub exit: Exit,
    pub state: SessionState,
}

/// Errors that end the session abnormally
#[derive(Debug, Error)]
pub enum NavError {
    #[error("{0}")]
    Listing(#[source] SearchError),
    #[error("Terminal error: {0}")]
    Console(#[from] io::Error),
}

enum Step {
    Continue(SessionState),
    Interrupted(SessionState),
}

/// Run `fut` unless an interrupt arrives first
async fn guarded<F: Future>(interrupts: &mut Interrupts, fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        Some(()) = interrupts.recv() => None,
    }
}

/// The interactive session
pub struct Navigator<C: Console> {
    services: Services,
    console: C,
    interrupts: Interrupts,
}

impl<C: Console> Navigator<C> {
    pub fn new(services: Services, console: C, interrupts: Interrupts) -> Self {
        Self {
            services,
            console,
            interrupts,
        }
    }

    /// Drive the session until end of input or Ctrl-C.
    ///
    /// Only an unparseable listing page or a broken terminal ends it with
    /// an error; every other failure becomes a notice.
    pub async fn run(mut self, mut state: SessionState) -> Result<Outcome, NavError> {
        tracing::info!(mode = ?state.mode, "session started");

        loop {
            state.rows = self.console.rows()? as usize;
            self.console.render(&state)?;

            let line = match guarded(&mut self.interrupts, self.console.read_line()).await {
                Some(line) => line?,
                None => return Ok(Self::finish(Exit::Interrupted, state)),
            };
            let Some(line) = line else {
                return Ok(Self::finish(Exit::Quit, state));
            };

            let (next, effect) = transition(state, &line);
            state = next;

            if let Some(effect) = effect {
                tracing::debug!(?effect, stage = ?state.stage, "applying effect");
                match self.apply(state, effect).await? {
                    Step::Continue(next) => state = next,
                    Step::Interrupted(last) => {
                        return Ok(Self::finish(Exit::Interrupted, last))
                    }
                }
            }
        }
    }

    fn finish(exit: Exit, state: SessionState) -> Outcome {
        tracing::info!(?exit, stage = ?state.stage, "session ended");
        Outcome { exit, state }
    }

    async fn apply(&mut self, state: SessionState, effect: Effect) -> Result<Step, NavError> {
        match effect {
            Effect::Search(query) => self.search(state, query).await,
            Effect::LoadHistory => Ok(Step::Continue(self.load_history(state))),
            Effect::Resolve(request) => self.resolve(state, request).await,
            Effect::Play(file) => self.play_file(state, file).await.map(Step::Continue),
            Effect::PlayAll => self.play_all(state).await.map(Step::Continue),
            Effect::StreamLink(link) => self.stream_link(state, link).await.map(Step::Continue),
        }
    }

    async fn search(&mut self, mut state: SessionState, query: String) -> Result<Step, NavError> {
        self.console
            .status(&format!("Searching nyaa.si for '{}'...", query))?;

        let Some(result) = guarded(&mut self.interrupts, self.services.listing.search(&query)).await
        else {
            return Ok(Step::Interrupted(state));
        };

        match result {
            Ok(entries) => {
                let entries = retain_seeded(entries);
                if entries.is_empty() {
                    state.set_notice(format!("No seeded results for '{}'", query));
                } else {
                    tracing::info!(count = entries.len(), %query, "search results");
                    state.show_results(entries);
                }
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "listing page could not be parsed");
                return Err(NavError::Listing(e));
            }
            Err(e) => {
                tracing::warn!(error = %e, %query, "search failed");
                state.set_notice(e.to_string());
            }
        }

        Ok(Step::Continue(state))
    }

    fn load_history(&mut self, mut state: SessionState) -> SessionState {
        match self.services.history.load_all() {
            Ok(records) if records.is_empty() => state.set_notice("No watch history yet"),
            Ok(records) => state.show_history(records),
            Err(e) => {
                tracing::warn!(error = %e, "could not read history");
                state.set_notice(e.to_string());
            }
        }
        state
    }

    async fn resolve(
        &mut self,
        mut state: SessionState,
        request: ResolveRequest,
    ) -> Result<Step, NavError> {
        let manifest = match ManifestRef::classify(&request.manifest) {
            Ok(manifest) => manifest,
            Err(e) => {
                state.set_notice(format!("{}. Try again.", e));
                return Ok(Step::Continue(state));
            }
        };
        let title = request
            .title
            .unwrap_or_else(|| manifest.display_name());

        self.console.status(&format!("Fetching file list for {}...", title))?;

        let Some(result) = guarded(&mut self.interrupts, self.services.resolver.resolve(&manifest)).await
        else {
            return Ok(Step::Interrupted(state));
        };

        match result {
            Ok(resolution) if resolution.files.is_empty() => {
                state.set_notice(format!("No files found in {}", title));
            }
            Ok(resolution) => state.show_files(
                ActiveManifest {
                    title,
                    manifest: manifest.as_str().to_string(),
                    target: resolution.target,
                },
                resolution.files,
                request.origin,
                request.last_picked,
            ),
            Err(e) => {
                tracing::warn!(error = %e, %title, "could not resolve manifest");
                state.set_notice(e.to_string());
            }
        }

        Ok(Step::Continue(state))
    }

    async fn play_file(
        &mut self,
        mut state: SessionState,
        file: FileEntry,
    ) -> Result<SessionState, NavError> {
        let Some(active) = state.manifest.clone() else {
            state.set_notice("Nothing selected to play");
            return Ok(state);
        };

        let mode = PlaybackMode::for_file(&file, &state.formats);
        let request = PlayRequest::file(&active.target, file.index, mode);
        let record = HistoryRecord::new(&active.title, &active.manifest, &file);
        self.play(&mut state, request, Some(record)).await?;
        Ok(state)
    }

    async fn play_all(&mut self, mut state: SessionState) -> Result<SessionState, NavError> {
        let Some(active) = state.manifest.clone() else {
            state.set_notice("Nothing selected to play");
            return Ok(state);
        };

        self.play(&mut state, PlayRequest::all(&active.target), None)
            .await?;
        Ok(state)
    }

    async fn stream_link(
        &mut self,
        mut state: SessionState,
        link: String,
    ) -> Result<SessionState, NavError> {
        match ManifestRef::classify(&link) {
            Ok(manifest) => {
                self.play(&mut state, PlayRequest::all(manifest.as_str()), None)
                    .await?
            }
            Err(e) => state.set_notice(format!("{}. Try again.", e)),
        }
        Ok(state)
    }

    /// Launch, record, then wait. Ctrl-C stops only the player.
    async fn play(
        &mut self,
        state: &mut SessionState,
        request: PlayRequest,
        record: Option<HistoryRecord>,
    ) -> Result<(), NavError> {
        self.console.release()?;

        let playback = match self.services.player.start(&request).await {
            Ok(playback) => playback,
            Err(e) => {
                tracing::warn!(error = %e, "playback failed to start");
                state.set_notice(e.to_string());
                return Ok(());
            }
        };

        if let Some(record) = record {
            if let Err(e) = self.services.history.append(&record) {
                tracing::warn!(error = %e, "could not record history");
                state.set_notice(format!("Could not record history: {}", e));
            }
        }

        tokio::select! {
            _ = playback.wait() => {}
            Some(()) = self.interrupts.recv() => {
                tracing::info!("playback interrupted");
                self.console.status("Stopping stream")?;
            }
        }

        // The player shares our process group, so the same Ctrl-C that
        // closed it may still be on its way to us
        tokio::time::sleep(INTERRUPT_SETTLE).await;
        while self.interrupts.try_recv().is_ok() {}

        Ok(())
    }
}
