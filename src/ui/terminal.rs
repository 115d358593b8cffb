//! Line-oriented terminal console
//!
//! Screens are drawn with ratatui but input stays in cooked mode: the user
//! types a line at the prompt and presses Enter. No raw mode and no
//! alternate screen, so the player can take over the same terminal. The
//! screen is cleared again when the console goes away.

use async_trait::async_trait;
use crossterm::{
    cursor::{MoveTo, Show},
    execute,
    terminal::{Clear, ClearType},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::app::SessionState;
use crate::navigator::Console;
use crate::ui::screen;

/// Console reading stdin and drawing to `W` (stdout outside tests)
pub struct TerminalConsole<W: Write = Stdout> {
    terminal: Terminal<CrosstermBackend<W>>,
    input: Lines<BufReader<Stdin>>,
}

impl TerminalConsole {
    pub fn new() -> io::Result<Self> {
        Ok(Self::with_terminal(Terminal::new(CrosstermBackend::new(
            io::stdout(),
        ))?))
    }
}

impl<W: Write> TerminalConsole<W> {
    pub fn with_terminal(terminal: Terminal<CrosstermBackend<W>>) -> Self {
        Self {
            terminal,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Blank screen, cursor home and visible
    fn clear_screen(&mut self) -> io::Result<()> {
        execute!(
            self.terminal.backend_mut(),
            Clear(ClearType::All),
            MoveTo(0, 0),
            Show
        )
    }
}

impl<W: Write> Drop for TerminalConsole<W> {
    fn drop(&mut self) {
        if let Err(e) = self.clear_screen() {
            tracing::debug!(error = %e, "could not clear terminal");
        }
    }
}

#[async_trait]
impl<W: Write + Send> Console for TerminalConsole<W> {
    fn rows(&self) -> io::Result<u16> {
        Ok(self.terminal.size()?.height)
    }

    fn render(&mut self, state: &SessionState) -> io::Result<()> {
        self.terminal.clear()?;
        self.terminal.draw(|frame| screen::render(frame, state))?;
        Ok(())
    }

    fn status(&mut self, message: &str) -> io::Result<()> {
        self.terminal.clear()?;
        self.terminal.draw(|frame| screen::render_status(frame, message))?;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        // The player's output starts at the top
        self.clear_screen()
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.input.next_line().await
    }
}
