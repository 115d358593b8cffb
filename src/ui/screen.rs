//! One screen per navigation stage
//!
//! Layout, top to bottom: header, blank, list, notice, prompt. The prompt
//! sits on the last row and the cursor is left right after it so the user
//! types in place. Lists longer than the screen are drawn a page at a time.

use ratatui::{
    prelude::*,
    widgets::Paragraph,
};

use crate::app::{Mode, SessionState, Stage};
use crate::ui::Theme;

/// Columns kept free to the left of a title
pub const TITLE_OFFSET: usize = 6;

/// Width the `[n]` key column is padded to
pub const KEY_COLUMN: usize = 5;

/// Shorten `label` to fit `width` columns minus `offset`, marking the cut.
pub fn truncate(label: &str, width: usize, offset: usize) -> String {
    let room = width.saturating_sub(offset);
    if label.chars().count() <= room {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(room.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// `"3"` becomes `[3]`, `"back"` becomes `[b]ack`
pub fn key_label(command: &str) -> Vec<Span<'static>> {
    if command.chars().all(|c| c.is_ascii_digit()) {
        return vec![Span::styled(format!("[{}]", command), Theme::keybind())];
    }

    let mut chars = command.chars();
    let first = chars.next().map(String::from).unwrap_or_default();
    vec![
        Span::styled(format!("[{}]", first), Theme::keybind()),
        Span::styled(chars.as_str().to_string(), Theme::keybind_desc()),
    ]
}

fn key_column(index: usize) -> Span<'static> {
    Span::styled(
        format!("{:<width$}", format!("[{}]", index), width = KEY_COLUMN),
        Theme::keybind(),
    )
}

/// Header text for the current stage
pub fn header(state: &SessionState) -> String {
    match state.stage {
        Stage::Search => "Ctrl-C to exit".to_string(),
        Stage::Results => format!("Search results for '{}':", state.query),
        Stage::Files => state
            .manifest
            .as_ref()
            .map(|m| m.title.clone())
            .unwrap_or_default(),
        Stage::History => "Watch History".to_string(),
    }
}

/// `, [n]ext page, [p]rev page` for whichever way there is more to see
fn paging(state: &SessionState, rows: usize) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    if state.has_next_page(rows) {
        spans.push(Span::raw(", "));
        spans.extend(key_label("next page"));
    }
    if state.has_prev_page(rows) {
        spans.push(Span::raw(", "));
        spans.extend(key_label("prev page"));
    }
    spans
}

/// Prompt for the current stage on a terminal `rows` tall
pub fn prompt(state: &SessionState, rows: usize) -> Line<'static> {
    let mut spans = Vec::new();
    match state.stage {
        Stage::Search => {
            spans.push(Span::raw(match state.mode {
                Mode::Search => "Search nyaa.si or ",
                Mode::Link => "Enter torrent or magnet link or ",
                Mode::Stream => "Enter torrent or magnet link to stream or ",
            }));
            spans.extend(key_label("history"));
        }
        Stage::Results => {
            spans.extend(key_label("back"));
            spans.push(Span::raw(", "));
            spans.extend(key_label("show all"));
            spans.extend(paging(state, rows));
            spans.push(Span::raw(", or Choose torrent"));
        }
        Stage::Files => {
            spans.extend(key_label("back"));
            spans.push(Span::raw(", "));
            spans.extend(key_label("show all"));
            if state.mode == Mode::Link {
                spans.push(Span::raw(", select "));
                spans.extend(key_label("all"));
            }
            spans.extend(paging(state, rows));
            spans.push(Span::raw(", or Choose file"));
            if let Some(last) = state.file_index {
                spans.push(Span::styled(format!(" ({})", last), Theme::dimmed()));
            }
        }
        Stage::History => {
            spans.extend(key_label("back"));
            let pages = paging(state, rows);
            if pages.is_empty() {
                spans.push(Span::raw(" or Select entry"));
            } else {
                spans.extend(pages);
                spans.push(Span::raw(", or Select entry"));
            }
        }
    }
    spans.push(Span::raw(": "));
    Line::from(spans)
}

/// List lines of the current page. `rows` is the terminal height.
pub fn body(state: &SessionState, width: usize, rows: usize) -> Vec<Line<'static>> {
    let indent = " ".repeat(KEY_COLUMN);
    let start = state.page_start(rows);
    let per_page = state.page_len(rows);
    match state.stage {
        Stage::Search => Vec::new(),
        Stage::Results => state
            .visible_entries(rows)
            .iter()
            .enumerate()
            .skip(start)
            .take(per_page)
            .flat_map(|(i, entry)| {
                [
                    Line::from(vec![
                        key_column(i),
                        Span::styled(truncate(&entry.title, width, TITLE_OFFSET), Theme::title()),
                    ]),
                    Line::from(vec![
                        Span::raw(indent.clone()),
                        Span::styled(entry.info(), Theme::dimmed()),
                    ]),
                ]
            })
            .collect(),
        Stage::Files => state
            .visible_files()
            .into_iter()
            .skip(start)
            .take(per_page)
            .map(|file| {
                let mut spans = key_label(&file.index.to_string());
                spans.push(Span::raw(" "));
                spans.push(Span::styled(
                    truncate(&file.name, width, TITLE_OFFSET),
                    Theme::title(),
                ));
                Line::from(spans)
            })
            .collect(),
        Stage::History => state
            .history
            .iter()
            .enumerate()
            .skip(start)
            .take(per_page)
            .flat_map(|(i, record)| {
                [
                    Line::from(vec![
                        key_column(i),
                        Span::styled(truncate(&record.title, width, TITLE_OFFSET), Theme::title()),
                    ]),
                    Line::from(vec![
                        Span::raw(indent.clone()),
                        Span::styled(
                            truncate(record.file_name(), width, TITLE_OFFSET + KEY_COLUMN),
                            Theme::dimmed(),
                        ),
                    ]),
                ]
            })
            .collect(),
    }
}

/// Draw the whole screen for `state`
pub fn render(frame: &mut Frame, state: &SessionState) {
    let area = frame.area();
    let width = area.width as usize;

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(Span::styled(truncate(&header(state), width, 0), Theme::header())),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(body(state, width, area.height as usize)),
        chunks[2],
    );

    if let Some(notice) = &state.notice {
        frame.render_widget(
            Paragraph::new(Span::styled(truncate(notice, width, 0), Theme::notice())),
            chunks[3],
        );
    }

    let prompt = prompt(state, area.height as usize);
    let cursor_x = (prompt.width() as u16).min(area.width.saturating_sub(1));
    frame.render_widget(Paragraph::new(prompt), chunks[4]);
    frame.set_cursor_position((chunks[4].x + cursor_x, chunks[4].y));
}

/// Replace the screen with a single progress or status line
pub fn render_status(frame: &mut Frame, message: &str) {
    let area = frame.area();
    frame.render_widget(
        Paragraph::new(Span::styled(
            truncate(message, area.width as usize, 0),
            Theme::loading(),
        )),
        area,
    );
}
