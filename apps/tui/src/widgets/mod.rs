//! Reusable TUI widgets.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Bottom status bar; a spinner frame is prefixed while `busy`.
pub(crate) fn status_bar(msg: &str, busy: bool, tick: usize) -> Paragraph<'_> {
    let text = if busy {
        format!(" {} {msg}", SPINNER[tick % SPINNER.len()])
    } else {
        format!(" {msg}")
    };
    Paragraph::new(text).style(Style::default().bg(Color::DarkGray).fg(Color::White))
}
