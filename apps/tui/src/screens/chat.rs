//! "Chat" screen: transcript and question input.

use crossterm::event::{KeyCode, KeyModifiers};
use docchat_shared::{Message, Role};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub(crate) struct ChatScreen {
    history: Vec<Message>,
    /// Rendered error messages, each placed after `history[..index]`.
    notices: Vec<(usize, String)>,
    /// Question shown while its turn is in flight.
    pending: Option<String>,
    input: String,
    placeholder: String,
    /// Lines scrolled up from the bottom of the transcript.
    scroll_back: u16,
}

impl ChatScreen {
    pub(crate) fn new(placeholder: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            notices: Vec::new(),
            pending: None,
            input: String::new(),
            placeholder: placeholder.into(),
            scroll_back: 0,
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn set_history(&mut self, history: Vec<Message>) {
        self.history = history;
        self.pending = None;
        self.scroll_back = 0;
    }

    pub(crate) fn push_notice(&mut self, text: impl Into<String>) {
        self.notices.push((self.history.len(), text.into()));
        self.pending = None;
    }

    /// Handle a key; returns a question when one is submitted.
    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> Option<String> {
        match code {
            KeyCode::Enter => {
                let question = self.input.trim().to_string();
                if question.is_empty() || self.is_busy() {
                    return None;
                }
                self.input.clear();
                self.pending = Some(question.clone());
                self.scroll_back = 0;
                Some(question)
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            KeyCode::Up | KeyCode::PageUp => {
                let step = if code == KeyCode::PageUp { 10 } else { 1 };
                self.scroll_back = self.scroll_back.saturating_add(step);
                None
            }
            KeyCode::Down | KeyCode::PageDown => {
                let step = if code == KeyCode::PageDown { 10 } else { 1 };
                self.scroll_back = self.scroll_back.saturating_sub(step);
                None
            }
            _ => None,
        }
    }

    fn transcript_lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();
        let notice_style = Style::default().fg(Color::Red);

        for (i, message) in self.history.iter().enumerate() {
            self.push_notices_at(i, &mut lines, notice_style);
            push_message(&mut lines, message.role, &message.content);
        }
        self.push_notices_at(self.history.len(), &mut lines, notice_style);

        if let Some(question) = &self.pending {
            push_message(&mut lines, Role::User, question);
        }
        lines
    }

    fn push_notices_at<'a>(&'a self, index: usize, lines: &mut Vec<Line<'a>>, style: Style) {
        for (_, text) in self.notices.iter().filter(|(at, _)| *at == index) {
            lines.push(Line::from(format!("✗ {text}")).style(style));
            lines.push(Line::from(""));
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Transcript
                Constraint::Length(3), // Input
            ])
            .split(area);

        // Transcript, pinned to the bottom unless scrolled back
        let lines = self.transcript_lines();
        let inner_width = chunks[0].width.saturating_sub(2).max(1) as usize;
        let inner_height = chunks[0].height.saturating_sub(2) as usize;
        let wrapped: usize = lines
            .iter()
            .map(|l| l.width().max(1).div_ceil(inner_width))
            .sum();
        let max_offset = wrapped.saturating_sub(inner_height);
        let offset = max_offset.saturating_sub(self.scroll_back as usize);

        let transcript = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Conversation "))
            .wrap(Wrap { trim: false })
            .scroll((offset.min(u16::MAX as usize) as u16, 0));
        f.render_widget(transcript, chunks[0]);

        // Input
        let input_style = if self.is_busy() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let input_block = Block::default()
            .borders(Borders::ALL)
            .title(" Question ")
            .border_style(input_style);
        let input = if self.input.is_empty() {
            Paragraph::new(self.placeholder.as_str()).style(Style::default().fg(Color::DarkGray))
        } else {
            Paragraph::new(self.input.as_str())
        };
        f.render_widget(input.block(input_block), chunks[1]);

        if !self.is_busy() {
            let x = chunks[1].x + 1 + self.input.chars().count().min(u16::MAX as usize) as u16;
            f.set_cursor_position((x.min(chunks[1].right().saturating_sub(2)), chunks[1].y + 1));
        }
    }
}

fn push_message<'a>(lines: &mut Vec<Line<'a>>, role: Role, content: &'a str) {
    let (label, color) = match role {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("Assistant", Color::Green),
    };
    lines.push(Line::from(label).style(Style::default().fg(color).add_modifier(Modifier::BOLD)));
    for line in content.lines() {
        lines.push(Line::from(line));
    }
    lines.push(Line::from(""));
}
