//! "Knowledge" screen: what the assistant currently knows.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use crate::worker::KnowledgeSummary;

pub(crate) struct KnowledgeScreen {
    summary: Option<KnowledgeSummary>,
    model: String,
    refreshing: bool,
}

impl KnowledgeScreen {
    pub(crate) fn new() -> Self {
        Self {
            summary: None,
            model: String::new(),
            refreshing: false,
        }
    }

    pub(crate) fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub(crate) fn set_summary(&mut self, summary: KnowledgeSummary) {
        self.summary = Some(summary);
        self.refreshing = false;
    }

    /// A reload failed; the current summary stays valid.
    pub(crate) fn refresh_failed(&mut self) {
        self.refreshing = false;
    }

    /// Returns `true` when the user asked for a rebuild.
    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> bool {
        if code == KeyCode::Char('r') && self.summary.is_some() && !self.refreshing {
            self.refreshing = true;
            return true;
        }
        false
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6), // Summary
                Constraint::Min(1),    // Document list
            ])
            .split(area);

        let Some(summary) = &self.summary else {
            let waiting = Paragraph::new("Building the knowledge base…")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title(" Knowledge "));
            f.render_widget(waiting, area);
            return;
        };

        let label = Style::default().fg(Color::Cyan);
        let hint = if self.refreshing {
            "Refreshing…"
        } else {
            "Press r to reload the folder"
        };
        let info = vec![
            Line::from(vec![Span::styled("Folder:    ", label), Span::raw(&summary.folder_id)]),
            Line::from(vec![
                Span::styled("Documents: ", label),
                Span::raw(summary.documents.len().to_string()),
            ]),
            Line::from(vec![
                Span::styled("Size:      ", label),
                Span::raw(format!("{} bytes", summary.bytes)),
            ]),
            Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
        ];
        let header = Paragraph::new(info).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Knowledge · {} ", self.model)),
        );
        f.render_widget(header, chunks[0]);

        let items: Vec<ListItem> = summary
            .documents
            .iter()
            .map(|name| ListItem::new(format!("  {name}")))
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Documents "));
        f.render_widget(list, chunks[1]);
    }
}
