//! Core TUI application state and event loop.

use std::io;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use docchat_shared::AppSection;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError};

use crate::screens::{ChatScreen, KnowledgeScreen, ScreenId};
use crate::widgets::status_bar;
use crate::worker::{Request, WorkerEvent};

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Loading,
    Ready,
    Thinking,
    /// A fatal error stopped the worker; only quitting is left.
    Halted,
}

/// Application state.
pub(crate) struct App {
    /// Currently active screen tab.
    pub active_tab: usize,
    pub should_quit: bool,
    pub phase: Phase,
    /// Status message shown in bottom bar.
    pub status: String,
    pub show_help: bool,
    /// Spinner frame counter.
    pub tick: usize,
    title: String,
    caption: String,
    chat: ChatScreen,
    knowledge: KnowledgeScreen,
    requests: UnboundedSender<Request>,
}

impl App {
    pub(crate) fn new(section: &AppSection, requests: UnboundedSender<Request>) -> Self {
        Self {
            active_tab: 0,
            should_quit: false,
            phase: Phase::Loading,
            status: "Loading knowledge base…".to_string(),
            show_help: false,
            tick: 0,
            title: format!("{} {}", section.icon, section.title),
            caption: section.caption.clone(),
            chat: ChatScreen::new(section.chat_input_placeholder.clone()),
            knowledge: KnowledgeScreen::new(),
            requests,
        }
    }

    fn current(&self) -> ScreenId {
        ScreenId::ALL[self.active_tab]
    }

    fn is_editing(&self) -> bool {
        self.current() == ScreenId::Chat && self.phase == Phase::Ready
    }

    fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Loading | Phase::Thinking)
    }

    fn send(&mut self, request: Request) {
        if self.requests.send(request).is_err() {
            self.phase = Phase::Halted;
            self.status = "The session worker has stopped. Press Ctrl-Q to quit.".to_string();
        }
    }

    /// Fold a worker update into the UI state.
    pub(crate) fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress(message) => self.status = message,
            WorkerEvent::Ready {
                history,
                summary,
                model,
            } => {
                self.status = format!(
                    "Ready · {} documents · press F1 for help",
                    summary.documents.len()
                );
                self.chat.set_history(history);
                self.knowledge.set_model(model);
                self.knowledge.set_summary(summary);
                self.phase = Phase::Ready;
            }
            WorkerEvent::Turn { history, error } => {
                self.chat.set_history(history);
                match error {
                    Some(message) => {
                        self.status = "The last question failed".to_string();
                        self.chat.push_notice(message);
                    }
                    None => self.status = "Ready".to_string(),
                }
                self.phase = Phase::Ready;
            }
            WorkerEvent::Refreshed(summary) => {
                self.status = format!("Knowledge reloaded · {} documents", summary.documents.len());
                self.knowledge.set_summary(summary);
                self.phase = Phase::Ready;
            }
            WorkerEvent::RefreshFailed(message) => {
                self.status = format!("Reload failed, keeping the current knowledge · {message}");
                self.knowledge.refresh_failed();
                self.phase = Phase::Ready;
            }
            WorkerEvent::Fatal(message) => {
                self.chat.push_notice(message.clone());
                self.status = format!("{message} · press Ctrl-Q to quit");
                self.phase = Phase::Halted;
            }
        }
    }
}

/// Set up the terminal, run the event loop, restore the terminal.
pub(crate) fn run(
    section: &AppSection,
    requests: UnboundedSender<Request>,
    events: UnboundedReceiver<WorkerEvent>,
) -> Result<()> {
    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, App::new(section, requests), events);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut events: UnboundedReceiver<WorkerEvent>,
) -> Result<()> {
    loop {
        loop {
            match events.try_recv() {
                Ok(event) => app.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if app.phase != Phase::Halted {
                        app.phase = Phase::Halted;
                        app.status = "The session worker has stopped".to_string();
                    }
                    break;
                }
            }
        }

        terminal.draw(|f| draw(f, &app))?;
        app.tick = app.tick.wrapping_add(1);

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('q') if !app.is_editing() => {
            app.should_quit = true;
            return;
        }
        KeyCode::F(1) => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Char('?') if !app.is_editing() => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.active_tab = (app.active_tab + 1) % ScreenId::ALL.len();
            app.status = format!("{}", app.current());
            return;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.phase != Phase::Ready {
        return;
    }

    // Delegate to current screen
    match app.current() {
        ScreenId::Chat => {
            if let Some(question) = app.chat.handle_key(code, modifiers) {
                app.phase = Phase::Thinking;
                app.status = "Thinking…".to_string();
                app.send(Request::Ask(question));
            }
        }
        ScreenId::Knowledge => {
            if app.knowledge.handle_key(code, modifiers) {
                app.phase = Phase::Loading;
                app.status = "Reloading knowledge base…".to_string();
                app.send(Request::Refresh);
            }
        }
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Length(1), // Caption
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Tab bar
    let tab_titles: Vec<Line> = ScreenId::ALL
        .iter()
        .map(|s| Line::from(format!("{s}")))
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", app.title)),
        )
        .select(app.active_tab)
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .divider(" │ ");

    f.render_widget(tabs, chunks[0]);

    let caption = Paragraph::new(format!(" {}", app.caption))
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    f.render_widget(caption, chunks[1]);

    // Content area, delegated to the active screen
    match app.current() {
        ScreenId::Chat => app.chat.draw(f, chunks[2]),
        ScreenId::Knowledge => app.knowledge.draw(f, chunks[2]),
    }

    // Status bar
    let bar = status_bar(&app.status, app.is_busy(), app.tick);
    f.render_widget(bar, chunks[3]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  Tab          Switch screen"),
        Line::from("  F1 / ?       Toggle this help"),
        Line::from("  Ctrl-Q       Quit"),
        Line::from(""),
        Line::from("Chat:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter        Send question"),
        Line::from("  ↑/↓ PgUp/Dn  Scroll conversation"),
        Line::from(""),
        Line::from("Knowledge:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  r            Reload the Drive folder"),
        Line::from("  q            Quit"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help · press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
