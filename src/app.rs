// App state and main event loop.
// Routes keyboard input into the session and settled background work back
// into it, then draws the single screen.

use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::event::{Event, EventHandler};
use crate::github::Transport;
use crate::state::{MutationOutcome, RepoSession, SessionPhase};
use crate::ui;

/// Which input box owns keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Path,
    Title,
}

impl Focus {
    pub fn toggle(&self) -> Self {
        match self {
            Focus::Path => Focus::Title,
            Focus::Title => Focus::Path,
        }
    }
}

/// Main application state.
pub struct App {
    /// Repository session behind the screen.
    pub session: RepoSession,
    /// Focused input box.
    pub focus: Focus,
    /// Draft title for a new issue.
    pub title_input: String,
    /// Transient status-line notice for local errors.
    pub notice: Option<String>,
    /// Issue list scroll state.
    pub issue_list: ListState,
    /// Sender for background task completions.
    event_tx: mpsc::UnboundedSender<Event>,
    /// Last session revision the selection was synced against.
    seen_revision: u64,
    /// Whether the app should exit.
    should_quit: bool,
}

impl App {
    pub fn new(transport: Arc<dyn Transport>, initial_path: Option<String>) -> Self {
        let mut session = RepoSession::new(transport);
        if let Some(path) = initial_path {
            session.set_path(path);
        }
        // Placeholder sender; run() swaps in the live one.
        let (tx, _rx) = mpsc::unbounded_channel();

        Self {
            session,
            focus: Focus::default(),
            title_input: String::new(),
            notice: None,
            issue_list: ListState::default(),
            event_tx: tx,
            seen_revision: 0,
            should_quit: false,
        }
    }

    /// Main event loop: owns the terminal for its whole lifetime.
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

        let mut events = EventHandler::new(Duration::from_millis(250));
        self.event_tx = events.sender();

        // A prefilled path is searched right away.
        if !self.session.path().is_empty() {
            self.start_fetch();
        }

        while !self.should_quit {
            terminal.draw(|frame| ui::draw(frame, self))?;
            if let Some(event) = events.next().await {
                self.handle_event(event);
            }
        }

        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Tick => {}
            Event::FetchDone(outcome) => {
                self.session.apply_fetch(outcome);
            }
            Event::MutationDone(outcome) => self.on_mutation_done(outcome),
        }

        if self.session.revision() != self.seen_revision {
            self.seen_revision = self.session.revision();
            self.sync_selection();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.notice = None;

        // A failed mutation blocks everything until acknowledged.
        if matches!(self.session.phase(), SessionPhase::MutationFailed(_)) {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.session.dismiss_mutation_error();
            }
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => self.focus = self.focus.toggle(),
            KeyCode::Enter => self.submit(),
            KeyCode::Up => self.select_prev(),
            KeyCode::Down => self.select_next(),
            KeyCode::Backspace => match self.focus {
                Focus::Path => {
                    let mut path = self.session.path().to_string();
                    path.pop();
                    self.session.set_path(path);
                }
                Focus::Title => {
                    self.title_input.pop();
                }
            },
            KeyCode::Char(c) => match self.focus {
                Focus::Path => {
                    let mut path = self.session.path().to_string();
                    path.push(c);
                    self.session.set_path(path);
                }
                Focus::Title => self.title_input.push(c),
            },
            _ => {}
        }
    }

    fn submit(&mut self) {
        match self.focus {
            Focus::Path => self.start_fetch(),
            Focus::Title => self.start_create_issue(),
        }
    }

    fn start_fetch(&mut self) {
        match self.session.fetch() {
            Ok(pending) => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(Event::FetchDone(pending.run().await));
                });
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    fn start_create_issue(&mut self) {
        match self.session.create_issue(&self.title_input) {
            Ok(pending) => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(Event::MutationDone(pending.run().await));
                });
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    fn on_mutation_done(&mut self, outcome: MutationOutcome) {
        self.session.apply_create_issue(outcome);
        if matches!(self.session.phase(), SessionPhase::Ready) {
            self.title_input.clear();
            // Land the selection on the issue that was just appended.
            let count = self.issue_count();
            if count > 0 {
                self.issue_list.select(Some(count - 1));
            }
        }
    }

    fn issue_count(&self) -> usize {
        self.session
            .repository()
            .map_or(0, |repository| repository.issues.edges.len())
    }

    /// Keep the selection inside the current issue list.
    fn sync_selection(&mut self) {
        let count = self.issue_count();
        if count == 0 {
            self.issue_list.select(None);
            return;
        }
        match self.issue_list.selected() {
            Some(i) if i < count => {}
            _ => self.issue_list.select(Some(0)),
        }
    }

    fn select_prev(&mut self) {
        let count = self.issue_count();
        if count == 0 {
            return;
        }
        let i = match self.issue_list.selected() {
            Some(i) => {
                if i == 0 {
                    0
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.issue_list.select(Some(i));
    }

    fn select_next(&mut self) {
        let count = self.issue_count();
        if count == 0 {
            return;
        }
        let i = match self.issue_list.selected() {
            Some(i) => {
                if i >= count - 1 {
                    i
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.issue_list.select(Some(i));
    }
}
