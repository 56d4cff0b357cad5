// Application event pump.
// Merges terminal input, a render tick, and settled background work.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use tokio::sync::mpsc;

use crate::state::{FetchOutcome, MutationOutcome};

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// Terminal key press.
    Key(KeyEvent),
    /// Periodic tick for UI refresh.
    Tick,
    /// A background fetch settled.
    FetchDone(FetchOutcome),
    /// A background create-issue call settled.
    MutationDone(MutationOutcome),
}

/// Produces events from terminal input, a tick timer, and background tasks.
pub struct EventHandler {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Create a new event handler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let input_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    if let Ok(CrosstermEvent::Key(key)) = event::read() {
                        if input_tx.send(Event::Key(key)).is_err() {
                            break;
                        }
                    }
                } else if input_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { tx, rx }
    }

    /// A sender for background tasks to report completions through.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
