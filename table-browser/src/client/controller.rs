//! Async driver for the view state
//!
//! A single task owns the [`ViewState`] and processes one event at a time:
//! user actions, fetch completions and debounce timers. Fetches run as
//! separate tasks and report back through the same channel, so state is
//! never touched concurrently. Every change is published on a `watch`
//! channel for the UI to render.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::client::api::{FetchError, ViewApi};
use crate::client::debounce::{Debouncer, DEFAULT_FILTER_DEBOUNCE};
use crate::client::state::{Command, RequestToken, ViewState, DEFAULT_PAGE_SIZE};
use crate::schema::ViewResult;

/// Something the user did in the browser UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SelectDatabase(String),
    ToggleTable(String),
    CloseTable,
    SetPage(u64),
    ClickSort(String),
    EditFilter { column: String, value: String },
}

/// Tuning knobs for a controller
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub page_size: u64,
    pub filter_debounce: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            filter_debounce: DEFAULT_FILTER_DEBOUNCE,
        }
    }
}

/// The controller's task has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("View controller is no longer running")]
pub struct ControllerClosed;

#[derive(Debug)]
enum Event {
    User(UserAction),
    DatabasesFetched {
        token: RequestToken,
        result: Result<Vec<String>, FetchError>,
    },
    TablesFetched {
        token: RequestToken,
        result: Result<Vec<String>, FetchError>,
    },
    RowsFetched {
        token: RequestToken,
        result: Result<ViewResult, FetchError>,
    },
    FilterDebounceElapsed(u64),
}

/// Handle to a running view state machine
///
/// Spawning mounts the view (the database list starts loading right away).
/// Dropping the handle stops the task; fetches still in flight finish but
/// their results go nowhere.
#[derive(Debug)]
pub struct ViewController {
    events: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<ViewState>,
    task: JoinHandle<()>,
}

impl ViewController {
    /// Start a controller on the current Tokio runtime
    pub fn spawn(api: Arc<dyn ViewApi>, options: ControllerOptions) -> Self {
        let (events, receiver) = mpsc::unbounded_channel();

        let mut state = ViewState::new(options.page_size);
        let mount = state.mount();
        let (publisher, state_receiver) = watch::channel(state.clone());

        let worker = Worker {
            api,
            state,
            publisher,
            events: events.downgrade(),
            debouncer: Debouncer::new(options.filter_debounce),
        };
        let task = tokio::spawn(worker.run(receiver, mount));

        Self {
            events,
            state: state_receiver,
            task,
        }
    }

    /// Queue a user action
    pub fn dispatch(&self, action: UserAction) -> Result<(), ControllerClosed> {
        self.events
            .send(Event::User(action))
            .map_err(|_| ControllerClosed)
    }

    /// Copy of the latest published state
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }
}

impl Drop for ViewController {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Worker {
    api: Arc<dyn ViewApi>,
    state: ViewState,
    publisher: watch::Sender<ViewState>,
    events: mpsc::WeakUnboundedSender<Event>,
    debouncer: Debouncer,
}

impl Worker {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Event>, initial: Vec<Command>) {
        self.execute(initial);

        while let Some(event) = receiver.recv().await {
            if self.handle(event) {
                self.publisher.send_replace(self.state.clone());
            }
        }

        debug!("View controller stopped");
    }

    /// Process one event; returns whether the state changed
    fn handle(&mut self, event: Event) -> bool {
        let commands = match event {
            Event::User(action) => {
                trace!(?action, "User action");
                match action {
                    UserAction::SelectDatabase(database) => self.state.select_database(database),
                    UserAction::ToggleTable(table) => self.state.toggle_table(table),
                    UserAction::CloseTable => self.state.close_table(),
                    UserAction::SetPage(page) => self.state.set_page(page),
                    UserAction::ClickSort(column) => self.state.click_sort(column),
                    UserAction::EditFilter { column, value } => self.state.edit_filter(column, value),
                }
            }
            Event::DatabasesFetched { token, result } => {
                return self.state.apply_databases(token, result);
            }
            Event::TablesFetched { token, result } => {
                return self.state.apply_tables(token, result);
            }
            Event::RowsFetched { token, result } => {
                let applied = self.state.apply_rows(token, result);
                if !applied {
                    debug!(token, "Discarded stale rows response");
                }
                return applied;
            }
            Event::FilterDebounceElapsed(generation) => {
                if !self.debouncer.finish(generation) {
                    return false;
                }
                self.state.commit_filters()
            }
        };

        self.execute(commands);
        true
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::FetchDatabases { token } => {
                    let api = self.api.clone();
                    self.spawn_fetch(async move {
                        Event::DatabasesFetched {
                            token,
                            result: api.list_databases().await,
                        }
                    });
                }
                Command::FetchTables { token, database } => {
                    let api = self.api.clone();
                    self.spawn_fetch(async move {
                        Event::TablesFetched {
                            token,
                            result: api.list_tables(&database).await,
                        }
                    });
                }
                Command::FetchRows { token, request } => {
                    debug!(token, table = %request.table, page = request.page, "Fetching rows");
                    let api = self.api.clone();
                    self.spawn_fetch(async move {
                        Event::RowsFetched {
                            token,
                            result: api.fetch_rows(&request).await,
                        }
                    });
                }
                Command::ScheduleFilterCommit => {
                    let events = self.events.clone();
                    self.debouncer.schedule(move |generation| async move {
                        if let Some(events) = events.upgrade() {
                            let _ = events.send(Event::FilterDebounceElapsed(generation));
                        }
                    });
                }
                Command::CancelFilterCommit => self.debouncer.cancel(),
            }
        }
    }

    fn spawn_fetch<F>(&self, fetch: F)
    where
        F: std::future::Future<Output = Event> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = fetch.await;
            if let Some(events) = events.upgrade() {
                let _ = events.send(event);
            }
        });
    }
}
