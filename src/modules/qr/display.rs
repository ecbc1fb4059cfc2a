use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::countdown::{Countdown, Tick};
use super::crud::QrSource;
use super::schema::QrCode;
use crate::services::Clock;

const TICK_PERIOD: Duration = Duration::from_secs(1);
const FETCH_FAILED_MESSAGE: &str = "Could not load the access code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Initial,
    Manual,
    /// Triggered by the countdown reaching zero
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayState {
    pub code: Option<QrCode>,
    pub remaining_secs: u64,
    pub loading: bool,
    pub paused: bool,
    pub error: Option<String>,
    pub last_refresh: Option<RefreshKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Refreshed(RefreshKind),
    FetchFailed { kind: RefreshKind, message: String },
    Remaining(u64),
    Expired,
    Paused,
    Resumed,
}

#[derive(Debug)]
enum Command {
    Refresh,
    Stop,
}

/// Rotating access code with a live countdown.
///
/// Owns at most one interval at a time: it is dropped while hidden and
/// replaced, never duplicated, whenever the countdown restarts.
pub struct QrDisplay {
    source: Arc<dyn QrSource>,
    clock: Arc<dyn Clock>,
    countdown: Countdown,
    ticker: Option<Interval>,
    visible: bool,
    state: watch::Sender<DisplayState>,
    events: mpsc::UnboundedSender<DisplayEvent>,
}

/// Handle to a running display; dropping it stops the task
pub struct QrDisplayHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<DisplayState>,
    events: mpsc::UnboundedReceiver<DisplayEvent>,
    task: Option<JoinHandle<()>>,
}

impl QrDisplayHandle {
    /// Requests an immediate re-fetch, also the retry path after a failure
    pub async fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh).await;
    }

    pub fn state(&self) -> DisplayState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.clone()
    }

    pub async fn next_event(&mut self) -> Option<DisplayEvent> {
        self.events.recv().await
    }

    pub async fn stop(mut self) {
        let _ = self.commands.send(Command::Stop).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for QrDisplayHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl QrDisplay {
    pub fn new(source: Arc<dyn QrSource>, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(DisplayState::default());
        let (events, _) = mpsc::unbounded_channel();
        Self {
            source,
            clock,
            countdown: Countdown::new(),
            ticker: None,
            visible: true,
            state,
            events,
        }
    }

    /// Starts the display task, following `visibility` for pause and resume
    pub fn spawn(mut self, visibility: watch::Receiver<Visibility>) -> QrDisplayHandle {
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events = events_tx;
        let state_rx = self.state.subscribe();

        let task = tokio::spawn(self.run(commands_rx, visibility));

        QrDisplayHandle {
            commands: commands_tx,
            state: state_rx,
            events: events_rx,
            task: Some(task),
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut visibility: watch::Receiver<Visibility>) {
        self.visible = *visibility.borrow_and_update() == Visibility::Visible;
        self.fetch(RefreshKind::Initial).await;
        let mut visibility_open = true;

        loop {
            tokio::select! {
                _ = next_tick(&mut self.ticker) => {
                    let tick = self.countdown.tick(self.clock.now());
                    self.apply(tick).await;
                }
                command = commands.recv() => match command {
                    Some(Command::Refresh) => self.fetch(RefreshKind::Manual).await,
                    Some(Command::Stop) | None => break,
                },
                changed = visibility.changed(), if visibility_open => {
                    if changed.is_err() {
                        visibility_open = false;
                        continue;
                    }
                    let now_visible = *visibility.borrow_and_update() == Visibility::Visible;
                    self.set_visible(now_visible).await;
                }
            }
        }

        self.ticker = None;
        tracing::debug!("QR display stopped");
    }

    fn emit(&self, event: DisplayEvent) {
        let _ = self.events.send(event);
    }

    /// Replaces the live interval with a fresh one aligned to now
    fn restart_ticker(&mut self) {
        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
    }

    async fn apply(&mut self, tick: Tick) {
        match tick {
            Tick::Remaining(secs) => {
                self.state.send_modify(|s| s.remaining_secs = secs);
                self.emit(DisplayEvent::Remaining(secs));
            }
            Tick::Expired => {
                self.state.send_modify(|s| s.remaining_secs = 0);
                self.emit(DisplayEvent::Expired);
                tracing::debug!("QR code expired, fetching a new one");
                self.fetch(RefreshKind::Automatic).await;
            }
            Tick::Idle => {}
        }
    }

    async fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;

        if visible {
            self.state.send_modify(|s| s.paused = false);
            self.emit(DisplayEvent::Resumed);
            let tick = self.countdown.resume(self.clock.now());
            self.restart_ticker();
            self.apply(tick).await;
        } else {
            self.countdown.pause();
            self.ticker = None;
            self.state.send_modify(|s| s.paused = true);
            self.emit(DisplayEvent::Paused);
        }
    }

    async fn fetch(&mut self, kind: RefreshKind) {
        self.state.send_modify(|s| s.loading = true);

        match self.source.current().await {
            Ok(code) => {
                let remaining = self.countdown.reset(code.expires_at, self.clock.now());
                if !self.visible {
                    self.countdown.pause();
                }
                tracing::info!(?kind, remaining, "QR code loaded");
                self.state.send_modify(|s| {
                    s.code = Some(code);
                    s.remaining_secs = remaining;
                    s.loading = false;
                    s.error = None;
                    s.last_refresh = Some(kind);
                });
                if self.visible {
                    self.restart_ticker();
                }
                self.emit(DisplayEvent::Refreshed(kind));
            }
            Err(e) => {
                tracing::warn!(?kind, "Failed to load QR code: {}", e);
                let message = e.user_message(FETCH_FAILED_MESSAGE);
                self.countdown.clear();
                self.state.send_modify(|s| {
                    s.code = None;
                    s.remaining_secs = 0;
                    s.loading = false;
                    s.error = Some(message.clone());
                });
                self.emit(DisplayEvent::FetchFailed { kind, message });
            }
        }
    }
}
