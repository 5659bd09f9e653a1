//! Playback controller: the per-window task that owns the time index.
//!
//! All mutable playback state lives inside one tokio task. The host talks to
//! it through a [`PlaybackHandle`]; frame fetches run as separate tasks that
//! report back over a channel, so view mutation only happens between the
//! controller's own suspension points.
//!
//! Seeking is debounced: every `Seek` resets a deadline and only the last one
//! issues a fetch. Timer ticks fetch immediately, so any frame period keeps
//! frames flowing. A fetch result is applied only if it carries the most
//! recent request id and its session is still current.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use field_common::{FieldError, FieldResult, Viewport};
use metrics::counter;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::frame::{FrameData, FrameSink, FrameSource, PlaybackView};
use crate::session::AnimationSession;

/// Quiet period after the last slider update before a fetch is issued.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(80);

/// Time between frames while playing.
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(1000);

const COMMAND_BUFFER: usize = 64;

/// Settings for one plot window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Number of timestamps in the snapshot
    pub frame_count: usize,
    /// Index shown when the window opens
    pub start_index: usize,
    pub debounce: Duration,
    pub frame_period: Duration,
}

impl PlaybackConfig {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frame_count,
            start_index: 0,
            debounce: DEFAULT_DEBOUNCE,
            frame_period: DEFAULT_FRAME_PERIOD,
        }
    }

    pub fn with_start_index(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_frame_period(mut self, period: Duration) -> Self {
        self.frame_period = period;
        self
    }
}

/// Playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    /// A debounced fetch is pending or in flight
    Seeking,
    Playing,
}

/// Snapshot of controller state published after every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Slider position
    pub index: usize,
    /// Index of the last frame handed to the sink
    pub applied_index: Option<usize>,
    pub last_request_id: u64,
    pub fetches_issued: u64,
    pub closed: bool,
}

#[derive(Debug)]
enum Command {
    Seek(usize),
    Play,
    Pause,
    SetPeriod(Duration),
    Close,
}

struct FetchOutcome {
    request_id: u64,
    index: usize,
    result: FieldResult<FrameData>,
}

enum Event {
    Command(Command),
    DebounceElapsed,
    Tick,
    Fetched(FetchOutcome),
    ViewportChanged,
    ViewportDetached,
}

/// The controller task. Construct it through [`PlaybackController::spawn`].
pub struct PlaybackController<S, K, V> {
    session: AnimationSession,
    config: PlaybackConfig,
    source: Arc<S>,
    sink: K,
    view: V,
    viewport: Option<watch::Receiver<Viewport>>,
    commands: mpsc::Receiver<Command>,
    results_tx: mpsc::UnboundedSender<FetchOutcome>,
    results: mpsc::UnboundedReceiver<FetchOutcome>,
    status_tx: watch::Sender<PlaybackStatus>,
    index: usize,
    applied_index: Option<usize>,
    playing: bool,
    ticker: Option<Interval>,
    deadline: Option<Instant>,
    last_request_id: u64,
    in_flight: bool,
    fetches_issued: u64,
    closed: bool,
}

impl<S, K, V> PlaybackController<S, K, V>
where
    S: FrameSource,
    K: FrameSink,
    V: PlaybackView,
{
    /// Start the controller task for a window.
    ///
    /// `viewport` is observed for pan/zoom/resize; every change is forwarded
    /// to the sink until the window closes.
    pub fn spawn(
        session: AnimationSession,
        config: PlaybackConfig,
        source: S,
        sink: K,
        view: V,
        viewport: Option<watch::Receiver<Viewport>>,
    ) -> PlaybackHandle {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (results_tx, results) = mpsc::unbounded_channel();

        let index = if config.start_index < config.frame_count {
            config.start_index
        } else {
            0
        };

        let initial = PlaybackStatus {
            state: PlaybackState::Idle,
            index,
            applied_index: None,
            last_request_id: 0,
            fetches_issued: 0,
            closed: false,
        };
        let (status_tx, status) = watch::channel(initial);

        let controller = Self {
            session: session.clone(),
            config,
            source: Arc::new(source),
            sink,
            view,
            viewport,
            commands,
            results_tx,
            results,
            status_tx,
            index,
            applied_index: None,
            playing: false,
            ticker: None,
            deadline: None,
            last_request_id: 0,
            in_flight: false,
            fetches_issued: 0,
            closed: false,
        };

        let task = tokio::spawn(controller.run());

        PlaybackHandle {
            commands: command_tx,
            status,
            session,
            task,
        }
    }

    async fn run(mut self) {
        info!(
            token = self.session.token(),
            frames = self.config.frame_count,
            "Playback window opened"
        );

        loop {
            let event = tokio::select! {
                command = self.commands.recv() => Event::Command(command.unwrap_or(Command::Close)),
                _ = sleep_until_deadline(self.deadline) => Event::DebounceElapsed,
                _ = next_tick(self.ticker.as_mut()) => Event::Tick,
                Some(outcome) = self.results.recv() => Event::Fetched(outcome),
                alive = viewport_changed(self.viewport.as_mut()) => {
                    if alive { Event::ViewportChanged } else { Event::ViewportDetached }
                }
            };

            match event {
                Event::Command(Command::Close) => {
                    self.close();
                    self.publish();
                    break;
                }
                Event::Command(command) => self.handle_command(command),
                Event::DebounceElapsed => self.issue_fetch(),
                Event::Tick => self.advance(),
                Event::Fetched(outcome) => self.apply_outcome(outcome),
                Event::ViewportChanged => self.refresh_viewport(),
                Event::ViewportDetached => {
                    debug!(token = self.session.token(), "Viewport source dropped");
                    self.viewport = None;
                }
            }

            self.publish();
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Seek(index) => self.seek(index),
            Command::Play => self.play(),
            Command::Pause => self.stop_playing(),
            Command::SetPeriod(period) => self.set_period(period),
            Command::Close => {}
        }
    }

    fn seek(&mut self, index: usize) {
        if index >= self.config.frame_count {
            warn!(
                index = index,
                frames = self.config.frame_count,
                "Seek index out of range, ignoring"
            );
            return;
        }
        self.index = index;
        self.schedule_fetch();
    }

    fn play(&mut self) {
        if self.playing {
            return;
        }
        if self.config.frame_count == 0 {
            warn!("Cannot play a snapshot without timestamps");
            return;
        }

        self.playing = true;
        self.ticker = Some(new_ticker(self.config.frame_period));
        self.view.set_playing(true);
        info!(
            token = self.session.token(),
            index = self.index,
            period_ms = self.config.frame_period.as_millis() as u64,
            "Playback started"
        );
    }

    fn stop_playing(&mut self) {
        self.ticker = None;
        if self.playing {
            self.playing = false;
            self.view.set_playing(false);
            info!(token = self.session.token(), index = self.index, "Playback paused");
        }
    }

    fn set_period(&mut self, period: Duration) {
        if period.is_zero() {
            warn!("Ignoring zero frame period");
            return;
        }
        self.config.frame_period = period;
        if self.playing {
            self.ticker = Some(new_ticker(period));
        }
        debug!(period_ms = period.as_millis() as u64, "Frame period changed");
    }

    /// Timer tick: move the slider one frame forward, looping at the end.
    ///
    /// The tick is already rate limited by the frame period, so it bypasses
    /// the debounce and supersedes any pending seek.
    fn advance(&mut self) {
        if self.config.frame_count == 0 {
            return;
        }
        self.index = (self.index + 1) % self.config.frame_count;
        self.view.set_slider(self.index);
        self.issue_fetch();
    }

    fn schedule_fetch(&mut self) {
        self.deadline = Some(Instant::now() + self.config.debounce);
    }

    fn issue_fetch(&mut self) {
        self.deadline = None;
        self.last_request_id += 1;
        self.fetches_issued += 1;
        self.in_flight = true;

        let request_id = self.last_request_id;
        let index = self.index;

        counter!("playback_fetches_total").increment(1);
        debug!(
            token = self.session.token(),
            request_id = request_id,
            index = index,
            "Issuing frame fetch"
        );
        self.view.set_loading(true);

        let source = Arc::clone(&self.source);
        let session = self.session.clone();
        let results = self.results_tx.clone();

        tokio::spawn(async move {
            let result = source.load_frame(index).await;
            if !session.is_current() {
                debug!(
                    token = session.token(),
                    request_id = request_id,
                    index = index,
                    "Session ended while frame was loading, dropping"
                );
                counter!("playback_stale_frames_total").increment(1);
                return;
            }
            // The controller may already be gone; nothing left to update then.
            let _ = results.send(FetchOutcome {
                request_id,
                index,
                result,
            });
        });
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        if outcome.request_id != self.last_request_id || !self.session.is_current() {
            debug!(
                request_id = outcome.request_id,
                last_request_id = self.last_request_id,
                index = outcome.index,
                "Discarding stale frame"
            );
            counter!("playback_stale_frames_total").increment(1);
            return;
        }

        self.in_flight = false;
        self.view.set_loading(false);

        let applied = outcome
            .result
            .and_then(|frame| self.sink.apply_frame(&frame).map(|_| frame.index));

        match applied {
            Ok(index) => {
                self.applied_index = Some(index);
                debug!(request_id = outcome.request_id, index = index, "Applied frame");
            }
            Err(e) => self.fail(e),
        }
    }

    /// Surface a data error: notify, clear the spinner, stop playing.
    fn fail(&mut self, err: FieldError) {
        error!(error = %err, index = self.index, "Frame load failed");
        self.deadline = None;
        self.in_flight = false;
        self.view.set_loading(false);
        self.view.notify_error(&err.to_string());
        self.stop_playing();
    }

    fn refresh_viewport(&mut self) {
        let Some(rx) = self.viewport.as_mut() else {
            return;
        };
        let viewport = *rx.borrow_and_update();
        if let Err(e) = self.sink.viewport_changed(&viewport) {
            warn!(error = %e, "Failed to re-render after viewport change");
        }
    }

    fn close(&mut self) {
        self.ticker = None;
        self.deadline = None;
        self.playing = false;

        if self.viewport.take().is_some() {
            debug!(token = self.session.token(), "Viewport observer detached");
        }
        if let Err(e) = self.sink.teardown() {
            warn!(error = %e, "Layer teardown failed, closing anyway");
        }

        self.session.invalidate();
        self.closed = true;
        info!(token = self.session.token(), "Playback window closed");
    }

    fn state(&self) -> PlaybackState {
        if self.playing {
            PlaybackState::Playing
        } else if !self.closed && (self.deadline.is_some() || self.in_flight) {
            PlaybackState::Seeking
        } else {
            PlaybackState::Idle
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(PlaybackStatus {
            state: self.state(),
            index: self.index,
            applied_index: self.applied_index,
            last_request_id: self.last_request_id,
            fetches_issued: self.fetches_issued,
            closed: self.closed,
        });
    }
}

fn new_ticker(period: Duration) -> Interval {
    // First tick one period after play, not immediately.
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

/// Resolves `true` on a viewport change, `false` once the sender is gone.
async fn viewport_changed(viewport: Option<&mut watch::Receiver<Viewport>>) -> bool {
    match viewport {
        Some(rx) => rx.changed().await.is_ok(),
        None => pending().await,
    }
}

/// Host-side handle to a running controller.
pub struct PlaybackHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<PlaybackStatus>,
    session: AnimationSession,
    task: JoinHandle<()>,
}

impl PlaybackHandle {
    /// Move the slider. Rapid calls coalesce into one fetch.
    pub async fn seek(&self, index: usize) -> FieldResult<()> {
        self.send(Command::Seek(index)).await
    }

    pub async fn play(&self) -> FieldResult<()> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> FieldResult<()> {
        self.send(Command::Pause).await
    }

    /// Change the time between frames while playing.
    pub async fn set_period(&self, period: Duration) -> FieldResult<()> {
        self.send(Command::SetPeriod(period)).await
    }

    /// Latest published controller state.
    pub fn status(&self) -> PlaybackStatus {
        *self.status.borrow()
    }

    /// Receiver for status updates.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.clone()
    }

    pub fn session(&self) -> &AnimationSession {
        &self.session
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the timer, detach observers, invalidate the session and wait for
    /// the task to end.
    pub async fn close(self) {
        if self.commands.send(Command::Close).await.is_err() {
            debug!(token = self.session.token(), "Playback task already stopped");
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Playback task ended abnormally");
        }
    }

    async fn send(&self, command: Command) -> FieldResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FieldError::Internal("playback window is closed".to_string()))
    }
}
