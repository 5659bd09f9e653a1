//! Plot window lifecycle: at most one live controller at a time.

use field_common::Viewport;
use tokio::sync::watch;
use tracing::info;

use crate::controller::{PlaybackConfig, PlaybackController, PlaybackHandle};
use crate::frame::{FrameSink, FrameSource, PlaybackView};
use crate::session::AnimationTokens;

/// Owns the generation counter and the currently open window.
#[derive(Default)]
pub struct PlotWindows {
    tokens: AnimationTokens,
    current: Option<PlaybackHandle>,
}

impl PlotWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: AnimationTokens) -> Self {
        Self {
            tokens,
            current: None,
        }
    }

    pub fn tokens(&self) -> &AnimationTokens {
        &self.tokens
    }

    /// Open a window, closing the previous one (timer, observers, session)
    /// before the new controller starts.
    pub async fn open<S, K, V>(
        &mut self,
        config: PlaybackConfig,
        source: S,
        sink: K,
        view: V,
        viewport: Option<watch::Receiver<Viewport>>,
    ) -> &PlaybackHandle
    where
        S: FrameSource,
        K: FrameSink,
        V: PlaybackView,
    {
        self.close().await;

        let session = self.tokens.begin();
        info!(token = session.token(), frames = config.frame_count, "Opening plot window");
        let handle = PlaybackController::spawn(session, config, source, sink, view, viewport);
        self.current.insert(handle)
    }

    /// The open window, if any.
    pub fn current(&self) -> Option<&PlaybackHandle> {
        self.current.as_ref()
    }

    /// Close the open window and wait for its task to end.
    pub async fn close(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.close().await;
        }
    }
}
