//! Time-index playback for field animations.
//!
//! One controller task per plot window owns the current index, the play
//! timer and the debounce deadline. Frame fetches run as separate tasks and
//! report back to the controller, which discards anything issued under a
//! superseded session or request.

pub mod controller;
pub mod frame;
pub mod loader;
pub mod session;
pub mod window;

pub use controller::{
    PlaybackConfig, PlaybackController, PlaybackHandle, PlaybackState, PlaybackStatus,
    DEFAULT_DEBOUNCE, DEFAULT_FRAME_PERIOD,
};
pub use frame::{FrameData, FrameSink, FrameSource, PlaybackView};
pub use loader::{FrameLoader, FrameQuery, SnapshotData};
pub use session::{AnimationSession, AnimationTokens};
pub use window::PlotWindows;
