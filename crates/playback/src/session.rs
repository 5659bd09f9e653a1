//! Generation tokens and animation sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared generation counter. Starting a session bumps it, which makes every
/// older session stale.
#[derive(Debug, Clone, Default)]
pub struct AnimationTokens {
    current: Arc<AtomicU64>,
}

impl AnimationTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, invalidating all previous ones.
    pub fn begin(&self) -> AnimationSession {
        let token = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        AnimationSession {
            token,
            tokens: self.clone(),
        }
    }

    /// The current generation.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Invalidate every session without starting a new one.
    pub fn bump(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Handle passed through every async callback of one plot window.
#[derive(Debug, Clone)]
pub struct AnimationSession {
    token: u64,
    tokens: AnimationTokens,
}

impl AnimationSession {
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Whether results produced under this session may still touch the view.
    pub fn is_current(&self) -> bool {
        self.tokens.current() == self.token
    }

    /// End this session. A newer session is left untouched.
    pub fn invalidate(&self) {
        let _ = self.tokens.current.compare_exchange(
            self.token,
            self.token + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}
