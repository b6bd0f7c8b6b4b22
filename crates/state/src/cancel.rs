use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationId(pub u64);

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// One in-flight generation per content slot. Starting a new one cancels
/// the previous token, so the newest request always wins.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    current: Option<(GenerationId, CancelToken)>,
}

impl GenerationTracker {
    pub fn begin(&mut self) -> (GenerationId, CancelToken) {
        self.cancel();
        let id = GenerationId(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed));
        let token = CancelToken::new();
        self.current = Some((id, token.clone()));
        (id, token)
    }

    pub fn is_current(&self, id: GenerationId) -> bool {
        self.current.as_ref().is_some_and(|(cur, _)| *cur == id)
    }

    /// Cancels the in-flight generation, if any. Results already queued for
    /// it are rejected by [`Self::is_current`] afterwards.
    pub fn cancel(&mut self) {
        if let Some((id, token)) = self.current.take() {
            log::debug!("cancelling generation {}", id.0);
            token.cancel();
        }
    }
}

impl Drop for GenerationTracker {
    fn drop(&mut self) {
        self.cancel();
    }
}
