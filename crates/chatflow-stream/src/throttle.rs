use tokio::time::{Duration, Instant};

/// Default minimum spacing between two renders
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Render throttle with a trailing deferred render
///
/// `observe` answers whether a render may happen right now. When it may not,
/// a deferred render is scheduled for `last_render + interval`; observing
/// again inside the window replaces that schedule rather than stacking
/// another one. The owner drives the deadline (e.g. in `tokio::select!`),
/// renders the latest text when it passes, and calls `flush` at the end of
/// the stream before its own unconditional final render.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_render: Option<Instant>,
    pending: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with the given minimum interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_render: None,
            pending: None,
        }
    }

    /// Record an update at `now`; true means render immediately
    pub fn observe(&mut self, now: Instant) -> bool {
        match self.last_render {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.pending = Some(last + self.interval);
                false
            }
            _ => {
                self.pending = None;
                true
            }
        }
    }

    /// When the deferred render is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// True when a deferred render is scheduled and its time has come
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.is_some_and(|deadline| now >= deadline)
    }

    /// Record that a render happened at `now`
    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
        self.pending = None;
    }

    /// Drop any scheduled render; returns whether one was pending
    pub fn flush(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_INTERVAL)
    }
}
