/// Readiness gate for the download scheduler.
///
/// Not a lock: signals are hints that new work may be schedulable, and the
/// gate goes quiet when the selector declines to schedule so the loop does
/// not spin. The `active < capacity` check is what actually bounds
/// concurrent downloads.
#[derive(Debug)]
pub(crate) struct DownloadSlots {
    capacity: usize,
    hints: usize,
    blocked: bool,
}

impl DownloadSlots {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            hints: capacity,
            blocked: false,
        }
    }

    /// Records that up to `n` new downloads may have become possible.
    pub(crate) fn signal(&mut self, n: usize) {
        self.hints = (self.hints + n).min(self.capacity);
        self.blocked = false;
    }

    /// Silences the gate until the next signal.
    pub(crate) fn block(&mut self) {
        self.blocked = true;
    }

    /// Consumes one hint when a download is launched.
    pub(crate) fn take(&mut self) {
        self.hints = self.hints.saturating_sub(1);
    }

    /// Whether the scheduler should run given `active` running downloads.
    pub(crate) fn ready(&self, active: usize) -> bool {
        !self.blocked && self.hints > 0 && active < self.capacity
    }
}
