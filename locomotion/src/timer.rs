use std::time::Duration;

/// Deferred work the avatar knows how to dispatch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// The teleport fade-out finished; relocate and fade back in
    TeleportFadeComplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// One-shot scheduling capability.
pub trait Timer {
    /// Schedule `event` to fire once, `delay` from now.
    fn after(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle;
}

struct PendingTimer {
    handle: TimerHandle,
    due: Duration,
    event: TimerEvent,
}

/// Frame-stepped timer: time only moves when [`FrameTimer::advance`] is called.
#[derive(Default)]
pub struct FrameTimer {
    now: Duration,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Move time forward and return every event that came due, each exactly once,
    /// ordered by due time and then by scheduling order.
    pub fn advance(&mut self, dt: Duration) -> Vec<TimerEvent> {
        self.now = self.now.saturating_add(dt);
        let now = self.now;

        let mut due: Vec<PendingTimer> = Vec::new();
        let mut remaining = Vec::with_capacity(self.pending.len());
        for pending in self.pending.drain(..) {
            if pending.due <= now {
                due.push(pending);
            } else {
                remaining.push(pending);
            }
        }
        self.pending = remaining;

        due.sort_by_key(|p| (p.due, p.handle.0));
        due.into_iter().map(|p| p.event).collect()
    }
}

impl Timer for FrameTimer {
    fn after(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTimer {
            handle,
            due: self.now.saturating_add(delay),
            event,
        });
        handle
    }
}
