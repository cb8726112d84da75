//! Scheduler
//!
//! Holds the guest callbacks waiting for the next display refresh or for a
//! timer to expire. Nothing here calls into the guest: the runtime asks
//! which callbacks are due and invokes them itself.
//!
//! Request ids start at 1, increase monotonically and are never reused, so
//! cancelling a stale id is a harmless no-op.

use std::collections::BTreeMap;
use std::time::Duration;

/// Identifier returned to the guest for a scheduled callback
pub type RequestId = i32;

/// A guest function pointer plus the argument it expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestCallback {
    /// Invoked through `run_callback(func)`
    Plain { func: i32 },
    /// Invoked through `run_callback_int(func, param)`
    WithInt { func: i32, param: i32 },
    /// Invoked through `run_callback_ptr(func, data)`
    WithPtr { func: i32, data: i32 },
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Duration,
    callback: GuestCallback,
}

#[derive(Debug)]
pub struct Scheduler {
    next_id: RequestId,
    frames: BTreeMap<RequestId, GuestCallback>,
    timers: BTreeMap<RequestId, Timer>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            frames: BTreeMap::new(),
            timers: BTreeMap::new(),
        }
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Run `callback` on the next frame tick
    pub fn request_animation_frame(&mut self, callback: GuestCallback) -> RequestId {
        let id = self.allocate_id();
        tracing::debug!(id, ?callback, "animation frame requested");
        self.frames.insert(id, callback);
        id
    }

    /// Returns true if a pending callback was removed
    pub fn cancel_animation_frame(&mut self, id: RequestId) -> bool {
        let removed = self.frames.remove(&id).is_some();
        tracing::debug!(id, removed, "animation frame cancelled");
        removed
    }

    /// Run `callback` once `delay` has elapsed past `now`
    pub fn set_timeout(
        &mut self,
        callback: GuestCallback,
        delay: Duration,
        now: Duration,
    ) -> RequestId {
        let id = self.allocate_id();
        let deadline = now.saturating_add(delay);
        tracing::debug!(id, ?callback, ?deadline, "timer scheduled");
        self.timers.insert(id, Timer { deadline, callback });
        id
    }

    /// Returns true if a pending timer was removed
    pub fn clear_timeout(&mut self, id: RequestId) -> bool {
        let removed = self.timers.remove(&id).is_some();
        tracing::debug!(id, removed, "timer cleared");
        removed
    }

    /// Ids of the frame callbacks pending right now, in request order.
    ///
    /// Callbacks requested after this call belong to the next tick.
    pub fn pending_frames(&self) -> Vec<RequestId> {
        self.frames.keys().copied().collect()
    }

    /// Remove a frame callback so it can be fired. `None` if it was
    /// cancelled in the meantime.
    pub fn take_frame(&mut self, id: RequestId) -> Option<GuestCallback> {
        self.frames.remove(&id)
    }

    /// Ids of the timers due at `now`, ordered by deadline then id
    pub fn due_timers(&self, now: Duration) -> Vec<RequestId> {
        let mut due: Vec<(Duration, RequestId)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(&id, timer)| (timer.deadline, id))
            .collect();
        due.sort_unstable();
        due.into_iter().map(|(_, id)| id).collect()
    }

    pub fn take_timer(&mut self, id: RequestId) -> Option<GuestCallback> {
        self.timers.remove(&id).map(|timer| timer.callback)
    }

    /// True while any callback is waiting to fire
    pub fn has_pending(&self) -> bool {
        !self.frames.is_empty() || !self.timers.is_empty()
    }

    /// Drop every pending callback
    pub fn clear(&mut self) {
        self.frames.clear();
        self.timers.clear();
    }
}
