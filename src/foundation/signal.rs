use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Level-triggered wake flag shared between a background loop and its wakers.
///
/// Notifications that arrive while the loop is busy are remembered, so the next wait returns
/// immediately. Spurious condvar wakeups are absorbed by re-checking the flag.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    pending: Mutex<bool>,
    cv: Condvar,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn notify(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.cv.notify_all();
    }

    /// Block until notified or `timeout` elapses. Returns `true` when woken by a notification.
    /// The pending flag is consumed either way.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending {
            let deadline = std::time::Instant::now() + timeout;
            while !*pending {
                if self.cv.wait_until(&mut pending, deadline).timed_out() {
                    break;
                }
            }
        }
        std::mem::replace(&mut *pending, false)
    }
}
