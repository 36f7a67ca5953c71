//! Cooperative cancellation between controlling threads and worker loops.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A settable stop flag that workers can wait on with a timeout.
///
/// The paced streamer blocks in [`wait_for`](Self::wait_for) for one
/// pacing period per iteration; the session thread raises the flag to
/// stop it within that period. The RTP receiver polls
/// [`is_set`](Self::is_set) between socket timeouts instead of waiting.
///
/// No thread is ever force-killed; every loop that must observe this
/// flag bounds its blocking calls with a socket timeout or uses
/// `wait_for` directly.
#[derive(Debug, Default)]
pub struct StopFlag {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake all waiters.
    pub fn set(&self) {
        *self.state.lock() = true;
        self.condvar.notify_all();
    }

    /// Lower the flag so a new worker can wait on it.
    pub fn clear(&self) {
        *self.state.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.state.lock()
    }

    /// Block for up to `timeout`, waking early when the flag is raised.
    /// Returns the flag state observed on wakeup.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if *state {
            return true;
        }
        self.condvar.wait_for(&mut state, timeout);
        *state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn wait_times_out_when_unset() {
        let flag = StopFlag::new();
        let start = Instant::now();
        assert!(!flag.wait_for(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn set_wakes_waiter_early() {
        let flag = Arc::new(StopFlag::new());
        let waiter = flag.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let raised = waiter.wait_for(Duration::from_secs(5));
            (raised, start.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        flag.set();
        let (raised, elapsed) = handle.join().unwrap();
        assert!(raised);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn clear_resets_the_flag() {
        let flag = StopFlag::new();
        flag.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
        assert!(!flag.wait_for(Duration::from_millis(1)));
    }

    #[test]
    fn wait_returns_immediately_when_already_set() {
        let flag = StopFlag::new();
        flag.set();
        let start = Instant::now();
        assert!(flag.wait_for(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
