//! Sleep utilities

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

/// Longest uninterrupted slice of a [`sleep_while_running`] wait.
const SLICE: Duration = Duration::from_millis(100);

/// Sleep for `duration`, waking early once `running` is cleared.
///
/// Returns `false` if the wait was cut short by shutdown.
pub fn sleep_while_running(duration: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(SLICE));
    }
}
