use once_cell::sync::Lazy;
use parking_lot::Mutex;

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

/// Cleanup closures run on shutdown (Ctrl-C or normal exit).
static GLOBAL_CLEANUP: Lazy<Mutex<Vec<Cleanup>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Register a cleanup closure to be run when `run_cleanups` is invoked.
pub fn register_cleanup(f: impl FnOnce() + Send + 'static) {
    GLOBAL_CLEANUP.lock().push(Box::new(f));
}

/// Run all registered cleanup closures. Safe to call multiple times; each
/// closure runs at most once.
pub fn run_cleanups() {
    let items = std::mem::take(&mut *GLOBAL_CLEANUP.lock());
    log::debug!("Running {} cleanup handlers", items.len());
    for f in items {
        // Each cleanup gets its own catch_unwind to avoid aborting others
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    }
}
