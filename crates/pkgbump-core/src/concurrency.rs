use pkgbump_registry::remove_live_scopes;
use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Exit status for an interrupted run, matching shell convention for SIGINT.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Handles SIGINT, SIGTERM and SIGHUP.
///
/// The first signal deletes any on-disk credential scope at once and sets a
/// flag the engine checks between steps, so the rest unwinds normally. A
/// second signal exits immediately.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        remove_live_scopes();
        if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
        eprintln!("\ninterrupt received, stopping after the current step...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_requested_by_default() {
        assert!(!shutdown_requested());
    }
}
