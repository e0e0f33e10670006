//! Process-wide panic hook for binaries embedding the IAM hook.
//!
//! Panics are logged through `tracing` with their location so they land in the
//! same stream as decision records. The hook is installed at most once.

use std::any::Any;
use std::panic::{self, Location};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

static PANIC_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the panic hook. Subsequent calls are no-ops.
///
/// # Example
/// ```no_run
/// use iam_auth_hook::panic_handler;
///
/// panic_handler::install_panic_hook();
/// ```
pub fn install_panic_hook() {
    if PANIC_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        warn!("Panic hook already installed, skipping");
        return;
    }

    panic::set_hook(Box::new(|info| {
        handle_panic(info.location(), info.payload());
    }));

    tracing::debug!("Panic hook installed");
}

fn handle_panic(location: Option<&Location<'_>>, payload: &(dyn Any + Send)) {
    let location = location
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown location".to_string());

    error!(
        location = %location,
        thread = std::thread::current().name().unwrap_or("unnamed"),
        "Panic: {}",
        panic_message(payload)
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic message".to_string()
    }
}

pub fn is_panic_hook_installed() -> bool {
    PANIC_HOOK_INSTALLED.load(Ordering::SeqCst)
}
