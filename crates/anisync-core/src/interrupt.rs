use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::sync::Notify;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INTERRUPT_NOTIFY: OnceLock<Notify> = OnceLock::new();

#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Installs the Ctrl+C handler.
///
/// The handler only sets a flag and wakes waiters; printing is left to
/// whichever command owns the terminal.
///
/// # Errors
/// Returns an error if a handler is already registered.
pub fn init() -> Result<()> {
    ctrlc::set_handler(trigger).context("Error setting Ctrl+C handler")
}

fn notify_waiters() {
    INTERRUPT_NOTIFY.get_or_init(Notify::new).notify_waiters();
}

/// Records an interrupt, force-exiting on the second one.
pub fn trigger() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        std::process::exit(130);
    }
    notify_waiters();
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Waits until an interrupt is triggered.
pub async fn wait_for_interrupt() {
    loop {
        let notify = INTERRUPT_NOTIFY.get_or_init(Notify::new);
        let notified = notify.notified();
        if is_interrupted() {
            return;
        }
        notified.await;
    }
}

pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}
