//! Ctrl+C handling. The first interrupt flips a shared flag that the day
//! loop and the stage boundaries poll; the second one exits immediately.

use crate::error::{FeedError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct GracefulShutdown {
    running: Arc<AtomicBool>,
    interrupts: Arc<AtomicUsize>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let interrupts = Arc::new(AtomicUsize::new(0));

        let running_in_handler = running.clone();
        let interrupts_in_handler = interrupts.clone();
        ctrlc::set_handler(move || {
            running_in_handler.store(false, Ordering::SeqCst);
            match interrupts_in_handler.fetch_add(1, Ordering::SeqCst) {
                0 => eprintln!("\nStopping after the current day... (Ctrl+C again to force exit)"),
                _ => {
                    eprintln!("\nForced exit.");
                    std::process::exit(130);
                }
            }
        })
        .map_err(|e| FeedError::Config {
            message: format!("Failed to install the Ctrl+C handler: {}", e),
        })?;

        Ok(Self { running, interrupts })
    }

    /// No handler registration; a process can only install one, so every
    /// test past the first needs this constructor.
    pub fn new_for_test() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            interrupts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// How many Ctrl+C presses the handler has absorbed so far.
    pub fn interrupt_count(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    /// The flag the handler flips. The extraction loop shares it so an
    /// interrupt lands at the next day boundary.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn check_shutdown(&self) -> Result<()> {
        if !self.is_running() {
            return Err(FeedError::Cancelled);
        }
        Ok(())
    }

    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Runs an operation bracketed by shutdown checks, so cancellation wins
    /// over a result computed after the interrupt arrived.
    pub fn with_shutdown_check<F, R>(&self, operation: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        self.check_shutdown()?;
        let result = operation()?;
        self.check_shutdown()?;
        Ok(result)
    }
}
