//! Ctrl-C routing.
//!
//! Tokio keeps its SIGINT handler for the rest of the process once installed,
//! so a single listener runs for the whole session. While an operation holds an
//! [`InterruptGuard`], Ctrl-C cancels that operation; otherwise it exits.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Exit status for a process stopped by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Clone, Default)]
pub struct Interrupts {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    /// Start the process-wide Ctrl-C listener. Must run inside the runtime.
    pub fn install() -> Self {
        let interrupts = Self::default();
        let listener = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !listener.cancel_active() {
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });
        interrupts
    }

    /// Route Ctrl-C to a fresh token until the guard is dropped.
    pub fn guard(&self) -> InterruptGuard {
        let token = CancellationToken::new();
        *self.lock() = Some(token.clone());
        InterruptGuard {
            interrupts: self.clone(),
            token,
        }
    }

    /// Cancel the guarded operation. Returns false if nothing is guarded.
    pub fn cancel_active(&self) -> bool {
        match self.lock().take() {
            Some(token) => {
                debug!("Ctrl-C cancelled the running operation");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct InterruptGuard {
    interrupts: Interrupts,
    token: CancellationToken,
}

impl InterruptGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.interrupts.lock().take();
    }
}
