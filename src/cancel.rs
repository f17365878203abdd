use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A shared flag that asks blocking operations to stop early.
///
/// Clones observe the same flag. Once cancelled a token stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Error::Cancelled)` if the token has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration`, waking every `poll` to look at the flag.
    ///
    /// Returns `Err(Error::Cancelled)` as soon as cancellation is observed.
    /// A `duration` too large to represent as a deadline sleeps until cancelled.
    pub fn sleep(&self, duration: Duration, poll: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(duration);
        let poll = poll.max(Duration::from_micros(100));
        loop {
            self.check()?;
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    poll.min(deadline - now)
                }
                None => poll,
            };
            std::thread::sleep(pause);
        }
    }
}
