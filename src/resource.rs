use crate::{CancellationToken, Error, FairLock, FairLockGuard, FairResourceConfig, Result};
use std::cell::Cell;
use std::time::Duration;

/// Outcome of a withdrawal attempt that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawResult {
    /// The amount was deducted.
    Applied { remaining: u64 },
    /// The balance was too small; nothing was deducted.
    InsufficientFunds { balance: u64 },
    /// Another thread held the lock and this attempt did not wait for it.
    LockUnavailable,
}

impl WithdrawResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// A withdrawable balance guarded by a [`FairLock`].
///
/// Every withdrawal holds the lock while checking the balance, waiting out the
/// configured processing delay and deducting, so the balance never drops
/// below zero and a refused withdrawal never deducts anything.
///
/// The zero-wait [`try_withdraw`](Self::try_withdraw) declines with
/// [`WithdrawResult::LockUnavailable`] under contention. Callers that prefer to
/// persist can use [`withdraw_with_retry`](Self::withdraw_with_retry) (backoff),
/// [`withdraw_timeout`](Self::withdraw_timeout) (bounded fair wait) or
/// [`withdraw`](Self::withdraw) (fair wait until cancelled).
///
/// # Examples
/// ```
/// use contention::{FairResource, FairResourceConfig, WithdrawResult};
///
/// let account = FairResource::with_config(100, FairResourceConfig::instant());
/// assert_eq!(
///     account.try_withdraw(60).unwrap(),
///     WithdrawResult::Applied { remaining: 40 }
/// );
/// assert_eq!(
///     account.try_withdraw(60).unwrap(),
///     WithdrawResult::InsufficientFunds { balance: 40 }
/// );
/// assert_eq!(account.balance(), 40);
/// ```
pub struct FairResource {
    balance: FairLock<Cell<u64>>,
    config: FairResourceConfig,
}

impl FairResource {
    /// Creates a resource holding `balance`, with the default configuration.
    pub fn new(balance: u64) -> Self {
        Self::with_config(balance, FairResourceConfig::default())
    }

    pub fn with_config(balance: u64, config: FairResourceConfig) -> Self {
        Self {
            balance: FairLock::with_backoff(Cell::new(balance), config.backoff),
            config,
        }
    }

    pub fn config(&self) -> &FairResourceConfig {
        &self.config
    }

    /// Reads the balance, waiting for any in-flight withdrawal to finish.
    ///
    /// Re-enters the lock when called from inside a withdrawal.
    pub fn balance(&self) -> u64 {
        self.balance.lock().get()
    }

    /// Whether some thread is inside a withdrawal or balance read right now.
    pub fn is_locked(&self) -> bool {
        self.balance.is_locked()
    }

    /// Attempts a withdrawal without waiting for the lock.
    pub fn try_withdraw(&self, amount: u64) -> Result<WithdrawResult> {
        self.try_withdraw_with(amount, &CancellationToken::new())
    }

    /// Like [`try_withdraw`](Self::try_withdraw), with a processing delay that
    /// stops early when `cancel` fires.
    ///
    /// A cancelled withdrawal releases the lock, deducts nothing and returns
    /// `Err(Error::Cancelled)`.
    pub fn try_withdraw_with(
        &self,
        amount: u64,
        cancel: &CancellationToken,
    ) -> Result<WithdrawResult> {
        Self::validate(amount)?;
        match self.balance.try_lock() {
            Some(guard) => self.apply(&guard, amount, cancel),
            None => {
                tracing::debug!(amount, "lock unavailable, declining withdrawal");
                Ok(WithdrawResult::LockUnavailable)
            }
        }
    }

    /// Waits in line for the lock, then withdraws.
    ///
    /// Never returns `LockUnavailable`; returns `Err(Error::Cancelled)` if
    /// `cancel` fires first.
    pub fn withdraw(&self, amount: u64, cancel: &CancellationToken) -> Result<WithdrawResult> {
        Self::validate(amount)?;
        let guard = self.balance.lock_cancellable(cancel)?;
        self.apply(&guard, amount, cancel)
    }

    /// Waits in line for the lock for at most `timeout`, then withdraws.
    ///
    /// Returns `Err(Error::Timeout { .. })` if the lock did not arrive in time.
    pub fn withdraw_timeout(
        &self,
        amount: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<WithdrawResult> {
        Self::validate(amount)?;
        let guard = self.balance.lock_timeout(timeout, cancel)?;
        self.apply(&guard, amount, cancel)
    }

    /// Repeats [`try_withdraw_with`](Self::try_withdraw_with) with exponential
    /// backoff while the lock is unavailable.
    ///
    /// Gives up with `LockUnavailable` after `backoff.max_attempts` attempts.
    pub fn withdraw_with_retry(
        &self,
        amount: u64,
        cancel: &CancellationToken,
    ) -> Result<WithdrawResult> {
        let backoff = self.config.backoff;
        let attempts = backoff.max_attempts.max(1);
        for attempt in 0..attempts {
            match self.try_withdraw_with(amount, cancel)? {
                WithdrawResult::LockUnavailable if attempt + 1 < attempts => {
                    cancel.sleep(backoff.delay(attempt), self.config.poll_interval)?;
                }
                outcome => return Ok(outcome),
            }
        }
        Ok(WithdrawResult::LockUnavailable)
    }

    fn validate(amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        Ok(())
    }

    fn apply(
        &self,
        guard: &FairLockGuard<'_, Cell<u64>>,
        amount: u64,
        cancel: &CancellationToken,
    ) -> Result<WithdrawResult> {
        let balance = self.balance();
        if balance < amount {
            tracing::debug!(amount, balance, "insufficient funds");
            return Ok(WithdrawResult::InsufficientFunds { balance });
        }

        if let Err(err) = cancel.sleep(self.config.processing_delay, self.config.poll_interval) {
            tracing::warn!(amount, balance, "withdrawal cancelled while processing");
            return Err(err);
        }

        let remaining = balance - amount;
        guard.set(remaining);
        tracing::debug!(amount, remaining, "withdrawal applied");
        Ok(WithdrawResult::Applied { remaining })
    }
}
