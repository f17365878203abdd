use crate::{BackoffConfig, CancellationToken, Error, Mutex, Result, WaiterPtr};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::atomic::AtomicU32;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Ownership bookkeeping, protected by the lock's state mutex.
///
/// Invariant: a non-empty `queue` implies `owner.is_some()`, because a
/// release with waiters hands ownership straight to the queue front.
#[derive(Default)]
struct State {
    owner: Option<ThreadId>,
    depth: usize,
    queue: VecDeque<WaiterPtr>,
}

impl State {
    fn try_acquire(&mut self, me: ThreadId) -> bool {
        match self.owner {
            Some(owner) if owner == me => {
                self.depth += 1;
                true
            }
            None if self.queue.is_empty() => {
                self.owner = Some(me);
                self.depth = 1;
                true
            }
            _ => false,
        }
    }
}

/// A fair, reentrant lock.
///
/// - **Fair:** blocked acquirers are served in arrival order. On release the
///   lock is handed directly to the longest-waiting thread, and
///   [`try_lock`](Self::try_lock) never barges past queued waiters.
/// - **Reentrant:** the owning thread may acquire the lock again; it becomes
///   free for others only after every guard has been dropped.
/// - **No poisoning:** a guard dropped during unwinding releases normally.
///
/// Because the owner may hold several guards at once, guards only hand out
/// `&T`. Use interior mutability (`Cell`, `RefCell`) for the protected data.
///
/// # Examples
/// ```
/// use contention::FairLock;
/// use std::cell::Cell;
///
/// let lock = FairLock::new(Cell::new(0));
/// let outer = lock.lock();
/// {
///     let inner = lock.lock(); // same thread, no deadlock
///     inner.set(inner.get() + 1);
///     assert_eq!(lock.hold_count(), 2);
/// }
/// outer.set(outer.get() + 1);
/// drop(outer);
/// assert!(!lock.is_locked());
/// assert_eq!(lock.lock().get(), 2);
/// ```
pub struct FairLock<T: ?Sized> {
    state: Mutex<State>,
    backoff: BackoffConfig,
    data: T,
}

// Safety: `data` is only reachable through a guard, guards are confined to
// the owning thread, and only one thread owns the lock at a time.
unsafe impl<T: ?Sized + Send> Send for FairLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for FairLock<T> {}

impl<T: Default> Default for FairLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> FairLock<T> {
    pub fn new(value: T) -> Self {
        Self::with_backoff(value, BackoffConfig::default())
    }

    /// Creates a lock whose timed waits poll with the given backoff.
    pub fn with_backoff(value: T, backoff: BackoffConfig) -> Self {
        Self {
            state: Mutex::new(State::default()),
            backoff,
            data: value,
        }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: ?Sized> FairLock<T> {
    /// Acquires the lock, queueing behind earlier waiters.
    ///
    /// **Locking behaviour:** returns immediately if the current thread
    /// already owns the lock.
    pub fn lock(&self) -> FairLockGuard<'_, T> {
        let me = thread::current().id();
        let waiter = AtomicU32::new(0);
        {
            let mut state = self.state.lock();
            if state.try_acquire(me) {
                return self.guard();
            }
            state.queue.push_back(WaiterPtr::new(&waiter, me));
            tracing::trace!(queued = state.queue.len(), "fair lock contended");
        }

        WaiterPtr::wait(&waiter);
        self.guard()
    }

    /// Attempts to acquire the lock without waiting.
    ///
    /// Succeeds if the current thread already owns the lock, or if it is free
    /// and nobody is queued for it.
    pub fn try_lock(&self) -> Option<FairLockGuard<'_, T>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.try_acquire(me) {
            Some(self.guard())
        } else {
            None
        }
    }

    /// Acquires the lock, giving up after `timeout` or once `cancel` fires.
    ///
    /// While queued, the thread keeps its place in line and polls with the
    /// lock's backoff. Giving up removes it from the queue.
    pub fn lock_timeout(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<FairLockGuard<'_, T>> {
        let start = Instant::now();
        self.acquire_until(start, start.checked_add(timeout), cancel)
    }

    /// Acquires the lock, waiting indefinitely unless `cancel` fires.
    pub fn lock_cancellable(&self, cancel: &CancellationToken) -> Result<FairLockGuard<'_, T>> {
        self.acquire_until(Instant::now(), None, cancel)
    }

    /// Whether any thread currently owns the lock.
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Whether the current thread owns the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Number of guards the current thread holds; 0 if it is not the owner.
    pub fn hold_count(&self) -> usize {
        let state = self.state.lock();
        if state.owner == Some(thread::current().id()) {
            state.depth
        } else {
            0
        }
    }

    /// Number of threads queued for the lock.
    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn acquire_until(
        &self,
        start: Instant,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<FairLockGuard<'_, T>> {
        let me = thread::current().id();
        let waiter = AtomicU32::new(0);
        {
            let mut state = self.state.lock();
            if state.try_acquire(me) {
                return Ok(self.guard());
            }
            cancel.check()?;
            state.queue.push_back(WaiterPtr::new(&waiter, me));
        }

        let mut attempt = 0u32;
        loop {
            if WaiterPtr::is_woken(&waiter) {
                return Ok(self.guard());
            }

            let now = Instant::now();
            let cancelled = cancel.is_cancelled();
            let expired = deadline.is_some_and(|d| now >= d);
            if cancelled || expired {
                let mut state = self.state.lock();
                // A release may have handed the lock over in the meantime.
                if WaiterPtr::is_woken(&waiter) {
                    drop(state);
                    return Ok(self.guard());
                }
                state.queue.retain(|w| !w.is(&waiter));
                drop(state);

                let waited = now - start;
                tracing::debug!(?waited, cancelled, "gave up waiting for fair lock");
                return Err(if cancelled {
                    Error::Cancelled
                } else {
                    Error::Timeout { waited }
                });
            }

            let mut pause = self.backoff.delay(attempt);
            if let Some(deadline) = deadline {
                pause = pause.min(deadline - now);
            }
            thread::sleep(pause);
            attempt = attempt.saturating_add(1);
        }
    }

    fn guard(&self) -> FairLockGuard<'_, T> {
        FairLockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.depth -= 1;
        if state.depth > 0 {
            return;
        }
        match state.queue.pop_front() {
            Some(next) => {
                state.owner = Some(next.thread());
                state.depth = 1;
                tracing::trace!(remaining = state.queue.len(), "fair lock handed off");
                next.wake_up();
            }
            None => state.owner = None,
        }
    }
}

/// An RAII guard for one level of [`FairLock`] ownership.
///
/// Dropping the last guard held by the owner releases the lock and hands it to
/// the next queued thread. Guards cannot leave the thread that acquired them.
#[must_use = "if unused the FairLock will immediately unlock"]
pub struct FairLockGuard<'a, T: ?Sized> {
    lock: &'a FairLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T: ?Sized> Deref for FairLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.lock.data
    }
}

impl<T: ?Sized> Drop for FairLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
