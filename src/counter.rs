use crate::Mutex;

/// A counter whose increments are safe under concurrent invocation.
///
/// Every call to [`increment`](Self::increment) is applied exactly once, no
/// matter how many threads race on it.
///
/// # Examples
/// ```
/// use contention::GuardedCounter;
/// use std::sync::Arc;
///
/// let counter = Arc::new(GuardedCounter::new());
/// let threads = (0..2)
///     .map(|_| {
///         let counter = counter.clone();
///         std::thread::spawn(move || {
///             for _ in 0..1000 {
///                 counter.increment();
///             }
///         })
///     })
///     .collect::<Vec<_>>();
/// threads.into_iter().for_each(|t| t.join().unwrap());
/// assert_eq!(counter.get(), 2000);
/// ```
#[derive(Default)]
pub struct GuardedCounter {
    count: Mutex<u64>,
}

impl GuardedCounter {
    pub const fn new() -> Self {
        Self::with_initial(0)
    }

    pub const fn with_initial(initial: u64) -> Self {
        Self {
            count: Mutex::new(initial),
        }
    }

    /// Adds one to the counter.
    #[inline]
    pub fn increment(&self) {
        self.add(1);
    }

    /// Adds `n` to the counter under a single acquisition.
    pub fn add(&self, n: u64) {
        let mut count = self.count.lock();
        *count = count.wrapping_add(n);
    }

    /// Returns the current value.
    pub fn get(&self) -> u64 {
        *self.count.lock()
    }
}

impl std::fmt::Debug for GuardedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedCounter")
            .field("count", &self.get())
            .finish()
    }
}
