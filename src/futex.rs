// Raw lock modified from https://github.com/rust-lang/rust/blob/master/library/std/src/sys/sync/mutex/futex.rs
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1; // locked, no other threads waiting
const CONTENDED: u32 = 2; // locked, and other threads waiting (contended)

/// A futex-based mutex protecting a value of type `T`.
///
/// Unlike `std::sync::Mutex` this lock never poisons: a guard dropped while
/// unwinding releases the lock like any other guard.
pub struct Mutex<T: ?Sized> {
    futex: AtomicU32,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `futex`.
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            futex: AtomicU32::new(UNLOCKED),
            data: UnsafeCell::new(value),
        }
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Acquires the lock, blocking the current thread until it is available.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        if !self.try_acquire() {
            self.lock_contended();
        }
        MutexGuard { mutex: self }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.futex
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_contended(&self) {
        // Spin first to speed things up if the lock is released quickly.
        let mut state = self.spin();

        // If it's unlocked now, attempt to take the lock
        // without marking it as contended.
        if state == UNLOCKED {
            match self
                .futex
                .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            {
                Ok(_) => return, // Locked!
                Err(s) => state = s,
            }
        }

        loop {
            // Put the lock in contended state, skipping the write if it is
            // already CONTENDED.
            if state != CONTENDED && self.futex.swap(CONTENDED, Acquire) == UNLOCKED {
                // We changed it from UNLOCKED to CONTENDED, so we just successfully locked it.
                return;
            }

            // Wait for the futex to change state, assuming it is still CONTENDED.
            atomic_wait::wait(&self.futex, CONTENDED);

            // Spin again after waking up.
            state = self.spin();
        }
    }

    fn spin(&self) -> u32 {
        let mut spin = 100;
        loop {
            // Only `load` while spinning, to be easier on the caches.
            let state = self.futex.load(Relaxed);

            // Stop spinning when the mutex is UNLOCKED,
            // but also when it's CONTENDED.
            if state != LOCKED || spin == 0 {
                return state;
            }

            std::hint::spin_loop();
            spin -= 1;
        }
    }

    #[inline]
    fn unlock(&self) {
        if self.futex.swap(UNLOCKED, Release) == CONTENDED {
            // Wake a single thread. It marks the mutex CONTENDED again when it
            // locks, so the remaining waiters are woken eventually.
            self.wake();
        }
    }

    #[cold]
    fn wake(&self) {
        atomic_wait::wake_one(&self.futex);
    }
}

/// RAII guard returned by [`Mutex::lock`]; releases the lock on drop.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the guard proves exclusive ownership of the lock.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard proves exclusive ownership of the lock.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_futex() {
        let lock = Arc::new(Mutex::new(()));
        let current = Arc::new(AtomicU32::new(0));
        const N: usize = 8;
        const M: usize = 1 << 16;

        let mut tasks = vec![];
        for _ in 0..N {
            let lock = lock.clone();
            let current = current.clone();
            tasks.push(std::thread::spawn(move || {
                for _ in 0..M {
                    let _guard = lock.lock();
                    assert_eq!(current.fetch_add(1, Acquire), 0);
                    current.fetch_sub(1, Acquire);
                }
            }));
        }
        for task in tasks {
            task.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent() {
        let counter = Arc::new(Mutex::new(0usize));
        const THREAD_COUNT: usize = 4;
        const ITERATIONS: usize = 10000;

        let mut handles = vec![];

        for _ in 0..THREAD_COUNT {
            let counter = Arc::clone(&counter);

            handles.push(std::thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    {
                        let mut value = counter.lock();
                        let read = *value;
                        std::thread::yield_now(); // Force a context switch to increase contention
                        *value = read + 1;
                    }

                    std::thread::yield_now();

                    {
                        let mut value = counter.lock();
                        let read = *value;
                        std::thread::yield_now();
                        *value = read - 1;
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*counter.lock(), 0);
    }

    #[test]
    fn test_guard_releases() {
        let lock = Mutex::new(1);
        {
            let guard = lock.lock();
            assert!(!lock.try_acquire());
            drop(guard);
        }
        assert!(lock.try_acquire());
        lock.unlock();
        *lock.lock() += 1;
        assert_eq!(*lock.lock(), 2);
    }

    #[test]
    fn test_no_poison_after_panic() {
        let lock = Arc::new(Mutex::new(0u32));
        let cloned = lock.clone();
        let result = std::thread::spawn(move || {
            let mut guard = cloned.lock();
            *guard = 7;
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert!(lock.try_acquire());
        lock.unlock();
        assert_eq!(*lock.lock(), 7);
    }
}
