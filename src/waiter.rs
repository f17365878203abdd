use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::ThreadId;

/// A queued thread waiting for ownership of a [`crate::FairLock`].
///
/// The waiting thread keeps the `AtomicU32` on its own stack and spins or
/// sleeps on it; the releasing thread flips it to 1 to hand ownership over.
///
/// # Safety
/// The wrapped `AtomicU32` must outlive the `WaiterPtr`. The lock guarantees
/// this by only touching queued pointers under its state mutex, and by having
/// a waiter that gives up remove itself from the queue under that same mutex.
pub struct WaiterPtr {
    ptr: *const AtomicU32,
    thread: ThreadId,
}

impl WaiterPtr {
    /// Creates a new `WaiterPtr` for `thread`, waiting on `w`.
    pub fn new(w: &AtomicU32, thread: ThreadId) -> Self {
        Self {
            ptr: w as *const _,
            thread,
        }
    }

    /// The thread that is waiting.
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Whether this pointer refers to `w`.
    pub fn is(&self, w: &AtomicU32) -> bool {
        std::ptr::eq(self.ptr, w)
    }

    /// Sets the atomic value to 1 and wakes the waiting thread.
    pub fn wake_up(&self) {
        let waiter = unsafe { &*self.ptr };
        waiter.store(1, Ordering::Release);
        atomic_wait::wake_one(self.ptr);
    }

    /// Blocks until another thread calls `wake_up()` for `w`.
    pub fn wait(w: &AtomicU32) {
        while !Self::is_woken(w) {
            atomic_wait::wait(w, 0);
        }
    }

    /// Non-blocking check used by timed waits.
    pub fn is_woken(w: &AtomicU32) -> bool {
        w.load(Ordering::Acquire) != 0
    }
}

// Safety: WaiterPtr can be safely shared between threads
unsafe impl Sync for WaiterPtr {}
unsafe impl Send for WaiterPtr {}
