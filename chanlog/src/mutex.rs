use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

static LOG_MUTEX: ReentrantMutex<()> = parking_lot::const_reentrant_mutex(());

// Only read by the discipline check, never used for exclusion.
static LOCK_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Scoped lock serializing writes to the channels.
///
/// Hold one while writing to [`out`](crate::out), [`log`](crate::log) or
/// [`err`](crate::err) so lines from different threads don't interleave. The
/// lock is re-entrant: a thread already holding it may take it again.
///
/// ```
/// use std::io::Write;
///
/// let _lock = chanlog::Lock::new();
/// let _ = writeln!(chanlog::log(), "step {}", 1);
/// ```
#[must_use = "the lock is released as soon as it is dropped"]
pub struct Lock {
    _guard: ReentrantMutexGuard<'static, ()>,
}

impl Lock {
    /// Blocks until the calling thread owns the lock.
    pub fn new() -> Lock {
        let guard = LOG_MUTEX.lock();
        LOCK_COUNT.fetch_add(1, Ordering::Relaxed);
        Lock { _guard: guard }
    }
}

impl Default for Lock {
    fn default() -> Self {
        Lock::new()
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        // The mutex itself is released after this body, when `_guard` drops.
        LOCK_COUNT.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Number of [`Lock`]s currently held across all threads.
pub fn lock_count() -> usize {
    LOCK_COUNT.load(Ordering::Relaxed)
}

/// Takes the write mutex without counting as a held [`Lock`].
pub(crate) fn serialize() -> ReentrantMutexGuard<'static, ()> {
    LOG_MUTEX.lock()
}

/// Panics in debug builds when a redirected channel emits while no [`Lock`]
/// is held and the assertion is enabled.
#[track_caller]
pub(crate) fn check_discipline() {
    if cfg!(debug_assertions) && crate::config::assert_lock() && lock_count() == 0 {
        panic!(
            "chanlog: emitted on a redirected channel without holding chanlog::Lock \
             (see chanlog::set_assert_lock)"
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn nested_locks_count_depth() {
        let outer = Lock::new();
        assert_eq!(lock_count(), 1);
        {
            let _inner = Lock::new();
            assert_eq!(lock_count(), 2);
            let _serial = serialize();
            assert_eq!(lock_count(), 2);
        }
        assert_eq!(lock_count(), 1);
        drop(outer);
    }

    #[test]
    fn lock_excludes_other_threads() {
        let held = Lock::new();
        let acquired = Arc::new(AtomicBool::new(false));
        let handle = std::thread::spawn({
            let acquired = acquired.clone();
            move || {
                let _lock = Lock::new();
                acquired.store(true, Ordering::SeqCst);
            }
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(held);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }
}
