//! Mutex-wrapped value types with exclusive and shared accessors (§4.1).
//!
//! [`GuardedCell`] is the plain case: every access takes the lock. [`DeferredGuarded`]
//! additionally lets a writer that cannot immediately acquire the lock enqueue its
//! mutation instead of blocking; the next thread to take the lock — exclusive or shared —
//! drains and applies the queue first, so a shared reader never observes state that
//! skipped a still-pending deferred mutation.

pub mod queue;

use std::sync::Mutex;

/// A value protected by a single mutex, with `exclusive`/`shared` accessors that block
/// until the lock is available.
pub struct GuardedCell<T> {
    data: Mutex<T>,
}

impl<T> GuardedCell<T> {
    pub fn new(value: T) -> Self {
        Self { data: Mutex::new(value) }
    }

    /// Run `f` with exclusive access, blocking until the lock is free.
    pub fn exclusive<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.data.lock().expect("guarded cell poisoned");
        f(&mut guard)
    }

    /// Run `f` with shared (read-only) access. There is no separate reader lock in this
    /// implementation — a plain `Mutex` is sufficient for this subsystem's access
    /// pattern, where reads are infrequent relative to writes — but the method is kept
    /// distinct from `exclusive` so call sites document their intent.
    pub fn shared<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.data.lock().expect("guarded cell poisoned");
        f(&guard)
    }
}

impl<T: Clone> GuardedCell<T> {
    pub fn load(&self) -> T {
        self.shared(|v| v.clone())
    }
}

impl<T> GuardedCell<T> {
    pub fn store(&self, value: T) {
        self.exclusive(|v| *v = value);
    }
}

type PendingFn<T> = Box<dyn FnOnce(&mut T) + Send>;

/// A [`GuardedCell`] variant that can defer a mutation instead of blocking for it.
///
/// `modify_detach` tries the lock; if it's free, the function runs inline (after first
/// draining any pending queue, so ordering is preserved). If the lock is held, the
/// function is appended to a pending queue guarded by its own cheap mutex and will run
/// the next time any accessor — exclusive or shared — takes the main lock.
pub struct DeferredGuarded<T> {
    data: Mutex<T>,
    pending: Mutex<Vec<PendingFn<T>>>,
}

impl<T> DeferredGuarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            data: Mutex::new(value),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn drain_pending(&self, guard: &mut T) {
        loop {
            let batch: Vec<PendingFn<T>> = {
                let mut pending = self.pending.lock().expect("pending queue poisoned");
                if pending.is_empty() {
                    return;
                }
                std::mem::take(&mut *pending)
            };
            for f in batch {
                f(guard);
            }
        }
    }

    /// Run `f` with exclusive access, draining any pending deferred mutations first.
    pub fn exclusive<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.data.lock().expect("guarded cell poisoned");
        self.drain_pending(&mut guard);
        f(&mut guard)
    }

    /// Run `f` with shared access, draining any pending deferred mutations first so the
    /// reader never observes state older than an already-queued write.
    pub fn shared<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let mut guard = self.data.lock().expect("guarded cell poisoned");
        self.drain_pending(&mut guard);
        f(&guard)
    }

    /// Apply `f` now if the lock is uncontended, or enqueue it to run on the next
    /// acquisition. Never blocks.
    pub fn modify_detach(&self, f: impl FnOnce(&mut T) + Send + 'static) {
        match self.data.try_lock() {
            Ok(mut guard) => {
                self.drain_pending(&mut guard);
                f(&mut guard);
            }
            Err(_) => {
                self.pending.lock().expect("pending queue poisoned").push(Box::new(f));
            }
        }
    }
}

impl<T: Clone> DeferredGuarded<T> {
    pub fn load(&self) -> T {
        self.shared(|v| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn exclusive_access_mutates_in_place() {
        let cell = GuardedCell::new(0);
        cell.exclusive(|v| *v += 1);
        assert_eq!(cell.load(), 1);
    }

    #[test]
    fn deferred_modify_runs_inline_when_uncontended() {
        let cell = DeferredGuarded::new(0);
        cell.modify_detach(|v| *v += 5);
        assert_eq!(cell.load(), 5);
    }

    #[test]
    fn deferred_pending_mutation_is_drained_by_next_reader() {
        let cell = Arc::new(DeferredGuarded::new(0));
        let guard = cell.data.lock().unwrap();
        cell.modify_detach(|v| *v += 10);
        drop(guard);
        // the pending mutation had no chance to run inline (lock was held); the next
        // shared access must drain it before returning.
        assert_eq!(cell.load(), 10);
    }
}
