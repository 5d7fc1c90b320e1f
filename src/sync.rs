use std::sync::{Mutex, MutexGuard};

/// Locking that recovers the guard from a poisoned mutex instead of failing.
pub(crate) trait PoisonlessLock<T> {
    fn plock(&self) -> MutexGuard<'_, T>;
}

impl<T> PoisonlessLock<T> for Mutex<T> {
    fn plock(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(l) => l,
            Err(e) => e.into_inner(),
        }
    }
}
