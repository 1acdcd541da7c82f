// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
A reader/writer spinlock guarding registry tables.

Registries are shared by every context and thread, including the wasm main thread,
which must not block on a mutex. Critical sections only look up or insert a handle,
so spinning is cheap.

The lock is released on drop of an internal guard, so a panic inside the closure
does not leave it locked.
*/

use std::cell::UnsafeCell;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

const UNLOCKED: u8 = 0;
// up to 254 readers, or one writer
const LOCKED_WRITE: u8 = u8::MAX;

pub(crate) struct Spinlock<T> {
    data: UnsafeCell<T>,
    state: AtomicU8,
}

unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send + Sync> Sync for Spinlock<T> {}

struct ReadLocked<'a>(&'a AtomicU8);

impl Drop for ReadLocked<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Release);
    }
}

struct WriteLocked<'a>(&'a AtomicU8);

impl Drop for WriteLocked<'_> {
    fn drop(&mut self) {
        self.0.store(UNLOCKED, Release);
    }
}

impl<T> Spinlock<T> {
    pub(crate) const fn new(data: T) -> Self {
        Spinlock {
            data: UnsafeCell::new(data),
            state: AtomicU8::new(UNLOCKED),
        }
    }

    fn lock_read(&self) -> ReadLocked<'_> {
        while self
            .state
            .fetch_update(Acquire, Relaxed, |v| (v < LOCKED_WRITE - 1).then_some(v + 1))
            .is_err()
        {
            std::hint::spin_loop();
        }
        ReadLocked(&self.state)
    }

    fn lock_write(&self) -> WriteLocked<'_> {
        while self
            .state
            .compare_exchange_weak(UNLOCKED, LOCKED_WRITE, Acquire, Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        WriteLocked(&self.state)
    }

    /// Runs `f` with shared access. `f` must not take the write lock.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let _locked = self.lock_read();
        // SAFETY: the read lock excludes writers
        f(unsafe { &*self.data.get() })
    }

    /// Runs `f` with exclusive access. `f` must not lock this spinlock again.
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _locked = self.lock_write();
        // SAFETY: the write lock excludes readers and other writers
        f(unsafe { &mut *self.data.get() })
    }
}

#[cfg(test)]
mod tests {
    use super::Spinlock;
    use std::sync::Arc;

    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::*;

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    fn test_with_and_with_mut() {
        let lock = Spinlock::new(vec![1]);
        lock.with_mut(|v| v.push(2));
        assert_eq!(lock.with(|v| v.len()), 2);
        // nested reads are fine
        let sum: i32 = lock.with(|a| lock.with(|b| a.iter().chain(b.iter()).sum()));
        assert_eq!(sum, 6);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_released_after_panic() {
        let lock = Spinlock::new(0);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            lock.with_mut(|_| panic!("boom"));
        }));
        assert!(result.is_err());
        lock.with_mut(|v| *v += 1);
        assert_eq!(lock.with(|v| *v), 1);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_concurrent_writers() {
        let lock = Arc::new(Spinlock::new(0u32));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        lock.with_mut(|v| *v += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(lock.with(|v| *v), 8000);
    }
}
