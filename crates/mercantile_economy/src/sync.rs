//! # Shared Economy
//!
//! One big lock around the whole economy, for a UI or render thread that
//! reads state while another thread ticks.
//!
//! The tick holds the write lock from start to finish, so a reader never
//! observes a half-applied tick.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::economy::{Economy, TickReport};

/// Cloneable handle to an economy behind a read-write lock.
///
/// # Example
///
/// ```rust
/// use mercantile_economy::{Economy, SharedEconomy};
///
/// let shared = SharedEconomy::new(Economy::new());
/// let renderer = shared.clone();
///
/// let report = shared.tick();
/// assert_eq!(renderer.read().current_tick(), report.tick);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SharedEconomy {
    inner: Arc<RwLock<Economy>>,
}

impl SharedEconomy {
    /// Wraps an economy.
    #[must_use]
    pub fn new(economy: Economy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(economy)),
        }
    }

    /// Runs one tick under the write lock.
    pub fn tick(&self) -> TickReport {
        self.inner.write().tick()
    }

    /// Locks the economy for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Economy> {
        self.inner.read()
    }

    /// Locks the economy for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, Economy> {
        self.inner.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_reader_thread_sees_whole_ticks() {
        let shared = SharedEconomy::new(Economy::new());
        let ticker = shared.clone();

        let handle = thread::spawn(move || {
            for _ in 0..100 {
                ticker.tick();
            }
        });

        let mut last = 0;
        while last < 100 {
            let tick = shared.read().current_tick();
            assert!(tick >= last);
            last = tick;
        }
        handle.join().unwrap();
        assert_eq!(shared.read().current_tick(), 100);
    }
}
