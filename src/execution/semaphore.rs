use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A small, blocking counting semaphore bounding how many pipeline runs hold a workbook in
/// memory at once.
pub struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

/// A held permit, returned to the semaphore on drop.
pub struct Permit<'a> {
    sem: &'a Semaphore,
    /// Time spent blocked before the permit was granted.
    pub waited: Duration,
}

impl Semaphore {
    /// `permits` is clamped to at least one.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits.max(1)),
            cv: Condvar::new(),
        }
    }

    /// Acquire one permit, blocking until available.
    pub fn acquire(&self) -> Permit<'_> {
        let start = Instant::now();
        let mut waited = false;
        let mut g = self.lock();
        while *g == 0 {
            waited = true;
            g = self.cv.wait(g).unwrap_or_else(|p| p.into_inner());
        }
        *g -= 1;
        Permit {
            sem: self,
            waited: if waited { start.elapsed() } else { Duration::ZERO },
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut g = self.sem.lock();
        *g += 1;
        self.sem.cv.notify_one();
    }
}
