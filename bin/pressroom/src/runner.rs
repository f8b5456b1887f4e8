//! Per-site serialization.
//!
//! A generation and a publish of the same site both rewrite its workspace,
//! so at most one runs per site at any time. Different sites run freely.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::trace;

/// One lock per site id.
#[derive(Debug, Default)]
pub struct SiteRunner {
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl SiteRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock of `site_id`, blocking until it is free.
    ///
    /// A run that panicked does not poison the site for later runs.
    pub fn with_site<R>(&self, site_id: i64, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(site_id).or_default())
        };

        trace!(site = site_id, "waiting for site lock");
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        trace!(site = site_id, "site lock acquired");
        f()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Barrier,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_same_site_is_serialized() {
        let runner = Arc::new(SiteRunner::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let runner = Arc::clone(&runner);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    runner.with_site(7, || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_different_sites_overlap() {
        let runner = Arc::new(SiteRunner::new());
        // Both closures must be inside their lock at once to pass the barrier.
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [1, 2]
            .into_iter()
            .map(|site| {
                let runner = Arc::clone(&runner);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || runner.with_site(site, || barrier.wait().is_leader()))
            })
            .collect();

        let leaders = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|leader| *leader)
            .count();
        assert_eq!(leaders, 1);
    }

    #[test]
    fn test_returns_value_and_survives_panic() {
        let runner = Arc::new(SiteRunner::new());
        let poisoned = Arc::clone(&runner);
        let _ = thread::spawn(move || poisoned.with_site(3, || panic!("boom"))).join();

        assert_eq!(runner.with_site(3, || 42), 42);
    }
}
