//! Per-site bounded concurrency: a fixed-size semaphore per
//! configured site. A consumer that can't acquire immediately is told the
//! pending queue is full rather than being made to wait, so the caller can
//! apply the queue-consumer backpressure (re-publish after a pause) instead
//! of blocking a worker.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use std::sync::Arc;

pub enum SitePoolAcquisition {
    /// No concurrency limit configured for this site; proceed unbounded.
    Unbounded,
    Acquired(OwnedSemaphorePermit),
    /// The site's semaphore is fully checked out; callers bounce the task
    /// back to the queue rather than block, which can loop under sustained
    /// overload if nothing else relieves the site's pool.
    PendingQueueFull,
}

pub struct SitePools {
    limits: HashMap<String, usize>,
    semaphores: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl SitePools {
    pub fn new(limits: HashMap<String, usize>) -> Self {
        SitePools { limits, semaphores: Mutex::new(HashMap::new()) }
    }

    fn semaphore_for(&self, site: &str) -> Option<Arc<Semaphore>> {
        let limit = *self.limits.get(site)?;
        let mut map = self.semaphores.lock().unwrap();
        Some(Arc::clone(map.entry(site.to_string()).or_insert_with(|| Arc::new(Semaphore::new(limit)))))
    }

    pub fn try_acquire(&self, site: &str) -> SitePoolAcquisition {
        match self.semaphore_for(site) {
            None => SitePoolAcquisition::Unbounded,
            Some(sem) => match sem.try_acquire_owned() {
                Ok(permit) => SitePoolAcquisition::Acquired(permit),
                Err(_) => SitePoolAcquisition::PendingQueueFull,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_site_is_unbounded() {
        let pools = SitePools::new(HashMap::new());
        assert!(matches!(pools.try_acquire("example.com"), SitePoolAcquisition::Unbounded));
    }

    #[test]
    fn configured_site_bounces_past_its_limit() {
        let mut limits = HashMap::new();
        limits.insert("example.com".to_string(), 1);
        let pools = SitePools::new(limits);
        let first = pools.try_acquire("example.com");
        assert!(matches!(first, SitePoolAcquisition::Acquired(_)));
        let second = pools.try_acquire("example.com");
        assert!(matches!(second, SitePoolAcquisition::PendingQueueFull));
    }
}
