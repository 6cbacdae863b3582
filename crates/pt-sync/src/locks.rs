//! Per-barcode write serialisation.
//!
//! Two passes touching the same barcode take turns; passes on different
//! barcodes never wait on each other.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct BarcodeLocks {
    inner: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

impl BarcodeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `barcode`. Released on drop.
    pub async fn lock(&self, barcode: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(barcode.to_string()).or_default())
        };
        slot.lock_owned().await
    }

    /// Forget locks nobody holds or waits on.
    pub async fn prune(&self) {
        let mut map = self.inner.lock().await;
        map.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_barcode_is_exclusive() {
        let locks = Arc::new(BarcodeLocks::new());
        let guard = locks.lock("B-1").await;

        let l2 = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = l2.lock("B-1").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_barcodes_do_not_block() {
        let locks = BarcodeLocks::new();
        let _a = locks.lock("A").await;
        let _b = locks.lock("B").await;
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn prune_drops_idle_slots() {
        let locks = BarcodeLocks::new();
        {
            let _g = locks.lock("A").await;
        }
        let _held = locks.lock("B").await;
        locks.prune().await;
        assert_eq!(locks.len().await, 1);
    }
}
