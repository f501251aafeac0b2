// Per-payment refund serialization.
//
// The gateway enforces the over-refund ceiling server-side, but two
// concurrent refund calls against the same payment would race toward that
// ceiling and one of them would get a late, confusing rejection. Holding an
// async lock per payment id keeps at most one refund in flight per payment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Clone, Default)]
pub struct RefundLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl RefundLocks {
    pub fn new() -> Self {
        Self::default()
    }

    // Get (or create) the lock for a payment id. The returned handle is
    // awaited by the caller; the registry mutex itself is held only for the
    // map lookup.
    pub fn lock_for(&self, payment_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().expect("refund lock registry poisoned");

        // A strong count of 1 means only the registry still holds the lock;
        // evict those so the map does not grow with every payment id seen
        map.retain(|_, lock| Arc::strong_count(lock) > 1);

        map.entry(payment_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.lock().expect("refund lock registry poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_payment_shares_a_lock() {
        let locks = RefundLocks::new();
        let a = locks.lock_for("pay_1");
        let b = locks.lock_for("pay_1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_payments_use_different_locks() {
        let locks = RefundLocks::new();
        let a = locks.lock_for("pay_1");
        let b = locks.lock_for("pay_2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_idle_locks_are_evicted() {
        let locks = RefundLocks::new();

        let held = locks.lock_for("pay_1");
        let dropped = locks.lock_for("pay_2");
        drop(dropped);

        // pay_2 is idle by the next lookup, pay_1 is still held
        locks.lock_for("pay_3");
        assert_eq!(locks.registered(), 2);
        drop(held);

        locks.lock_for("pay_4");
        assert_eq!(locks.registered(), 1);
    }

    #[tokio::test]
    async fn test_second_refund_waits_for_first() {
        let locks = RefundLocks::new();
        let lock = locks.lock_for("pay_1");

        let guard = lock.lock().await;
        assert!(locks.lock_for("pay_1").try_lock().is_err());
        drop(guard);
        assert!(locks.lock_for("pay_1").try_lock().is_ok());
    }
}
