use solana_sdk::signature::Signature;
use std::collections::HashSet;
use std::sync::Mutex;

/// Tracks payment signatures that have been redeemed or are being redeemed.
pub trait RedemptionLedger: Send + Sync {
    /// Atomically records `signature`. Returns `false` if it was already there.
    fn try_reserve(&self, signature: &Signature) -> bool;

    /// Drops a reservation whose transfer never reached the network.
    fn release(&self, signature: &Signature);

    fn is_redeemed(&self, signature: &Signature) -> bool;
}

/// Process-local ledger. Reservations are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    redeemed: Mutex<HashSet<Signature>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RedemptionLedger for InMemoryLedger {
    fn try_reserve(&self, signature: &Signature) -> bool {
        let mut redeemed = self
            .redeemed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        redeemed.insert(*signature)
    }

    fn release(&self, signature: &Signature) {
        let mut redeemed = self
            .redeemed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        redeemed.remove(signature);
    }

    fn is_redeemed(&self, signature: &Signature) -> bool {
        self.redeemed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(signature)
    }
}
