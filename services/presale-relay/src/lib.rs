//! Presale relay: verifies that a buyer's SOL payment landed in the presale
//! wallet and transfers the matching amount of presale tokens back to them.
//!
//! ```text
//! POST /verify { signature, buyer }
//!        │
//!        ▼
//!   payment::verify_payment ── lamports received by the presale wallet
//!        │
//!        ▼
//!   pricing::ExchangeRate ──── lamports → token base units
//!        │
//!        ▼
//!   ledger::RedemptionLedger ─ one redemption per signature
//!        │
//!        ▼
//!   transfer::TransferExecutor ─ ATAs + transfer_checked
//! ```

use std::sync::Arc;

pub mod chain;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod payment;
pub mod pricing;
pub mod relay;
pub mod routes;
pub mod transfer;

pub use chain::{BalanceMeta, Chain, ChainError, RpcChain, TransactionBalances};
pub use config::{ConfigError, RelayConfig};
pub use errors::RelayError;
pub use ledger::{InMemoryLedger, RedemptionLedger};
pub use payment::PaymentOutcome;
pub use pricing::{ExchangeRate, PricingError};

/// Shared, read-only handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub chain: Arc<dyn Chain>,
    pub ledger: Arc<dyn RedemptionLedger>,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        chain: Arc<dyn Chain>,
        ledger: Arc<dyn RedemptionLedger>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            chain,
            ledger,
        }
    }
}
