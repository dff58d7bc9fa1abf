use anchor_lang::prelude::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;

use crate::chain::{Chain, TransactionBalances};

/// Result of checking one signature for a SOL payment into the presale wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The presale wallet gained this many lamports.
    Confirmed(u64),
    /// No confirmed transaction, or one without execution metadata.
    NotFound,
    /// The presale wallet is not among the transaction's accounts.
    WrongRecipient,
    /// The presale wallet balance did not increase.
    NonPositiveDelta,
    /// The lookup itself failed.
    QueryFailed(String),
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed(lamports) => write!(f, "confirmed ({lamports} lamports)"),
            Self::NotFound => f.write_str("transaction not found"),
            Self::WrongRecipient => f.write_str("presale wallet not involved"),
            Self::NonPositiveDelta => f.write_str("presale balance did not increase"),
            Self::QueryFailed(reason) => write!(f, "lookup failed: {reason}"),
        }
    }
}

pub async fn verify_payment(
    chain: &dyn Chain,
    signature: &Signature,
    presale: &Pubkey,
) -> PaymentOutcome {
    match chain.fetch_transaction(signature).await {
        Ok(Some(balances)) => inspect_balances(&balances, presale),
        Ok(None) => PaymentOutcome::NotFound,
        Err(e) => {
            tracing::warn!(%signature, error = %e, "payment lookup failed");
            PaymentOutcome::QueryFailed(e.to_string())
        }
    }
}

/// Lamport delta of `presale` within an already fetched transaction.
pub fn inspect_balances(balances: &TransactionBalances, presale: &Pubkey) -> PaymentOutcome {
    let Some(meta) = &balances.meta else {
        return PaymentOutcome::NotFound;
    };
    let Some(idx) = balances.account_keys.iter().position(|key| key == presale) else {
        return PaymentOutcome::WrongRecipient;
    };

    let (Some(&pre), Some(&post)) = (meta.pre_balances.get(idx), meta.post_balances.get(idx))
    else {
        return PaymentOutcome::NonPositiveDelta;
    };

    match post.checked_sub(pre) {
        Some(lamports) if lamports > 0 => PaymentOutcome::Confirmed(lamports),
        _ => PaymentOutcome::NonPositiveDelta,
    }
}
