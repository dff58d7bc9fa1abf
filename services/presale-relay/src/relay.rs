use anchor_lang::prelude::Pubkey;
use solana_sdk::signature::Signature;
use std::str::FromStr;

use crate::errors::RelayError;
use crate::payment::{verify_payment, PaymentOutcome};
use crate::transfer::{TransferExecutor, TransferFailure};
use crate::AppState;

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub txid: Signature,
    pub lamports: u64,
    pub tokens: u64,
}

/// Verifies the SOL payment behind `signature` and sends the purchased tokens
/// to `buyer`.
///
/// A signature is reserved in the ledger before any transfer is attempted and
/// stays reserved once the transfer is broadcast. The reservation is dropped
/// only when the transfer never left the relay or the cluster rejected it;
/// a broadcast with an unknown outcome keeps the signature redeemed.
pub async fn redeem(
    state: &AppState,
    signature: &str,
    buyer: &str,
) -> Result<Redemption, RelayError> {
    let buyer = Pubkey::from_str(buyer.trim()).map_err(|_| RelayError::InvalidBuyer)?;
    let signature =
        Signature::from_str(signature.trim()).map_err(|_| RelayError::InvalidPayment)?;

    if state.ledger.is_redeemed(&signature) {
        return Err(RelayError::AlreadyRedeemed);
    }

    let config = &state.config;
    let lamports =
        match verify_payment(state.chain.as_ref(), &signature, &config.presale_pubkey).await {
            PaymentOutcome::Confirmed(lamports) => lamports,
            PaymentOutcome::QueryFailed(reason) => return Err(RelayError::LookupFailed(reason)),
            outcome => {
                tracing::warn!(%signature, %buyer, %outcome, "payment rejected");
                return Err(RelayError::InvalidPayment);
            }
        };

    let tokens = config.exchange.tokens_for(lamports)?;
    tracing::info!(%signature, %buyer, lamports, tokens, "payment verified");

    if !state.ledger.try_reserve(&signature) {
        return Err(RelayError::AlreadyRedeemed);
    }

    let executor = TransferExecutor::new(state.chain.as_ref(), config);
    match executor.execute(&buyer, tokens).await {
        Ok(txid) => Ok(Redemption {
            txid,
            lamports,
            tokens,
        }),
        Err(TransferFailure::NotSent(e)) => {
            state.ledger.release(&signature);
            Err(e)
        }
        Err(TransferFailure::Unresolved { txid, error }) => {
            tracing::error!(
                %signature, %buyer, tokens, %txid, %error,
                "transfer outcome unknown, signature stays redeemed until reconciled"
            );
            Err(RelayError::TransferUnresolved {
                txid: txid.to_string(),
                reason: error.to_string(),
            })
        }
    }
}
