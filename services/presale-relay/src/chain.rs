//! Chain access for the relay.
//!
//! Everything the relay needs from a Solana node goes through [`Chain`], so
//! request handling can be exercised against an in-process double. [`RpcChain`]
//! is the production implementation backed by the nonblocking `RpcClient`.

use anchor_lang::prelude::Pubkey;
use serde_json::json;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::RpcRequest;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, UiLoadedAddresses, UiTransactionEncoding,
};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    Rpc(#[from] ClientError),
    #[error("Malformed transaction data: {0}")]
    Decode(String),
    /// The cluster refused the transaction (preflight, simulation or an
    /// executed instruction error); no state change from it will land.
    #[error("Transaction rejected: {0}")]
    Rejected(String),
}

impl ChainError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Separates definitive refusals from transport failures, after which the
/// transaction may still land.
fn classify_send_error(err: ClientError) -> ChainError {
    match err.get_transaction_error() {
        Some(_) => ChainError::Rejected(err.to_string()),
        None => ChainError::Rpc(err),
    }
}

/// Lamport balances of every account touched by a transaction.
///
/// `account_keys` lists static keys first, then loaded writable and loaded
/// readonly addresses, matching the index order of the balance vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBalances {
    pub account_keys: Vec<Pubkey>,
    pub meta: Option<BalanceMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMeta {
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
}

#[async_trait::async_trait]
pub trait Chain: Send + Sync {
    /// Looks up a transaction at `confirmed` commitment. `Ok(None)` means the
    /// node has no record of the signature.
    async fn fetch_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionBalances>, ChainError>;

    /// Raw data of an account, or `None` if it does not exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ChainError>;

    async fn latest_blockhash(&self) -> Result<Hash, ChainError>;

    /// Broadcasts a signed transaction. With `confirm` set, waits until the
    /// cluster reports it at the client's commitment.
    ///
    /// Only [`ChainError::Rejected`] means the transaction cannot land; any
    /// other error leaves its outcome unknown.
    async fn send_transaction(
        &self,
        transaction: &Transaction,
        confirm: bool,
    ) -> Result<Signature, ChainError>;
}

pub struct RpcChain {
    client: RpcClient,
}

impl RpcChain {
    pub fn new(rpc_url: String) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait::async_trait]
impl Chain for RpcChain {
    async fn fetch_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionBalances>, ChainError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        // `getTransaction` answers `null` for unknown signatures; requesting an
        // Option keeps that apart from transport failures.
        let response: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .client
            .send(
                RpcRequest::GetTransaction,
                json!([signature.to_string(), config]),
            )
            .await?;
        response.map(decode_balances).transpose()
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ChainError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        confirm: bool,
    ) -> Result<Signature, ChainError> {
        let sent = if confirm {
            self.client.send_and_confirm_transaction(transaction).await
        } else {
            self.client.send_transaction(transaction).await
        };
        sent.map_err(classify_send_error)
    }
}

fn decode_balances(
    confirmed: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<TransactionBalances, ChainError> {
    let encoded = confirmed.transaction;
    let transaction = encoded
        .transaction
        .decode()
        .ok_or_else(|| ChainError::Decode("transaction payload could not be decoded".into()))?;

    let mut account_keys = transaction.message.static_account_keys().to_vec();

    let meta = match encoded.meta {
        Some(meta) => {
            let loaded: Option<UiLoadedAddresses> = meta.loaded_addresses.into();
            if let Some(loaded) = loaded {
                for address in loaded.writable.iter().chain(loaded.readonly.iter()) {
                    let key = Pubkey::from_str(address).map_err(|e| {
                        ChainError::Decode(format!("loaded address {address}: {e}"))
                    })?;
                    account_keys.push(key);
                }
            }
            Some(BalanceMeta {
                pre_balances: meta.pre_balances,
                post_balances: meta.post_balances,
            })
        }
        None => None,
    };

    Ok(TransactionBalances { account_keys, meta })
}
