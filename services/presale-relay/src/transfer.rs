use anchor_lang::prelude::Pubkey;
use anchor_lang::AccountDeserialize;
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::associated_token::spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use anchor_spl::token::{spl_token, TokenAccount};
use solana_sdk::instruction::Instruction;
use solana_sdk::signature::{Signature, Signer};
use solana_sdk::transaction::Transaction;

use crate::chain::{Chain, ChainError};
use crate::config::RelayConfig;
use crate::errors::RelayError;

/// How far a failed [`TransferExecutor::execute`] got.
#[derive(Debug)]
pub enum TransferFailure {
    /// No token transfer reached the network, or the cluster refused it.
    NotSent(RelayError),
    /// The transfer was broadcast and its outcome is unknown; it may still land.
    Unresolved { txid: Signature, error: ChainError },
}

impl From<RelayError> for TransferFailure {
    fn from(error: RelayError) -> Self {
        Self::NotSent(error)
    }
}

impl From<ChainError> for TransferFailure {
    fn from(error: ChainError) -> Self {
        Self::NotSent(error.into())
    }
}

/// Moves presale tokens to a buyer, paying every fee from the presale keypair.
pub struct TransferExecutor<'a> {
    chain: &'a dyn Chain,
    config: &'a RelayConfig,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(chain: &'a dyn Chain, config: &'a RelayConfig) -> Self {
        Self { chain, config }
    }

    /// Sends `tokens` to the buyer's associated token account.
    ///
    /// Everything up to the broadcast of the transfer itself fails with
    /// [`TransferFailure::NotSent`], as does a transfer the cluster rejects.
    /// ATA creation is idempotent, so its failures never leave tokens in flight.
    pub async fn execute(
        &self,
        buyer: &Pubkey,
        tokens: u64,
    ) -> Result<Signature, TransferFailure> {
        let buyer_ata = self.resolve_or_create_token_account(buyer).await?;
        let presale_ata = self
            .resolve_or_create_token_account(&self.config.presale_pubkey)
            .await?;

        let ix = self.build_transfer(&presale_ata, &buyer_ata, tokens)?;
        let tx = self.sign(ix).await?;
        let txid = tx.signatures[0];

        match self
            .chain
            .send_transaction(&tx, self.config.confirm_transfers)
            .await
        {
            Ok(txid) => {
                tracing::info!(%buyer, %buyer_ata, tokens, %txid, "token transfer submitted");
                Ok(txid)
            }
            Err(error) if error.is_rejection() => Err(TransferFailure::NotSent(error.into())),
            Err(error) => Err(TransferFailure::Unresolved { txid, error }),
        }
    }

    /// Returns the owner's associated token account for the presale mint,
    /// creating it first if the chain has no such account.
    pub async fn resolve_or_create_token_account(
        &self,
        owner: &Pubkey,
    ) -> Result<Pubkey, RelayError> {
        let mint = &self.config.mint;
        let ata = get_associated_token_address(owner, mint);

        match self.chain.get_account_data(&ata).await? {
            Some(data) => {
                let account = TokenAccount::try_deserialize(&mut data.as_slice()).map_err(|_| {
                    RelayError::InvalidTokenAccount {
                        address: ata.to_string(),
                    }
                })?;
                if account.mint != *mint || account.owner != *owner {
                    return Err(RelayError::InvalidTokenAccount {
                        address: ata.to_string(),
                    });
                }
            }
            None => {
                let ix = create_associated_token_account_idempotent(
                    &self.config.presale_keypair.pubkey(),
                    owner,
                    mint,
                    &spl_token::ID,
                );
                // The transfer that follows needs this account to exist.
                let txid = self.submit(ix, true).await?;
                tracing::info!(%owner, %ata, %txid, "created associated token account");
            }
        }

        Ok(ata)
    }

    pub fn build_transfer(
        &self,
        source: &Pubkey,
        destination: &Pubkey,
        tokens: u64,
    ) -> Result<Instruction, RelayError> {
        spl_token::instruction::transfer_checked(
            &spl_token::ID,
            source,
            &self.config.mint,
            destination,
            &self.config.presale_keypair.pubkey(),
            &[],
            tokens,
            self.config.exchange.decimals,
        )
        .map_err(|e| RelayError::Instruction(e.to_string()))
    }

    async fn sign(&self, ix: Instruction) -> Result<Transaction, ChainError> {
        let payer = &self.config.presale_keypair;
        let blockhash = self.chain.latest_blockhash().await?;
        Ok(Transaction::new_signed_with_payer(
            &[ix],
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        ))
    }

    async fn submit(&self, ix: Instruction, confirm: bool) -> Result<Signature, RelayError> {
        let tx = self.sign(ix).await?;
        Ok(self.chain.send_transaction(&tx, confirm).await?)
    }
}
