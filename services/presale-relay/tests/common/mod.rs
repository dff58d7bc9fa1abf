#![allow(dead_code)]

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::native_token::LAMPORTS_PER_SOL;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::token::spl_token::instruction::TokenInstruction;
use anchor_spl::token::spl_token::state::{Account as SplAccount, AccountState};
use presale_relay::{
    AppState, BalanceMeta, Chain, ChainError, ExchangeRate, InMemoryLedger, RelayConfig,
    TransactionBalances,
};
use solana_client::client_error::ClientErrorKind;
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-process stand-in for an RPC node that records every call.
#[derive(Default)]
pub struct MockChain {
    pub transactions: Mutex<HashMap<Signature, TransactionBalances>>,
    pub accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    pub sent: Mutex<Vec<(Transaction, bool)>>,
    pub calls: AtomicUsize,
    pub fetches: AtomicUsize,
    pub fail_lookup: AtomicBool,
    /// The cluster refuses every broadcast; nothing is recorded.
    pub fail_send: AtomicBool,
    /// The next broadcast lands but the node's reply is lost.
    pub lose_next_reply: AtomicBool,
}

impl MockChain {
    pub fn insert_transaction(&self, signature: Signature, balances: TransactionBalances) {
        self.transactions.lock().unwrap().insert(signature, balances);
    }

    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(Transaction, bool)> {
        self.sent.lock().unwrap().clone()
    }

    /// Decoded `TransferChecked` instructions among the sent transactions.
    pub fn transfers(&self) -> Vec<(u64, u8)> {
        self.sent()
            .iter()
            .flat_map(|(tx, _)| tx.message.instructions.clone())
            .filter_map(|ix| match TokenInstruction::unpack(&ix.data) {
                Ok(TokenInstruction::TransferChecked { amount, decimals }) => {
                    Some((amount, decimals))
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Chain for MockChain {
    async fn fetch_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionBalances>, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // Let a concurrent request run between the ledger check and the lookup.
        tokio::task::yield_now().await;
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(ChainError::Decode("node unavailable".into()));
        }
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::new_unique())
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        confirm: bool,
    ) -> Result<Signature, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ChainError::Rejected("blockhash not found".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((transaction.clone(), confirm));
        if self.lose_next_reply.swap(false, Ordering::SeqCst) {
            let lost = ClientErrorKind::Custom("connection reset by peer".into());
            return Err(ChainError::Rpc(lost.into()));
        }
        Ok(transaction.signatures[0])
    }
}

pub fn token_account_data(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let account = SplAccount {
        mint: *mint,
        owner: *owner,
        amount,
        state: AccountState::Initialized,
        ..SplAccount::default()
    };
    let mut data = vec![0u8; SplAccount::LEN];
    SplAccount::pack(account, &mut data).unwrap();
    data
}

pub fn payment(keys: Vec<Pubkey>, pre: Vec<u64>, post: Vec<u64>) -> TransactionBalances {
    TransactionBalances {
        account_keys: keys,
        meta: Some(BalanceMeta {
            pre_balances: pre,
            post_balances: post,
        }),
    }
}

pub struct Harness {
    pub state: AppState,
    pub chain: Arc<MockChain>,
    pub ledger: Arc<InMemoryLedger>,
    pub presale: Pubkey,
    pub mint: Pubkey,
}

impl Harness {
    /// 500 tokens per SOL, 6 decimals; the presale token account already exists.
    pub fn new() -> Self {
        Self::with_confirm_transfers(true)
    }

    pub fn with_confirm_transfers(confirm_transfers: bool) -> Self {
        let keypair = Keypair::new();
        let presale = keypair.pubkey();
        let mint = Pubkey::new_unique();
        let config = RelayConfig {
            rpc_url: "http://127.0.0.1:8899".into(),
            presale_keypair: keypair,
            presale_pubkey: presale,
            mint,
            exchange: ExchangeRate::new(6, 500),
            bind_address: "127.0.0.1".into(),
            port: 3000,
            confirm_transfers,
        };

        let chain = Arc::new(MockChain::default());
        chain.insert_account(
            get_associated_token_address(&presale, &mint),
            token_account_data(&mint, &presale, 1_000_000_000_000),
        );
        let ledger = Arc::new(InMemoryLedger::new());
        let state = AppState::new(config, chain.clone(), ledger.clone());

        Self {
            state,
            chain,
            ledger,
            presale,
            mint,
        }
    }

    /// Registers a transaction in which `buyer` pays `lamports` to the presale wallet.
    pub fn pay(&self, buyer: &Pubkey, lamports: u64) -> Signature {
        let signature = Signature::new_unique();
        self.chain.insert_transaction(
            signature,
            payment(
                vec![*buyer, self.presale, anchor_lang::system_program::ID],
                vec![10 * LAMPORTS_PER_SOL, 0, 1],
                vec![10 * LAMPORTS_PER_SOL - lamports - 5_000, lamports, 1],
            ),
        );
        signature
    }

    pub fn buyer_ata(&self, buyer: &Pubkey) -> Pubkey {
        get_associated_token_address(buyer, &self.mint)
    }

    pub fn is_ata_create(tx: &Transaction) -> bool {
        tx.message.instructions.iter().any(|ix| {
            tx.message.account_keys[ix.program_id_index as usize]
                == anchor_spl::associated_token::ID
        })
    }
}
