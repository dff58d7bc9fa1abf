use anchor_lang::prelude::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::pricing::ExchangeRate;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn invalid(key: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}

/// Process-wide settings, read once at startup and never mutated.
pub struct RelayConfig {
    pub rpc_url: String,
    pub presale_keypair: Keypair,
    /// Receives SOL payments and owns the source token account.
    pub presale_pubkey: Pubkey,
    pub mint: Pubkey,
    pub exchange: ExchangeRate,
    pub bind_address: String,
    pub port: u16,
    /// Wait for `confirmed` commitment before answering a transfer.
    pub confirm_transfers: bool,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("rpc_url", &self.rpc_url)
            .field("presale_keypair", &self.presale_keypair.pubkey())
            .field("presale_pubkey", &self.presale_pubkey)
            .field("mint", &self.mint)
            .field("exchange", &self.exchange)
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("confirm_transfers", &self.confirm_transfers)
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &'static str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let rpc_url = required("RPC")?;
        let presale_keypair = parse_keypair(&required("PRESALE_WALLET_SECRET")?)?;
        let presale_pubkey =
            parse_pubkey("PRESALE_WALLET_PUBKEY", &required("PRESALE_WALLET_PUBKEY")?)?;
        let mint = parse_pubkey("MINT_ADDRESS", &required("MINT_ADDRESS")?)?;

        let decimals = required("DECIMALS")?
            .parse::<u8>()
            .map_err(|e| invalid("DECIMALS", e))?;
        let tokens_per_sol = required("TOKENS_PER_SOL")?
            .parse::<u64>()
            .map_err(|e| invalid("TOKENS_PER_SOL", e))?;
        if tokens_per_sol == 0 {
            return Err(invalid("TOKENS_PER_SOL", "must be greater than 0"));
        }

        let port = match optional("PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| invalid("PORT", e))?,
            None => DEFAULT_PORT,
        };
        let bind_address =
            optional("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let confirm_transfers = match optional("CONFIRM_TRANSFERS") {
            Some(flag) => parse_flag("CONFIRM_TRANSFERS", &flag)?,
            None => true,
        };

        Ok(Self {
            rpc_url,
            presale_keypair,
            presale_pubkey,
            mint,
            exchange: ExchangeRate::new(decimals, tokens_per_sol),
            bind_address,
            port,
            confirm_transfers,
        })
    }

    /// The payment wallet is also the owner of the token account the keypair
    /// signs for; a mismatch means every transfer will be rejected on-chain.
    pub fn signer_matches_wallet(&self) -> bool {
        self.presale_keypair.pubkey() == self.presale_pubkey
    }
}

/// Parses a secret key serialized as a JSON byte array, e.g. `[12,34,...]`.
#[allow(deprecated)]
fn parse_keypair(secret: &str) -> Result<Keypair, ConfigError> {
    const KEY: &str = "PRESALE_WALLET_SECRET";
    let bytes: Vec<u8> = serde_json::from_str(secret).map_err(|e| invalid(KEY, e))?;
    Keypair::from_bytes(&bytes).map_err(|e| invalid(KEY, e))
}

fn parse_pubkey(key: &'static str, value: &str) -> Result<Pubkey, ConfigError> {
    Pubkey::from_str(value).map_err(|e| invalid(key, e))
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(key, format!("expected a boolean, got {other:?}"))),
    }
}
