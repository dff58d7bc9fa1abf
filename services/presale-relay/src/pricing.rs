use anchor_lang::solana_program::native_token::LAMPORTS_PER_SOL;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Payment amount must be greater than 0")]
    ZeroPayment,
    #[error("Payment is too small to buy a single token base unit")]
    DustPayment,
    #[error("Token amount overflows u64")]
    Overflow,
}

/// Fixed exchange parameters, loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate {
    pub decimals: u8,
    pub tokens_per_sol: u64,
}

impl ExchangeRate {
    pub const fn new(decimals: u8, tokens_per_sol: u64) -> Self {
        Self {
            decimals,
            tokens_per_sol,
        }
    }

    /// Converts a verified lamport payment into token base units:
    /// `floor(lamports * tokens_per_sol * 10^decimals / LAMPORTS_PER_SOL)`.
    ///
    /// Intermediates are `u128`. Any overflow there implies the floored result
    /// cannot fit in `u64` either, so both cases report `Overflow`.
    pub fn tokens_for(&self, lamports: u64) -> Result<u64, PricingError> {
        if lamports == 0 {
            return Err(PricingError::ZeroPayment);
        }

        let scale = 10u128
            .checked_pow(u32::from(self.decimals))
            .ok_or(PricingError::Overflow)?;
        let numerator = u128::from(lamports)
            .checked_mul(u128::from(self.tokens_per_sol))
            .and_then(|v| v.checked_mul(scale))
            .ok_or(PricingError::Overflow)?;
        let tokens = numerator / u128::from(LAMPORTS_PER_SOL);

        let tokens = u64::try_from(tokens).map_err(|_| PricingError::Overflow)?;
        if tokens == 0 {
            return Err(PricingError::DustPayment);
        }
        Ok(tokens)
    }
}
