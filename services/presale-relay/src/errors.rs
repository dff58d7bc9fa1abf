use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::chain::ChainError;
use crate::pricing::PricingError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing signature or buyer")]
    MissingField,
    #[error("Invalid buyer address")]
    InvalidBuyer,
    #[error("Invalid payment")]
    InvalidPayment,
    #[error("Payment already redeemed")]
    AlreadyRedeemed,
    #[error("Payment lookup failed: {0}")]
    LookupFailed(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("Token account {address} does not hold the presale mint for its owner")]
    InvalidTokenAccount { address: String },
    #[error("Failed to build transfer: {0}")]
    Instruction(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("Transfer {txid} was broadcast but not confirmed: {reason}")]
    TransferUnresolved { txid: String, reason: String },
    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField
            | Self::InvalidBuyer
            | Self::InvalidPayment
            | Self::MalformedBody(_)
            | Self::Pricing(PricingError::ZeroPayment | PricingError::DustPayment) => {
                StatusCode::BAD_REQUEST
            }
            Self::AlreadyRedeemed => StatusCode::CONFLICT,
            Self::LookupFailed(_)
            | Self::Pricing(PricingError::Overflow)
            | Self::InvalidTokenAccount { .. }
            | Self::Instruction(_)
            | Self::Chain(_)
            | Self::TransferUnresolved { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
