use axum::http::StatusCode;
use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::{error::HttpError, models::walletmodels::PaymentCurrency};

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Insufficient funds for this operation")]
    InsufficientFunds,

    #[error("{0}")]
    LimitExceeded(String),

    #[error("Maximum balance exceeded ({max} {currency})")]
    BalanceCapExceeded {
        max: BigDecimal,
        currency: PaymentCurrency,
    },

    #[error("Cannot transfer to your own wallet")]
    SelfTransfer,

    #[error("Wallet is inactive or blocked")]
    WalletInactiveOrBlocked,

    #[error("Wallet not found")]
    WalletNotFound,

    #[error("Transaction {0} not found")]
    TransactionNotFound(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Payment gateway rejected the request: {0}")]
    GatewayRejected(String),

    #[error("Payment gateway unreachable: {0}")]
    GatewayUnreachable(String),

    #[error("Invalid webhook payload: {0}")]
    InvalidWebhook(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl WalletError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WalletError::InvalidAmount
            | WalletError::LimitExceeded(_)
            | WalletError::BalanceCapExceeded { .. }
            | WalletError::SelfTransfer
            | WalletError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,

            WalletError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,

            WalletError::WalletInactiveOrBlocked => StatusCode::FORBIDDEN,

            WalletError::WalletNotFound
            | WalletError::TransactionNotFound(_)
            | WalletError::UserNotFound => StatusCode::NOT_FOUND,

            WalletError::GatewayRejected(_) | WalletError::GatewayUnreachable(_) => {
                StatusCode::BAD_GATEWAY
            }

            WalletError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WalletError> for HttpError {
    fn from(error: WalletError) -> Self {
        let status = error.status_code();
        HttpError::new(error.to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_validation_errors_to_bad_request() {
        assert_eq!(WalletError::InvalidAmount.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(WalletError::SelfTransfer.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WalletError::LimitExceeded("daily".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn maps_funds_and_activity_errors() {
        assert_eq!(
            WalletError::InsufficientFunds.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            WalletError::WalletInactiveOrBlocked.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn maps_gateway_errors_to_bad_gateway() {
        assert_eq!(
            WalletError::GatewayRejected("declined".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            WalletError::GatewayUnreachable("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn cap_error_names_limit_and_currency() {
        let err = WalletError::BalanceCapExceeded {
            max: BigDecimal::from(100),
            currency: PaymentCurrency::Xof,
        };
        assert_eq!(err.to_string(), "Maximum balance exceeded (100 XOF)");
    }
}
