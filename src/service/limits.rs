//! Limit policy for wallet operations.
//!
//! Pure validation only: these functions never touch the database. The
//! wallet engine calls them inside its transaction, before any write.

use bigdecimal::BigDecimal;

use super::error::WalletError;
use crate::{models::walletmodels::PaymentCurrency, utils::decimal::zero};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Credit,
    Debit,
}

/// Per-wallet limits. `None` means the limit is not enforced.
#[derive(Debug, Clone, Default)]
pub struct WalletLimits {
    pub daily_limit: Option<BigDecimal>,
    pub monthly_limit: Option<BigDecimal>,
    pub max_balance: Option<BigDecimal>,
}

pub fn validate_amount(
    amount: &BigDecimal,
    balance: &BigDecimal,
    operation: Operation,
) -> Result<(), WalletError> {
    if *amount <= zero() {
        return Err(WalletError::InvalidAmount);
    }

    if operation == Operation::Debit && amount > balance {
        return Err(WalletError::InsufficientFunds);
    }

    Ok(())
}

/// Checks the amount against daily/monthly spend and the max-balance cap.
/// Every violated limit is named in the single error message.
pub fn validate_limits(
    amount: &BigDecimal,
    current_balance: &BigDecimal,
    daily_spent: &BigDecimal,
    monthly_spent: &BigDecimal,
    limits: &WalletLimits,
    currency: PaymentCurrency,
) -> Result<(), WalletError> {
    let mut errors: Vec<String> = Vec::new();

    if let Some(daily_limit) = &limits.daily_limit {
        if daily_spent + amount > *daily_limit {
            errors.push(format!("Daily limit exceeded ({} {})", daily_limit, currency));
        }
    }

    if let Some(monthly_limit) = &limits.monthly_limit {
        if monthly_spent + amount > *monthly_limit {
            errors.push(format!(
                "Monthly limit exceeded ({} {})",
                monthly_limit, currency
            ));
        }
    }

    if let Some(max_balance) = &limits.max_balance {
        if current_balance + amount > *max_balance {
            errors.push(format!(
                "Maximum balance exceeded ({} {})",
                max_balance, currency
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(WalletError::LimitExceeded(errors.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> BigDecimal {
        BigDecimal::from(v)
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(matches!(
            validate_amount(&dec(0), &dec(1000), Operation::Credit),
            Err(WalletError::InvalidAmount)
        ));
        assert!(matches!(
            validate_amount(&dec(-50), &dec(1000), Operation::Debit),
            Err(WalletError::InvalidAmount)
        ));
    }

    #[test]
    fn debit_above_balance_is_insufficient_funds() {
        // balance 1000, debit 1500 -> rejected
        assert!(matches!(
            validate_amount(&dec(1500), &dec(1000), Operation::Debit),
            Err(WalletError::InsufficientFunds)
        ));
        assert!(validate_amount(&dec(1000), &dec(1000), Operation::Debit).is_ok());
    }

    #[test]
    fn credit_ignores_balance() {
        assert!(validate_amount(&dec(1500), &dec(0), Operation::Credit).is_ok());
    }

    #[test]
    fn unset_limits_are_not_enforced() {
        let limits = WalletLimits::default();
        assert!(validate_limits(
            &dec(1_000_000),
            &dec(0),
            &dec(0),
            &dec(0),
            &limits,
            PaymentCurrency::Xof,
        )
        .is_ok());
    }

    #[test]
    fn daily_limit_violation_names_the_daily_limit() {
        // daily limit 1000, spent 900 today, new debit of 200
        let limits = WalletLimits {
            daily_limit: Some(dec(1000)),
            ..Default::default()
        };
        let err = validate_limits(
            &dec(200),
            &dec(5000),
            &dec(900),
            &dec(900),
            &limits,
            PaymentCurrency::Xof,
        )
        .unwrap_err();

        match err {
            WalletError::LimitExceeded(msg) => {
                assert!(msg.contains("Daily limit exceeded (1000 XOF)"));
            }
            other => panic!("expected LimitExceeded, got {:?}", other),
        }
    }

    #[test]
    fn reaching_a_limit_exactly_is_allowed() {
        let limits = WalletLimits {
            daily_limit: Some(dec(1000)),
            ..Default::default()
        };
        assert!(validate_limits(
            &dec(100),
            &dec(0),
            &dec(900),
            &dec(900),
            &limits,
            PaymentCurrency::Xof,
        )
        .is_ok());
    }

    #[test]
    fn all_violated_limits_are_named_together() {
        let limits = WalletLimits {
            daily_limit: Some(dec(1000)),
            monthly_limit: Some(dec(2000)),
            max_balance: Some(dec(500)),
        };
        let err = validate_limits(
            &dec(600),
            &dec(400),
            &dec(900),
            &dec(1900),
            &limits,
            PaymentCurrency::Xof,
        )
        .unwrap_err();

        match err {
            WalletError::LimitExceeded(msg) => {
                assert!(msg.contains("Daily limit exceeded"));
                assert!(msg.contains("Monthly limit exceeded"));
                assert!(msg.contains("Maximum balance exceeded"));
            }
            other => panic!("expected LimitExceeded, got {:?}", other),
        }
    }
}
