// models/walletmodels.rs
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_currency", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentCurrency {
    Xof,
    Xaf,
    Usd,
    Eur,
}

impl Default for PaymentCurrency {
    fn default() -> Self {
        PaymentCurrency::Xof
    }
}

impl PaymentCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentCurrency::Xof => "XOF",
            PaymentCurrency::Xaf => "XAF",
            PaymentCurrency::Usd => "USD",
            PaymentCurrency::Eur => "EUR",
        }
    }
}

impl std::fmt::Display for PaymentCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "wallet_transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Free-form ledger categories. Kept as constants rather than an enum so
/// collaborators can tag entries without a schema migration.
pub mod category {
    pub const RECHARGE: &str = "RECHARGE";
    pub const RECHARGE_CONFIRMED: &str = "RECHARGE_CONFIRMED";
    pub const TRANSFER_IN: &str = "TRANSFER_IN";
    pub const TRANSFER_OUT: &str = "TRANSFER_OUT";
    pub const CREDIT: &str = "CREDIT";
    pub const DEBIT: &str = "DEBIT";
}

pub mod source_type {
    pub const PAYMENT: &str = "PAYMENT";
    pub const PAYMENT_CONFIRMATION: &str = "PAYMENT_CONFIRMATION";
    pub const TRANSFER: &str = "TRANSFER";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: BigDecimal,
    pub currency: PaymentCurrency,
    pub is_active: bool,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub daily_limit: Option<BigDecimal>,
    pub monthly_limit: Option<BigDecimal>,
    pub max_balance: Option<BigDecimal>,
    pub metadata: Option<serde_json::Value>,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Wallet {
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.is_blocked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub transaction_id: String,
    pub reference_id: Option<String>,
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: BigDecimal,
    pub currency: PaymentCurrency,
    pub balance_before: BigDecimal,
    pub balance_after: BigDecimal,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub category: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub failure_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Ledger reference prefixes. The prefix encodes how the entry was created:
/// WRT = recharge, WCT = credit, WDT = debit, TRF = transfer pair.
pub const RECHARGE_PREFIX: &str = "WRT";
pub const CREDIT_PREFIX: &str = "WCT";
pub const DEBIT_PREFIX: &str = "WDT";
pub const TRANSFER_PREFIX: &str = "TRF";

pub fn generate_transaction_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, millis, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[test]
    fn test_generate_transaction_id_format() {
        let id = generate_transaction_id(RECHARGE_PREFIX);
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "WRT");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_transaction_id(TRANSFER_PREFIX);
        let b = generate_transaction_id(TRANSFER_PREFIX);
        assert_ne!(a, b);
    }

    #[test]
    fn test_wallet_usable() {
        let wallet = Wallet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            balance: BigDecimal::from(0),
            currency: PaymentCurrency::Xof,
            is_active: true,
            is_blocked: false,
            block_reason: None,
            daily_limit: None,
            monthly_limit: None,
            max_balance: None,
            metadata: None,
            last_transaction_at: None,
            created_at: None,
            updated_at: None,
        };
        assert!(wallet.is_usable());

        let blocked = Wallet {
            is_blocked: true,
            ..wallet
        };
        assert!(!blocked.is_usable());
    }
}
