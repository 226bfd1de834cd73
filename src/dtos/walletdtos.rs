// dtos/walletdtos.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::walletdb::{
        CategoryBreakdownRow, SortBy, SortOrder, TransactionFilter, WalletSettingsUpdate,
    },
    models::walletmodels::*,
    service::{
        payment_gateway::{PaymentMethod, PaymentProvider},
        wallet_service::{WalletBalance, WalletStats},
    },
    utils::decimal::{amount_from_f64, amount_to_f64, zero},
};

// ===== Request DTOs =====

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RechargeRequestDto {
    #[validate(range(min = 100.0, max = 1000000.0, message = "Amount must be between 100 and 1,000,000"))]
    pub amount: f64,

    #[serde(default)]
    pub currency: PaymentCurrency,

    #[validate(length(max = 200, message = "Description too long"))]
    pub description: Option<String>,

    pub payment_method: PaymentMethod,

    pub provider: Option<PaymentProvider>,

    #[validate(url(message = "Invalid return URL"))]
    pub return_url: Option<String>,

    /// Correlation data carried through settlement, e.g. a `booking_id`.
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TransferRequestDto {
    pub recipient_user_id: Uuid,

    #[validate(range(min = 100.0, max = 500000.0, message = "Amount must be between 100 and 500,000"))]
    pub amount: f64,

    #[validate(length(max = 200, message = "Description too long"))]
    pub description: Option<String>,

    #[serde(default)]
    pub currency: PaymentCurrency,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateWalletSettingsDto {
    #[validate(range(min = 1.0, message = "Daily limit must be positive"))]
    pub daily_limit: Option<f64>,

    #[validate(range(min = 1.0, message = "Monthly limit must be positive"))]
    pub monthly_limit: Option<f64>,

    #[validate(range(min = 1.0, message = "Max balance must be positive"))]
    pub max_balance: Option<f64>,

    pub is_active: Option<bool>,
}

impl UpdateWalletSettingsDto {
    pub fn into_update(self) -> WalletSettingsUpdate {
        WalletSettingsUpdate {
            daily_limit: self.daily_limit.and_then(amount_from_f64),
            monthly_limit: self.monthly_limit.and_then(amount_from_f64),
            max_balance: self.max_balance.and_then(amount_from_f64),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TransactionHistoryQueryDto {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub category: Option<String>,
    pub source_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "Offset must be non-negative"))]
    pub offset: Option<i64>,

    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl TransactionHistoryQueryDto {
    pub fn into_filter(self) -> Result<TransactionFilter, String> {
        let sort_by = match self.sort_by.as_deref() {
            None | Some("created") => SortBy::Created,
            Some("amount") => SortBy::Amount,
            Some("status") => SortBy::Status,
            Some(other) => return Err(format!("Unknown sort field: {}", other)),
        };

        let sort_order = match self.sort_order.as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => return Err(format!("Unknown sort order: {}", other)),
        };

        Ok(TransactionFilter {
            transaction_type: self.transaction_type,
            status: self.status,
            category: self.category,
            source_type: self.source_type,
            start_date: self.start_date,
            end_date: self.end_date,
            min_amount: self.min_amount.and_then(amount_from_f64),
            max_amount: self.max_amount.and_then(amount_from_f64),
            sort_by,
            sort_order,
            limit: self.limit.unwrap_or(20),
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrencyQueryDto {
    pub currency: Option<PaymentCurrency>,
}

// ===== Response DTOs =====

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: f64,
    pub currency: PaymentCurrency,
    pub is_active: bool,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub daily_limit: Option<f64>,
    pub monthly_limit: Option<f64>,
    pub max_balance: Option<f64>,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Wallet> for WalletResponseDto {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            user_id: wallet.user_id,
            balance: amount_to_f64(&wallet.balance),
            currency: wallet.currency,
            is_active: wallet.is_active,
            is_blocked: wallet.is_blocked,
            block_reason: wallet.block_reason,
            daily_limit: wallet.daily_limit.as_ref().map(amount_to_f64),
            monthly_limit: wallet.monthly_limit.as_ref().map(amount_to_f64),
            max_balance: wallet.max_balance.as_ref().map(amount_to_f64),
            last_transaction_at: wallet.last_transaction_at,
            created_at: wallet.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponseDto {
    pub id: Uuid,
    pub transaction_id: String,
    pub reference_id: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub currency: PaymentCurrency,
    pub balance_before: f64,
    pub balance_after: f64,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub failure_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<WalletTransaction> for TransactionResponseDto {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            transaction_id: tx.transaction_id,
            reference_id: tx.reference_id,
            transaction_type: tx.transaction_type,
            amount: amount_to_f64(&tx.amount),
            currency: tx.currency,
            balance_before: amount_to_f64(&tx.balance_before),
            balance_after: amount_to_f64(&tx.balance_after),
            status: tx.status,
            description: tx.description,
            category: tx.category,
            source_type: tx.source_type,
            source_id: tx.source_id,
            failure_reason: tx.failure_reason,
            processed_at: tx.processed_at,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponseDto {
    pub balance: f64,
    pub currency: PaymentCurrency,
    pub is_active: bool,
    pub is_blocked: bool,
    pub daily_limit: Option<f64>,
    pub monthly_limit: Option<f64>,
    pub remaining_daily_limit: Option<f64>,
    pub remaining_monthly_limit: Option<f64>,
}

impl From<WalletBalance> for BalanceResponseDto {
    fn from(balance: WalletBalance) -> Self {
        let remaining = |limit: &Option<bigdecimal::BigDecimal>, spent: &bigdecimal::BigDecimal| {
            limit.as_ref().map(|limit| {
                let headroom = limit - spent;
                if headroom < zero() {
                    0.0
                } else {
                    amount_to_f64(&headroom)
                }
            })
        };

        Self {
            remaining_daily_limit: remaining(&balance.wallet.daily_limit, &balance.daily_spent),
            remaining_monthly_limit: remaining(
                &balance.wallet.monthly_limit,
                &balance.monthly_spent,
            ),
            balance: amount_to_f64(&balance.wallet.balance),
            currency: balance.wallet.currency,
            is_active: balance.wallet.is_active,
            is_blocked: balance.wallet.is_blocked,
            daily_limit: balance.wallet.daily_limit.as_ref().map(amount_to_f64),
            monthly_limit: balance.wallet.monthly_limit.as_ref().map(amount_to_f64),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RechargeResponseDto {
    pub transaction: TransactionResponseDto,
    pub payment_url: String,
    pub payment_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponseDto {
    pub transaction: TransactionResponseDto,
    pub recipient_transaction: TransactionResponseDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryStatDto {
    pub amount: f64,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthlyStatsDto {
    pub total_credits: f64,
    pub total_debits: f64,
    pub transaction_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletStatsResponseDto {
    pub total_balance: f64,
    pub currency: PaymentCurrency,
    pub total_transactions: i64,
    pub total_credits: f64,
    pub total_debits: f64,
    pub pending_transactions: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub monthly_stats: MonthlyStatsDto,
    pub category_breakdown: HashMap<String, CategoryStatDto>,
}

impl From<WalletStats> for WalletStatsResponseDto {
    fn from(stats: WalletStats) -> Self {
        let category_breakdown = stats
            .ledger
            .category_breakdown
            .into_iter()
            .map(|row: CategoryBreakdownRow| {
                (
                    row.category,
                    CategoryStatDto {
                        amount: amount_to_f64(&row.amount),
                        count: row.count,
                    },
                )
            })
            .collect();

        Self {
            total_balance: amount_to_f64(&stats.total_balance),
            currency: stats.currency,
            total_transactions: stats.ledger.total_transactions,
            total_credits: amount_to_f64(&stats.ledger.total_credits),
            total_debits: amount_to_f64(&stats.ledger.total_debits),
            pending_transactions: stats.ledger.pending_transactions,
            last_transaction_at: stats.ledger.last_transaction_at,
            monthly_stats: MonthlyStatsDto {
                total_credits: amount_to_f64(&stats.ledger.monthly_credits),
                total_debits: amount_to_f64(&stats.ledger.monthly_debits),
                transaction_count: stats.ledger.monthly_transaction_count,
            },
            category_breakdown,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMetadata {
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedTransactionsDto {
    pub transactions: Vec<TransactionResponseDto>,
    pub total: i64,
    pub pagination: PaginationMetadata,
}

impl PaginatedTransactionsDto {
    pub fn new(transactions: Vec<WalletTransaction>, total: i64, limit: i64, offset: i64) -> Self {
        let limit = limit.max(1);
        Self {
            transactions: transactions.into_iter().map(Into::into).collect(),
            total,
            pagination: PaginationMetadata {
                page: offset / limit + 1,
                limit,
                total_pages: (total + limit - 1) / limit,
            },
        }
    }
}

// ===== Response envelope =====

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn wallet(balance: i64, daily_limit: Option<i64>) -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            balance: BigDecimal::from(balance),
            currency: PaymentCurrency::Xof,
            is_active: true,
            is_blocked: false,
            block_reason: None,
            daily_limit: daily_limit.map(BigDecimal::from),
            monthly_limit: None,
            max_balance: None,
            metadata: None,
            last_transaction_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn balance_dto_computes_remaining_headroom() {
        let balance = WalletBalance {
            wallet: wallet(1000, Some(500)),
            daily_spent: BigDecimal::from(200),
            monthly_spent: BigDecimal::from(0),
        };

        let dto: BalanceResponseDto = balance.into();
        assert_eq!(dto.remaining_daily_limit, Some(300.0));
        assert_eq!(dto.remaining_monthly_limit, None);
    }

    #[test]
    fn remaining_headroom_clamps_at_zero() {
        let balance = WalletBalance {
            wallet: wallet(1000, Some(500)),
            daily_spent: BigDecimal::from(700),
            monthly_spent: BigDecimal::from(0),
        };

        let dto: BalanceResponseDto = balance.into();
        assert_eq!(dto.remaining_daily_limit, Some(0.0));
    }

    #[test]
    fn history_query_rejects_unknown_sort() {
        let query = TransactionHistoryQueryDto {
            transaction_type: None,
            status: None,
            category: None,
            source_type: None,
            start_date: None,
            end_date: None,
            min_amount: None,
            max_amount: None,
            limit: None,
            offset: None,
            sort_by: Some("balance".to_string()),
            sort_order: None,
        };
        assert!(query.into_filter().is_err());
    }

    #[test]
    fn history_query_defaults() {
        let query = TransactionHistoryQueryDto {
            transaction_type: None,
            status: None,
            category: None,
            source_type: None,
            start_date: None,
            end_date: None,
            min_amount: None,
            max_amount: None,
            limit: None,
            offset: None,
            sort_by: None,
            sort_order: None,
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.sort_by, SortBy::Created);
        assert_eq!(filter.sort_order, SortOrder::Desc);
    }

    #[test]
    fn pagination_math() {
        let dto = PaginatedTransactionsDto::new(vec![], 45, 20, 40);
        assert_eq!(dto.pagination.page, 3);
        assert_eq!(dto.pagination.total_pages, 3);
    }
}
