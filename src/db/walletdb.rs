// db/walletdb.rs
//
// Ledger store for wallets and wallet transactions. Every balance mutation
// runs in one database transaction with the wallet row(s) locked FOR UPDATE,
// so a ledger row can never disagree with the stored balance.
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgConnection;
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::walletmodels::*,
    service::{
        error::WalletError,
        limits::{self, Operation, WalletLimits},
    },
    utils::decimal::zero,
};

const WALLET_COLUMNS: &str = r#"
    id,
    user_id,
    balance,
    currency,
    is_active,
    is_blocked,
    block_reason,
    daily_limit,
    monthly_limit,
    max_balance,
    metadata,
    last_transaction_at,
    created_at,
    updated_at
"#;

const TX_COLUMNS: &str = r#"
    id,
    transaction_id,
    reference_id,
    wallet_id,
    user_id,
    transaction_type,
    amount,
    currency,
    balance_before,
    balance_after,
    status,
    description,
    category,
    metadata,
    source_type,
    source_id,
    failure_reason,
    processed_at,
    created_at,
    updated_at
"#;

// Defaults applied when a wallet is lazily provisioned, in currency units.
const DEFAULT_DAILY_LIMIT: i64 = 500_000;
const DEFAULT_MONTHLY_LIMIT: i64 = 5_000_000;
const DEFAULT_MAX_BALANCE: i64 = 10_000_000;

#[derive(Debug, Clone, Default)]
pub struct LedgerEntryParams {
    pub amount: BigDecimal,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reference_id: Option<String>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Default)]
pub struct WalletSettingsUpdate {
    pub daily_limit: Option<BigDecimal>,
    pub monthly_limit: Option<BigDecimal>,
    pub max_balance: Option<BigDecimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Created,
    Amount,
    Status,
}

impl SortBy {
    fn column(&self) -> &'static str {
        match self {
            SortBy::Created => "created_at",
            SortBy::Amount => "amount",
            SortBy::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub category: Option<String>,
    pub source_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_amount: Option<BigDecimal>,
    pub max_amount: Option<BigDecimal>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        TransactionFilter {
            transaction_type: None,
            status: None,
            category: None,
            source_type: None,
            start_date: None,
            end_date: None,
            min_amount: None,
            max_amount: None,
            sort_by: SortBy::Created,
            sort_order: SortOrder::Desc,
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryBreakdownRow {
    pub category: String,
    pub amount: BigDecimal,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct LedgerStats {
    pub total_transactions: i64,
    pub total_credits: BigDecimal,
    pub total_debits: BigDecimal,
    pub pending_transactions: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub monthly_credits: BigDecimal,
    pub monthly_debits: BigDecimal,
    pub monthly_transaction_count: i64,
    pub category_breakdown: Vec<CategoryBreakdownRow>,
}

#[async_trait]
pub trait WalletLedgerExt {
    async fn get_or_create_wallet(
        &self,
        user_id: Uuid,
        currency: PaymentCurrency,
    ) -> Result<Wallet, WalletError>;

    async fn get_wallet_by_id(&self, wallet_id: Uuid) -> Result<Option<Wallet>, WalletError>;

    async fn update_wallet_settings(
        &self,
        wallet_id: Uuid,
        settings: WalletSettingsUpdate,
    ) -> Result<Wallet, WalletError>;

    /// Completed credit: locks the wallet, enforces the max-balance cap,
    /// writes the ledger row and the new balance in one unit.
    async fn credit_wallet(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<(WalletTransaction, Wallet), WalletError>;

    /// Completed debit: locks the wallet, enforces sufficient funds, writes
    /// the ledger row and the new balance in one unit.
    async fn debit_wallet(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<(WalletTransaction, Wallet), WalletError>;

    /// Two-leg transfer. Both wallets are locked inside the same transaction
    /// (in id order), sender daily/monthly limits and the recipient
    /// max-balance cap are checked under the locks, and both ledger rows
    /// share `reference_id`. Any failure rolls back both legs.
    async fn transfer_funds(
        &self,
        sender_wallet_id: Uuid,
        recipient_wallet_id: Uuid,
        amount: BigDecimal,
        reference_id: String,
        sender_description: String,
        recipient_description: String,
    ) -> Result<(WalletTransaction, WalletTransaction), WalletError>;

    /// PENDING credit for a recharge: balance_after == balance_before until
    /// settlement resolves it.
    async fn create_pending_credit(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<WalletTransaction, WalletError>;

    async fn annotate_transaction_source(
        &self,
        id: Uuid,
        source_id: &str,
        metadata_patch: JsonValue,
    ) -> Result<WalletTransaction, WalletError>;

    /// Settlement: moves the PENDING row identified by `transaction_id` to
    /// COMPLETED and credits the wallet in the same unit. Returns `None`
    /// when there is no pending row (duplicate or out-of-order event), so
    /// webhook replays are no-ops.
    async fn confirm_pending_credit(
        &self,
        transaction_id: &str,
        expected_amount: Option<&BigDecimal>,
    ) -> Result<Option<(WalletTransaction, Wallet)>, WalletError>;

    /// Marks a PENDING row FAILED with the provider's reason. Returns `None`
    /// when the row is absent or already terminal.
    async fn fail_pending_transaction(
        &self,
        transaction_id: &str,
        reason: &str,
    ) -> Result<Option<WalletTransaction>, WalletError>;

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<WalletTransaction>, WalletError>;

    async fn get_wallet_transactions(
        &self,
        wallet_id: Uuid,
        filter: TransactionFilter,
    ) -> Result<(Vec<WalletTransaction>, i64), WalletError>;

    async fn get_daily_spent(&self, wallet_id: Uuid) -> Result<BigDecimal, WalletError>;

    async fn get_monthly_spent(&self, wallet_id: Uuid) -> Result<BigDecimal, WalletError>;

    async fn get_wallet_stats(&self, wallet_id: Uuid) -> Result<LedgerStats, WalletError>;
}

#[async_trait]
impl WalletLedgerExt for DBClient {
    async fn get_or_create_wallet(
        &self,
        user_id: Uuid,
        currency: PaymentCurrency,
    ) -> Result<Wallet, WalletError> {
        // ON CONFLICT DO NOTHING resolves the concurrent first-access race:
        // the loser falls through to the read below.
        let inserted = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            INSERT INTO wallets (user_id, currency, daily_limit, monthly_limit, max_balance)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, currency) DO NOTHING
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(currency)
        .bind(BigDecimal::from(DEFAULT_DAILY_LIMIT))
        .bind(BigDecimal::from(DEFAULT_MONTHLY_LIMIT))
        .bind(BigDecimal::from(DEFAULT_MAX_BALANCE))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(wallet) = inserted {
            tracing::info!("Provisioned {} wallet for user {}", currency, user_id);
            return Ok(wallet);
        }

        let existing = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            SELECT {WALLET_COLUMNS}
            FROM wallets
            WHERE user_id = $1 AND currency = $2
            "#
        ))
        .bind(user_id)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;

        existing.ok_or(WalletError::WalletNotFound)
    }

    async fn get_wallet_by_id(&self, wallet_id: Uuid) -> Result<Option<Wallet>, WalletError> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            SELECT {WALLET_COLUMNS}
            FROM wallets
            WHERE id = $1
            "#
        ))
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    async fn update_wallet_settings(
        &self,
        wallet_id: Uuid,
        settings: WalletSettingsUpdate,
    ) -> Result<Wallet, WalletError> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            UPDATE wallets
            SET daily_limit = COALESCE($2, daily_limit),
                monthly_limit = COALESCE($3, monthly_limit),
                max_balance = COALESCE($4, max_balance),
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(wallet_id)
        .bind(settings.daily_limit)
        .bind(settings.monthly_limit)
        .bind(settings.max_balance)
        .bind(settings.is_active)
        .fetch_optional(&self.pool)
        .await?;

        wallet.ok_or(WalletError::WalletNotFound)
    }

    async fn credit_wallet(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<(WalletTransaction, Wallet), WalletError> {
        let mut tx = self.pool.begin().await?;

        let wallet = lock_wallet(&mut tx, wallet_id).await?;

        if !wallet.is_usable() {
            return Err(WalletError::WalletInactiveOrBlocked);
        }

        limits::validate_amount(&params.amount, &wallet.balance, Operation::Credit)?;

        let balance_after = &wallet.balance + &params.amount;
        if let Some(max_balance) = &wallet.max_balance {
            if balance_after > *max_balance {
                return Err(WalletError::BalanceCapExceeded {
                    max: max_balance.clone(),
                    currency: wallet.currency,
                });
            }
        }

        let transaction = insert_completed_entry(
            &mut tx,
            &wallet,
            TransactionType::Credit,
            &params,
            &wallet.balance,
            &balance_after,
            CREDIT_PREFIX,
            category::CREDIT,
        )
        .await?;

        let wallet = apply_balance(&mut tx, wallet_id, &balance_after).await?;

        tx.commit().await?;
        Ok((transaction, wallet))
    }

    async fn debit_wallet(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<(WalletTransaction, Wallet), WalletError> {
        let mut tx = self.pool.begin().await?;

        let wallet = lock_wallet(&mut tx, wallet_id).await?;

        if !wallet.is_usable() {
            return Err(WalletError::WalletInactiveOrBlocked);
        }

        limits::validate_amount(&params.amount, &wallet.balance, Operation::Debit)?;

        let balance_after = &wallet.balance - &params.amount;

        let transaction = insert_completed_entry(
            &mut tx,
            &wallet,
            TransactionType::Debit,
            &params,
            &wallet.balance,
            &balance_after,
            DEBIT_PREFIX,
            category::DEBIT,
        )
        .await?;

        let wallet = apply_balance(&mut tx, wallet_id, &balance_after).await?;

        tx.commit().await?;
        Ok((transaction, wallet))
    }

    async fn transfer_funds(
        &self,
        sender_wallet_id: Uuid,
        recipient_wallet_id: Uuid,
        amount: BigDecimal,
        reference_id: String,
        sender_description: String,
        recipient_description: String,
    ) -> Result<(WalletTransaction, WalletTransaction), WalletError> {
        let mut tx = self.pool.begin().await?;

        // Lock both rows in id order so concurrent opposite-direction
        // transfers cannot deadlock.
        let (first_id, second_id) = if sender_wallet_id < recipient_wallet_id {
            (sender_wallet_id, recipient_wallet_id)
        } else {
            (recipient_wallet_id, sender_wallet_id)
        };
        let first = lock_wallet(&mut tx, first_id).await?;
        let second = lock_wallet(&mut tx, second_id).await?;
        let (sender, recipient) = if first.id == sender_wallet_id {
            (first, second)
        } else {
            (second, first)
        };

        if !sender.is_usable() || !recipient.is_usable() {
            return Err(WalletError::WalletInactiveOrBlocked);
        }

        limits::validate_amount(&amount, &sender.balance, Operation::Debit)?;

        // Sender-side daily/monthly limits, computed under the lock.
        let daily_spent = daily_spent_on(&mut *tx, sender.id).await?;
        let monthly_spent = monthly_spent_on(&mut *tx, sender.id).await?;
        limits::validate_limits(
            &amount,
            &sender.balance,
            &daily_spent,
            &monthly_spent,
            &WalletLimits {
                daily_limit: sender.daily_limit.clone(),
                monthly_limit: sender.monthly_limit.clone(),
                max_balance: None,
            },
            sender.currency,
        )?;

        // Recipient-side cap.
        let recipient_after = &recipient.balance + &amount;
        if let Some(max_balance) = &recipient.max_balance {
            if recipient_after > *max_balance {
                return Err(WalletError::BalanceCapExceeded {
                    max: max_balance.clone(),
                    currency: recipient.currency,
                });
            }
        }

        let sender_after = &sender.balance - &amount;

        let debit_params = LedgerEntryParams {
            amount: amount.clone(),
            description: Some(sender_description),
            category: Some(category::TRANSFER_OUT.to_string()),
            reference_id: Some(reference_id.clone()),
            source_type: Some(source_type::TRANSFER.to_string()),
            source_id: Some(recipient.id.to_string()),
            metadata: None,
        };
        let sender_tx = insert_completed_entry(
            &mut tx,
            &sender,
            TransactionType::Debit,
            &debit_params,
            &sender.balance,
            &sender_after,
            DEBIT_PREFIX,
            category::TRANSFER_OUT,
        )
        .await?;
        apply_balance(&mut tx, sender.id, &sender_after).await?;

        let credit_params = LedgerEntryParams {
            amount: amount.clone(),
            description: Some(recipient_description),
            category: Some(category::TRANSFER_IN.to_string()),
            reference_id: Some(reference_id),
            source_type: Some(source_type::TRANSFER.to_string()),
            source_id: Some(sender.id.to_string()),
            metadata: None,
        };
        let recipient_tx = insert_completed_entry(
            &mut tx,
            &recipient,
            TransactionType::Credit,
            &credit_params,
            &recipient.balance,
            &recipient_after,
            CREDIT_PREFIX,
            category::TRANSFER_IN,
        )
        .await?;
        apply_balance(&mut tx, recipient.id, &recipient_after).await?;

        tx.commit().await?;
        Ok((sender_tx, recipient_tx))
    }

    async fn create_pending_credit(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<WalletTransaction, WalletError> {
        let mut tx = self.pool.begin().await?;

        let wallet = lock_wallet(&mut tx, wallet_id).await?;

        if !wallet.is_usable() {
            return Err(WalletError::WalletInactiveOrBlocked);
        }

        limits::validate_amount(&params.amount, &wallet.balance, Operation::Credit)?;

        let transaction_id = generate_transaction_id(RECHARGE_PREFIX);
        let transaction = sqlx::query_as::<_, WalletTransaction>(&format!(
            r#"
            INSERT INTO wallet_transactions
                (transaction_id, reference_id, wallet_id, user_id, transaction_type,
                 amount, currency, balance_before, balance_after, status,
                 description, category, metadata, source_type, source_id)
            VALUES ($1, $2, $3, $4, 'credit'::wallet_transaction_type,
                    $5, $6, $7, $7, 'pending'::wallet_transaction_status,
                    $8, $9, $10, $11, $12)
            RETURNING {TX_COLUMNS}
            "#
        ))
        .bind(&transaction_id)
        .bind(&params.reference_id)
        .bind(wallet.id)
        .bind(wallet.user_id)
        .bind(&params.amount)
        .bind(wallet.currency)
        .bind(&wallet.balance)
        .bind(&params.description)
        .bind(params.category.as_deref().unwrap_or(category::RECHARGE))
        .bind(&params.metadata)
        .bind(params.source_type.as_deref().unwrap_or(source_type::PAYMENT))
        .bind(&params.source_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn annotate_transaction_source(
        &self,
        id: Uuid,
        source_id: &str,
        metadata_patch: JsonValue,
    ) -> Result<WalletTransaction, WalletError> {
        let transaction = sqlx::query_as::<_, WalletTransaction>(&format!(
            r#"
            UPDATE wallet_transactions
            SET source_id = $2,
                metadata = COALESCE(metadata, '{{}}'::jsonb) || $3,
                updated_at = now()
            WHERE id = $1
            RETURNING {TX_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(source_id)
        .bind(metadata_patch)
        .fetch_optional(&self.pool)
        .await?;

        transaction.ok_or_else(|| WalletError::TransactionNotFound(id.to_string()))
    }

    async fn confirm_pending_credit(
        &self,
        transaction_id: &str,
        expected_amount: Option<&BigDecimal>,
    ) -> Result<Option<(WalletTransaction, Wallet)>, WalletError> {
        let mut tx = self.pool.begin().await?;

        // The status predicate under FOR UPDATE is what makes replays and
        // webhook/poll races converge: only one caller sees the pending row.
        let pending = sqlx::query_as::<_, WalletTransaction>(&format!(
            r#"
            SELECT {TX_COLUMNS}
            FROM wallet_transactions
            WHERE transaction_id = $1
              AND status = 'pending'::wallet_transaction_status
            FOR UPDATE
            "#
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        let pending = match pending {
            Some(row) => row,
            None => return Ok(None),
        };

        if let Some(expected) = expected_amount {
            if *expected != pending.amount {
                return Err(WalletError::InvalidWebhook(format!(
                    "amount mismatch for transaction {}",
                    transaction_id
                )));
            }
        }

        let wallet = lock_wallet(&mut tx, pending.wallet_id).await?;

        if !wallet.is_usable() {
            return Err(WalletError::WalletInactiveOrBlocked);
        }

        let balance_after = &wallet.balance + &pending.amount;
        if let Some(max_balance) = &wallet.max_balance {
            if balance_after > *max_balance {
                return Err(WalletError::BalanceCapExceeded {
                    max: max_balance.clone(),
                    currency: wallet.currency,
                });
            }
        }

        let transaction = sqlx::query_as::<_, WalletTransaction>(&format!(
            r#"
            UPDATE wallet_transactions
            SET status = 'completed'::wallet_transaction_status,
                balance_before = $2,
                balance_after = $3,
                category = $4,
                source_type = $5,
                processed_at = now(),
                updated_at = now()
            WHERE id = $1
            RETURNING {TX_COLUMNS}
            "#
        ))
        .bind(pending.id)
        .bind(&wallet.balance)
        .bind(&balance_after)
        .bind(category::RECHARGE_CONFIRMED)
        .bind(source_type::PAYMENT_CONFIRMATION)
        .fetch_one(&mut *tx)
        .await?;

        let wallet = apply_balance(&mut tx, wallet.id, &balance_after).await?;

        tx.commit().await?;
        Ok(Some((transaction, wallet)))
    }

    async fn fail_pending_transaction(
        &self,
        transaction_id: &str,
        reason: &str,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let transaction = sqlx::query_as::<_, WalletTransaction>(&format!(
            r#"
            UPDATE wallet_transactions
            SET status = 'failed'::wallet_transaction_status,
                failure_reason = $2,
                processed_at = now(),
                updated_at = now()
            WHERE transaction_id = $1
              AND status = 'pending'::wallet_transaction_status
            RETURNING {TX_COLUMNS}
            "#
        ))
        .bind(transaction_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let transaction = sqlx::query_as::<_, WalletTransaction>(&format!(
            r#"
            SELECT {TX_COLUMNS}
            FROM wallet_transactions
            WHERE transaction_id = $1
            "#
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn get_wallet_transactions(
        &self,
        wallet_id: Uuid,
        filter: TransactionFilter,
    ) -> Result<(Vec<WalletTransaction>, i64), WalletError> {
        let mut where_clause = String::from("WHERE wallet_id = $1");
        let mut idx = 1usize;

        if filter.transaction_type.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND transaction_type = ${idx}"));
        }
        if filter.status.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND status = ${idx}"));
        }
        if filter.category.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND category ILIKE '%' || ${idx} || '%'"));
        }
        if filter.source_type.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND source_type = ${idx}"));
        }
        if filter.start_date.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND created_at >= ${idx}"));
        }
        if filter.end_date.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND created_at <= ${idx}"));
        }
        if filter.min_amount.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND amount >= ${idx}"));
        }
        if filter.max_amount.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND amount <= ${idx}"));
        }

        let list_sql = format!(
            "SELECT {TX_COLUMNS} FROM wallet_transactions {where_clause} ORDER BY {} {} LIMIT ${} OFFSET ${}",
            filter.sort_by.column(),
            filter.sort_order.keyword(),
            idx + 1,
            idx + 2,
        );
        let count_sql = format!("SELECT COUNT(*) FROM wallet_transactions {where_clause}");

        let mut list_query = sqlx::query_as::<_, WalletTransaction>(&list_sql).bind(wallet_id);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(wallet_id);

        if let Some(transaction_type) = filter.transaction_type {
            list_query = list_query.bind(transaction_type);
            count_query = count_query.bind(transaction_type);
        }
        if let Some(status) = filter.status {
            list_query = list_query.bind(status);
            count_query = count_query.bind(status);
        }
        if let Some(category) = filter.category {
            list_query = list_query.bind(category.clone());
            count_query = count_query.bind(category);
        }
        if let Some(source) = filter.source_type {
            list_query = list_query.bind(source.clone());
            count_query = count_query.bind(source);
        }
        if let Some(start_date) = filter.start_date {
            list_query = list_query.bind(start_date);
            count_query = count_query.bind(start_date);
        }
        if let Some(end_date) = filter.end_date {
            list_query = list_query.bind(end_date);
            count_query = count_query.bind(end_date);
        }
        if let Some(min_amount) = filter.min_amount {
            list_query = list_query.bind(min_amount.clone());
            count_query = count_query.bind(min_amount);
        }
        if let Some(max_amount) = filter.max_amount {
            list_query = list_query.bind(max_amount.clone());
            count_query = count_query.bind(max_amount);
        }

        let transactions = list_query
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        let total = count_query.fetch_one(&self.pool).await?;

        Ok((transactions, total))
    }

    async fn get_daily_spent(&self, wallet_id: Uuid) -> Result<BigDecimal, WalletError> {
        let mut conn = self.pool.acquire().await?;
        Ok(daily_spent_on(&mut *conn, wallet_id).await?)
    }

    async fn get_monthly_spent(&self, wallet_id: Uuid) -> Result<BigDecimal, WalletError> {
        let mut conn = self.pool.acquire().await?;
        Ok(monthly_spent_on(&mut *conn, wallet_id).await?)
    }

    async fn get_wallet_stats(&self, wallet_id: Uuid) -> Result<LedgerStats, WalletError> {
        let total_transactions = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM wallet_transactions
            WHERE wallet_id = $1
              AND status = 'completed'::wallet_transaction_status
            "#,
        )
        .bind(wallet_id)
        .fetch_one(&self.pool)
        .await?;

        let total_credits = lifetime_total(self, wallet_id, TransactionType::Credit).await?;
        let total_debits = lifetime_total(self, wallet_id, TransactionType::Debit).await?;

        let pending_transactions = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM wallet_transactions
            WHERE wallet_id = $1
              AND status = 'pending'::wallet_transaction_status
            "#,
        )
        .bind(wallet_id)
        .fetch_one(&self.pool)
        .await?;

        let last_transaction_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT created_at
            FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        let monthly_rows = sqlx::query_as::<_, (TransactionType, BigDecimal, i64)>(
            r#"
            SELECT transaction_type, COALESCE(SUM(amount), 0), COUNT(*)
            FROM wallet_transactions
            WHERE wallet_id = $1
              AND status = 'completed'::wallet_transaction_status
              AND created_at >= date_trunc('month', now())
            GROUP BY transaction_type
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        let mut monthly_credits = zero();
        let mut monthly_debits = zero();
        let mut monthly_transaction_count = 0i64;
        for (transaction_type, amount, count) in monthly_rows {
            monthly_transaction_count += count;
            match transaction_type {
                TransactionType::Credit => monthly_credits = amount,
                TransactionType::Debit => monthly_debits = amount,
            }
        }

        let category_rows = sqlx::query_as::<_, (String, BigDecimal, i64)>(
            r#"
            SELECT COALESCE(category, 'UNCATEGORIZED'), COALESCE(SUM(amount), 0), COUNT(*)
            FROM wallet_transactions
            WHERE wallet_id = $1
              AND status = 'completed'::wallet_transaction_status
            GROUP BY category
            ORDER BY 2 DESC
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        let category_breakdown = category_rows
            .into_iter()
            .map(|(category, amount, count)| CategoryBreakdownRow {
                category,
                amount,
                count,
            })
            .collect();

        Ok(LedgerStats {
            total_transactions,
            total_credits,
            total_debits,
            pending_transactions,
            last_transaction_at,
            monthly_credits,
            monthly_debits,
            monthly_transaction_count,
            category_breakdown,
        })
    }
}

async fn lock_wallet(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wallet_id: Uuid,
) -> Result<Wallet, WalletError> {
    let wallet = sqlx::query_as::<_, Wallet>(&format!(
        r#"
        SELECT {WALLET_COLUMNS}
        FROM wallets
        WHERE id = $1
        FOR UPDATE
        "#
    ))
    .bind(wallet_id)
    .fetch_optional(&mut **tx)
    .await?;

    wallet.ok_or(WalletError::WalletNotFound)
}

#[allow(clippy::too_many_arguments)]
async fn insert_completed_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wallet: &Wallet,
    transaction_type: TransactionType,
    params: &LedgerEntryParams,
    balance_before: &BigDecimal,
    balance_after: &BigDecimal,
    id_prefix: &str,
    default_category: &str,
) -> Result<WalletTransaction, WalletError> {
    let transaction_id = generate_transaction_id(id_prefix);
    let transaction = sqlx::query_as::<_, WalletTransaction>(&format!(
        r#"
        INSERT INTO wallet_transactions
            (transaction_id, reference_id, wallet_id, user_id, transaction_type,
             amount, currency, balance_before, balance_after, status,
             description, category, metadata, source_type, source_id, processed_at)
        VALUES ($1, $2, $3, $4, $5,
                $6, $7, $8, $9, 'completed'::wallet_transaction_status,
                $10, $11, $12, $13, $14, now())
        RETURNING {TX_COLUMNS}
        "#
    ))
    .bind(&transaction_id)
    .bind(&params.reference_id)
    .bind(wallet.id)
    .bind(wallet.user_id)
    .bind(transaction_type)
    .bind(&params.amount)
    .bind(wallet.currency)
    .bind(balance_before)
    .bind(balance_after)
    .bind(&params.description)
    .bind(params.category.as_deref().unwrap_or(default_category))
    .bind(&params.metadata)
    .bind(&params.source_type)
    .bind(&params.source_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(transaction)
}

async fn apply_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wallet_id: Uuid,
    balance: &BigDecimal,
) -> Result<Wallet, WalletError> {
    let wallet = sqlx::query_as::<_, Wallet>(&format!(
        r#"
        UPDATE wallets
        SET balance = $2,
            last_transaction_at = now(),
            updated_at = now()
        WHERE id = $1
        RETURNING {WALLET_COLUMNS}
        "#
    ))
    .bind(wallet_id)
    .bind(balance)
    .fetch_one(&mut **tx)
    .await?;

    Ok(wallet)
}

async fn daily_spent_on(conn: &mut PgConnection, wallet_id: Uuid) -> Result<BigDecimal, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM wallet_transactions
        WHERE wallet_id = $1
          AND transaction_type = 'debit'::wallet_transaction_type
          AND status = 'completed'::wallet_transaction_status
          AND created_at >= date_trunc('day', now())
        "#,
    )
    .bind(wallet_id)
    .fetch_one(conn)
    .await
}

async fn monthly_spent_on(
    conn: &mut PgConnection,
    wallet_id: Uuid,
) -> Result<BigDecimal, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM wallet_transactions
        WHERE wallet_id = $1
          AND transaction_type = 'debit'::wallet_transaction_type
          AND status = 'completed'::wallet_transaction_status
          AND created_at >= date_trunc('month', now())
        "#,
    )
    .bind(wallet_id)
    .fetch_one(conn)
    .await
}

async fn lifetime_total(
    client: &DBClient,
    wallet_id: Uuid,
    transaction_type: TransactionType,
) -> Result<BigDecimal, WalletError> {
    let total = sqlx::query_scalar::<_, BigDecimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM wallet_transactions
        WHERE wallet_id = $1
          AND transaction_type = $2
          AND status = 'completed'::wallet_transaction_status
        "#,
    )
    .bind(wallet_id)
    .bind(transaction_type)
    .fetch_one(&client.pool)
    .await?;

    Ok(total)
}
