// service/wallet_service.rs
//
// Orchestrates wallet operations against the ledger store, applying the
// limit policy before any balance mutation. All writes happen inside the
// ledger store's atomic units; nothing here touches `balance` directly.
use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::{
    error::WalletError,
    limits::{self, Operation, WalletLimits},
    notification_service::NotificationService,
    payment_gateway::{
        GatewayRegistry, OpenSessionRequest, PaymentCustomer, PaymentMethod, PaymentProvider,
    },
};
use crate::{
    db::{
        db::DBClient,
        userdb::UserDirectoryExt,
        walletdb::{
            LedgerEntryParams, LedgerStats, TransactionFilter, WalletLedgerExt,
            WalletSettingsUpdate,
        },
    },
    models::walletmodels::*,
    utils::decimal::zero,
};

#[derive(Debug, Clone)]
pub struct RechargeRequest {
    pub amount: BigDecimal,
    pub currency: PaymentCurrency,
    pub description: Option<String>,
    pub payment_method: PaymentMethod,
    pub provider: Option<PaymentProvider>,
    pub return_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub recipient_user_id: Uuid,
    pub amount: BigDecimal,
    pub currency: PaymentCurrency,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct RechargeInit {
    pub transaction: WalletTransaction,
    pub payment_url: String,
    pub external_id: String,
}

#[derive(Debug)]
pub struct WalletBalance {
    pub wallet: Wallet,
    pub daily_spent: BigDecimal,
    pub monthly_spent: BigDecimal,
}

#[derive(Debug)]
pub struct WalletStats {
    pub total_balance: BigDecimal,
    pub currency: PaymentCurrency,
    pub ledger: LedgerStats,
}

#[derive(Clone)]
pub struct WalletService {
    db_client: Arc<DBClient>,
    gateways: Arc<GatewayRegistry>,
    notifications: Arc<NotificationService>,
}

impl WalletService {
    pub fn new(
        db_client: Arc<DBClient>,
        gateways: Arc<GatewayRegistry>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            gateways,
            notifications,
        }
    }

    /// Resolves the user's wallet, provisioning it on first access.
    pub async fn get_wallet(
        &self,
        user_id: Uuid,
        currency: PaymentCurrency,
    ) -> Result<Wallet, WalletError> {
        self.db_client.get_or_create_wallet(user_id, currency).await
    }

    pub async fn get_balance(
        &self,
        user_id: Uuid,
        currency: PaymentCurrency,
    ) -> Result<WalletBalance, WalletError> {
        let wallet = self.get_wallet(user_id, currency).await?;
        let daily_spent = self.db_client.get_daily_spent(wallet.id).await?;
        let monthly_spent = self.db_client.get_monthly_spent(wallet.id).await?;

        Ok(WalletBalance {
            wallet,
            daily_spent,
            monthly_spent,
        })
    }

    pub async fn update_settings(
        &self,
        user_id: Uuid,
        currency: PaymentCurrency,
        settings: WalletSettingsUpdate,
    ) -> Result<Wallet, WalletError> {
        let wallet = self.get_wallet(user_id, currency).await?;
        tracing::info!("Updating wallet settings for user {}", user_id);
        self.db_client.update_wallet_settings(wallet.id, settings).await
    }

    /// Completed credit against one wallet. Used by internal collaborators
    /// (refunds, promotional credits); recharges go through `recharge_init`.
    pub async fn credit(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<(WalletTransaction, Wallet), WalletError> {
        tracing::info!("Crediting wallet {} with {}", wallet_id, params.amount);
        let (transaction, wallet) = self.db_client.credit_wallet(wallet_id, params).await?;
        self.notify_transaction(&transaction, "wallet_credited");
        Ok((transaction, wallet))
    }

    pub async fn debit(
        &self,
        wallet_id: Uuid,
        params: LedgerEntryParams,
    ) -> Result<(WalletTransaction, Wallet), WalletError> {
        tracing::info!("Debiting wallet {} with {}", wallet_id, params.amount);
        let (transaction, wallet) = self.db_client.debit_wallet(wallet_id, params).await?;
        self.notify_transaction(&transaction, "wallet_debited");
        Ok((transaction, wallet))
    }

    /// Wallet-to-wallet transfer: one atomic unit, two ledger rows sharing a
    /// reference id. Sender daily/monthly limits and the recipient's
    /// max-balance cap are enforced under the row locks.
    pub async fn transfer(
        &self,
        sender_user_id: Uuid,
        request: TransferRequest,
    ) -> Result<(WalletTransaction, WalletTransaction), WalletError> {
        if sender_user_id == request.recipient_user_id {
            return Err(WalletError::SelfTransfer);
        }

        limits::validate_amount(&request.amount, &zero(), Operation::Credit)?;

        let sender = self
            .db_client
            .find_user(sender_user_id)
            .await?
            .ok_or(WalletError::UserNotFound)?;
        let recipient = self
            .db_client
            .find_user(request.recipient_user_id)
            .await?
            .ok_or(WalletError::UserNotFound)?;

        let sender_wallet = self.get_wallet(sender.id, request.currency).await?;
        let recipient_wallet = self.get_wallet(recipient.id, request.currency).await?;

        if !sender_wallet.is_usable() || !recipient_wallet.is_usable() {
            return Err(WalletError::WalletInactiveOrBlocked);
        }

        let reference_id = generate_transaction_id(TRANSFER_PREFIX);
        let note = request
            .description
            .map(|d| format!(" - {}", d))
            .unwrap_or_default();

        tracing::info!(
            "Transferring {} {} from user {} to user {} ({})",
            request.amount,
            request.currency,
            sender.id,
            recipient.id,
            reference_id
        );

        let (sender_tx, recipient_tx) = self
            .db_client
            .transfer_funds(
                sender_wallet.id,
                recipient_wallet.id,
                request.amount,
                reference_id,
                format!("Transfer to {}{}", recipient.full_name(), note),
                format!("Transfer from {}{}", sender.full_name(), note),
            )
            .await?;

        self.notify_transaction(&sender_tx, "transfer_sent");
        self.notify_transaction(&recipient_tx, "transfer_received");

        Ok((sender_tx, recipient_tx))
    }

    /// Opens a recharge: PENDING ledger row first, then the external payment
    /// session. A provider rejection marks the row failed; a timeout leaves
    /// it pending because the provider may still have accepted the session.
    pub async fn recharge_init(
        &self,
        user_id: Uuid,
        request: RechargeRequest,
    ) -> Result<RechargeInit, WalletError> {
        limits::validate_amount(&request.amount, &zero(), Operation::Credit)?;

        if let Some(provider) = request.provider {
            if !provider.accepts_amount(&request.amount) {
                return Err(WalletError::LimitExceeded(format!(
                    "Amount {} {} is outside the accepted range for {:?}",
                    request.amount, request.currency, provider
                )));
            }
        }

        let user = self
            .db_client
            .find_user(user_id)
            .await?
            .ok_or(WalletError::UserNotFound)?;

        let wallet = self.get_wallet(user_id, request.currency).await?;
        if !wallet.is_usable() {
            return Err(WalletError::WalletInactiveOrBlocked);
        }

        let daily_spent = self.db_client.get_daily_spent(wallet.id).await?;
        let monthly_spent = self.db_client.get_monthly_spent(wallet.id).await?;
        limits::validate_limits(
            &request.amount,
            &wallet.balance,
            &daily_spent,
            &monthly_spent,
            &WalletLimits {
                daily_limit: wallet.daily_limit.clone(),
                monthly_limit: wallet.monthly_limit.clone(),
                max_balance: wallet.max_balance.clone(),
            },
            wallet.currency,
        )?;

        let mut metadata = serde_json::json!({
            "payment_method": request.payment_method,
            "provider": request.provider,
        });
        if let Some(extra) = &request.metadata {
            if let (Some(base), Some(extra)) = (metadata.as_object_mut(), extra.as_object()) {
                for (key, value) in extra {
                    base.insert(key.clone(), value.clone());
                }
            }
        }

        let pending = self
            .db_client
            .create_pending_credit(
                wallet.id,
                LedgerEntryParams {
                    amount: request.amount.clone(),
                    description: Some(
                        request
                            .description
                            .clone()
                            .unwrap_or_else(|| "Wallet recharge".to_string()),
                    ),
                    category: Some(category::RECHARGE.to_string()),
                    source_type: Some(source_type::PAYMENT.to_string()),
                    metadata: Some(metadata),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            "Recharge initiated for user {}: transaction {}",
            user_id,
            pending.transaction_id
        );

        let gateway = self.gateways.get(None)?;
        let session = gateway
            .open(OpenSessionRequest {
                transaction_id: pending.transaction_id.clone(),
                amount: request.amount.clone(),
                currency: request.currency,
                description: format!("Wallet recharge - {}", pending.transaction_id),
                customer: PaymentCustomer {
                    name: user.full_name(),
                    email: user.email.clone(),
                    phone: user.phone_number.clone(),
                },
                channels: Some(channels_for(request.payment_method).to_string()),
                return_url: request.return_url.clone(),
            })
            .await;

        let session = match session {
            Ok(session) => session,
            Err(error @ WalletError::GatewayUnreachable(_)) => {
                // The session may exist provider-side; keep the row pending
                // so the webhook or a later poll can still settle it.
                tracing::warn!(
                    "Gateway unreachable for recharge {}; transaction left pending",
                    pending.transaction_id
                );
                return Err(error);
            }
            Err(error) => {
                self.db_client
                    .fail_pending_transaction(&pending.transaction_id, &error.to_string())
                    .await?;
                tracing::error!(
                    "Recharge {} failed at gateway: {}",
                    pending.transaction_id,
                    error
                );
                return Err(error);
            }
        };

        let transaction = self
            .db_client
            .annotate_transaction_source(
                pending.id,
                &session.external_id,
                serde_json::json!({
                    "payment_token": session.external_id,
                    "payment_url": session.redirect_url,
                }),
            )
            .await?;

        Ok(RechargeInit {
            transaction,
            payment_url: session.redirect_url,
            external_id: session.external_id,
        })
    }

    pub async fn get_transactions(
        &self,
        user_id: Uuid,
        currency: PaymentCurrency,
        filter: TransactionFilter,
    ) -> Result<(Vec<WalletTransaction>, i64), WalletError> {
        let wallet = self.get_wallet(user_id, currency).await?;
        self.db_client.get_wallet_transactions(wallet.id, filter).await
    }

    pub async fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: &str,
    ) -> Result<WalletTransaction, WalletError> {
        let transaction = self
            .db_client
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| WalletError::TransactionNotFound(transaction_id.to_string()))?;

        // Foreign transactions are indistinguishable from absent ones.
        if transaction.user_id != user_id {
            return Err(WalletError::TransactionNotFound(transaction_id.to_string()));
        }

        Ok(transaction)
    }

    pub async fn get_stats(
        &self,
        user_id: Uuid,
        currency: PaymentCurrency,
    ) -> Result<WalletStats, WalletError> {
        let wallet = self.get_wallet(user_id, currency).await?;
        let ledger = self.db_client.get_wallet_stats(wallet.id).await?;

        Ok(WalletStats {
            total_balance: wallet.balance,
            currency: wallet.currency,
            ledger,
        })
    }

    fn notify_transaction(&self, transaction: &WalletTransaction, template: &'static str) {
        let notifications = self.notifications.clone();
        let user_id = transaction.user_id;
        let vars = serde_json::json!({
            "transaction_id": transaction.transaction_id,
            "amount": transaction.amount.to_string(),
            "currency": transaction.currency.as_str(),
        });

        tokio::spawn(async move {
            notifications.notify(user_id, template, vars).await;
        });
    }
}

fn channels_for(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::MobileMoney => "MOBILE_MONEY",
        PaymentMethod::CreditCard => "CREDIT_CARD",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_follow_payment_method() {
        assert_eq!(channels_for(PaymentMethod::MobileMoney), "MOBILE_MONEY");
        assert_eq!(channels_for(PaymentMethod::CreditCard), "CREDIT_CARD");
    }
}
