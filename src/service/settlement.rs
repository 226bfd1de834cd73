// service/settlement.rs
//
// Bridges verified aggregator outcomes onto the ledger. This is the only
// place that knows about both the wallet ledger and the booking collaborator;
// the dependency is one-way, through the narrow BookingPort.
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::{
    error::WalletError,
    notification_service::NotificationService,
    payment_gateway::{GatewayRegistry, PaymentProbe, WebhookEvent, WebhookStatus},
};
use crate::{
    db::{db::DBClient, walletdb::WalletLedgerExt},
    models::walletmodels::{Wallet, WalletTransaction},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Confirmed,
    Failed(String),
    Cancelled,
}

/// One settlement attempt, keyed by the ledger transaction id the aggregator
/// echoes back. `amount` is present for webhook-driven events and
/// cross-checked against the pending row before any credit.
#[derive(Debug, Clone)]
pub struct SettlementEvent {
    pub transaction_id: String,
    pub amount: Option<BigDecimal>,
    pub outcome: PaymentOutcome,
}

impl SettlementEvent {
    pub fn from_webhook(event: WebhookEvent) -> Self {
        let outcome = match event.status {
            WebhookStatus::Accepted => PaymentOutcome::Confirmed,
            WebhookStatus::Refused => PaymentOutcome::Failed(
                event
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "Payment refused by provider".to_string()),
            ),
            WebhookStatus::Cancelled => PaymentOutcome::Cancelled,
        };

        SettlementEvent {
            transaction_id: event.transaction_id,
            amount: Some(event.amount),
            outcome,
        }
    }

    /// A pending probe produces no event: the settlement window stays open.
    pub fn from_probe(transaction_id: &str, probe: PaymentProbe) -> Option<Self> {
        let outcome = match probe {
            PaymentProbe::Completed => PaymentOutcome::Confirmed,
            PaymentProbe::Failed(reason) => PaymentOutcome::Failed(reason),
            PaymentProbe::Pending => return None,
        };

        Some(SettlementEvent {
            transaction_id: transaction_id.to_string(),
            amount: None,
            outcome,
        })
    }
}

#[derive(Debug)]
pub enum SettlementOutcome {
    Credited {
        transaction: WalletTransaction,
        wallet: Wallet,
    },
    MarkedFailed(WalletTransaction),
    /// Duplicate or out-of-order event; the ledger was left untouched.
    NothingToSettle,
}

#[async_trait]
pub trait BookingPort: Send + Sync {
    async fn confirm_payment(&self, booking_id: Uuid, payment_ref: &str) -> Result<(), WalletError>;
}

/// Default booking collaborator backed by the bookings table.
pub struct DbBookingClient {
    db_client: Arc<DBClient>,
}

impl DbBookingClient {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }
}

#[async_trait]
impl BookingPort for DbBookingClient {
    async fn confirm_payment(&self, booking_id: Uuid, payment_ref: &str) -> Result<(), WalletError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'confirmed',
                payment_ref = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .bind(payment_ref)
        .execute(&self.db_client.pool)
        .await
        .map_err(WalletError::Database)?;

        if result.rows_affected() == 0 {
            return Err(WalletError::TransactionNotFound(booking_id.to_string()));
        }

        Ok(())
    }
}

pub struct SettlementCoordinator {
    db_client: Arc<DBClient>,
    gateways: Arc<GatewayRegistry>,
    booking: Arc<dyn BookingPort>,
    notifications: Arc<NotificationService>,
}

impl SettlementCoordinator {
    pub fn new(
        db_client: Arc<DBClient>,
        gateways: Arc<GatewayRegistry>,
        booking: Arc<dyn BookingPort>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            gateways,
            booking,
            notifications,
        }
    }

    /// Poll-driven reconciliation for a still-pending recharge. Converges on
    /// the same `settle` path the webhook uses; a gateway outage is not a
    /// caller error, the transaction simply stays pending.
    pub async fn reconcile_by_poll(
        &self,
        transaction_id: &str,
    ) -> Result<SettlementOutcome, WalletError> {
        let gateway = self.gateways.get(None)?;

        let probe = match gateway.check_status(transaction_id).await {
            Ok(probe) => probe,
            Err(WalletError::GatewayUnreachable(reason)) => {
                tracing::warn!(
                    "Status poll for {} failed, will retry later: {}",
                    transaction_id,
                    reason
                );
                return Ok(SettlementOutcome::NothingToSettle);
            }
            Err(error) => return Err(error),
        };

        match SettlementEvent::from_probe(transaction_id, probe) {
            Some(event) => self.settle(event).await,
            None => Ok(SettlementOutcome::NothingToSettle),
        }
    }

    /// Applies a terminal payment outcome. Webhook delivery and status polls
    /// both land here; the pending-status predicate inside the ledger makes
    /// the transition idempotent, so the loser of a race no-ops.
    pub async fn settle(&self, event: SettlementEvent) -> Result<SettlementOutcome, WalletError> {
        match event.outcome {
            PaymentOutcome::Confirmed => {
                let settled = self
                    .db_client
                    .confirm_pending_credit(&event.transaction_id, event.amount.as_ref())
                    .await?;

                match settled {
                    None => {
                        tracing::info!(
                            "Nothing to settle for transaction {} (duplicate or already terminal)",
                            event.transaction_id
                        );
                        Ok(SettlementOutcome::NothingToSettle)
                    }
                    Some((transaction, wallet)) => {
                        tracing::info!(
                            "Recharge confirmed: transaction {} credited wallet {}",
                            transaction.transaction_id,
                            wallet.id
                        );

                        // Secondary effects. The money movement is committed;
                        // neither of these can roll it back.
                        self.confirm_linked_booking(&transaction).await;
                        self.dispatch_notification(&transaction);

                        Ok(SettlementOutcome::Credited { transaction, wallet })
                    }
                }
            }
            PaymentOutcome::Failed(reason) => self.mark_failed(&event.transaction_id, &reason).await,
            PaymentOutcome::Cancelled => {
                self.mark_failed(&event.transaction_id, "Payment cancelled")
                    .await
            }
        }
    }

    async fn mark_failed(
        &self,
        transaction_id: &str,
        reason: &str,
    ) -> Result<SettlementOutcome, WalletError> {
        let failed = self
            .db_client
            .fail_pending_transaction(transaction_id, reason)
            .await?;

        match failed {
            None => {
                tracing::info!(
                    "Nothing to settle for transaction {} (duplicate or already terminal)",
                    transaction_id
                );
                Ok(SettlementOutcome::NothingToSettle)
            }
            Some(transaction) => {
                tracing::warn!(
                    "Recharge failed: transaction {} marked failed: {}",
                    transaction.transaction_id,
                    reason
                );
                self.dispatch_notification(&transaction);
                Ok(SettlementOutcome::MarkedFailed(transaction))
            }
        }
    }

    async fn confirm_linked_booking(&self, transaction: &WalletTransaction) {
        let booking_id = transaction
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("booking_id"))
            .and_then(|value| value.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok());

        let Some(booking_id) = booking_id else {
            return;
        };

        if let Err(error) = self
            .booking
            .confirm_payment(booking_id, &transaction.transaction_id)
            .await
        {
            // Left for reconciliation; the wallet credit stands.
            tracing::error!(
                "Booking {} confirmation failed after settlement of {}: {}",
                booking_id,
                transaction.transaction_id,
                error
            );
        }
    }

    fn dispatch_notification(&self, transaction: &WalletTransaction) {
        let notifications = self.notifications.clone();
        let user_id = transaction.user_id;
        let template = match transaction.status {
            crate::models::walletmodels::TransactionStatus::Completed => "wallet_recharge_confirmed",
            _ => "wallet_recharge_failed",
        };
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

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> BigDecimal {
        BigDecimal::from(v)
    }

    #[test]
    fn webhook_statuses_map_to_outcomes() {
        let accepted = WebhookEvent {
            transaction_id: "WRT_1_a".to_string(),
            amount: dec(5000),
            status: WebhookStatus::Accepted,
            failure_reason: None,
        };
        let event = SettlementEvent::from_webhook(accepted);
        assert_eq!(event.outcome, PaymentOutcome::Confirmed);
        assert_eq!(event.amount, Some(dec(5000)));

        let refused = WebhookEvent {
            transaction_id: "WRT_1_a".to_string(),
            amount: dec(5000),
            status: WebhookStatus::Refused,
            failure_reason: Some("operator refused".to_string()),
        };
        assert_eq!(
            SettlementEvent::from_webhook(refused).outcome,
            PaymentOutcome::Failed("operator refused".to_string())
        );

        let cancelled = WebhookEvent {
            transaction_id: "WRT_1_a".to_string(),
            amount: dec(5000),
            status: WebhookStatus::Cancelled,
            failure_reason: None,
        };
        assert_eq!(
            SettlementEvent::from_webhook(cancelled).outcome,
            PaymentOutcome::Cancelled
        );
    }

    #[test]
    fn pending_probe_produces_no_event() {
        assert!(SettlementEvent::from_probe("WRT_1_a", PaymentProbe::Pending).is_none());

        let confirmed = SettlementEvent::from_probe("WRT_1_a", PaymentProbe::Completed).unwrap();
        assert_eq!(confirmed.outcome, PaymentOutcome::Confirmed);
        // Polls carry no authoritative amount; the ledger row is the truth.
        assert!(confirmed.amount.is_none());

        let failed =
            SettlementEvent::from_probe("WRT_1_a", PaymentProbe::Failed("expired".to_string()))
                .unwrap();
        assert_eq!(failed.outcome, PaymentOutcome::Failed("expired".to_string()));
    }
}
