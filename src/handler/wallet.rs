// handler/wallet.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::{
    dtos::walletdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::walletmodels::TransactionStatus,
    service::wallet_service::{RechargeRequest, TransferRequest},
    utils::decimal::amount_from_f64,
    AppState,
};

pub async fn get_wallet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<CurrencyQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let currency = params.currency.unwrap_or_default();

    let wallet = app_state
        .wallet_service
        .get_wallet(auth.user.id, currency)
        .await
        .map_err(HttpError::from)?;

    let response: WalletResponseDto = wallet.into();
    Ok(Json(ApiResponse::success("Wallet retrieved successfully", response)))
}

pub async fn get_balance(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<CurrencyQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let currency = params.currency.unwrap_or_default();

    let balance = app_state
        .wallet_service
        .get_balance(auth.user.id, currency)
        .await
        .map_err(HttpError::from)?;

    let response: BalanceResponseDto = balance.into();
    Ok(Json(ApiResponse::success("Balance retrieved successfully", response)))
}

pub async fn update_settings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<CurrencyQueryDto>,
    Json(body): Json<UpdateWalletSettingsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let currency = params.currency.unwrap_or_default();

    let wallet = app_state
        .wallet_service
        .update_settings(auth.user.id, currency, body.into_update())
        .await
        .map_err(HttpError::from)?;

    let response: WalletResponseDto = wallet.into();
    Ok(Json(ApiResponse::success("Wallet settings updated successfully", response)))
}

pub async fn initiate_recharge(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<RechargeRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let amount = amount_from_f64(body.amount)
        .ok_or_else(|| HttpError::bad_request("Invalid amount"))?;

    let recharge = app_state
        .wallet_service
        .recharge_init(
            auth.user.id,
            RechargeRequest {
                amount,
                currency: body.currency,
                description: body.description,
                payment_method: body.payment_method,
                provider: body.provider,
                return_url: body.return_url,
                metadata: body.metadata,
            },
        )
        .await
        .map_err(HttpError::from)?;

    let response = RechargeResponseDto {
        transaction: recharge.transaction.into(),
        payment_url: recharge.payment_url,
        payment_id: recharge.external_id,
    };
    Ok(Json(ApiResponse::success("Recharge initiated successfully", response)))
}

pub async fn get_recharge_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let transaction = app_state
        .wallet_service
        .get_transaction(auth.user.id, &transaction_id)
        .await
        .map_err(HttpError::from)?;

    // Still pending: ask the aggregator. The poll converges on the same
    // idempotent settlement path the webhook uses.
    if transaction.status == TransactionStatus::Pending {
        app_state
            .settlement
            .reconcile_by_poll(&transaction_id)
            .await
            .map_err(HttpError::from)?;
    }

    let transaction = app_state
        .wallet_service
        .get_transaction(auth.user.id, &transaction_id)
        .await
        .map_err(HttpError::from)?;

    let message = match transaction.status {
        TransactionStatus::Completed => "Recharge confirmed",
        TransactionStatus::Failed => "Recharge failed",
        TransactionStatus::Pending => "Recharge still pending",
    };

    let response: TransactionResponseDto = transaction.into();
    Ok(Json(ApiResponse::success(message, response)))
}

pub async fn transfer_funds(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<TransferRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let amount = amount_from_f64(body.amount)
        .ok_or_else(|| HttpError::bad_request("Invalid amount"))?;

    let (sender_tx, recipient_tx) = app_state
        .wallet_service
        .transfer(
            auth.user.id,
            TransferRequest {
                recipient_user_id: body.recipient_user_id,
                amount,
                currency: body.currency,
                description: body.description,
            },
        )
        .await
        .map_err(HttpError::from)?;

    let response = TransferResponseDto {
        transaction: sender_tx.into(),
        recipient_transaction: recipient_tx.into(),
    };
    Ok(Json(ApiResponse::success("Transfer completed successfully", response)))
}

pub async fn get_transaction_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(currency): Query<CurrencyQueryDto>,
    Query(params): Query<TransactionHistoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let filter = params.into_filter().map_err(HttpError::bad_request)?;
    let limit = filter.limit;
    let offset = filter.offset;

    let (transactions, total) = app_state
        .wallet_service
        .get_transactions(auth.user.id, currency.currency.unwrap_or_default(), filter)
        .await
        .map_err(HttpError::from)?;

    let response = PaginatedTransactionsDto::new(transactions, total, limit, offset);
    Ok(Json(ApiResponse::success("Transactions retrieved successfully", response)))
}

pub async fn get_transaction_detail(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let transaction = app_state
        .wallet_service
        .get_transaction(auth.user.id, &transaction_id)
        .await
        .map_err(HttpError::from)?;

    let response: TransactionResponseDto = transaction.into();
    Ok(Json(ApiResponse::success("Transaction retrieved successfully", response)))
}

pub async fn get_wallet_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<CurrencyQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state
        .wallet_service
        .get_stats(auth.user.id, params.currency.unwrap_or_default())
        .await
        .map_err(HttpError::from)?;

    let response: WalletStatsResponseDto = stats.into();
    Ok(Json(ApiResponse::success("Wallet stats retrieved successfully", response)))
}
