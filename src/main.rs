mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;
use service::{
    notification_service::{start_notification_sweeper, NotificationService, SystemClock},
    payment_gateway::GatewayRegistry,
    settlement::{DbBookingClient, SettlementCoordinator},
    wallet_service::WalletService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub gateways: Arc<GatewayRegistry>,
    pub wallet_service: Arc<WalletService>,
    pub settlement: Arc<SettlementCoordinator>,
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client = Arc::new(db_client);

        // Built once here and injected; nothing below holds a back-reference.
        let gateways = Arc::new(GatewayRegistry::new(&config));
        let notification_service = Arc::new(NotificationService::new(Arc::new(SystemClock)));

        let wallet_service = Arc::new(WalletService::new(
            db_client.clone(),
            gateways.clone(),
            notification_service.clone(),
        ));

        let booking_client = Arc::new(DbBookingClient::new(db_client.clone()));
        let settlement = Arc::new(SettlementCoordinator::new(
            db_client.clone(),
            gateways.clone(),
            booking_client,
            notification_service.clone(),
        ));

        Self {
            env: config,
            db_client,
            gateways,
            wallet_service,
            settlement,
            notification_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    // Notification log sweep, owned by process startup.
    let sweeper_service = app_state.notification_service.clone();
    tokio::spawn(async move {
        start_notification_sweeper(sweeper_service).await;
    });

    let app = create_router(app_state).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
