pub mod error;
pub mod limits;
pub mod notification_service;
pub mod payment_gateway;
pub mod settlement;
pub mod wallet_service;
