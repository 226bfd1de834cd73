// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // CinetPay aggregator configuration
    pub cinetpay_api_key: String,
    pub cinetpay_site_id: String,
    pub cinetpay_secret_key: String,
    pub cinetpay_base_url: String,
    pub cinetpay_version: String,
    pub gateway_timeout_secs: u64,
    pub notify_base_url: String,
    pub return_base_url: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").unwrap_or_else(|_| "60".to_string());
        let app_url = std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        // Aggregator configuration (with test defaults)
        let cinetpay_api_key = std::env::var("CINETPAY_API_KEY")
            .unwrap_or_else(|_| "test_api_key".to_string());
        let cinetpay_site_id = std::env::var("CINETPAY_SITE_ID")
            .unwrap_or_else(|_| "test_site_id".to_string());
        let cinetpay_secret_key = std::env::var("CINETPAY_SECRET_KEY")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let cinetpay_base_url = std::env::var("CINETPAY_BASE_URL")
            .unwrap_or_else(|_| "https://api-checkout.cinetpay.com".to_string());
        let cinetpay_version = std::env::var("CINETPAY_VERSION")
            .unwrap_or_else(|_| "v2".to_string());
        let gateway_timeout_secs = std::env::var("GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(15);
        let notify_base_url = std::env::var("NOTIFY_BASE_URL")
            .unwrap_or_else(|_| app_url.clone());
        let return_base_url = std::env::var("RETURN_BASE_URL")
            .unwrap_or_else(|_| app_url.clone());

        Config {
            database_url,
            app_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8000),
            cinetpay_api_key,
            cinetpay_site_id,
            cinetpay_secret_key,
            cinetpay_base_url,
            cinetpay_version,
            gateway_timeout_secs,
            notify_base_url,
            return_base_url,
        }
    }
}
