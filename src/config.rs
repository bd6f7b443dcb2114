use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Shared secret used to verify identity-provider session tokens (HS256).
    pub session_secret: String,
    /// Shared secret used to verify identity-provider webhook signatures.
    /// May carry a `whsec_` prefix; the remainder is base64.
    pub webhook_secret: String,
    pub storage_url: String,
    pub storage_service_key: String,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CASEDESK_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "casedesk.db".to_string()),
            session_secret: env::var("SESSION_SECRET").unwrap_or_default(),
            webhook_secret: env::var("IDENTITY_WEBHOOK_SECRET").unwrap_or_default(),
            storage_url: env::var("STORAGE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:54321".to_string()),
            storage_service_key: env::var("STORAGE_SERVICE_KEY").unwrap_or_default(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
