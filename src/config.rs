use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub stripe_secret_key: Option<String>,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub image_api_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok();
        let email_api_url = env::var("EMAIL_API_URL").ok();
        let email_api_key = env::var("EMAIL_API_KEY").ok();
        let email_from =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "noreply@marketplace.local".to_string());
        let image_api_url = env::var("IMAGE_API_URL").ok();
        Ok(Self {
            database_url,
            host,
            port,
            stripe_secret_key,
            email_api_url,
            email_api_key,
            email_from,
            image_api_url,
        })
    }
}
