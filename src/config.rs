use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_api_url: String,
    pub gateway_timeout_secs: u64,
    pub forecast_url: Option<String>,
    pub cors_allowed_origins: Option<String>,
    pub expiry_sweep_schedule: String,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")?,
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET")?,
            razorpay_api_url: env::var("RAZORPAY_API_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            forecast_url: env::var("FORECAST_URL").ok(),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            // Daily at midnight, matching the inventory sweep the store staff expect.
            expiry_sweep_schedule: env::var("EXPIRY_SWEEP_SCHEDULE")
                .unwrap_or_else(|_| "0 0 0 * * *".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.razorpay_key_id.is_empty() || self.razorpay_key_secret.is_empty() {
            anyhow::bail!("RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET must be set");
        }
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }

        url::Url::parse(&self.razorpay_api_url)
            .map_err(|_| anyhow::anyhow!("RAZORPAY_API_URL is not a valid URL"))?;

        cron::Schedule::try_from(self.expiry_sweep_schedule.as_str())
            .map_err(|e| anyhow::anyhow!("EXPIRY_SWEEP_SCHEDULE is not a valid cron expression: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 3000,
            database_url: "postgres://localhost:5432/medstock".to_string(),
            razorpay_key_id: "rzp_test_key".to_string(),
            razorpay_key_secret: "secret".to_string(),
            razorpay_api_url: "https://api.razorpay.com".to_string(),
            gateway_timeout_secs: 10,
            forecast_url: None,
            cors_allowed_origins: None,
            expiry_sweep_schedule: "0 0 0 * * *".to_string(),
            currency: "INR".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_database_url() {
        let mut config = base_config();
        config.database_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_gateway_url() {
        let mut config = base_config();
        config.razorpay_api_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_cron_expression() {
        let mut config = base_config();
        config.expiry_sweep_schedule = "every day at midnight".to_string();
        assert!(config.validate().is_err());
    }
}
