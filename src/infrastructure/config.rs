use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub loan_period_days: i64,
    pub reservation_hold_days: i64,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://librarysphere.db?mode=rwc".to_string());

        Ok(Self {
            database_url,
            port: parse_var("PORT", 8000)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            loan_period_days: parse_positive("LOAN_PERIOD_DAYS", 30)?,
            reservation_hold_days: parse_positive("RESERVATION_HOLD_DAYS", 14)?,
            seed_demo: env::var("SEED_DEMO").is_ok(),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_positive(name: &str, default: i64) -> Result<i64, ConfigError> {
    let value = parse_var(name, default)?;
    if value <= 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("{} must be a positive number of days", value),
        ));
    }
    Ok(value)
}
