use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_JWT_EXPIRY_DAYS: i64 = 90;

/// Process configuration read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub address: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let host: IpAddr = std::env::var("HOST")
            .unwrap_or_else(|_| DEFAULT_HOST.into())
            .parse()
            .context("HOST must be an IP address")?;
        let port = match std::env::var("PORT") {
            Ok(port) => port.parse().context("PORT must be a number")?,
            Err(_) => DEFAULT_PORT,
        };
        let jwt_expiry_days = match std::env::var("JWT_EXPIRY_DAYS") {
            Ok(days) => days.parse().context("JWT_EXPIRY_DAYS must be a number")?,
            Err(_) => DEFAULT_JWT_EXPIRY_DAYS,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expiry_days,
            address: SocketAddr::new(host, port),
        })
    }
}
