use std::net::SocketAddr;

use anyhow::Context;

use crate::pagination::PageLimits;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub cache_ttl_seconds: i64,
    pub records_per_page: u64,
    pub max_records_per_page: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelhouse.db?mode=rwc".to_string());

        let cache_ttl_seconds: i64 =
            std::env::var("CACHE_TTL_SECONDS").ok().and_then(|s| s.parse().ok()).unwrap_or(60);

        let max_records_per_page: u64 = std::env::var("MAX_RECORDS_PER_PAGE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(50);

        let records_per_page: u64 = std::env::var("RECORDS_PER_PAGE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(10)
            .min(max_records_per_page);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            cache_ttl_seconds,
            records_per_page,
            max_records_per_page,
        })
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_records_per_page: self.records_per_page,
            max_records_per_page: self.max_records_per_page,
        }
    }
}
