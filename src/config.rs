use std::env;
use std::str::FromStr;

use anyhow::{Context, bail};
use dotenvy::dotenv;

/// Which backend holds the employee collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Mongo,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreKind::Mongo),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => bail!("unknown EMPLOYEE_STORE '{}', expected 'mongo' or 'memory'", other),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub store: StoreKind,

    // Only required for the mongo store
    pub mongo_uri: Option<String>,
    pub db_name: String,
    pub collection_name: String,

    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("EMPLOYEE_STORE") {
            Some(raw) => raw.parse()?,
            None => StoreKind::Mongo,
        };

        let mongo_uri = lookup("MONGO_URI").filter(|uri| !uri.trim().is_empty());
        if store == StoreKind::Mongo && mongo_uri.is_none() {
            bail!("MONGO_URI must be set when EMPLOYEE_STORE is 'mongo'");
        }

        let config = Self {
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            store,
            mongo_uri,
            db_name: lookup("MONGO_DB_NAME").unwrap_or_else(|| "assessment_db".to_string()),
            collection_name: lookup("MONGO_COLLECTION")
                .unwrap_or_else(|| "employees".to_string()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        };

        if config.db_name.trim().is_empty() || config.collection_name.trim().is_empty() {
            bail!("MONGO_DB_NAME and MONGO_COLLECTION must not be empty");
        }

        Ok(config)
    }

    pub fn require_mongo_uri(&self) -> anyhow::Result<&str> {
        self.mongo_uri
            .as_deref()
            .context("MONGO_URI must be set when EMPLOYEE_STORE is 'mongo'")
    }
}
