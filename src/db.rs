use std::sync::Arc;

use anyhow::Context;
use bson::doc;
use mongodb::Client;
use tracing::info;

use crate::config::{Config, StoreKind};
use crate::store::{EmployeeStore, MemoryEmployeeStore, MongoEmployeeStore};

pub type SharedStore = Arc<dyn EmployeeStore>;

pub async fn init_store(config: &Config) -> anyhow::Result<SharedStore> {
    match config.store {
        StoreKind::Memory => {
            info!("Using in-memory employee store");
            Ok(Arc::new(MemoryEmployeeStore::new()))
        }
        StoreKind::Mongo => {
            let store = init_mongo(config).await?;
            Ok(Arc::new(store))
        }
    }
}

async fn init_mongo(config: &Config) -> anyhow::Result<MongoEmployeeStore> {
    let client = Client::with_uri_str(config.require_mongo_uri()?)
        .await
        .context("Failed to create MongoDB client")?;

    // The driver connects lazily; ping so a bad URI fails at startup.
    client
        .database(&config.db_name)
        .run_command(doc! { "ping": 1 })
        .await
        .context("Failed to connect to MongoDB")?;
    info!(db = %config.db_name, collection = %config.collection_name, "Connected to MongoDB");

    let store = MongoEmployeeStore::new(client, &config.db_name, &config.collection_name);
    store
        .ensure_indexes()
        .await
        .context("Failed to create employee indexes")?;
    Ok(store)
}
