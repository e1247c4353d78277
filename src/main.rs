use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod store;

use config::Config;
use db::init_store;

use crate::docs::ApiDoc;
use crate::store::EmployeeStore;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Employee Management API"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(store = ?config.store, addr = %config.server_addr, "Server starting...");

    let shared = init_store(&config).await?;
    let store: Data<dyn EmployeeStore> = Data::from(shared.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store.clone())
            .service(index)
            .configure(routes::configure)
    })
    .bind(&config.server_addr)
    .with_context(|| format!("Failed to bind {}", config.server_addr))?
    .run()
    .await
    .context("HTTP server failed")?;

    shared.shutdown().await;
    info!("Server stopped");
    Ok(())
}
