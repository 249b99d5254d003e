use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http, web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use vidtube_backend::config::Config;
use vidtube_backend::media::S3MediaStore;
use vidtube_backend::repositories::PgStore;
use vidtube_backend::{configure_extractors, errors, handlers, services, AppState};

fn startup_error(message: &str, cause: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", message, cause);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", message, cause))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let db_pool = services::init_db_pool(&config.database_url)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;
    let store = PgStore::new(db_pool);
    store
        .migrate()
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;
    info!("Database ready");

    let s3_client = services::init_s3_client(&config.media).await;
    services::ensure_bucket_exists(&s3_client, &config.media.bucket)
        .await
        .map_err(|e| startup_error("Media bucket unavailable", e))?;
    let media = S3MediaStore::new(
        s3_client,
        config.media.bucket.clone(),
        config.media.public_url.clone(),
    );

    let state = web::Data::new(AppState::new(
        Arc::new(store),
        Arc::new(media),
        config.auth.clone(),
    ));

    let bind = (config.host.clone(), config.port);
    info!("Starting HTTP server on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
            .supports_credentials();
        for origin in &config.cors_allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure_extractors(
                config.upload_dir.clone(),
                config.max_upload_bytes,
            ))
            .configure(handlers::configure_routes)
            .default_service(web::to(errors::not_found))
    })
    .bind(bind)?
    .run()
    .await
}
