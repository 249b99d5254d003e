use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::MediaConfig;

pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

pub async fn init_s3_client(config: &MediaConfig) -> Client {
    let sdk_config = aws_config::from_env().load().await;
    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

    if let Some(endpoint) = &config.endpoint {
        s3_config_builder = s3_config_builder
            .endpoint_url(endpoint)
            .force_path_style(true);
    }

    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "env",
    );
    s3_config_builder = s3_config_builder.credentials_provider(credentials);

    match sdk_config.region() {
        Some(region) => s3_config_builder = s3_config_builder.region(region.clone()),
        None => s3_config_builder = s3_config_builder.region(Region::new("us-east-1")),
    }

    Client::from_conf(s3_config_builder.build())
}

pub async fn ensure_bucket_exists(client: &Client, bucket: &str) -> Result<(), String> {
    if client.head_bucket().bucket(bucket).send().await.is_ok() {
        info!("Bucket {} exists", bucket);
        return Ok(());
    }

    warn!("Bucket {} not found, creating it", bucket);
    client
        .create_bucket()
        .bucket(bucket)
        .send()
        .await
        .map(|_| info!("Created bucket {}", bucket))
        .map_err(|e| format!("Failed to create bucket {}: {}", bucket, e))
}
