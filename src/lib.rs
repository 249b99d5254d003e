use std::path::PathBuf;
use std::sync::Arc;

use actix_multipart::form::tempfile::TempFileConfig;
use actix_multipart::form::MultipartFormConfig;
use actix_web::web;

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ids;
pub mod media;
pub mod models;
pub mod repositories;
pub mod response;
pub mod services;
pub mod validation;
pub mod video_utils;

use crate::config::AuthConfig;
use crate::media::MediaStore;
use crate::repositories::{
    CommentRepository, LikeRepository, PlaylistRepository, SubscriptionRepository,
    TweetRepository, UserRepository, VideoRepository,
};

/// JSON and url-encoded request bodies above this are rejected.
pub const JSON_BODY_LIMIT: usize = 16 * 1024;

pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub videos: Arc<dyn VideoRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tweets: Arc<dyn TweetRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub playlists: Arc<dyn PlaylistRepository>,
    pub media: Arc<dyn MediaStore>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wires every repository to one store that implements them all.
    pub fn new<S>(store: Arc<S>, media: Arc<dyn MediaStore>, auth: AuthConfig) -> Self
    where
        S: UserRepository
            + VideoRepository
            + CommentRepository
            + TweetRepository
            + LikeRepository
            + SubscriptionRepository
            + PlaylistRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            videos: store.clone(),
            comments: store.clone(),
            tweets: store.clone(),
            likes: store.clone(),
            subscriptions: store.clone(),
            playlists: store,
            media,
            auth,
        }
    }
}

/// Extractor limits and error handlers shared by the server and the test suite.
pub fn configure_extractors(
    upload_dir: PathBuf,
    max_upload_bytes: usize,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(
            web::JsonConfig::default()
                .limit(JSON_BODY_LIMIT)
                .error_handler(errors::json_error_handler),
        )
        .app_data(
            web::FormConfig::default()
                .limit(JSON_BODY_LIMIT)
                .error_handler(errors::form_error_handler),
        )
        .app_data(web::QueryConfig::default().error_handler(errors::query_error_handler))
        .app_data(
            MultipartFormConfig::default()
                .total_limit(max_upload_bytes)
                .error_handler(errors::multipart_error_handler),
        )
        .app_data(TempFileConfig::default().directory(upload_dir));
    }
}
