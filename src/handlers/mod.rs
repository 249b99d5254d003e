use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_web::{get, web, HttpResponse};
use log::warn;
use serde_json::json;

use crate::auth::CurrentUser;
use crate::errors::{self, ApiError};
use crate::ids::parse_object_id;
use crate::media::LocalFile;
use crate::models::VideoDetails;
use crate::response::ApiResponse;
use crate::AppState;

pub mod comments;
pub mod dashboard;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

#[get("/healthcheck")]
async fn healthcheck() -> HttpResponse {
    ApiResponse::ok(json!({ "status": "ok" }), "Service is healthy")
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(healthcheck)
            .service(web::scope("/users").configure(users::configure))
            .service(web::scope("/videos").configure(videos::configure))
            .service(web::scope("/comments").configure(comments::configure))
            .service(web::scope("/likes").configure(likes::configure))
            .service(web::scope("/subscriptions").configure(subscriptions::configure))
            .service(web::scope("/tweets").configure(tweets::configure))
            .service(web::scope("/playlists").configure(playlists::configure))
            .service(web::scope("/dashboard").configure(dashboard::configure))
            .default_service(web::to(errors::not_found)),
    );
}

pub(crate) fn text(field: &Option<Text<String>>) -> Option<&str> {
    field.as_ref().map(|t| t.0.as_str())
}

pub(crate) fn local_file(upload: &TempFile) -> LocalFile {
    LocalFile {
        path: upload.file.path().to_path_buf(),
        file_name: upload.file_name.clone(),
        content_type: upload.content_type.as_ref().map(|m| m.to_string()),
    }
}

/// Loads a video the caller is allowed to see; drafts are hidden from everyone
/// but their owner.
pub(crate) async fn visible_video(
    state: &AppState,
    user: &CurrentUser,
    raw_id: &str,
) -> Result<VideoDetails, ApiError> {
    let id = parse_object_id("video id", raw_id)?;
    match state.videos.details(&id).await? {
        Some(video) if video.is_published || video.owner.id == user.id() => Ok(video),
        _ => Err(ApiError::NotFound("Video not found".into())),
    }
}

pub(crate) async fn existing_channel(state: &AppState, raw_id: &str) -> Result<String, ApiError> {
    let id = parse_object_id("channel id", raw_id)?;
    match state.users.find(&id).await? {
        Some(channel) => Ok(channel.id),
        None => Err(ApiError::NotFound("Channel not found".into())),
    }
}

/// Removes assets uploaded earlier in a request that then failed.
pub(crate) async fn discard_uploads(state: &AppState, urls: &[&str]) {
    for url in urls {
        if let Err(e) = state.media.delete_url(url).await {
            warn!("Could not remove orphaned asset {}: {}", url, e);
        }
    }
}
