use actix_web::{get, web, HttpResponse};

use super::existing_channel;
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::response::ApiResponse;
use crate::AppState;

#[get("/channel-stats/{channel_id}")]
async fn channel_stats(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let channel = existing_channel(&state, &path).await?;
    let stats = state.videos.channel_stats(&channel).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

#[get("/channel-videos/{channel_id}")]
async fn channel_videos(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let channel = existing_channel(&state, &path).await?;
    let videos = state
        .videos
        .by_owner(&channel, channel == user.id())
        .await?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(channel_stats).service(channel_videos);
}
