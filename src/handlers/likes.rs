use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

use super::visible_video;
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::ids::parse_object_id;
use crate::models::LikeTarget;
use crate::response::ApiResponse;
use crate::AppState;

async fn toggle(
    state: &AppState,
    user: &CurrentUser,
    target: LikeTarget,
    raw_id: &str,
) -> Result<HttpResponse, ApiError> {
    let id = match target {
        LikeTarget::Video => visible_video(state, user, raw_id).await?.id,
        LikeTarget::Tweet => {
            let id = parse_object_id("tweet id", raw_id)?;
            if state.tweets.find(&id).await?.is_none() {
                return Err(ApiError::NotFound("Tweet not found".into()));
            }
            id
        }
        LikeTarget::Comment => {
            let id = parse_object_id("comment id", raw_id)?;
            if state.comments.find(&id).await?.is_none() {
                return Err(ApiError::NotFound("Comment not found".into()));
            }
            id
        }
    };

    let like = state.likes.toggle(user.id(), target, &id).await?;
    let liked = like.contains(target, &id);
    let message = if liked { "Liked" } else { "Unliked" };
    Ok(ApiResponse::ok(json!({ "like": like, "liked": liked }), message))
}

#[post("/video/{video_id}")]
async fn toggle_video_like(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    toggle(&state, &user, LikeTarget::Video, &path).await
}

#[post("/tweet/{tweet_id}")]
async fn toggle_tweet_like(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    toggle(&state, &user, LikeTarget::Tweet, &path).await
}

#[post("/comment/{comment_id}")]
async fn toggle_comment_like(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    toggle(&state, &user, LikeTarget::Comment, &path).await
}

#[get("")]
async fn liked_videos(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let videos = state.likes.liked_videos(user.id()).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(liked_videos)
        .service(toggle_video_like)
        .service(toggle_tweet_like)
        .service(toggle_comment_like);
}
