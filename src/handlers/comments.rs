use actix_web::{delete, get, patch, post, web, HttpResponse};

use super::visible_video;
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::ids::parse_object_id;
use crate::models::{ContentRequest, Page, PageParams};
use crate::response::{empty, ApiResponse};
use crate::validation::Validator;
use crate::AppState;

const NOT_OWNED: &str = "Comment not found or you do not have access to it";

#[get("/video/{video_id}")]
async fn list_comments(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let video = visible_video(&state, &user, &path).await?;
    let page = Page::new(params.page, params.limit);

    let comments = state.comments.for_video(&video.id, page).await?;
    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

#[post("/video/{video_id}")]
async fn add_comment(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    body: web::Json<ContentRequest>,
) -> Result<HttpResponse, ApiError> {
    let video_id = parse_object_id("video id", &path)?;
    let mut v = Validator::new();
    let content = v.required("content", body.content.as_deref());
    v.finish()?;

    let video = visible_video(&state, &user, &video_id).await?;
    let comment = state.comments.create(&video.id, user.id(), &content).await?;
    Ok(ApiResponse::ok(comment, "Comment added successfully"))
}

#[patch("/{comment_id}")]
async fn update_comment(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    body: web::Json<ContentRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("comment id", &path)?;
    let mut v = Validator::new();
    let content = v.required("content", body.content.as_deref());
    v.finish()?;

    let comment = state
        .comments
        .update_owned(&id, user.id(), &content)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_OWNED.into()))?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

#[delete("/{comment_id}")]
async fn delete_comment(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("comment id", &path)?;
    if !state.comments.delete_owned(&id, user.id()).await? {
        return Err(ApiError::NotFound(NOT_OWNED.into()));
    }
    Ok(ApiResponse::ok(empty(), "Comment deleted successfully"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_comments)
        .service(add_comment)
        .service(update_comment)
        .service(delete_comment);
}
