use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use log::info;

use super::{discard_uploads, local_file, text, visible_video};
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::ids::parse_object_id;
use crate::media::MediaKind;
use crate::models::{NewVideo, Page, VideoListParams, VideoQuery, VideoSort};
use crate::response::{empty, ApiResponse};
use crate::validation::Validator;
use crate::AppState;

const NOT_OWNED: &str = "Video not found or you do not have access to it";

#[derive(MultipartForm)]
pub struct PublishForm {
    title: Option<Text<String>>,
    description: Option<Text<String>>,
    video: Option<TempFile>,
    thumbnail: Option<TempFile>,
}

#[derive(MultipartForm)]
pub struct UpdateVideoForm {
    title: Option<Text<String>>,
    description: Option<Text<String>>,
    thumbnail: Option<TempFile>,
}

fn sort_direction(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        None | Some("") | Some("desc") | Some("-1") => Some(false),
        Some("asc") | Some("1") => Some(true),
        Some(_) => None,
    }
}

#[get("")]
async fn list_videos(
    state: web::Data<AppState>,
    user: CurrentUser,
    params: web::Query<VideoListParams>,
) -> Result<HttpResponse, ApiError> {
    let params = params.into_inner();
    let sort_by = VideoSort::parse(params.sort_by.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Invalid sortBy".into()))?;
    let ascending = sort_direction(params.sort_type.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Invalid sortType".into()))?;
    let owner = match params.user_id.as_deref() {
        Some(raw) => Some(parse_object_id("userId", raw)?),
        None => None,
    };
    let search = params
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let videos = state
        .videos
        .list(VideoQuery {
            viewer: user.id().to_string(),
            owner,
            search,
            sort_by,
            ascending,
            page: Page::new(params.page, params.limit),
        })
        .await?;
    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

async fn create_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    form: PublishForm,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let title = v.required("title", text(&form.title));
    let description = v.required("description", text(&form.description));
    v.require_present("video", &form.video);
    v.require_present("thumbnail", &form.thumbnail);
    v.finish()?;

    let (video_file, thumbnail) = match (&form.video, &form.thumbnail) {
        (Some(video), Some(thumbnail)) => (local_file(video), local_file(thumbnail)),
        _ => return Err(ApiError::BadRequest("video and thumbnail files are required".into())),
    };

    let uploaded_video = state.media.upload(&video_file, MediaKind::Video).await?;
    let uploaded_thumbnail = match state.media.upload(&thumbnail, MediaKind::Image).await {
        Ok(uploaded) => uploaded,
        Err(e) => {
            discard_uploads(&state, &[uploaded_video.url.as_str()]).await;
            return Err(e.into());
        }
    };

    let created = state
        .videos
        .create(NewVideo {
            video_file: uploaded_video.url.clone(),
            thumbnail: uploaded_thumbnail.url.clone(),
            title,
            description,
            duration: uploaded_video.duration,
            owner: user.id().to_string(),
        })
        .await;
    let video = match created {
        Ok(video) => video,
        Err(e) => {
            discard_uploads(&state, &[uploaded_video.url.as_str(), uploaded_thumbnail.url.as_str()]).await;
            return Err(e.into());
        }
    };

    info!("User {} published video {}", user.id(), video.id);
    Ok(ApiResponse::ok(video, "Video published successfully"))
}

#[post("")]
async fn publish_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    MultipartForm(form): MultipartForm<PublishForm>,
) -> Result<HttpResponse, ApiError> {
    create_video(state, user, form).await
}

#[post("/upload")]
async fn upload_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    MultipartForm(form): MultipartForm<PublishForm>,
) -> Result<HttpResponse, ApiError> {
    create_video(state, user, form).await
}

#[get("/{video_id}")]
async fn get_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let mut video = visible_video(&state, &user, &path).await?;

    state.videos.increment_views(&video.id).await?;
    state.users.record_watch(user.id(), &video.id).await?;
    video.views += 1;

    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

#[patch("/{video_id}")]
async fn update_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    MultipartForm(form): MultipartForm<UpdateVideoForm>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("video id", &path)?;
    let mut v = Validator::new();
    let title = v.required("title", text(&form.title));
    let description = v.required("description", text(&form.description));
    v.finish()?;

    let existing = state
        .videos
        .find_owned(&id, user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_OWNED.into()))?;

    let thumbnail = match &form.thumbnail {
        Some(file) => Some(state.media.upload(&local_file(file), MediaKind::Image).await?.url),
        None => None,
    };

    let updated = state
        .videos
        .update_owned(&id, user.id(), &title, &description, thumbnail.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_OWNED.into()))?;

    if thumbnail.is_some() {
        state.media.delete_url(&existing.thumbnail).await?;
    }
    Ok(ApiResponse::ok(updated, "Video updated successfully"))
}

#[delete("/{video_id}")]
async fn delete_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("video id", &path)?;
    let video = state
        .videos
        .find_owned(&id, user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_OWNED.into()))?;

    state.media.delete_url(&video.video_file).await?;
    state.media.delete_url(&video.thumbnail).await?;

    if !state.videos.delete_owned(&id, user.id()).await? {
        return Err(ApiError::NotFound(NOT_OWNED.into()));
    }

    info!("User {} deleted video {}", user.id(), id);
    Ok(ApiResponse::ok(empty(), "Video deleted successfully"))
}

#[patch("/toggle/publish/{video_id}")]
async fn toggle_publish(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("video id", &path)?;
    let video = state
        .videos
        .toggle_publish(&id, user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_OWNED.into()))?;

    let message = if video.is_published {
        "Video published"
    } else {
        "Video unpublished"
    };
    Ok(ApiResponse::ok(video, message))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_videos)
        .service(publish_video)
        .service(upload_video)
        .service(toggle_publish)
        .service(get_video)
        .service(update_video)
        .service(delete_video);
}
