use actix_web::{delete, get, patch, post, web, HttpResponse};

use super::visible_video;
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::ids::parse_object_id;
use crate::models::PlaylistRequest;
use crate::response::{empty, ApiResponse};
use crate::validation::Validator;
use crate::AppState;

const NOT_OWNED: &str = "Playlist not found or you do not have access to it";

fn playlist_fields(body: &PlaylistRequest) -> Result<(String, String), ApiError> {
    let mut v = Validator::new();
    let name = v.required("name", body.name.as_deref());
    let description = v.required("description", body.description.as_deref());
    v.finish()?;
    Ok((name, description))
}

#[post("")]
async fn create_playlist(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<PlaylistRequest>,
) -> Result<HttpResponse, ApiError> {
    let (name, description) = playlist_fields(&body)?;
    let playlist = state.playlists.create(user.id(), &name, &description).await?;
    Ok(ApiResponse::ok(playlist, "Playlist created successfully"))
}

#[get("")]
async fn my_playlists(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let playlists = state.playlists.by_owner(user.id(), user.id()).await?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}

#[get("/user/{user_id}")]
async fn user_playlists(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let owner = parse_object_id("user id", &path)?;
    if state.users.find(&owner).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let playlists = state.playlists.by_owner(&owner, user.id()).await?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}

#[get("/{playlist_id}")]
async fn get_playlist(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("playlist id", &path)?;
    let playlist = state
        .playlists
        .details(&id, user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".into()))?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

#[patch("/{playlist_id}")]
async fn update_playlist(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    body: web::Json<PlaylistRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("playlist id", &path)?;
    let (name, description) = playlist_fields(&body)?;

    let playlist = state
        .playlists
        .update_owned(&id, user.id(), &name, &description)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_OWNED.into()))?;
    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

#[delete("/{playlist_id}")]
async fn delete_playlist(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("playlist id", &path)?;
    if !state.playlists.delete_owned(&id, user.id()).await? {
        return Err(ApiError::NotFound(NOT_OWNED.into()));
    }
    Ok(ApiResponse::ok(empty(), "Playlist deleted successfully"))
}

async fn owned_playlist_and_video(
    state: &AppState,
    user: &CurrentUser,
    raw_playlist: &str,
    raw_video: &str,
) -> Result<(String, String), ApiError> {
    let playlist_id = parse_object_id("playlist id", raw_playlist)?;
    let video_id = parse_object_id("video id", raw_video)?;

    if state.playlists.find_owned(&playlist_id, user.id()).await?.is_none() {
        return Err(ApiError::NotFound(NOT_OWNED.into()));
    }
    Ok((playlist_id, video_id))
}

#[patch("/{playlist_id}/{video_id}")]
async fn add_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (raw_playlist, raw_video) = path.into_inner();
    let (playlist_id, video_id) =
        owned_playlist_and_video(&state, &user, &raw_playlist, &raw_video).await?;

    visible_video(&state, &user, &video_id).await?;

    let playlist = state
        .playlists
        .add_video(&playlist_id, user.id(), &video_id)
        .await?
        .ok_or_else(|| ApiError::Conflict("Video is already in the playlist".into()))?;
    Ok(ApiResponse::ok(playlist, "Video added to playlist"))
}

#[delete("/{playlist_id}/{video_id}")]
async fn remove_video(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (raw_playlist, raw_video) = path.into_inner();
    let (playlist_id, video_id) =
        owned_playlist_and_video(&state, &user, &raw_playlist, &raw_video).await?;

    let playlist = state
        .playlists
        .remove_video(&playlist_id, user.id(), &video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video is not in the playlist".into()))?;
    Ok(ApiResponse::ok(playlist, "Video removed from playlist"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_playlist)
        .service(my_playlists)
        .service(user_playlists)
        .service(get_playlist)
        .service(update_playlist)
        .service(delete_playlist)
        .service(add_video)
        .service(remove_video);
}
