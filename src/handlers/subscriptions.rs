use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

use super::existing_channel;
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::response::ApiResponse;
use crate::AppState;

#[post("/toggle-subscription/{channel_id}")]
async fn toggle_subscription(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let channel = existing_channel(&state, &path).await?;
    if channel == user.id() {
        return Err(ApiError::BadRequest("You cannot subscribe to your own channel".into()));
    }

    let subscribed = state.subscriptions.toggle(user.id(), &channel).await?;
    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(json!({ "subscribed": subscribed }), message))
}

#[get("/{channel_id}")]
async fn channel_subscribers(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let channel = existing_channel(&state, &path).await?;
    let subscribers = state.subscriptions.subscribers(&channel).await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

#[get("")]
async fn subscribed_channels(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let channels = state.subscriptions.subscribed_channels(user.id()).await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(toggle_subscription)
        .service(subscribed_channels)
        .service(channel_subscribers);
}
