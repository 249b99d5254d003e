use actix_web::{delete, get, patch, post, web, HttpResponse};

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::ids::parse_object_id;
use crate::models::ContentRequest;
use crate::response::{empty, ApiResponse};
use crate::validation::Validator;
use crate::AppState;

const NOT_OWNED: &str = "Tweet not found or you do not have access to it";

#[post("")]
async fn create_tweet(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<ContentRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let content = v.required("content", body.content.as_deref());
    v.finish()?;

    let tweet = state.tweets.create(user.id(), &content).await?;
    Ok(ApiResponse::ok(tweet, "Tweet created successfully"))
}

#[get("")]
async fn my_tweets(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    let tweets = state.tweets.by_owner(user.id()).await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

#[get("/user/{user_id}")]
async fn user_tweets(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let owner = parse_object_id("user id", &path)?;
    if state.users.find(&owner).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let tweets = state.tweets.by_owner(&owner).await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

#[get("/{tweet_id}")]
async fn get_tweet(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("tweet id", &path)?;
    let tweet = state
        .tweets
        .find(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".into()))?;
    Ok(ApiResponse::ok(tweet, "Tweet fetched successfully"))
}

#[patch("/{tweet_id}")]
async fn update_tweet(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    body: web::Json<ContentRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("tweet id", &path)?;
    let mut v = Validator::new();
    let content = v.required("content", body.content.as_deref());
    v.finish()?;

    let tweet = state
        .tweets
        .update_owned(&id, user.id(), &content)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_OWNED.into()))?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

#[delete("/{tweet_id}")]
async fn delete_tweet(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id("tweet id", &path)?;
    if !state.tweets.delete_owned(&id, user.id()).await? {
        return Err(ApiError::NotFound(NOT_OWNED.into()));
    }
    Ok(ApiResponse::ok(empty(), "Tweet deleted successfully"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_tweet)
        .service(my_tweets)
        .service(user_tweets)
        .service(get_tweet)
        .service(update_tweet)
        .service(delete_tweet);
}
