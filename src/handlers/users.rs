use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{debug, info};
use serde_json::json;

use super::{discard_uploads, local_file, text};
use crate::auth::{self, CurrentUser, REFRESH_COOKIE};
use crate::errors::ApiError;
use crate::media::MediaKind;
use crate::models::{
    AccountUpdateRequest, LoginRequest, NewUser, PasswordChangeRequest, RefreshRequest,
};
use crate::response::{empty, ApiResponse};
use crate::validation::Validator;
use crate::AppState;

#[derive(MultipartForm)]
pub struct RegisterForm {
    username: Option<Text<String>>,
    email: Option<Text<String>>,
    password: Option<Text<String>>,
    #[multipart(rename = "fullName")]
    full_name: Option<Text<String>>,
    avatar: Option<TempFile>,
    #[multipart(rename = "coverImage")]
    cover_image: Option<TempFile>,
}

#[derive(MultipartForm)]
pub struct AvatarForm {
    avatar: Option<TempFile>,
}

#[derive(MultipartForm)]
pub struct CoverImageForm {
    #[multipart(rename = "coverImage")]
    cover_image: Option<TempFile>,
}

#[post("/register")]
async fn register(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<RegisterForm>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let username = v.required("username", text(&form.username)).to_lowercase();
    let email = v.email("email", text(&form.email));
    let password = v.required("password", text(&form.password));
    let full_name = v.required("fullName", text(&form.full_name));
    v.require_present("avatar", &form.avatar);
    v.finish()?;

    if state.users.find_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict("User with this username already exists".into()));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".into()));
    }

    let password_hash = auth::hash_password(password, state.auth.bcrypt_cost).await?;

    let avatar = match &form.avatar {
        Some(file) => state.media.upload(&local_file(file), MediaKind::Image).await?.url,
        None => return Err(ApiError::BadRequest("avatar file is required".into())),
    };
    let cover_image = match &form.cover_image {
        Some(file) => match state.media.upload(&local_file(file), MediaKind::Image).await {
            Ok(uploaded) => uploaded.url,
            Err(e) => {
                discard_uploads(&state, &[avatar.as_str()]).await;
                return Err(e.into());
            }
        },
        None => String::new(),
    };

    let created = state
        .users
        .create(NewUser {
            username,
            email,
            full_name,
            avatar: avatar.clone(),
            cover_image: cover_image.clone(),
            password_hash,
        })
        .await;
    let user = match created {
        Ok(user) => user,
        Err(e) => {
            discard_uploads(&state, &[avatar.as_str(), cover_image.as_str()]).await;
            return Err(e.into());
        }
    };

    info!("Registered user {} ({})", user.username, user.id);
    Ok(ApiResponse::ok(user, "User registered successfully"))
}

#[post("/login")]
async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let mut v = Validator::new();
    let username = v.optional(body.username.as_deref()).map(|u| u.to_lowercase());
    let email = v.optional(body.email.as_deref()).map(|e| e.to_lowercase());
    let password = v.required("password", body.password.as_deref());
    v.check(
        username.is_some() || email.is_some(),
        "username",
        "required",
        "username or email is required",
    );
    v.finish()?;

    let user = match (&username, &email) {
        (Some(username), _) => state.users.find_by_username(username).await?,
        (None, Some(email)) => state.users.find_by_email(email).await?,
        (None, None) => None,
    }
    .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

    let secrets = state
        .users
        .find_secrets(&user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;
    if !auth::verify_password(password, secrets.password_hash).await? {
        return Err(ApiError::Unauthorized("Invalid user credentials".into()));
    }

    let tokens = auth::issue_tokens(&state.auth, &user)?;
    state
        .users
        .set_refresh_token(&user.id, Some(&tokens.refresh_token))
        .await?;

    let mut builder = HttpResponse::Ok();
    for cookie in auth::session_cookies(&state.auth, &tokens) {
        builder.cookie(cookie);
    }
    let data = json!({
        "user": user,
        "accessToken": tokens.access_token,
        "refreshToken": tokens.refresh_token,
    });
    Ok(ApiResponse::new(StatusCode::OK, data, "User logged in successfully")
        .into_response(builder))
}

#[post("/refresh-token")]
async fn refresh_token(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
) -> Result<HttpResponse, ApiError> {
    let incoming = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .ok_or_else(|| ApiError::Unauthorized("unauthorized request".into()))?;

    let claims = auth::verify_refresh(&state.auth, &incoming).map_err(|e| {
        debug!("Rejected refresh token: {}", e);
        ApiError::Unauthorized("Invalid refresh token".into())
    })?;
    let user = state
        .users
        .find(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

    let tokens = auth::issue_tokens(&state.auth, &user)?;
    let rotated = state
        .users
        .rotate_refresh_token(&user.id, &incoming, &tokens.refresh_token)
        .await?;
    if !rotated {
        return Err(ApiError::Unauthorized("Refresh token is expired or used".into()));
    }

    let mut builder = HttpResponse::Ok();
    for cookie in auth::session_cookies(&state.auth, &tokens) {
        builder.cookie(cookie);
    }
    Ok(ApiResponse::new(StatusCode::OK, tokens, "Access token refreshed")
        .into_response(builder))
}

#[post("/logout")]
async fn logout(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    state.users.set_refresh_token(user.id(), None).await?;

    let mut builder = HttpResponse::Ok();
    for cookie in auth::cleared_cookies(&state.auth) {
        builder.cookie(cookie);
    }
    Ok(ApiResponse::new(StatusCode::OK, empty(), "User logged out")
        .into_response(builder))
}

#[post("/update-password")]
async fn update_password(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<PasswordChangeRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let current = v.required("currentPassword", body.current_password.as_deref());
    let new_password = v.required("newPassword", body.new_password.as_deref());
    let confirm = v.required("confirmNewPassword", body.confirm_new_password.as_deref());
    v.check(
        new_password.is_empty() || confirm.is_empty() || new_password == confirm,
        "confirmNewPassword",
        "mismatch",
        "New password and confirmation do not match",
    );
    v.finish()?;

    let secrets = state
        .users
        .find_secrets(user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;
    if !auth::verify_password(current, secrets.password_hash).await? {
        return Err(ApiError::BadRequest("Invalid password".into()));
    }

    let hash = auth::hash_password(new_password, state.auth.bcrypt_cost).await?;
    state.users.set_password(user.id(), &hash).await?;
    Ok(ApiResponse::ok(empty(), "Password changed successfully"))
}

#[post("/update-user-info")]
async fn update_account(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<AccountUpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let full_name = v.required("fullName", body.full_name.as_deref());
    let email = v.email("email", body.email.as_deref());
    v.finish()?;

    let updated = state
        .users
        .update_account(user.id(), &full_name, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;
    Ok(ApiResponse::ok(updated, "Account details updated successfully"))
}

#[post("/update-avatar")]
async fn update_avatar(
    state: web::Data<AppState>,
    user: CurrentUser,
    MultipartForm(form): MultipartForm<AvatarForm>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.require_present("avatar", &form.avatar);
    v.finish()?;
    let file = match &form.avatar {
        Some(file) => local_file(file),
        None => return Err(ApiError::BadRequest("avatar file is required".into())),
    };

    let uploaded = state.media.upload(&file, MediaKind::Image).await?;
    let updated = state
        .users
        .set_avatar(user.id(), &uploaded.url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;
    state.media.delete_url(&user.0.avatar).await?;

    Ok(ApiResponse::ok(
        json!({ "avatar": updated.avatar }),
        "Avatar updated successfully",
    ))
}

#[post("/update-coverimage")]
async fn update_cover_image(
    state: web::Data<AppState>,
    user: CurrentUser,
    MultipartForm(form): MultipartForm<CoverImageForm>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.require_present("coverImage", &form.cover_image);
    v.finish()?;
    let file = match &form.cover_image {
        Some(file) => local_file(file),
        None => return Err(ApiError::BadRequest("coverImage file is required".into())),
    };

    let uploaded = state.media.upload(&file, MediaKind::Image).await?;
    let updated = state
        .users
        .set_cover_image(user.id(), &uploaded.url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;
    state.media.delete_url(&user.0.cover_image).await?;

    Ok(ApiResponse::ok(
        json!({ "coverImage": updated.cover_image }),
        "Cover image updated successfully",
    ))
}

#[get("/getcurrentuser")]
async fn current_user(user: CurrentUser) -> HttpResponse {
    ApiResponse::ok(user.0, "User fetched successfully")
}

#[get("/channel/{username}")]
async fn channel_profile(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let username = path.into_inner().trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is missing".into()));
    }

    let channel = state
        .users
        .channel_profile(&username, user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".into()))?;
    Ok(ApiResponse::ok(channel, "Channel fetched successfully"))
}

#[get("/watch-history")]
async fn watch_history(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let history = state.users.watch_history(user.id()).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(refresh_token)
        .service(logout)
        .service(update_password)
        .service(update_account)
        .service(update_avatar)
        .service(update_cover_image)
        .service(current_user)
        .service(channel_profile)
        .service(watch_history);
}
