/// User endpoints: registration, login, profile, password reset
///
/// # Endpoints
///
/// - `POST /api/users` - Register (public)
/// - `POST /api/users/login` - Login and get a token (public, rate-limited)
/// - `POST /api/users/forgot-password` - Issue a reset token (public)
/// - `POST /api/users/reset-password` - Redeem a reset token (public)
/// - `GET /api/users` - List users (admin)
/// - `GET /api/users/me` - Current profile
/// - `PUT /api/users/update-profile` - Partial profile update
/// - `POST /api/users/upload-avatar` - Multipart avatar upload

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
    uploads,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tasksphere_shared::{
    auth::{
        authorization::require_admin,
        jwt::{create_token, Claims},
        middleware::CurrentUser,
        password::{hash_password, verify_password},
        reset::{generate_reset_token, hash_reset_token},
    },
    models::user::{CreateUser, UpdateUser, User, UserProfile},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    /// Password
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    pub password: String,
}

/// Profile plus a freshly issued bearer token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserProfile,

    /// Bearer token for subsequent requests
    pub token: String,
}

/// Partial profile update request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,

    /// Required when `new_password` is set
    pub old_password: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: Option<String>,
}

/// Forgot-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
}

/// Forgot-password response
///
/// Email delivery is simulated: the token is returned in the response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub reset_token: String,
}

/// Reset-password request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// Message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Avatar upload response
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub message: String,
    pub avatar: String,
}

/// Registers a new user
///
/// # Errors
///
/// - `400 Bad Request`: missing/invalid fields, or the email is taken
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    let token = create_token(&Claims::new(user.id), state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// Authenticates a user and issues a token
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password
/// - `429 Too Many Requests`: rate limit exceeded
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = create_token(&Claims::new(user.id), state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// Lists all users (admin only), password hashes excluded
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    require_admin(&current)?;

    let users = User::list(&state.db).await?;

    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// Returns the authenticated user's profile
pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(current)
}

/// Applies a partial profile update
///
/// Changing the password requires the current one.
///
/// # Errors
///
/// - `400 Bad Request`: validation failure or wrong old password
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    req.validate()?;

    let user = User::find_by_id(&state.db, current.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let mut update = UpdateUser {
        name: req.name,
        email: req.email,
        password_hash: None,
    };

    if let Some(new_password) = req.new_password {
        let old_password = req.old_password.unwrap_or_default();
        if !verify_password(&old_password, &user.password_hash)? {
            return Err(ApiError::BadRequest("Old password is incorrect".to_string()));
        }
        update.password_hash = Some(hash_password(&new_password)?);
    }

    let updated = User::update(&state.db, current.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(updated.into()))
}

/// Accepts a multipart avatar upload (field `avatar`)
///
/// The file passes the shared upload policy (jpg/jpeg/png/pdf, 2 MB) and is
/// stored under `<upload_dir>/avatars/`.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let mut stored: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|f| f.to_string())
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

        let data = field.bytes().await?;
        let path =
            uploads::store_upload(&state.config.uploads.dir, "avatars", &filename, data).await?;

        stored = Some(path);
        break;
    }

    let avatar = stored.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    User::set_avatar(&state.db, current.id, &avatar).await?;

    Ok(Json(AvatarResponse {
        message: "Avatar uploaded".to_string(),
        avatar,
    }))
}

/// Issues a password-reset token
///
/// The token's digest and a 15-minute expiry land on the user row; the token
/// itself is returned in the response (stand-in for email delivery).
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<ForgotPasswordResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let reset = generate_reset_token();

    User::set_reset_token(&state.db, user.id, &reset.token_hash, reset.expires_at).await?;

    Ok(Json(ForgotPasswordResponse {
        message: "Password reset token generated".to_string(),
        reset_token: reset.token,
    }))
}

/// Redeems a reset token and sets a new password
///
/// # Errors
///
/// - `400 Bad Request`: unknown or expired token
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = User::find_by_reset_token(&state.db, &hash_reset_token(&req.token))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired token".to_string()))?;

    let password_hash = hash_password(&req.new_password)?;
    User::reset_password(&state.db, user.id, &password_hash).await?;

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}
