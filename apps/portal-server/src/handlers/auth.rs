//! Authentication handlers.

use actix_web::{HttpResponse, web};

use portal_core::domain::User;
use portal_core::ports::{ROLE_AUTHOR, ROLE_READER, ROLE_STAFF};
use portal_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    if username.is_empty() {
        return Err(AppError::Validation("Username must not be empty".to_string()));
    }
    if !email.is_empty() && !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    state.passwords.check_policy(&req.password)?;

    if state.repos.users.find_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let mut user = User::new(username, email, password_hash);
    user.first_name = req.first_name;
    user.last_name = req.last_name;
    let user = state.repos.users.save(user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(HttpResponse::Created().json(issue_token(&state, &user).await?))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .repos
        .users
        .find_by_username(req.username.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    match state.passwords.verify(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::Unauthorized),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            return Err(AppError::Unauthorized);
        }
    }

    Ok(HttpResponse::Ok().json(issue_token(&state, &user).await?))
}

/// GET /api/auth/me - Protected route
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state
        .repos
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let is_author = state.authors.is_author(user.id).await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_author,
        is_staff: user.is_staff,
        created_at: user.created_at,
    }))
}

/// POST /api/auth/become-author
///
/// Idempotent. Returns a fresh token carrying the author role.
pub async fn become_author(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    state.authors.become_author(identity.user_id).await?;

    let user = state
        .repos
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(issue_token(&state, &user).await?))
}

async fn issue_token(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let mut roles = vec![ROLE_READER.to_string()];
    if state.authors.is_author(user.id).await? {
        roles.push(ROLE_AUTHOR.to_string());
    }
    if user.is_staff {
        roles.push(ROLE_STAFF.to_string());
    }

    let token = state
        .tokens
        .generate_token(user.id, &user.username, roles)?;

    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    })
}
