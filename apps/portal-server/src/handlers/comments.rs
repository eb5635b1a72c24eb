//! Comment handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use portal_core::domain::Comment;
use portal_shared::dto::{CommentRequest, CommentResponse, ScoreResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn comment_response(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        user_id: comment.user_id,
        text: comment.text,
        score: comment.score,
        created_at: comment.created_at,
    }
}

/// GET /api/posts/{id}/comments
pub async fn list(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let comments = state.comments.list(path.into_inner()).await?;
    let body: Vec<CommentResponse> = comments.into_iter().map(comment_response).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /api/posts/{id}/comments
pub async fn add(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .add(identity.user_id, path.into_inner(), body.into_inner().text)
        .await?;
    Ok(HttpResponse::Created().json(comment_response(comment)))
}

/// POST /api/comments/{id}/like
pub async fn like(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let score = state.comments.like(id).await?;
    Ok(HttpResponse::Ok().json(ScoreResponse { id, score }))
}

/// POST /api/comments/{id}/dislike
pub async fn dislike(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let score = state.comments.dislike(id).await?;
    Ok(HttpResponse::Ok().json(ScoreResponse { id, score }))
}
