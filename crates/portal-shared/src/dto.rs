//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a new reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    /// Optional; readers without an address receive no mail.
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// A user's public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_author: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Body of `POST /api/posts`. `kind` is `news` or `article`; the form field
/// name `post_type` is accepted too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[serde(alias = "post_type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub kind: String,
    pub title: String,
    pub content: String,
    /// First 150 characters of the content.
    pub preview: String,
    pub score: i64,
    pub category_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Query string of `GET /api/posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostSearchQuery {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Case-insensitive substring of the author's username.
    pub author: Option<String>,
    /// Posts published on or after this day (UTC).
    pub date_after: Option<NaiveDate>,
    pub category: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Query string of `GET /api/posts/new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTypeQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// What the create form for a post kind needs: its labels and whether the
/// caller may publish right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPostFormResponse {
    pub kind: String,
    pub display_name: String,
    pub content_label: String,
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub id: Uuid,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub user_id: Uuid,
    pub username: String,
    pub rating: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingBreakdown {
    pub post_scores: i64,
    pub own_comment_scores: i64,
    pub received_comment_scores: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorDetailResponse {
    pub user_id: Uuid,
    pub username: String,
    pub rating: i64,
    pub breakdown: RatingBreakdown,
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub action: String,
    pub target: String,
    pub target_id: Uuid,
}
