//! Author listing and profiles.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use portal_shared::dto::{AuthorDetailResponse, AuthorResponse, RatingBreakdown};

use super::posts::post_response;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/authors
///
/// Ordered by the last computed rating.
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let authors = state.authors.list().await?;
    let body: Vec<AuthorResponse> = authors
        .into_iter()
        .map(|(author, user)| AuthorResponse {
            user_id: author.user_id,
            username: user.username,
            rating: author.rating,
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/authors/{id}
///
/// Recomputes the rating before answering.
pub async fn detail(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let profile = state.authors.profile(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(AuthorDetailResponse {
        user_id: profile.author.user_id,
        username: profile.user.username,
        rating: profile.author.rating,
        breakdown: RatingBreakdown {
            post_scores: profile.components.post_scores,
            own_comment_scores: profile.components.own_comment_scores,
            received_comment_scores: profile.components.received_comment_scores,
        },
        posts: profile
            .posts
            .into_iter()
            .map(|post| post_response(post, &state.censor))
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use uuid::Uuid;

    use crate::handlers::test_support::TestApp;
    use portal_core::domain::PostKind;
    use portal_core::services::NewPost;

    #[actix_web::test]
    async fn detail_refreshes_rating() {
        let ctx = TestApp::new();
        let (alice, _) = ctx.author("alice").await;
        let (bob, _) = ctx.reader("bob").await;
        let post = ctx
            .state
            .posts
            .create(
                alice.id,
                NewPost {
                    kind: PostKind::News,
                    title: "Scores".into(),
                    content: "text".into(),
                    category_ids: vec![],
                },
            )
            .await
            .unwrap();
        ctx.state.posts.like(post.id).await.unwrap();
        let comment = ctx
            .state
            .comments
            .add(bob.id, post.id, "nice".into())
            .await
            .unwrap();
        ctx.state.comments.like(comment.id).await.unwrap();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/authors/{}", alice.id))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rating"], 4);
        assert_eq!(body["breakdown"]["post_scores"], 1);
        assert_eq!(body["breakdown"]["received_comment_scores"], 1);
        assert_eq!(body["posts"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri("/api/authors").to_request();
        let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list[0]["username"], "alice");
        assert_eq!(list[0]["rating"], 4);
    }

    #[actix_web::test]
    async fn unknown_author_is_not_found() {
        let ctx = TestApp::new();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/authors/{}", Uuid::new_v4()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
