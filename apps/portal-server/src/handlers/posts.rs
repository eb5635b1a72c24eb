//! Post handlers.

use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use uuid::Uuid;

use portal_core::domain::{Censor, PREVIEW_CHARS, Post, PostKind, preview_of};
use portal_core::ports::{PageRequest, PostFilter};
use portal_core::services::{NewPost, PostEdit};
use portal_shared::PageResponse;
use portal_shared::dto::{
    CreatePostRequest, NewPostFormResponse, PostResponse, PostSearchQuery, PostTypeQuery,
    ScoreResponse, UpdatePostRequest,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Wire form of a post with banned words masked.
pub(crate) fn post_response(post: Post, censor: &Censor) -> PostResponse {
    let content = censor.apply(&post.content);
    PostResponse {
        preview: preview_of(&content, PREVIEW_CHARS),
        id: post.id,
        author_id: post.author_id,
        kind: post.kind.slug().to_string(),
        title: censor.apply(&post.title),
        content,
        score: post.score,
        category_ids: post.category_ids,
        created_at: post.created_at,
    }
}

pub(crate) fn search_filter(query: &PostSearchQuery) -> PostFilter {
    let non_blank = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    PostFilter {
        title: non_blank(&query.title),
        author_username: non_blank(&query.author),
        published_after: query
            .date_after
            .map(|day| day.and_time(NaiveTime::MIN).and_utc()),
        category_id: query.category,
    }
}

pub(crate) fn page_request(query: &PostSearchQuery) -> PageRequest {
    PageRequest::new(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(PageRequest::DEFAULT_PER_PAGE),
    )
}

pub(crate) async fn search_page(
    state: &AppState,
    filter: PostFilter,
    page: PageRequest,
) -> AppResult<PageResponse<PostResponse>> {
    let found = state.posts.search(&filter, page).await?;
    Ok(PageResponse::new(
        found
            .items
            .into_iter()
            .map(|post| post_response(post, &state.censor))
            .collect(),
        found.total,
        found.page,
        found.per_page,
    ))
}

fn parse_kind(raw: &str) -> AppResult<PostKind> {
    raw.parse().map_err(AppError::BadRequest)
}

/// GET /api/posts
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<PostSearchQuery>,
) -> AppResult<HttpResponse> {
    let page = search_page(&state, search_filter(&query), page_request(&query)).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/posts/new?type=news|article
///
/// Labels of the create form and the caller's remaining allowance.
pub async fn new_form(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PostTypeQuery>,
) -> AppResult<HttpResponse> {
    let kind = match query.kind.as_deref() {
        Some(raw) => parse_kind(raw)?,
        None => PostKind::News,
    };
    let allowance = state
        .posts
        .allowance(identity.user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("You are not registered as an author".to_string()))?;

    let config = kind.config();
    Ok(HttpResponse::Ok().json(NewPostFormResponse {
        kind: config.slug.to_string(),
        display_name: config.display_name.to_string(),
        content_label: config.content_label.to_string(),
        allowed: allowance.allowed,
        remaining: allowance.remaining,
        retry_after_secs: allowance.reset_after.as_secs(),
    }))
}

/// POST /api/posts
///
/// Subscribers are notified once the post is stored; a failed notification
/// never fails the request.
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let kind = parse_kind(&req.kind)?;

    let post = state
        .posts
        .create(
            identity.user_id,
            NewPost {
                kind,
                title: req.title,
                content: req.content,
                category_ids: req.category_ids,
            },
        )
        .await?;

    state.delivery.post_published(&post).await;

    Ok(HttpResponse::Created().json(post_response(post, &state.censor)))
}

/// GET /api/posts/{id}
pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = state.posts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post_response(post, &state.censor)))
}

/// PUT /api/posts/{kind}/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(String, Uuid)>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let (kind, id) = path.into_inner();
    let kind = route_kind(&kind, id)?;
    let req = body.into_inner();

    let post = state
        .posts
        .update(
            identity.user_id,
            kind,
            id,
            PostEdit {
                title: req.title,
                content: req.content,
                category_ids: req.category_ids,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(post_response(post, &state.censor)))
}

/// DELETE /api/posts/{kind}/{id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(String, Uuid)>,
) -> AppResult<HttpResponse> {
    let (kind, id) = path.into_inner();
    let kind = route_kind(&kind, id)?;

    state.posts.delete(identity.user_id, kind, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{id}/like
pub async fn like(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let score = state.posts.like(id).await?;
    Ok(HttpResponse::Ok().json(ScoreResponse { id, score }))
}

/// POST /api/posts/{id}/dislike
pub async fn dislike(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let score = state.posts.dislike(id).await?;
    Ok(HttpResponse::Ok().json(ScoreResponse { id, score }))
}

/// An unknown kind segment reads as a missing post.
fn route_kind(raw: &str, id: Uuid) -> AppResult<PostKind> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Post with id {} not found", id)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    use crate::handlers::test_support::TestApp;
    use portal_core::domain::{Censor, SubscriptionAction, SubscriptionTarget};
    use portal_core::ports::PageRequest;

    #[actix_web::test]
    async fn create_notifies_subscribers_once() {
        let ctx = TestApp::new();
        let (alice, alice_token) = ctx.author("alice").await;
        let (u1, _) = ctx.reader("u1").await;
        let tech = ctx.category("Tech").await;
        ctx.state
            .subscriptions
            .apply(u1.id, SubscriptionAction::Subscribe, SubscriptionTarget::Category, tech.id)
            .await
            .unwrap();
        ctx.state
            .subscriptions
            .apply(u1.id, SubscriptionAction::Subscribe, SubscriptionTarget::Author, alice.id)
            .await
            .unwrap();
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", alice_token))
            .set_json(json!({
                "post_type": "news",
                "title": "Rust 2.0 released",
                "content": "Big news today.",
                "category_ids": [tech.id]
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let inbox = ctx.mailbox.inbox("u1@example.com").await;
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].subject, "Rust 2.0 released");
    }

    #[actix_web::test]
    async fn fourth_post_of_the_day_is_rejected_with_post_type() {
        let ctx = TestApp::new();
        let (_, token) = ctx.author("alice").await;
        let app = test::init_service(ctx.app()).await;

        for i in 0..3 {
            let req = test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(("Authorization", token.clone()))
                .set_json(json!({
                    "kind": "article",
                    "title": format!("A{}", i),
                    "content": "text"
                }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", token.clone()))
            .set_json(json!({ "kind": "article", "title": "A3", "content": "text" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key("retry-after"));
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["post_type"], "article");

        let req = test::TestRequest::get()
            .uri("/api/posts/new?type=article")
            .insert_header(("Authorization", token))
            .to_request();
        let form: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(form["allowed"], false);
        assert_eq!(form["remaining"], 0);
        assert_eq!(form["content_label"], "Article text:");
    }

    #[actix_web::test]
    async fn readers_cannot_post() {
        let ctx = TestApp::new();
        let (_, token) = ctx.reader("reader").await;
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", token.clone()))
            .set_json(json!({ "kind": "news", "title": "Hi", "content": "text" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/posts/new")
            .insert_header(("Authorization", token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn edit_and_delete_follow_kind_and_owner() {
        let ctx = TestApp::new();
        let (_, alice) = ctx.author("alice").await;
        let (_, bob) = ctx.author("bob").await;
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({ "kind": "news", "title": "Draft", "content": "v1" }))
            .to_request();
        let created: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();

        let edit = json!({ "title": "Final", "content": "v2" });

        let req = test::TestRequest::put()
            .uri(&format!("/api/posts/articles/{}", id))
            .insert_header(("Authorization", alice.clone()))
            .set_json(&edit)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri(&format!("/api/posts/news/{}", id))
            .insert_header(("Authorization", bob.clone()))
            .set_json(&edit)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri(&format!("/api/posts/news/{}", id))
            .insert_header(("Authorization", alice.clone()))
            .set_json(&edit)
            .to_request();
        let updated: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["title"], "Final");
        assert_eq!(updated["created_at"], created["created_at"]);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/posts/news/{}", id))
            .insert_header(("Authorization", alice))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{}", id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn votes_and_search() {
        let ctx = TestApp::new();
        let (_, alice) = ctx.author("alice").await;
        let (_, reader) = ctx.reader("reader").await;
        let app = test::init_service(ctx.app()).await;

        for title in ["Rust tips", "Go tips", "rust news"] {
            let req = test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(("Authorization", alice.clone()))
                .set_json(json!({ "kind": "news", "title": title, "content": "text" }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get()
            .uri("/api/posts?title=RUST&author=ali")
            .to_request();
        let page: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 2);
        let id = page["items"][0]["id"].as_str().unwrap().to_string();

        for path in ["like", "like", "dislike"] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/posts/{}/{}", id, path))
                .insert_header(("Authorization", reader.clone()))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{}", id))
            .to_request();
        let post: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(post["score"], 1);
    }

    #[actix_web::test]
    async fn banned_words_are_masked_in_responses() {
        let mut ctx = TestApp::new();
        ctx.state.censor = Censor::from_list("darn");
        let (_, alice) = ctx.author("alice").await;
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", alice))
            .set_json(json!({
                "kind": "news",
                "title": "Darn weather",
                "content": "darn rain again"
            }))
            .to_request();
        let created: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["title"], "**** weather");
        assert_eq!(created["content"], "**** rain again");
        assert_eq!(created["preview"], "**** rain again");

        // Stored text is untouched; only the served copy is masked.
        let id = created["id"].as_str().unwrap().parse().unwrap();
        let stored = ctx.state.posts.get(id).await.unwrap();
        assert_eq!(stored.title, "Darn weather");
    }

    #[actix_web::test]
    async fn huge_page_number_returns_an_empty_page() {
        let ctx = TestApp::new();
        let (_, alice) = ctx.author("alice").await;
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", alice))
            .set_json(json!({ "kind": "news", "title": "Only one", "content": "text" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts?page={}", u64::MAX))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let page: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["page"], PageRequest::MAX_PAGE);
        assert!(page["items"].as_array().unwrap().is_empty());
    }
}
