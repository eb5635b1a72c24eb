//! Category handlers. Creating categories is reserved to staff.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use portal_core::domain::Category;
use portal_shared::dto::{CategoryRequest, CategoryResponse, PostSearchQuery};

use super::posts::{page_request, search_filter, search_page};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn category_response(category: Category) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        name: category.name,
    }
}

/// GET /api/categories
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let categories = state.repos.categories.list().await?;
    let body: Vec<CategoryResponse> = categories.into_iter().map(category_response).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /api/categories
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CategoryRequest>,
) -> AppResult<HttpResponse> {
    if !identity.is_staff() {
        return Err(AppError::Forbidden(
            "Only staff can create categories".to_string(),
        ));
    }

    let name = body.into_inner().name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Category name must not be empty".to_string()));
    }
    if state.repos.categories.find_by_name(&name).await?.is_some() {
        return Err(AppError::Conflict(format!("Category '{}' already exists", name)));
    }

    let category = state.repos.categories.save(Category::new(name)).await?;
    tracing::info!(category_id = %category.id, name = %category.name, "Category created");
    Ok(HttpResponse::Created().json(category_response(category)))
}

/// GET /api/categories/{id}/posts
///
/// Accepts the same filters as the post listing.
pub async fn posts(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PostSearchQuery>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if state.repos.categories.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Category with id {} not found", id)));
    }

    let mut filter = search_filter(&query);
    filter.category_id = Some(id);

    let page = search_page(&state, filter, page_request(&query)).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    use crate::handlers::test_support::TestApp;
    use portal_core::domain::PostKind;
    use portal_core::services::NewPost;

    #[actix_web::test]
    async fn only_staff_create_categories() {
        let ctx = TestApp::new();
        let (_, reader) = ctx.reader("reader").await;
        let (_, staff) = ctx.staff("editor").await;
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(("Authorization", reader))
            .set_json(json!({ "name": "Tech" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(("Authorization", staff.clone()))
            .set_json(json!({ "name": "Tech" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(("Authorization", staff))
            .set_json(json!({ "name": "Tech" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get().uri("/api/categories").to_request();
        let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn category_posts_are_filtered() {
        let ctx = TestApp::new();
        let (alice, _) = ctx.author("alice").await;
        let tech = ctx.category("Tech").await;
        let science = ctx.category("Science").await;
        for (title, category) in [("T1", tech.id), ("S1", science.id), ("T2", tech.id)] {
            ctx.state
                .posts
                .create(
                    alice.id,
                    NewPost {
                        kind: PostKind::News,
                        title: title.into(),
                        content: "text".into(),
                        category_ids: vec![category],
                    },
                )
                .await
                .unwrap();
        }
        let app = test::init_service(ctx.app()).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/categories/{}/posts", tech.id))
            .to_request();
        let page: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 2);
    }
}
