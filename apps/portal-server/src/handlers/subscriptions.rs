//! Subscribe to or unsubscribe from a category or an author.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use portal_core::domain::{SubscriptionAction, SubscriptionTarget};
use portal_shared::dto::SubscriptionResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/subscriptions/{action}/{target}/{id}
///
/// `action` is `subscribe` or `unsubscribe`, `target` is `category` or
/// `author`. Repeating a request changes nothing.
pub async fn toggle(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(String, String, Uuid)>,
) -> AppResult<HttpResponse> {
    let (action, target, target_id) = path.into_inner();
    let action: SubscriptionAction = action.parse().map_err(AppError::BadRequest)?;
    let target: SubscriptionTarget = target.parse().map_err(AppError::BadRequest)?;

    state
        .subscriptions
        .apply(identity.user_id, action, target, target_id)
        .await?;

    Ok(HttpResponse::Ok().json(SubscriptionResponse {
        action: match action {
            SubscriptionAction::Subscribe => "subscribe",
            SubscriptionAction::Unsubscribe => "unsubscribe",
        }
        .to_string(),
        target: match target {
            SubscriptionTarget::Category => "category",
            SubscriptionTarget::Author => "author",
        }
        .to_string(),
        target_id,
    }))
}
