//! Reader subscriptions to categories and authors.

use uuid::Uuid;

use super::Repositories;
use crate::domain::{SubscriptionAction, SubscriptionTarget};
use crate::error::DomainError;

pub struct SubscriptionService {
    repos: Repositories,
}

impl SubscriptionService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Subscribe or unsubscribe. Both directions are idempotent.
    pub async fn apply(
        &self,
        user_id: Uuid,
        action: SubscriptionAction,
        target: SubscriptionTarget,
        target_id: Uuid,
    ) -> Result<(), DomainError> {
        match target {
            SubscriptionTarget::Category => {
                let categories = &self.repos.categories;
                if categories.find_by_id(target_id).await?.is_none() {
                    return Err(DomainError::NotFound {
                        entity_type: "Category",
                        id: target_id,
                    });
                }
                match action {
                    SubscriptionAction::Subscribe => {
                        categories.add_subscriber(target_id, user_id).await?
                    }
                    SubscriptionAction::Unsubscribe => {
                        categories.remove_subscriber(target_id, user_id).await?
                    }
                }
            }
            SubscriptionTarget::Author => {
                let authors = &self.repos.authors;
                if authors.find_by_id(target_id).await?.is_none() {
                    return Err(DomainError::NotFound {
                        entity_type: "Author",
                        id: target_id,
                    });
                }
                match action {
                    SubscriptionAction::Subscribe => {
                        authors.add_subscriber(target_id, user_id).await?
                    }
                    SubscriptionAction::Unsubscribe => {
                        authors.remove_subscriber(target_id, user_id).await?
                    }
                }
            }
        }

        tracing::info!(
            user_id = %user_id,
            ?action,
            ?target,
            target_id = %target_id,
            "Subscription changed"
        );
        Ok(())
    }
}
