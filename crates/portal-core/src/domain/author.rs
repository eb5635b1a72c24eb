use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weight of the author's own post scores in the rating.
pub const POST_SCORE_WEIGHT: i64 = 3;

/// Author profile, one-to-one with a [`User`](super::User) and keyed by the
/// user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub user_id: Uuid,
    /// Cached value of [`RatingComponents::rating`]; refreshed on demand.
    pub rating: i64,
}

impl Author {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id, rating: 0 }
    }
}

/// The three aggregates an author's rating is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingComponents {
    /// Sum of the scores of the author's posts.
    pub post_scores: i64,
    /// Sum of the scores of comments the author wrote anywhere.
    pub own_comment_scores: i64,
    /// Sum of the scores of comments left under the author's posts.
    pub received_comment_scores: i64,
}

impl RatingComponents {
    pub fn rating(&self) -> i64 {
        POST_SCORE_WEIGHT * self.post_scores
            + self.own_comment_scores
            + self.received_comment_scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_weights_post_scores_three_times() {
        let components = RatingComponents {
            post_scores: 4,
            own_comment_scores: -2,
            received_comment_scores: 5,
        };
        assert_eq!(components.rating(), 15);
        assert_eq!(RatingComponents::default().rating(), 0);
    }
}
