//! Domain entities - the core business objects.

mod author;
mod category;
mod censor;
mod comment;
mod post;
mod subscription;
mod user;

pub use author::{Author, POST_SCORE_WEIGHT, RatingComponents};
pub use category::Category;
pub use censor::Censor;
pub use comment::Comment;
pub use post::{MAX_TITLE_CHARS, PREVIEW_CHARS, Post, PostKind, PostKindConfig, preview_of};
pub use subscription::{SubscriptionAction, SubscriptionTarget};
pub use user::User;
