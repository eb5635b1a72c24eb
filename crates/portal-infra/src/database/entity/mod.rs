//! SeaORM entities for the portal schema.

pub mod author;
pub mod author_subscriber;
pub mod category;
pub mod category_subscriber;
pub mod comment;
pub mod post;
pub mod post_category;
pub mod user;
