//! Post entity for SeaORM. Category links live in [`super::post_category`].

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use portal_core::domain::{Post, PostKind};
use portal_core::error::RepoError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub author_id: Uuid,
    /// Two-letter kind code, `NW` or `AR`.
    pub kind: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub score: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::AuthorId",
        to = "super::author::Column::UserId",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_domain(self, category_ids: Vec<Uuid>) -> Result<Post, RepoError> {
        let kind = PostKind::from_code(&self.kind)
            .ok_or_else(|| RepoError::Query(format!("unknown post kind '{}'", self.kind)))?;

        Ok(Post {
            id: self.id,
            author_id: self.author_id,
            kind,
            title: self.title,
            content: self.content,
            score: self.score,
            category_ids,
            created_at: self.created_at.into(),
        })
    }
}

/// Full row for inserts. Category ids are written separately.
impl From<&Post> for ActiveModel {
    fn from(post: &Post) -> Self {
        Self {
            id: Set(post.id),
            author_id: Set(post.author_id),
            kind: Set(post.kind.code().to_string()),
            title: Set(post.title.clone()),
            content: Set(post.content.clone()),
            score: Set(post.score),
            created_at: Set(post.created_at.into()),
        }
    }
}
