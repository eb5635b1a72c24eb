//! Author profile entity, keyed by the user's id.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub rating: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for portal_core::domain::Author {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            rating: model.rating,
        }
    }
}

impl From<portal_core::domain::Author> for ActiveModel {
    fn from(author: portal_core::domain::Author) -> Self {
        Self {
            user_id: Set(author.user_id),
            rating: Set(author.rating),
        }
    }
}
