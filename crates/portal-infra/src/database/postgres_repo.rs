//! PostgreSQL repository implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, OnConflict, Query, SelectStatement, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbConn, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use portal_core::domain::{Author, Comment, Post, RatingComponents, User};
use portal_core::error::RepoError;
use portal_core::ports::{
    AuthorRepository, BaseRepository, CategoryRepository, CommentRepository, Page, PageRequest,
    PostFilter, PostRepository, UserRepository,
};
use portal_core::services::Repositories;

use super::entity::{
    author, author_subscriber, category, category_subscriber, comment, post, post_category, user,
};
use super::postgres_base::{PostgresBaseRepository, query_err, write_err};

pub type PostgresUserRepository = PostgresBaseRepository<user::Entity>;
pub type PostgresAuthorRepository = PostgresBaseRepository<author::Entity>;
pub type PostgresCategoryRepository = PostgresBaseRepository<category::Entity>;
pub type PostgresCommentRepository = PostgresBaseRepository<comment::Entity>;

/// Wire every repository to one shared connection pool.
pub fn postgres_repositories(db: Arc<DbConn>) -> Repositories {
    Repositories {
        users: Arc::new(PostgresUserRepository::new(db.clone())),
        authors: Arc::new(PostgresAuthorRepository::new(db.clone())),
        categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
        posts: Arc::new(PostgresPostRepository::new(db.clone())),
        comments: Arc::new(PostgresCommentRepository::new(db)),
    }
}

/// Case-insensitive substring match on `col`.
fn icontains<C>(col: C, needle: &str) -> SimpleExpr
where
    C: sea_orm::sea_query::IntoColumnRef,
{
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(col))).like(format!("%{}%", escaped))
}

/// `post_id` of every post filed under the category.
fn posts_in_category(category_id: Uuid) -> SelectStatement {
    Query::select()
        .column(post_category::Column::PostId)
        .from(post_category::Entity)
        .and_where(post_category::Column::CategoryId.eq(category_id))
        .to_owned()
}

/// `SUM(score)` over the selected rows as BIGINT, zero when empty.
fn score_sum(table: &str) -> SimpleExpr {
    Expr::cust(format!("COALESCE(SUM(\"{}\".\"score\"), 0)::BIGINT", table))
}

async fn users_in(db: &DbConn, subquery: SelectStatement) -> Result<Vec<User>, RepoError> {
    let users = user::Entity::find()
        .filter(user::Column::Id.in_subquery(subquery))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
        .map_err(query_err)?;
    Ok(users.into_iter().map(Into::into).collect())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let result = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl AuthorRepository for PostgresAuthorRepository {
    async fn list(&self) -> Result<Vec<Author>, RepoError> {
        let authors = author::Entity::find()
            .order_by_desc(author::Column::Rating)
            .all(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(authors.into_iter().map(Into::into).collect())
    }

    async fn subscribers(&self, author_id: Uuid) -> Result<Vec<User>, RepoError> {
        let subquery = Query::select()
            .column(author_subscriber::Column::UserId)
            .from(author_subscriber::Entity)
            .and_where(author_subscriber::Column::AuthorId.eq(author_id))
            .to_owned();
        users_in(&*self.db, subquery).await
    }

    async fn add_subscriber(&self, author_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        author_subscriber::Entity::insert(author_subscriber::ActiveModel {
            author_id: Set(author_id),
            user_id: Set(user_id),
        })
        .on_conflict(
            OnConflict::columns([
                author_subscriber::Column::AuthorId,
                author_subscriber::Column::UserId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&*self.db)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn remove_subscriber(&self, author_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        author_subscriber::Entity::delete_many()
            .filter(author_subscriber::Column::AuthorId.eq(author_id))
            .filter(author_subscriber::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn rating_components(&self, author_id: Uuid) -> Result<RatingComponents, RepoError> {
        let post_scores: Option<i64> = post::Entity::find()
            .select_only()
            .column_as(score_sum("posts"), "total")
            .filter(post::Column::AuthorId.eq(author_id))
            .into_tuple()
            .one(&*self.db)
            .await
            .map_err(query_err)?;

        let own_comment_scores: Option<i64> = comment::Entity::find()
            .select_only()
            .column_as(score_sum("comments"), "total")
            .filter(comment::Column::UserId.eq(author_id))
            .into_tuple()
            .one(&*self.db)
            .await
            .map_err(query_err)?;

        let authored_posts = Query::select()
            .column(post::Column::Id)
            .from(post::Entity)
            .and_where(post::Column::AuthorId.eq(author_id))
            .to_owned();
        let received_comment_scores: Option<i64> = comment::Entity::find()
            .select_only()
            .column_as(score_sum("comments"), "total")
            .filter(comment::Column::PostId.in_subquery(authored_posts))
            .into_tuple()
            .one(&*self.db)
            .await
            .map_err(query_err)?;

        Ok(RatingComponents {
            post_scores: post_scores.unwrap_or(0),
            own_comment_scores: own_comment_scores.unwrap_or(0),
            received_comment_scores: received_comment_scores.unwrap_or(0),
        })
    }

    async fn store_rating(&self, author_id: Uuid, rating: i64) -> Result<(), RepoError> {
        let result = author::Entity::update_many()
            .col_expr(author::Column::Rating, Expr::value(rating))
            .filter(author::Column::UserId.eq(author_id))
            .exec(&*self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn list(&self) -> Result<Vec<portal_core::domain::Category>, RepoError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(categories.into_iter().map(Into::into).collect())
    }

    async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<portal_core::domain::Category>, RepoError> {
        let result = category::Entity::find()
            .filter(category::Column::Name.eq(name))
            .one(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(result.map(Into::into))
    }

    async fn subscribers(&self, category_id: Uuid) -> Result<Vec<User>, RepoError> {
        let subquery = Query::select()
            .column(category_subscriber::Column::UserId)
            .from(category_subscriber::Entity)
            .and_where(category_subscriber::Column::CategoryId.eq(category_id))
            .to_owned();
        users_in(&*self.db, subquery).await
    }

    async fn add_subscriber(&self, category_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        category_subscriber::Entity::insert(category_subscriber::ActiveModel {
            category_id: Set(category_id),
            user_id: Set(user_id),
        })
        .on_conflict(
            OnConflict::columns([
                category_subscriber::Column::CategoryId,
                category_subscriber::Column::UserId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&*self.db)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn remove_subscriber(
        &self,
        category_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), RepoError> {
        category_subscriber::Entity::delete_many()
            .filter(category_subscriber::Column::CategoryId.eq(category_id))
            .filter(category_subscriber::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let comments = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    async fn adjust_score(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        let result = comment::Entity::update_many()
            .col_expr(
                comment::Column::Score,
                Expr::col(comment::Column::Score).add(delta),
            )
            .filter(comment::Column::Id.eq(id))
            .exec(&*self.db)
            .await
            .map_err(query_err)?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        let score: Option<i64> = comment::Entity::find_by_id(id)
            .select_only()
            .column(comment::Column::Score)
            .into_tuple()
            .one(&*self.db)
            .await
            .map_err(query_err)?;
        score.ok_or(RepoError::NotFound)
    }
}

/// Posts plus their category links in `post_categories`.
pub struct PostgresPostRepository {
    db: Arc<DbConn>,
}

impl PostgresPostRepository {
    pub fn new(db: impl Into<Arc<DbConn>>) -> Self {
        Self { db: db.into() }
    }

    /// Load the category links of `models` in one query and build posts.
    async fn with_categories<C: ConnectionTrait>(
        db: &C,
        models: Vec<post::Model>,
    ) -> Result<Vec<Post>, RepoError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let links = post_category::Entity::find()
            .filter(post_category::Column::PostId.is_in(ids))
            .all(db)
            .await
            .map_err(query_err)?;

        let mut by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in links {
            by_post.entry(link.post_id).or_default().push(link.category_id);
        }

        models
            .into_iter()
            .map(|m| {
                let categories = by_post.remove(&m.id).unwrap_or_default();
                m.into_domain(categories)
            })
            .collect()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for PostgresPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let Some(model) = post::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(query_err)?
        else {
            return Ok(None);
        };
        Ok(Self::with_categories(&*self.db, vec![model]).await?.pop())
    }

    /// Inserts a new post, or rewrites kind, title, content and categories of
    /// an existing one. Score and creation time are never overwritten.
    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(query_err)?;

        let exists = post::Entity::find_by_id(entity.id)
            .one(&txn)
            .await
            .map_err(query_err)?
            .is_some();

        if exists {
            post::ActiveModel {
                id: sea_orm::ActiveValue::Unchanged(entity.id),
                kind: Set(entity.kind.code().to_string()),
                title: Set(entity.title.clone()),
                content: Set(entity.content.clone()),
                ..Default::default()
            }
            .update(&txn)
            .await
            .map_err(write_err)?;

            post_category::Entity::delete_many()
                .filter(post_category::Column::PostId.eq(entity.id))
                .exec(&txn)
                .await
                .map_err(query_err)?;
        } else {
            post::ActiveModel::from(&entity)
                .insert(&txn)
                .await
                .map_err(write_err)?;
        }

        if !entity.category_ids.is_empty() {
            let links = entity
                .category_ids
                .iter()
                .map(|category_id| post_category::ActiveModel {
                    post_id: Set(entity.id),
                    category_id: Set(*category_id),
                });
            post_category::Entity::insert_many(links)
                .exec_without_returning(&txn)
                .await
                .map_err(write_err)?;
        }

        let model = post::Entity::find_by_id(entity.id)
            .one(&txn)
            .await
            .map_err(query_err)?
            .ok_or(RepoError::NotFound)?;
        let saved = Self::with_categories(&txn, vec![model])
            .await?
            .pop()
            .ok_or(RepoError::NotFound)?;

        txn.commit().await.map_err(query_err)?;
        Ok(saved)
    }

    /// Category links and comments go with the post through ON DELETE CASCADE.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = post::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(query_err)?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        let models = post::Entity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(query_err)?;
        Self::with_categories(&*self.db, models).await
    }

    async fn created_by_author_since(
        &self,
        author_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, RepoError> {
        let times: Vec<sea_orm::prelude::DateTimeWithTimeZone> = post::Entity::find()
            .select_only()
            .column(post::Column::CreatedAt)
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::CreatedAt.gte(since))
            .into_tuple()
            .all(&*self.db)
            .await
            .map_err(query_err)?;
        Ok(times.into_iter().map(Into::into).collect())
    }

    async fn find_by_category_since(
        &self,
        category_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Post>, RepoError> {
        let models = post::Entity::find()
            .filter(post::Column::Id.in_subquery(posts_in_category(category_id)))
            .filter(post::Column::CreatedAt.gte(since))
            .order_by_desc(post::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(query_err)?;
        Self::with_categories(&*self.db, models).await
    }

    async fn search(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let mut query = post::Entity::find();

        if let Some(title) = filter.title.as_deref().filter(|t| !t.is_empty()) {
            query = query.filter(icontains((post::Entity, post::Column::Title), title));
        }
        if let Some(username) = filter.author_username.as_deref().filter(|u| !u.is_empty()) {
            query = query
                .join(JoinType::InnerJoin, post::Relation::Author.def())
                .join(JoinType::InnerJoin, author::Relation::User.def())
                .filter(icontains((user::Entity, user::Column::Username), username));
        }
        if let Some(after) = filter.published_after {
            query = query.filter(post::Column::CreatedAt.gte(after));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(post::Column::Id.in_subquery(posts_in_category(category_id)));
        }

        let paginator = query
            .order_by_desc(post::Column::CreatedAt)
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await.map_err(query_err)?;
        let models = paginator
            .fetch_page(page.page - 1)
            .await
            .map_err(query_err)?;

        Ok(Page {
            items: Self::with_categories(&*self.db, models).await?,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn adjust_score(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        let result = post::Entity::update_many()
            .col_expr(post::Column::Score, Expr::col(post::Column::Score).add(delta))
            .filter(post::Column::Id.eq(id))
            .exec(&*self.db)
            .await
            .map_err(query_err)?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        let score: Option<i64> = post::Entity::find_by_id(id)
            .select_only()
            .column(post::Column::Score)
            .into_tuple()
            .one(&*self.db)
            .await
            .map_err(query_err)?;
        score.ok_or(RepoError::NotFound)
    }
}
