use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DbConn, DbErr, EntityTrait, IntoActiveModel,
    PrimaryKeyTrait,
};

use portal_core::error::RepoError;
use portal_core::ports::BaseRepository;

/// Generic PostgreSQL repository for entities that map one row to one
/// domain value.
pub struct PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: Arc<DbConn>,
    _entity: PhantomData<E>,
}

impl<E> PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    /// Accepts an owned connection or a pool shared with other repositories.
    pub fn new(db: impl Into<Arc<DbConn>>) -> Self {
        Self {
            db: db.into(),
            _entity: PhantomData,
        }
    }
}

/// Map a write error, recognising unique and foreign-key violations.
pub(crate) fn write_err(e: DbErr) -> RepoError {
    let msg = e.to_string();
    if msg.contains("duplicate") || msg.contains("unique") {
        RepoError::Constraint("Entity already exists".to_string())
    } else if msg.contains("foreign key") {
        RepoError::Constraint("Referenced entity does not exist".to_string())
    } else {
        RepoError::Query(msg)
    }
}

pub(crate) fn query_err(e: DbErr) -> RepoError {
    match e {
        DbErr::Conn(inner) => RepoError::Connection(inner.to_string()),
        DbErr::ConnectionAcquire(inner) => RepoError::Connection(inner.to_string()),
        other => RepoError::Query(other.to_string()),
    }
}

#[async_trait]
impl<E, T, ID> BaseRepository<T, ID> for PostgresBaseRepository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + Send,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Clone + Send + Sync,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = ID>,
    ID: Send + Sync + Into<sea_orm::Value> + Clone + Copy + 'static,
    T: From<E::Model> + Into<E::ActiveModel> + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError> {
        let result = E::find_by_id(id).one(&*self.db).await.map_err(query_err)?;
        Ok(result.map(Into::into))
    }

    /// Every column of the domain value is `Set`, so `ActiveModel::save`
    /// would always issue an UPDATE. Try the update first and insert when no
    /// row matched.
    async fn save(&self, entity: T) -> Result<T, RepoError> {
        let active_model: E::ActiveModel = entity.into();

        let model = match active_model.clone().update(&*self.db).await {
            Ok(model) => model,
            Err(DbErr::RecordNotUpdated) => {
                active_model.insert(&*self.db).await.map_err(write_err)?
            }
            Err(e) => return Err(write_err(e)),
        };

        Ok(model.into())
    }

    async fn delete(&self, id: ID) -> Result<(), RepoError> {
        let result = E::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
