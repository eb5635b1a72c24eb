//! Content store backends: PostgreSQL via SeaORM and an in-memory store.

mod memory;

#[cfg(feature = "postgres")]
mod connections;
#[cfg(feature = "postgres")]
pub mod entity;
#[cfg(feature = "postgres")]
mod postgres_base;
#[cfg(feature = "postgres")]
pub mod postgres_repo;

pub use memory::InMemoryContentStore;

#[cfg(feature = "postgres")]
pub use connections::{DatabaseConfig, DatabaseConnections};
#[cfg(feature = "postgres")]
pub use postgres_repo::{
    PostgresAuthorRepository, PostgresCategoryRepository, PostgresCommentRepository,
    PostgresPostRepository, PostgresUserRepository, postgres_repositories,
};

#[cfg(feature = "postgres")]
#[cfg(test)]
mod tests;
