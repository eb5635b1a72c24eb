use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use portal_core::domain::{Author, Post, PostKind};
use portal_core::error::RepoError;
use portal_core::ports::{BaseRepository, PostRepository};

use super::entity::{author, post, post_category};
use super::postgres_repo::{
    PostgresAuthorRepository, PostgresPostRepository, postgres_repositories,
};

fn post_row(id: Uuid, author_id: Uuid, kind: &str) -> post::Model {
    post::Model {
        id,
        author_id,
        kind: kind.to_owned(),
        title: "Test Post".to_owned(),
        content: "Content".to_owned(),
        score: 4,
        created_at: Utc::now().into(),
    }
}

#[tokio::test]
async fn test_find_post_attaches_categories() {
    let post_id = Uuid::new_v4();
    let author_id = Uuid::new_v4();
    let category_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_row(post_id, author_id, "AR")]])
        .append_query_results([vec![post_category::Model {
            post_id,
            category_id,
        }]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let post: Post = repo.find_by_id(post_id).await.unwrap().unwrap();

    assert_eq!(post.kind, PostKind::Article);
    assert_eq!(post.score, 4);
    assert_eq!(post.category_ids, vec![category_id]);
}

#[tokio::test]
async fn test_unknown_kind_code_is_an_error() {
    let post_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_row(post_id, Uuid::new_v4(), "XX")]])
        .append_query_results([Vec::<post_category::Model>::new()])
        .into_connection();

    let result = PostgresPostRepository::new(db).find_by_id(post_id).await;
    assert!(matches!(result, Err(RepoError::Query(_))));
}

#[tokio::test]
async fn test_adjust_score_on_missing_post_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let result = PostgresPostRepository::new(db)
        .adjust_score(Uuid::new_v4(), 1)
        .await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_save_inserts_when_update_matches_nothing() {
    let user_id = Uuid::new_v4();

    // UPDATE ... RETURNING yields no row, then INSERT ... RETURNING yields it.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<author::Model>::new()])
        .append_query_results([vec![author::Model { user_id, rating: 0 }]])
        .into_connection();

    let repo = PostgresAuthorRepository::new(db);
    let saved: Author = repo.save(Author::new(user_id)).await.unwrap();

    assert_eq!(saved.user_id, user_id);
    assert_eq!(saved.rating, 0);
}

#[tokio::test]
async fn test_repositories_share_one_connection() {
    let user_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();

    // Both repositories read from the same queue of mocked results.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![author::Model { user_id, rating: 7 }]])
        .append_query_results([vec![post_row(post_id, user_id, "NW")]])
        .append_query_results([Vec::<post_category::Model>::new()])
        .into_connection();

    let repos = postgres_repositories(Arc::new(db));

    let author = repos.authors.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(author.rating, 7);

    let post = repos.posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(post.kind, PostKind::News);
    assert_eq!(post.author_id, user_id);
}
