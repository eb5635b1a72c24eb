//! In-memory content store implementing every repository port.
//!
//! Mirrors the relational schema closely enough for tests and single-process
//! demos: unique usernames and category names, foreign keys checked on write,
//! cascading deletes. Data is lost on restart.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use portal_core::domain::{Author, Category, Comment, Post, RatingComponents, User};
use portal_core::error::RepoError;
use portal_core::ports::{
    AuthorRepository, BaseRepository, CategoryRepository, CommentRepository, Page, PageRequest,
    PostFilter, PostRepository, UserRepository,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    authors: HashMap<Uuid, Author>,
    categories: HashMap<Uuid, Category>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    /// (category_id, user_id)
    category_subscribers: HashSet<(Uuid, Uuid)>,
    /// (author_id, user_id)
    author_subscribers: HashSet<(Uuid, Uuid)>,
}

impl State {
    fn users_where(&self, pred: impl Fn(&Uuid) -> bool) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .values()
            .filter(|u| pred(&u.id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    fn remove_post(&mut self, id: Uuid) -> bool {
        let existed = self.posts.remove(&id).is_some();
        self.comments.retain(|_, c| c.post_id != id);
        existed
    }

    fn remove_author(&mut self, id: Uuid) -> bool {
        let existed = self.authors.remove(&id).is_some();
        let owned: Vec<Uuid> = self
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned {
            self.remove_post(post_id);
        }
        self.author_subscribers.retain(|(author, _)| *author != id);
        existed
    }
}

fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Default)]
pub struct InMemoryContentStore {
    state: RwLock<State>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryContentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn save(&self, entity: User) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|u| u.username == entity.username && u.id != entity.id);
        if taken {
            return Err(RepoError::Constraint(format!(
                "username '{}' already exists",
                entity.username
            )));
        }
        state.users.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        state.remove_author(id);
        state.comments.retain(|_, c| c.user_id != id);
        state.category_subscribers.retain(|(_, user)| *user != id);
        state.author_subscribers.retain(|(_, user)| *user != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryContentStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl BaseRepository<Author, Uuid> for InMemoryContentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Author>, RepoError> {
        Ok(self.state.read().await.authors.get(&id).cloned())
    }

    async fn save(&self, entity: Author) -> Result<Author, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&entity.user_id) {
            return Err(RepoError::Constraint("author must reference a user".into()));
        }
        state.authors.insert(entity.user_id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.remove_author(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl AuthorRepository for InMemoryContentStore {
    async fn list(&self) -> Result<Vec<Author>, RepoError> {
        let state = self.state.read().await;
        let mut authors: Vec<Author> = state.authors.values().cloned().collect();
        authors.sort_by(|a, b| b.rating.cmp(&a.rating));
        Ok(authors)
    }

    async fn subscribers(&self, author_id: Uuid) -> Result<Vec<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users_where(|id| state.author_subscribers.contains(&(author_id, *id))))
    }

    async fn add_subscriber(&self, author_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&author_id) || !state.users.contains_key(&user_id) {
            return Err(RepoError::Constraint("unknown author or user".into()));
        }
        state.author_subscribers.insert((author_id, user_id));
        Ok(())
    }

    async fn remove_subscriber(&self, author_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        self.state
            .write()
            .await
            .author_subscribers
            .remove(&(author_id, user_id));
        Ok(())
    }

    async fn rating_components(&self, author_id: Uuid) -> Result<RatingComponents, RepoError> {
        let state = self.state.read().await;
        let own_posts: HashSet<Uuid> = state
            .posts
            .values()
            .filter(|p| p.author_id == author_id)
            .map(|p| p.id)
            .collect();

        Ok(RatingComponents {
            post_scores: state
                .posts
                .values()
                .filter(|p| p.author_id == author_id)
                .map(|p| p.score)
                .sum(),
            own_comment_scores: state
                .comments
                .values()
                .filter(|c| c.user_id == author_id)
                .map(|c| c.score)
                .sum(),
            received_comment_scores: state
                .comments
                .values()
                .filter(|c| own_posts.contains(&c.post_id))
                .map(|c| c.score)
                .sum(),
        })
    }

    async fn store_rating(&self, author_id: Uuid, rating: i64) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let author = state.authors.get_mut(&author_id).ok_or(RepoError::NotFound)?;
        author.rating = rating;
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for InMemoryContentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn save(&self, entity: Category) -> Result<Category, RepoError> {
        let mut state = self.state.write().await;
        let taken = state
            .categories
            .values()
            .any(|c| c.name == entity.name && c.id != entity.id);
        if taken {
            return Err(RepoError::Constraint(format!(
                "category '{}' already exists",
                entity.name
            )));
        }
        state.categories.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        for post in state.posts.values_mut() {
            post.category_ids.retain(|c| *c != id);
        }
        state.category_subscribers.retain(|(category, _)| *category != id);
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryContentStore {
    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepoError> {
        let state = self.state.read().await;
        Ok(state.categories.values().find(|c| c.name == name).cloned())
    }

    async fn subscribers(&self, category_id: Uuid) -> Result<Vec<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users_where(|id| state.category_subscribers.contains(&(category_id, *id))))
    }

    async fn add_subscriber(&self, category_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&category_id) || !state.users.contains_key(&user_id) {
            return Err(RepoError::Constraint("unknown category or user".into()));
        }
        state.category_subscribers.insert((category_id, user_id));
        Ok(())
    }

    async fn remove_subscriber(
        &self,
        category_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), RepoError> {
        self.state
            .write()
            .await
            .category_subscribers
            .remove(&(category_id, user_id));
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryContentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&entity.author_id) {
            return Err(RepoError::Constraint("post must reference an author".into()));
        }
        if let Some(missing) = entity
            .category_ids
            .iter()
            .find(|c| !state.categories.contains_key(c))
        {
            return Err(RepoError::Constraint(format!("unknown category {}", missing)));
        }

        let saved = match state.posts.get(&entity.id) {
            Some(existing) => Post {
                score: existing.score,
                created_at: existing.created_at,
                author_id: existing.author_id,
                ..entity
            },
            None => entity,
        };
        state.posts.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        if self.state.write().await.remove_post(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryContentStore {
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        newest_first(&mut posts);
        Ok(posts)
    }

    async fn created_by_author_since(
        &self,
        author_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .filter(|p| p.author_id == author_id && p.created_at >= since)
            .map(|p| p.created_at)
            .collect())
    }

    async fn find_by_category_since(
        &self,
        category_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Post>, RepoError> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.in_category(category_id) && p.created_at >= since)
            .cloned()
            .collect();
        newest_first(&mut posts);
        Ok(posts)
    }

    async fn search(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let state = self.state.read().await;
        let mut matches: Vec<Post> = state
            .posts
            .values()
            .filter(|p| {
                filter
                    .title
                    .as_deref()
                    .is_none_or(|t| contains_ci(&p.title, t))
            })
            .filter(|p| {
                filter.author_username.as_deref().is_none_or(|name| {
                    state
                        .users
                        .get(&p.author_id)
                        .is_some_and(|u| contains_ci(&u.username, name))
                })
            })
            .filter(|p| filter.published_after.is_none_or(|after| p.created_at >= after))
            .filter(|p| filter.category_id.is_none_or(|c| p.in_category(c)))
            .cloned()
            .collect();
        newest_first(&mut matches);

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn adjust_score(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        let mut state = self.state.write().await;
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.score += delta;
        Ok(post.score)
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryContentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, entity: Comment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&entity.post_id) || !state.users.contains_key(&entity.user_id)
        {
            return Err(RepoError::Constraint("comment must reference a post and a user".into()));
        }
        state.comments.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        match self.state.write().await.comments.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl CommentRepository for InMemoryContentStore {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn adjust_score(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        let mut state = self.state.write().await;
        let comment = state.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        comment.score += delta;
        Ok(comment.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::domain::PostKind;

    async fn author(store: &InMemoryContentStore, name: &str) -> User {
        let user = BaseRepository::<User, Uuid>::save(
            store,
            User::new(name.into(), format!("{}@example.com", name), String::new()),
        )
        .await
        .unwrap();
        BaseRepository::<Author, Uuid>::save(store, Author::new(user.id))
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn test_update_keeps_score_and_creation_time() {
        let store = InMemoryContentStore::new();
        let alice = author(&store, "alice").await;

        let post = Post::new(alice.id, PostKind::News, "T".into(), "C".into(), vec![]);
        let post = BaseRepository::<Post, Uuid>::save(&store, post).await.unwrap();
        PostRepository::adjust_score(&store, post.id, 5).await.unwrap();

        let mut edited = post.clone();
        edited.title = "T2".into();
        edited.score = 0;
        edited.created_at = Utc::now() + chrono::Duration::days(1);
        let saved = BaseRepository::<Post, Uuid>::save(&store, edited).await.unwrap();

        assert_eq!(saved.title, "T2");
        assert_eq!(saved.score, 5);
        assert_eq!(saved.created_at, post.created_at);
    }

    #[tokio::test]
    async fn test_deleting_post_removes_its_comments() {
        let store = InMemoryContentStore::new();
        let alice = author(&store, "alice").await;
        let post = BaseRepository::<Post, Uuid>::save(
            &store,
            Post::new(alice.id, PostKind::Article, "T".into(), "C".into(), vec![]),
        )
        .await
        .unwrap();
        BaseRepository::<Comment, Uuid>::save(&store, Comment::new(post.id, alice.id, "hi".into()))
            .await
            .unwrap();

        BaseRepository::<Post, Uuid>::delete(&store, post.id).await.unwrap();

        assert!(store.find_by_post(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let store = InMemoryContentStore::new();
        author(&store, "alice").await;

        let result = BaseRepository::<User, Uuid>::save(
            &store,
            User::new("alice".into(), String::new(), String::new()),
        )
        .await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_search_filters_case_insensitively_and_paginates() {
        let store = InMemoryContentStore::new();
        let alice = author(&store, "Alice").await;
        let bob = author(&store, "bob").await;
        let now = Utc::now();

        for i in 0..7 {
            let post = Post::new(
                alice.id,
                PostKind::News,
                format!("Rust news {}", i),
                "c".into(),
                vec![],
            )
            .with_created_at(now - chrono::Duration::minutes(i));
            BaseRepository::<Post, Uuid>::save(&store, post).await.unwrap();
        }
        BaseRepository::<Post, Uuid>::save(
            &store,
            Post::new(bob.id, PostKind::News, "Go news".into(), "c".into(), vec![]),
        )
        .await
        .unwrap();

        let filter = PostFilter {
            title: Some("RUST".into()),
            author_username: Some("ali".into()),
            ..PostFilter::default()
        };
        let page = store.search(&filter, PageRequest::new(2, 5)).await.unwrap();

        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].title, "Rust news 5");
    }
}
