mod common;

use chrono::{Duration, Utc};
use common::{World, news};
use portal_core::DomainError;
use portal_core::domain::{Comment, Post, PostKind};
use portal_core::ports::{BaseRepository, Cache, PageRequest, PostFilter};
use portal_core::services::{PostCache, PostEdit};
use uuid::Uuid;

async fn backdate(world: &World, author: Uuid, title: &str, age: Duration) -> Post {
    let post = Post::new(author, PostKind::News, title.into(), "old".into(), vec![])
        .with_created_at(Utc::now() - age);
    BaseRepository::<Post, Uuid>::save(world.store.as_ref(), post)
        .await
        .unwrap()
}

#[tokio::test]
async fn fourth_post_in_a_day_is_rejected() {
    let world = World::new();
    let alice = world.author("alice").await;

    for i in 0..3 {
        world
            .posts
            .create(alice.id, news(&format!("Post {}", i), &[]))
            .await
            .unwrap();
    }

    let mut fourth = news("One too many", &[]);
    fourth.kind = PostKind::Article;
    let err = world.posts.create(alice.id, fourth).await.unwrap_err();

    match err {
        DomainError::PostingLimitExceeded { kind, limit, retry_after } => {
            assert_eq!(kind, PostKind::Article);
            assert_eq!(limit, 3);
            assert!(retry_after > std::time::Duration::ZERO);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(world.posts.by_author(alice.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn posts_older_than_a_day_do_not_count() {
    let world = World::new();
    let alice = world.author("alice").await;

    backdate(&world, alice.id, "Yesterday", Duration::hours(24) + Duration::seconds(1)).await;
    backdate(&world, alice.id, "Earlier", Duration::hours(2)).await;
    backdate(&world, alice.id, "Recent", Duration::hours(1)).await;

    let allowance = world.posts.allowance(alice.id).await.unwrap().unwrap();
    assert!(allowance.allowed);
    assert_eq!(allowance.remaining, 1);

    world
        .posts
        .create(alice.id, news("Still allowed", &[]))
        .await
        .unwrap();
}

#[tokio::test]
async fn readers_cannot_post_until_they_become_authors() {
    let world = World::new();
    let reader = world.user("reader").await;

    let err = world.posts.create(reader.id, news("Hi", &[])).await.unwrap_err();
    assert!(matches!(err, DomainError::NotAnAuthor));
    assert!(world.posts.allowance(reader.id).await.unwrap().is_none());

    let first = world.authors.become_author(reader.id).await.unwrap();
    let second = world.authors.become_author(reader.id).await.unwrap();
    assert_eq!(first, second);
    world.posts.create(reader.id, news("Hi", &[])).await.unwrap();
}

#[tokio::test]
async fn invalid_posts_are_rejected() {
    let world = World::new();
    let alice = world.author("alice").await;

    let long_title = "x".repeat(101);
    let err = world
        .posts
        .create(alice.id, news(&long_title, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = world
        .posts
        .create(alice.id, news("Orphan", &[Uuid::new_v4()]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn edits_and_votes_invalidate_the_cache() {
    let world = World::new();
    let alice = world.author("alice").await;
    let post = world
        .posts
        .create(alice.id, news("Draft", &[]))
        .await
        .unwrap();

    world.posts.get(post.id).await.unwrap();
    assert!(world.cache.get(&PostCache::key(post.id)).await.is_some());

    world
        .posts
        .update(
            alice.id,
            PostKind::News,
            post.id,
            PostEdit {
                title: "Final".into(),
                content: "Edited body".into(),
                category_ids: vec![],
            },
        )
        .await
        .unwrap();
    assert!(world.cache.get(&PostCache::key(post.id)).await.is_none());
    assert_eq!(world.posts.get(post.id).await.unwrap().title, "Final");

    assert_eq!(world.posts.like(post.id).await.unwrap(), 1);
    assert_eq!(world.posts.get(post.id).await.unwrap().score, 1);
    assert_eq!(world.posts.dislike(post.id).await.unwrap(), 0);
    assert_eq!(world.posts.get(post.id).await.unwrap().score, 0);

    let fetched = world.posts.get(post.id).await.unwrap();
    assert_eq!(fetched.created_at, post.created_at);
}

#[tokio::test]
async fn only_the_author_can_edit_with_matching_kind() {
    let world = World::new();
    let alice = world.author("alice").await;
    let bob = world.author("bob").await;
    let post = world
        .posts
        .create(alice.id, news("Mine", &[]))
        .await
        .unwrap();
    let edit = PostEdit {
        title: "Hijacked".into(),
        content: "x".into(),
        category_ids: vec![],
    };

    let err = world
        .posts
        .update(bob.id, PostKind::News, post.id, edit.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let err = world
        .posts
        .delete(alice.id, PostKind::Article, post.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    world
        .posts
        .delete(alice.id, PostKind::News, post.id)
        .await
        .unwrap();
    assert!(matches!(
        world.posts.get(post.id).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn search_filters_by_title_author_and_date() {
    let world = World::new();
    let alice = world.author("alice").await;
    let bob = world.author("bob").await;
    world.posts.create(alice.id, news("Rust tips", &[])).await.unwrap();
    world.posts.create(bob.id, news("Rust news", &[])).await.unwrap();
    backdate(&world, alice.id, "Old rust", Duration::days(10)).await;

    let filter = PostFilter {
        title: Some("rust".into()),
        author_username: Some("ALI".into()),
        published_after: Some(Utc::now() - Duration::days(1)),
        category_id: None,
    };
    let page = world.posts.search(&filter, PageRequest::default()).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Rust tips");
}

#[tokio::test]
async fn rating_combines_post_and_comment_scores() {
    let world = World::new();
    let alice = world.author("alice").await;
    let bob = world.author("bob").await;

    let alice_post = world.posts.create(alice.id, news("A", &[])).await.unwrap();
    let bob_post = world.posts.create(bob.id, news("B", &[])).await.unwrap();
    world.posts.like(alice_post.id).await.unwrap();
    world.posts.like(alice_post.id).await.unwrap();

    let on_bob: Comment = world
        .comments
        .add(alice.id, bob_post.id, "nice".into())
        .await
        .unwrap();
    world.comments.like(on_bob.id).await.unwrap();

    let on_alice = world
        .comments
        .add(bob.id, alice_post.id, "meh".into())
        .await
        .unwrap();
    world.comments.dislike(on_alice.id).await.unwrap();
    world.comments.dislike(on_alice.id).await.unwrap();

    // 3 * 2 + 1 + (-2)
    let profile = world.authors.profile(alice.id).await.unwrap();
    assert_eq!(profile.author.rating, 5);
    assert_eq!(profile.posts.len(), 1);

    let listed = world.authors.list().await.unwrap();
    assert_eq!(listed[0].0.user_id, alice.id);
}

#[tokio::test]
async fn weekly_digest_mails_each_subscriber_per_active_category() {
    let world = World::new();
    let tech = world.category("Tech").await;
    let science = world.category("Science").await;
    let idle = world.category("Idle").await;
    let alice = world.author("alice").await;
    let bob = world.author("bob").await;
    let u1 = world.user("u1").await;
    let u2 = world.user("u2").await;

    for reader in [&u1, &u2] {
        world.follow_category(reader, &tech).await;
        world.follow_category(reader, &science).await;
        world.follow_category(reader, &idle).await;
    }

    world.posts.create(alice.id, news("T1", &[tech.id])).await.unwrap();
    world.posts.create(alice.id, news("T2", &[tech.id])).await.unwrap();
    world.posts.create(bob.id, news("S1", &[science.id])).await.unwrap();
    let old = Post::new(bob.id, PostKind::News, "Ancient".into(), "x".into(), vec![idle.id])
        .with_created_at(Utc::now() - Duration::days(8));
    BaseRepository::<Post, Uuid>::save(world.store.as_ref(), old)
        .await
        .unwrap();

    let report = world.digest.run().await;

    assert_eq!(report.categories, 2);
    assert_eq!(report.sent, 4);
    assert_eq!(report.failed, 0);

    let inbox = world.mailbox.inbox("u1@example.com").await;
    assert_eq!(inbox.len(), 2);
    let tech_mail = inbox
        .iter()
        .find(|m| m.subject == "New posts in \"Tech\" this week")
        .unwrap();
    assert!(tech_mail.text_body.contains("T1"));
    assert!(tech_mail.text_body.contains("T2"));
    assert!(!inbox.iter().any(|m| m.text_body.contains("Ancient")));
}

#[tokio::test]
async fn weekly_digest_skips_readers_without_address() {
    let world = World::new();
    let tech = world.category("Tech").await;
    let alice = world.author("alice").await;
    let u1 = world.user("u1").await;
    let silent = world.user_with_email("silent", " ").await;
    world.follow_category(&u1, &tech).await;
    world.follow_category(&silent, &tech).await;
    world.posts.create(alice.id, news("T1", &[tech.id])).await.unwrap();

    let report = world.digest.run().await;

    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 0);
    let sent = world.mailbox.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["u1@example.com".to_string()]);
}

#[tokio::test]
async fn weekly_digest_continues_past_a_rejected_address() {
    let world = World::new();
    let tech = world.category("Tech").await;
    let alice = world.author("alice").await;
    let u1 = world.user("u1").await;
    let u2 = world.user("u2").await;
    let u3 = world.user("u3").await;
    for reader in [&u1, &u2, &u3] {
        world.follow_category(reader, &tech).await;
    }
    world.mailbox.reject("u2@example.com").await;
    world.posts.create(alice.id, news("T1", &[tech.id])).await.unwrap();

    let report = world.digest.run().await;

    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(world.mailbox.inbox("u1@example.com").await.len(), 1);
    assert!(world.mailbox.inbox("u2@example.com").await.is_empty());
    assert_eq!(world.mailbox.inbox("u3@example.com").await.len(), 1);
}
