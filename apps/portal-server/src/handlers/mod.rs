//! HTTP handlers and route configuration.

mod auth;
mod authors;
mod categories;
mod comments;
mod health;
mod posts;
mod subscriptions;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me))
                    .route("/become-author", web::post().to(auth::become_author)),
            )
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list))
                    .route("", web::post().to(posts::create))
                    .route("/new", web::get().to(posts::new_form))
                    .route("/{id}", web::get().to(posts::get))
                    .route("/{id}/like", web::post().to(posts::like))
                    .route("/{id}/dislike", web::post().to(posts::dislike))
                    .route("/{id}/comments", web::get().to(comments::list))
                    .route("/{id}/comments", web::post().to(comments::add))
                    .route("/{kind}/{id}", web::put().to(posts::update))
                    .route("/{kind}/{id}", web::delete().to(posts::delete)),
            )
            .service(
                web::scope("/comments")
                    .route("/{id}/like", web::post().to(comments::like))
                    .route("/{id}/dislike", web::post().to(comments::dislike)),
            )
            .service(
                web::scope("/categories")
                    .route("", web::get().to(categories::list))
                    .route("", web::post().to(categories::create))
                    .route("/{id}/posts", web::get().to(categories::posts)),
            )
            .service(
                web::scope("/authors")
                    .route("", web::get().to(authors::list))
                    .route("/{id}", web::get().to(authors::detail)),
            )
            .route(
                "/subscriptions/{action}/{target}/{id}",
                web::post().to(subscriptions::toggle),
            ),
    );
}
