#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the water watch platform.
//!
//! Serves the dashboard API (filtered `GeoJSON`, search, incident
//! upload), the blog API (posts, comments, like toggle), and the static
//! map frontend. Authentication and HTML rendering are external
//! collaborators: handlers take the acting user id explicitly and
//! return JSON.

mod handlers;
mod upload;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use switchy_database::Database;
use water_watch_server_models::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Database connection.
    pub db: Arc<dyn Database>,
    /// Explicit server configuration (filter defaults, upload limits).
    pub config: ServerConfig,
}

/// Starts the water watch API server.
///
/// Opens the `SQLite` database (creating the schema on first run) and
/// binds the HTTP server. This is a regular async function; the caller
/// provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if the database cannot be opened or the schema cannot be
/// created.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Opening database at {}...", config.database_path.display());
    let db = water_watch_database::open_db(Some(&config.database_path))
        .await
        .expect("Failed to open database");

    let state = web::Data::new(AppState {
        db: Arc::from(db),
        config: config.clone(),
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let static_dir = config.static_dir.clone();

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .route("/api/health", web::get().to(handlers::health))
            .service(
                web::scope("/dashboard")
                    .route("/", web::get().to(handlers::dashboard_home))
                    .route("/api/geojson/", web::get().to(handlers::geojson_data))
                    .route("/api/search/", web::get().to(handlers::search))
                    .route("/upload/", web::post().to(upload::upload_incidents)),
            )
            .route("/like_post/", web::post().to(handlers::like_post))
            .service(
                web::scope("/blog")
                    .route("/posts/", web::get().to(handlers::list_posts))
                    .route("/posts/{id}/", web::get().to(handlers::post_detail))
                    .route("/posts/{id}/", web::delete().to(handlers::delete_post))
                    .route(
                        "/posts/{id}/comments/",
                        web::post().to(handlers::create_comment),
                    )
                    .route("/comments/{id}/", web::delete().to(handlers::delete_comment))
                    .route("/profile/{user_id}/", web::get().to(handlers::profile)),
            )
            // Serve the map frontend (production)
            .service(Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
