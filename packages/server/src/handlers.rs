//! HTTP handler functions for the water watch API.

use actix_web::{HttpResponse, web};
use water_watch_blog::{BlogError, queries as blog_queries};
use water_watch_dashboard::{geojson, queries, search as search_service};
use water_watch_server_models::{
    ActorRequest, ApiDashboard, ApiHealth, CommentRequest, DashboardParams, GeoJsonParams,
    LikeRequest, LikeResponse, SearchParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Translates a blog error into the HTTP error taxonomy.
fn blog_error_response(e: &BlogError) -> HttpResponse {
    match e {
        BlogError::NotFound(what) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("{what} not found")
        })),
        BlogError::Forbidden => HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Only the author may do that"
        })),
        _ => {
            log::error!("Blog operation failed: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal error"
            }))
        }
    }
}

/// `GET /dashboard/`
///
/// Returns the dashboard summary for the requested filters as JSON.
/// HTML rendering belongs to the frontend.
pub async fn dashboard_home(
    state: web::Data<AppState>,
    params: web::Query<DashboardParams>,
) -> HttpResponse {
    let filters = params.to_filters(&state.config.filters);

    match queries::dashboard_summary(state.db.as_ref(), &filters).await {
        Ok(summary) => HttpResponse::Ok().json(ApiDashboard::new(summary, &filters)),
        Err(e) => {
            log::error!("Failed to build dashboard summary: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to build dashboard summary"
            }))
        }
    }
}

/// `GET /dashboard/api/geojson/`
///
/// Returns the three entity layers as `FeatureCollection`s. Categories
/// outside the requested `type` are present but empty.
pub async fn geojson_data(
    state: web::Data<AppState>,
    params: web::Query<GeoJsonParams>,
) -> HttpResponse {
    let data_type = params.data_type.as_deref().unwrap_or("all");
    let db = state.db.as_ref();

    let mut municipalities = geojson::empty_collection();
    let mut incidents = geojson::empty_collection();
    let mut parks = geojson::empty_collection();

    if matches!(data_type, "all" | "municipalities") {
        match queries::list_municipalities(db).await {
            Ok(rows) => {
                municipalities = geojson::feature_collection(
                    rows.iter().map(geojson::municipality_feature).collect(),
                );
            }
            Err(e) => return geojson_error(&e),
        }
    }

    if matches!(data_type, "all" | "incidents") {
        match queries::list_incidents(db).await {
            Ok(rows) => {
                incidents = geojson::feature_collection(
                    rows.iter().map(geojson::incident_feature).collect(),
                );
            }
            Err(e) => return geojson_error(&e),
        }
    }

    if matches!(data_type, "all" | "parks") {
        match queries::list_parks(db).await {
            Ok(rows) => {
                parks =
                    geojson::feature_collection(rows.iter().map(geojson::park_feature).collect());
            }
            Err(e) => return geojson_error(&e),
        }
    }

    HttpResponse::Ok().json(serde_json::json!({
        "municipalities": municipalities,
        "incidents": incidents,
        "parks": parks,
    }))
}

fn geojson_error(e: &water_watch_dashboard::DashboardError) -> HttpResponse {
    log::error!("Failed to serialize GeoJSON layers: {e}");
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "Failed to load GeoJSON data"
    }))
}

/// `GET /dashboard/api/search/`
pub async fn search(state: web::Data<AppState>, params: web::Query<SearchParams>) -> HttpResponse {
    let query = params.q.as_deref().unwrap_or("");

    match search_service::search(state.db.as_ref(), query).await {
        Ok(results) => HttpResponse::Ok().json(serde_json::json!({ "results": results })),
        Err(e) => {
            log::error!("Search failed: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Search failed"
            }))
        }
    }
}

/// `POST /like_post/`
///
/// Toggles the acting user's like on a post. Method dispatch rejects
/// anything but POST.
pub async fn like_post(state: web::Data<AppState>, body: web::Json<LikeRequest>) -> HttpResponse {
    match blog_queries::toggle_like(state.db.as_ref(), body.user_id, body.post_id).await {
        Ok(toggle) => HttpResponse::Ok().json(LikeResponse {
            liked: toggle.liked,
            likes_count: toggle.likes_count,
        }),
        Err(e) => blog_error_response(&e),
    }
}

/// `GET /blog/posts/`
pub async fn list_posts(state: web::Data<AppState>) -> HttpResponse {
    match blog_queries::list_posts(state.db.as_ref()).await {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => blog_error_response(&e),
    }
}

/// `GET /blog/posts/{id}/`
pub async fn post_detail(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    match blog_queries::get_post_detail(state.db.as_ref(), path.into_inner()).await {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(e) => blog_error_response(&e),
    }
}

/// `GET /blog/profile/{user_id}/`
pub async fn profile(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let user_id = path.into_inner();
    let db = state.db.as_ref();

    let user = match blog_queries::get_user(db, user_id).await {
        Ok(user) => user,
        Err(e) => return blog_error_response(&e),
    };

    match blog_queries::posts_by_author(db, user_id).await {
        Ok(posts) => HttpResponse::Ok().json(serde_json::json!({
            "user": user,
            "posts": posts,
        })),
        Err(e) => blog_error_response(&e),
    }
}

/// `POST /blog/posts/{id}/comments/`
pub async fn create_comment(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<CommentRequest>,
) -> HttpResponse {
    match blog_queries::create_comment(
        state.db.as_ref(),
        path.into_inner(),
        body.user_id,
        &body.content,
    )
    .await
    {
        Ok(id) => HttpResponse::Ok().json(serde_json::json!({ "id": id })),
        Err(e) => blog_error_response(&e),
    }
}

/// `DELETE /blog/posts/{id}/`
pub async fn delete_post(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ActorRequest>,
) -> HttpResponse {
    match blog_queries::delete_post(state.db.as_ref(), path.into_inner(), body.user_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "deleted": true })),
        Err(e) => blog_error_response(&e),
    }
}

/// `DELETE /blog/comments/{id}/`
pub async fn delete_comment(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ActorRequest>,
) -> HttpResponse {
    match blog_queries::delete_comment(state.db.as_ref(), path.into_inner(), body.user_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "deleted": true })),
        Err(e) => blog_error_response(&e),
    }
}
