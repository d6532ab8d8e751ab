//! HTTP handlers and route configuration.

mod health;
mod posts;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, web};

use yatube_shared::ErrorResponse;

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // A malformed `{post_id}` is just another missing post.
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::NotFound(err.to_string()).into()),
    )
    .route("/", web::get().to(posts::index))
    .route("/group/{slug}/", web::get().to(posts::group_posts))
    .route("/profile/{username}/", web::get().to(posts::profile))
    .route("/posts/{post_id}/", web::get().to(posts::post_detail))
    .route("/posts/{post_id}/edit/", web::get().to(posts::edit_form))
    .route("/posts/{post_id}/edit/", web::post().to(posts::edit_submit))
    .route("/create/", web::get().to(posts::create_form))
    .route("/create/", web::post().to(posts::create_submit))
    .route("/health/", web::get().to(health::health_check));
}

/// Fallback for every unmatched route.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound()
        .json(ErrorResponse::not_found(format!("No route for {}", req.method())).at(req.path()))
}
