use axum::{
    handler::Handler,
    http::{header, Method, Uri},
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod analytics;
pub mod config;
pub mod cursors;
pub mod database;
pub mod extract;
pub mod utils;

pub mod admin;
pub mod helpers;
pub mod problem;
pub mod schema;

pub mod controllers;
pub mod models;
pub mod response;
pub mod views;

use controllers::{analytics as analytics_controller, glucose_measurement};
use problem::{GenericProblem, Problem};

pub static VERSION: &str = env!("CARGO_PKG_VERSION");

/// The HTTP application: the measurement store and the analytics report.
pub fn app(pg: database::PgPool, analytics_settings: config::AnalyticsSettings) -> Router {
    Router::new()
        .route(
            "/glucose-measurements",
            get(glucose_measurement::glucose_measurements)
                .post(glucose_measurement::create_glucose_measurement),
        )
        .route(
            "/glucose-measurements/:id",
            get(glucose_measurement::glucose_measurement_by_id)
                .put(glucose_measurement::update_glucose_measurement)
                .patch(glucose_measurement::update_glucose_measurement)
                .delete(glucose_measurement::delete_glucose_measurement),
        )
        .route(
            "/analytics/glucose-averages",
            get(analytics_controller::glucose_averages),
        )
        .route(
            "/version",
            get(|| async { response::ResponseBuilder::ok().body(VERSION) }),
        )
        .layer(Extension(pg))
        .layer(Extension(analytics_settings))
        .fallback(fallback.into_service())
        .layer(tower_http::compression::CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE])
                .expose_headers([header::LINK, header::LOCATION]),
        )
        .layer(TraceLayer::new_for_http())
}

/// 404 handler
async fn fallback(uri: Uri) -> impl IntoResponse {
    tracing::trace!("No route for {}", uri);
    Problem::Generic(GenericProblem::NotFound).into_response()
}
