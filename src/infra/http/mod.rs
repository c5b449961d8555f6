mod error;
mod handlers;
mod middleware;
mod state;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use state::HttpState;

use axum::{Router, middleware as axum_middleware, routing::get};

use middleware::{enforce_request_timeout, log_responses, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    let request_timeout = state.request_timeout;

    let rover_routes = Router::new()
        .route("/mars/manifest/{rover}", get(handlers::manifest))
        .route("/mars/photos/{rover}/sol/{day}", get(handlers::photos_by_sol))
        .route(
            "/mars/photos/{rover}/earthdate/{date}",
            get(handlers::photos_by_earth_date),
        )
        .layer(axum_middleware::from_fn_with_state(
            request_timeout,
            enforce_request_timeout,
        ));

    Router::new()
        .merge(rover_routes)
        .route("/_health", get(handlers::health))
        .fallback(handlers::fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
