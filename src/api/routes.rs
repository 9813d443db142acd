use axum::{middleware, routing::get, Router};

use crate::api::access_log::log_request;
use crate::api::handlers::{self, AppState};

fn api_v1() -> Router<AppState> {
    Router::new().route("/properties/:id", get(handlers::find_property))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
