//! HTTP surface: brand routes plus the operational endpoints.
//!
//! Routes:
//! - `GET|PUT|DELETE /brands/:uuid`
//! - `GET /brands/__count`
//! - `GET /__health`, `/__gtg`, `/__ping`, `/__build-info`

mod handlers;
mod health;
mod request_id;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::Context;
use crate::graph::GraphClient;

pub use request_id::{RequestId, REQUEST_ID_HEADER};

/// Path segment the brand routes are mounted under.
pub const SERVICE_PATH: &str = "/brands";

/// Builds the application router.
pub fn router<C>(ctx: Context<C>) -> Router
where
    C: GraphClient + 'static,
{
    let brands = Router::new()
        .route("/__count", get(handlers::count::<C>))
        .route(
            "/:uuid",
            get(handlers::read::<C>)
                .put(handlers::write::<C>)
                .delete(handlers::delete::<C>),
        );

    Router::new()
        .nest(SERVICE_PATH, brands)
        .route("/__health", get(health::health::<C>))
        .route("/__gtg", get(health::good_to_go::<C>))
        .route("/__ping", get(health::ping))
        .route("/__build-info", get(health::build_info::<C>))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id::propagate))
                .layer(TraceLayer::new_for_http().make_span_with(request_id::make_span)),
        )
        .with_state(ctx)
}
