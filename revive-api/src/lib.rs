use axum::{
    http::Method,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod bundles;
pub mod cart;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod products;
pub mod state;
pub mod worker;

pub use state::{AppState, AuthConfig, Repositories};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let protected = Router::new()
        .merge(bundles::supplier_routes())
        .merge(orders::routes())
        .merge(products::routes())
        .merge(cart::routes())
        .merge(admin::routes())
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(bundles::public_routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
