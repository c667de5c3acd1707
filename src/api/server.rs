use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::api::handler;
use crate::config::Config;
use crate::db::store::Store;
use crate::error::AppError;

pub type JsonResult<T> = core::result::Result<Json<T>, AppError>;

#[derive(Debug)]
pub struct AppState<S> {
    pub store: S,
    pub config: Config,
}

/// Builds the full route table over any [`Store`] backend. Tests mount this
/// over the in-memory store; `main` serves it over Postgres.
pub fn router<S: Store>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(|| async { Response::new(Body::empty()) }))
        //
        // recycling: challenges, completions, leaderboard
        .route(
            "/challenges",
            get(handler::list_challenges::<S>).post(handler::create_challenge::<S>),
        )
        .route("/challenges/mine", get(handler::my_challenges::<S>))
        .route(
            "/challenges/{id}/complete",
            post(handler::complete_challenge::<S>),
        )
        .route("/leaderboard", get(handler::leaderboard::<S>))
        //
        // recycling: waste log and center directory
        .route(
            "/waste",
            get(handler::list_waste_entries::<S>).post(handler::log_waste_entry::<S>),
        )
        .route("/waste/summary", get(handler::waste_summary::<S>))
        .route(
            "/centers",
            get(handler::list_centers::<S>).post(handler::create_center::<S>),
        )
        //
        // energy: goals and contributions
        .route(
            "/goals",
            get(handler::list_goals::<S>).post(handler::create_goal::<S>),
        )
        .route(
            "/goals/{id}/contribute",
            post(handler::contribute_to_goal::<S>),
        )
        .route("/goals/contributions", get(handler::my_contributions::<S>))
        //
        // energy: devices, readings, recommendations
        .route(
            "/devices",
            get(handler::list_devices::<S>).post(handler::register_device::<S>),
        )
        .route(
            "/devices/{id}/readings",
            post(handler::record_reading::<S>),
        )
        .route("/readings", get(handler::list_readings::<S>))
        .route(
            "/recommendations",
            get(handler::list_recommendations::<S>),
        )
        .route(
            "/recommendations/generate",
            get(handler::generate_recommendations::<S>),
        )
        .route(
            "/recommendations/{id}/read",
            post(handler::mark_recommendation_read::<S>),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[instrument(skip(state))]
pub async fn serve<S: Store>(state: Arc<AppState<S>>) -> std::io::Result<()> {
    let port = state.config.port;
    let app = router(state);

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let listener = TcpListener::bind(socket_addr).await?;
    info!("listening on {socket_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Custom error trace handler for `AppError`-shaped responses.
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<AppError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;

        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
