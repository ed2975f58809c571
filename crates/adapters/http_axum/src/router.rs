//! Axum router assembly.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::trace::TraceLayer;

use thermotwin_app::ports::{
    CurrentStateRepository, MessagePublisher, TargetStateRepository, TwinTelemetry,
};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api/v1`. Every request is reported to the
/// telemetry port, and a [`TraceLayer`] logs each HTTP request/response at
/// the `DEBUG` level using the `tracing` ecosystem.
pub fn build<TR, CR, P>(state: AppState<TR, CR, P>) -> Router
where
    TR: TargetStateRepository + Send + Sync + 'static,
    CR: CurrentStateRepository + Send + Sync + 'static,
    P: MessagePublisher + Send + Sync + 'static,
{
    let telemetry = Arc::clone(&state.telemetry);
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics::<TR, CR, P>))
        .nest("/api/v1", crate::api::routes())
        .layer(middleware::from_fn_with_state(telemetry, track_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics<TR, CR, P>(State(state): State<AppState<TR, CR, P>>) -> Response {
    match &state.metrics {
        Some(render) => render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Route label: method and matched path template, e.g. `GET /api/v1/target-state/{device_id}`.
fn route_name(request: &Request) -> String {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str);
    format!("{} {path}", request.method())
}

async fn track_request(
    State(telemetry): State<Arc<dyn TwinTelemetry>>,
    request: Request,
    next: Next,
) -> Response {
    let route = route_name(&request);
    let started = Instant::now();
    let response = next.run(request).await;
    telemetry.request_handled(&route, response.status().as_u16(), started.elapsed());
    response
}
