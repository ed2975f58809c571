//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod current_state;
#[allow(clippy::missing_errors_doc)]
pub mod target_state;

use axum::Router;
use axum::routing::get;

use thermotwin_app::ports::{CurrentStateRepository, MessagePublisher, TargetStateRepository};

use crate::state::AppState;

/// Build the `/api/v1` sub-router.
pub fn routes<TR, CR, P>() -> Router<AppState<TR, CR, P>>
where
    TR: TargetStateRepository + Send + Sync + 'static,
    CR: CurrentStateRepository + Send + Sync + 'static,
    P: MessagePublisher + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/target-state/{device_id}",
            get(target_state::get::<TR, CR, P>).post(target_state::update::<TR, CR, P>),
        )
        .route(
            "/current-state/{device_id}",
            get(current_state::get::<TR, CR, P>),
        )
}
