//! JSON REST handler for the current half of the twin.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use thermotwin_app::ports::{CurrentStateRepository, MessagePublisher, TargetStateRepository};
use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<CurrentState>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/v1/current-state/{device_id}`
pub async fn get<TR, CR, P>(
    State(state): State<AppState<TR, CR, P>>,
    Path(device_id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    TR: TargetStateRepository + Send + Sync + 'static,
    CR: CurrentStateRepository + Send + Sync + 'static,
    P: MessagePublisher + Send + Sync + 'static,
{
    let current = state
        .twin_service
        .get_current_state(&DeviceId::from(device_id))
        .await?;
    Ok(GetResponse::Ok(Json(current)))
}
