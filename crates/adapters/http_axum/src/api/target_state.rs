//! JSON REST handlers for the target half of the twin.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use thermotwin_app::ports::{CurrentStateRepository, MessagePublisher, TargetStateRepository};
use thermotwin_domain::id::DeviceId;
use thermotwin_domain::target_state::{TargetState, TargetStatePatch};

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<TargetState>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the update endpoint.
pub enum UpdateResponse {
    Ok(Json<TargetState>),
}

impl IntoResponse for UpdateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/v1/target-state/{device_id}`
pub async fn get<TR, CR, P>(
    State(state): State<AppState<TR, CR, P>>,
    Path(device_id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    TR: TargetStateRepository + Send + Sync + 'static,
    CR: CurrentStateRepository + Send + Sync + 'static,
    P: MessagePublisher + Send + Sync + 'static,
{
    let target = state
        .twin_service
        .get_target_state(&DeviceId::from(device_id))
        .await?;
    Ok(GetResponse::Ok(Json(target)))
}

/// `POST /api/v1/target-state/{device_id}`
///
/// The body is a partial target state; the device id always comes from the path.
pub async fn update<TR, CR, P>(
    State(state): State<AppState<TR, CR, P>>,
    Path(device_id): Path<String>,
    payload: Result<Json<TargetStatePatch>, JsonRejection>,
) -> Result<UpdateResponse, ApiError>
where
    TR: TargetStateRepository + Send + Sync + 'static,
    CR: CurrentStateRepository + Send + Sync + 'static,
    P: MessagePublisher + Send + Sync + 'static,
{
    let Json(patch) = payload?;
    let target = state
        .twin_service
        .update_target_state(&DeviceId::from(device_id), patch)
        .await?;
    Ok(UpdateResponse::Ok(Json(target)))
}
