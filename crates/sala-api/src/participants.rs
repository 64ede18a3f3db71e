use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use sala_types::api::RegisterRequest;
use sala_types::models::{BROADCAST, JOIN_TEXT, MessageKind, Participant};

use crate::error::{ApiError, ApiResult};
use crate::messages::new_row;
use crate::middleware::Identity;
use crate::state::{AppState, with_db};
use crate::validate;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let name = validate::required("name", &req.name)?;
    let last_status = chrono::Utc::now().timestamp_millis();

    let join = new_row(&name, BROADCAST, JOIN_TEXT, MessageKind::Status);
    let candidate = name.clone();
    let created = with_db(&state, move |db| {
        db.create_participant(&candidate, last_status, &join)
    })
    .await?;

    if !created {
        return Err(ApiError::Conflict);
    }

    debug!("{} joined", name);
    Ok((StatusCode::CREATED, Json(Participant { name, last_status })))
}

pub async fn list_participants(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = with_db(&state, |db| db.list_participants()).await?;

    let participants: Vec<Participant> = rows
        .into_iter()
        .map(|row| Participant {
            name: row.name,
            last_status: row.last_status,
        })
        .collect();

    Ok(Json(participants))
}

/// Heartbeat: keeps the caller out of the next sweep.
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<StatusCode> {
    let name = identity
        .name()
        .ok_or_else(|| ApiError::BadRequest("Cabeçalho 'user' ausente.".into()))?
        .to_string();
    let now = chrono::Utc::now().timestamp_millis();

    let touched = with_db(&state, move |db| db.touch_participant(&name, now)).await?;

    if !touched {
        return Err(ApiError::NotFound("Participante não encontrado."));
    }
    Ok(StatusCode::OK)
}
