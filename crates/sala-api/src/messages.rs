use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use sala_db::models::{MessageRow, Mutation};
use sala_types::api::SendMessageRequest;
use sala_types::models::{BROADCAST, Message, MessageKind};

use crate::error::{ApiError, ApiResult};
use crate::middleware::Identity;
use crate::state::{AppState, with_db};
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    /// Kept raw so a bad value is a validation error rather than a query
    /// rejection.
    pub limit: Option<String>,
}

/// Fresh row with a new id and the current local time.
pub(crate) fn new_row(from: &str, to: &str, text: &str, kind: MessageKind) -> MessageRow {
    MessageRow {
        id: Uuid::new_v4().to_string(),
        sender: from.to_string(),
        recipient: to.to_string(),
        body: text.to_string(),
        kind: kind.as_str().to_string(),
        time: chrono::Local::now().format("%H:%M:%S").to_string(),
    }
}

pub(crate) fn to_message(row: MessageRow) -> Message {
    Message {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        kind: row.kind.parse().unwrap_or_else(|e| {
            warn!("Corrupt kind on message '{}': {}", row.id, e);
            MessageKind::Message
        }),
        from: row.sender,
        to: row.recipient,
        text: row.body,
        time: row.time,
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let input = validate::message_input(&req)?;
    let from = identity.name().ok_or(ApiError::UnknownSender)?.to_string();

    let row = new_row(&from, &input.to, &input.text, input.kind);
    let insert = row.clone();
    // Sender must be live now; later eviction does not touch the message
    let stored = with_db(&state, move |db| db.insert_message_from_participant(&insert)).await?;

    if !stored {
        return Err(ApiError::UnknownSender);
    }

    debug!("{} -> {} ({})", from, input.to, input.kind);
    Ok((StatusCode::CREATED, Json(to_message(row))))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Query(query), _): WithRejection<Query<MessageQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let viewer = identity
        .name()
        .ok_or_else(|| ApiError::Validation("Cabeçalho 'user' ausente.".into()))?
        .to_string();
    let limit = validate::limit(query.limit.as_deref())?;

    let rows = with_db(&state, move |db| db.messages_visible_to(&viewer, BROADCAST, limit)).await?;

    let messages: Vec<Message> = rows.into_iter().map(to_message).collect();
    Ok(Json(messages))
}

/// Replace `to`, `text` and `type` of a message the caller wrote.
pub async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> ApiResult<StatusCode> {
    let input = validate::message_input(&req)?;
    // No sender is ever empty, so a missing header resolves to NotFound or NotAuthor
    let requester = identity.name().unwrap_or_default().to_string();

    let outcome = with_db(&state, move |db| {
        db.update_message(&id, &requester, &input.to, &input.text, input.kind.as_str())
    })
    .await?;

    mutation_status(outcome)
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<StatusCode> {
    let requester = identity.name().unwrap_or_default().to_string();

    let outcome = with_db(&state, move |db| db.delete_message(&id, &requester)).await?;

    mutation_status(outcome)
}

fn mutation_status(outcome: Mutation) -> ApiResult<StatusCode> {
    match outcome {
        Mutation::Applied => Ok(StatusCode::OK),
        Mutation::NotFound => Err(ApiError::NotFound("Mensagem não encontrada.")),
        Mutation::NotAuthor => Err(ApiError::Unauthorized),
    }
}
