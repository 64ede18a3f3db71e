//! Input normalization. Everything a client sends passes through here before
//! it reaches the store.

use sala_types::api::SendMessageRequest;
use sala_types::models::MessageKind;

use crate::error::{ApiError, ApiResult};

/// Strip markup and surrounding whitespace.
///
/// Anything from a `<` up to the next `>` is dropped. A `<` with no closing
/// `>` is kept as text.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw.trim();

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// Sanitize `raw` and reject it if nothing is left.
pub fn required(field: &str, raw: &str) -> ApiResult<String> {
    let value = sanitize(raw);
    if value.is_empty() {
        return Err(ApiError::Validation(format!("Campo '{}' é obrigatório.", field)));
    }
    Ok(value)
}

/// A message body that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInput {
    pub to: String,
    pub text: String,
    pub kind: MessageKind,
}

pub fn message_input(req: &SendMessageRequest) -> ApiResult<MessageInput> {
    let to = required("to", &req.to)?;
    let text = required("text", &req.text)?;
    let kind = req
        .kind
        .trim()
        .parse::<MessageKind>()
        .ok()
        .filter(MessageKind::is_user_postable)
        .ok_or_else(|| {
            ApiError::Validation("Campo 'type' deve ser 'message' ou 'private_message'.".into())
        })?;

    Ok(MessageInput { to, text, kind })
}

/// `?limit=` must be a positive integer when present.
pub fn limit(raw: Option<&str>) -> ApiResult<Option<u64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ApiError::Validation(
            "Parâmetro 'limit' deve ser um inteiro positivo.".into(),
        )),
    }
}
