use axum::{extract::Request, middleware::Next, response::Response};

use crate::validate::sanitize;

/// Header carrying the caller's participant name.
pub const USER_HEADER: &str = "user";

/// Who the caller claims to be, taken verbatim from the `user` header.
///
/// The header is trusted: there is no verification behind it.
#[derive(Debug, Clone)]
pub struct Identity(pub Option<String>);

impl Identity {
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Read the `user` header, normalize it like any other input, and attach the
/// result to the request. An absent or blank header yields `Identity(None)`;
/// each handler decides what that means.
pub async fn identify(mut req: Request, next: Next) -> Response {
    let name = req
        .headers()
        .get(USER_HEADER)
        .map(|v| sanitize(&String::from_utf8_lossy(v.as_bytes())))
        .filter(|name| !name.is_empty());

    req.extensions_mut().insert(Identity(name));
    next.run(req).await
}
