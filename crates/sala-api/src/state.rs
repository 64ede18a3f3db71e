use std::sync::Arc;

use sala_db::Database;

use crate::error::ApiResult;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self { db })
    }
}

/// Run a blocking store call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    // Join and store failures are both logged when the error is rendered
    let result = tokio::task::spawn_blocking(move || f(&state.db)).await??;
    Ok(result)
}
