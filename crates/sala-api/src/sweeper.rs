use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sala_db::Database;
use sala_types::models::{BROADCAST, LEAVE_TEXT, MessageKind};

use crate::messages::new_row;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Time between passes.
    pub interval: Duration,
    /// A participant whose last heartbeat is at least this old is evicted.
    pub stale_after: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            stale_after: Duration::from_secs(10),
        }
    }
}

/// Background task that evicts inactive participants.
///
/// Runs on an interval until `shutdown` is cancelled. A failed pass is logged
/// and the next tick simply tries again.
pub async fn run_sweep_loop(state: AppState, config: SweepConfig, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(config.interval);
    info!(
        "Sweeper started (every {:?}, stale after {:?})",
        config.interval, config.stale_after
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let now = chrono::Utc::now().timestamp_millis();
        let db_state = state.clone();
        let pass = tokio::task::spawn_blocking(move || {
            sweep_stale(&db_state.db, now, config.stale_after)
        });

        match pass.await {
            Ok(Ok(evicted)) => {
                if !evicted.is_empty() {
                    info!("Sweep: evicted {} participant(s)", evicted.len());
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {:#}", e),
            Err(e) => error!("Sweep task join error: {}", e),
        }
    }

    info!("Sweeper stopped");
}

/// One sweep pass at time `now_ms`. Returns the names that were evicted.
///
/// Each eviction removes the participant and appends its departure notice in
/// one transaction, keyed on the `last_status` read here; a participant whose
/// heartbeat arrives mid-pass is skipped. A failure on one participant does
/// not stop the pass.
pub fn sweep_stale(db: &Database, now_ms: i64, stale_after: Duration) -> anyhow::Result<Vec<String>> {
    let cutoff = now_ms - i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);
    let stale = db.stale_participants(cutoff)?;

    let mut evicted = Vec::with_capacity(stale.len());
    for participant in stale {
        let departure = new_row(&participant.name, BROADCAST, LEAVE_TEXT, MessageKind::Status);
        match db.evict_participant(&participant.name, participant.last_status, &departure) {
            Ok(true) => {
                info!("{} left (inactive)", participant.name);
                evicted.push(participant.name);
            }
            Ok(false) => debug!("{} sent a heartbeat during the sweep, kept", participant.name),
            Err(e) => warn!("Failed to evict {}: {:#}", participant.name, e),
        }
    }

    Ok(evicted)
}
