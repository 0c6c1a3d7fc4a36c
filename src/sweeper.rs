use std::{sync::Arc, time::Duration};

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{CollabError, CollabResult};
use crate::invitations::store;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedExpiry {
    pub invitation_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: Vec<Uuid>,
    /// Candidates resolved by another actor between selection and update.
    pub skipped: Vec<Uuid>,
    pub failed: Vec<FailedExpiry>,
}

impl SweepReport {
    pub fn expired_count(&self) -> usize {
        self.expired.len()
    }
}

/// Runs `expire` for every candidate. A failing record is recorded and the
/// batch moves on.
pub fn sweep_batch<F>(candidates: Vec<Uuid>, mut expire: F) -> SweepReport
where
    F: FnMut(Uuid) -> CollabResult<bool>,
{
    let mut report = SweepReport::default();
    for id in candidates {
        match expire(id) {
            Ok(true) => report.expired.push(id),
            Ok(false) => report.skipped.push(id),
            Err(err) => {
                warn!(invitation_id = %id, error = %err, "failed to expire invitation");
                report.failed.push(FailedExpiry {
                    invitation_id: id,
                    error: err.to_string(),
                });
            }
        }
    }
    report
}

/// Validates an expiry window given in days. The window must be positive and
/// its cutoff must be representable relative to the current time.
pub fn expiry_window(days: i64) -> CollabResult<ChronoDuration> {
    if days <= 0 {
        return Err(CollabError::invalid("expiry_days must be positive"));
    }
    let window = ChronoDuration::try_days(days)
        .ok_or_else(|| CollabError::invalid("expiry_days is out of range"))?;
    expiry_cutoff(Utc::now().naive_utc(), window)?;
    Ok(window)
}

fn expiry_cutoff(now: NaiveDateTime, window: ChronoDuration) -> CollabResult<NaiveDateTime> {
    now.checked_sub_signed(window)
        .ok_or_else(|| CollabError::invalid("expiry window is out of range"))
}

/// Expires PENDING invitations created before `now - window`. Never creates a
/// grant or edge, and is safe to run concurrently with itself.
pub fn run_expiry_sweep_at(
    conn: &mut PgConnection,
    now: NaiveDateTime,
    window: ChronoDuration,
) -> CollabResult<SweepReport> {
    let cutoff = expiry_cutoff(now, window)?;
    let candidates = store::stale_pending_ids(conn, cutoff)?;
    if candidates.is_empty() {
        return Ok(SweepReport::default());
    }

    let report = sweep_batch(candidates, |id| store::expire_if_pending(conn, id, now));
    info!(
        expired = report.expired.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        %cutoff,
        "expiry sweep finished"
    );
    Ok(report)
}

pub fn run_expiry_sweep(
    conn: &mut PgConnection,
    window: ChronoDuration,
) -> CollabResult<SweepReport> {
    run_expiry_sweep_at(conn, Utc::now().naive_utc(), window)
}

pub struct ExpirySweeper {
    state: Arc<AppState>,
    interval: Duration,
    window: ChronoDuration,
}

impl ExpirySweeper {
    pub fn new(state: Arc<AppState>, interval: Duration, window: ChronoDuration) -> Self {
        Self {
            state,
            interval,
            window,
        }
    }

    pub fn from_config(state: Arc<AppState>) -> Self {
        let interval = state.config.sweep_interval();
        let window = state.config.expiry_window();
        Self::new(state, interval, window)
    }

    pub async fn run(&self) {
        info!(
            interval_secs = self.interval.as_secs(),
            window_days = self.window.num_days(),
            "expiry sweeper started"
        );
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.tick().await {
                error!(error = %err, "expiry sweep failed");
            }
        }
    }

    pub async fn tick(&self) -> anyhow::Result<SweepReport> {
        let window = self.window;
        self.state
            .with_blocking_conn(move |conn| Ok(run_expiry_sweep(conn, window)?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollabError;

    #[test]
    fn failing_record_does_not_stop_the_batch() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let broken = ids[1];

        let report = sweep_batch(ids.clone(), |id| {
            if id == broken {
                Err(CollabError::CorruptRecord("simulated".into()))
            } else {
                Ok(true)
            }
        });

        assert_eq!(report.expired, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].invitation_id, broken);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn already_resolved_candidates_are_skipped_not_failed() {
        let ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let report = sweep_batch(ids.clone(), |id| Ok(id != ids[0]));

        assert_eq!(report.skipped, vec![ids[0]]);
        assert_eq!(report.expired, vec![ids[1]]);
        assert_eq!(report.expired_count(), 1);
    }

    #[test]
    fn empty_batch_reports_nothing() {
        let report = sweep_batch(Vec::new(), |_| -> CollabResult<bool> {
            panic!("no candidates to expire")
        });
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn expiry_window_rejects_non_positive_and_oversized_days() {
        assert_eq!(expiry_window(7).ok(), Some(ChronoDuration::days(7)));
        assert!(matches!(expiry_window(0), Err(CollabError::InvalidRequest(_))));
        assert!(matches!(expiry_window(-3), Err(CollabError::InvalidRequest(_))));
        assert!(matches!(expiry_window(100_000_000), Err(CollabError::InvalidRequest(_))));
        assert!(matches!(expiry_window(i64::MAX), Err(CollabError::InvalidRequest(_))));
    }

    #[test]
    fn unrepresentable_cutoff_is_an_error() {
        let now = Utc::now().naive_utc();
        assert!(matches!(
            expiry_cutoff(now, ChronoDuration::MAX),
            Err(CollabError::InvalidRequest(_))
        ));
        assert_eq!(
            expiry_cutoff(now, ChronoDuration::days(1)).ok(),
            Some(now - ChronoDuration::days(1))
        );
    }
}
