//! Session auto-completion sweep.
//!
//! A checked-in session finishes on its own once the lesson duration has
//! elapsed; no tutor action is required. Duration comes from the offer's
//! current lesson times when the offer still exists, falling back to the
//! copy stored on the monthly schedule.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::session::SessionDetail;
use crate::ports::{Notification, Notifier, OfferRepository, SessionRepository};

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub completed: usize,
    pub not_due: usize,
    pub skipped: usize,
}

pub struct SessionCompletionLoop {
    sessions: Arc<dyn SessionRepository>,
    offers: Arc<dyn OfferRepository>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    batch_size: u32,
}

impl SessionCompletionLoop {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        offers: Arc<dyn OfferRepository>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            sessions,
            offers,
            notifier,
            interval,
            batch_size,
        }
    }

    /// Runs until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "Session completion loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once(Timestamp::now()).await {
                        Ok(report) => debug!(?report, "Session sweep finished"),
                        Err(err) => error!(error = %err, "Session sweep failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Session completion loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One sweep, completing every open session whose duration has elapsed
    /// at `now`.
    pub async fn run_once(&self, now: Timestamp) -> Result<SweepReport, DomainError> {
        let open = self.sessions.find_open_details(self.batch_size).await?;
        let mut report = SweepReport::default();

        for detail in open {
            report.scanned += 1;
            if let Err(err) = self.sweep_one(detail, now, &mut report).await {
                warn!(error = %err, "Could not complete session; will retry next sweep");
                report.skipped += 1;
            }
        }

        Ok(report)
    }

    async fn sweep_one(
        &self,
        mut detail: SessionDetail,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), DomainError> {
        let Some(mut schedule) = self.sessions.find_schedule_by_id(&detail.schedule_id).await?
        else {
            warn!(
                detail_id = %detail.id,
                schedule_id = %detail.schedule_id,
                "Open session references a missing schedule; skipping"
            );
            report.skipped += 1;
            return Ok(());
        };

        let duration = match self.offers.find_by_id(&schedule.offer_id).await? {
            Some(offer) => offer.schedule.session_duration(),
            None => schedule.lesson_schedule.session_duration(),
        };
        if !detail.is_due_for_completion(duration, now) {
            report.not_due += 1;
            return Ok(());
        }

        detail.complete()?;
        self.sessions.update_detail(&detail).await?;
        // A schedule deactivated mid-day no longer counts sessions, but the
        // day itself still closes.
        match schedule.record_completed_session() {
            Ok(()) => self.sessions.update_schedule(&schedule).await?,
            Err(err) => warn!(schedule_id = %schedule.id, error = %err, "Session count not recorded"),
        }
        report.completed += 1;

        debug!(
            detail_id = %detail.id,
            schedule_id = %schedule.id,
            completed = schedule.sessions_completed,
            total = schedule.total_sessions,
            "Session auto-completed"
        );

        let data = json!({ "session_detail_id": detail.id, "schedule_id": schedule.id });
        let body = format!(
            "Session {} of {} for {} is complete",
            schedule.sessions_completed, schedule.total_sessions, schedule.child_name
        );
        for party in [schedule.tutor_id.clone(), schedule.parent_id.clone()] {
            self.notifier
                .notify(
                    Notification::new(party, "Session completed", body.clone())
                        .with_data(data.clone()),
                )
                .await;
        }

        Ok(())
    }
}
