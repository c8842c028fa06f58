use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use super::templates::render;
use crate::AppState;
use infra::models::OutboxRow;
use infra::repos::{OutboxMessage, OutboxRepo, OutboxStatus};

const BATCH_SIZE: i64 = 20;
const BASE_RETRY_SECONDS: f64 = 30.0;
const MAX_RETRY_SECONDS: f64 = 3600.0;

/// Delay before the next attempt after `attempts` failures: 30s, 60s, 120s…
pub fn retry_delay(attempts: i32) -> f64 {
    let exponent = attempts.saturating_sub(1).clamp(0, 16);
    (BASE_RETRY_SECONDS * 2f64.powi(exponent)).min(MAX_RETRY_SECONDS)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
}

pub struct OutboxService {
    state: AppState,
    interval: Interval,
}

impl OutboxService {
    pub fn new(state: AppState) -> Self {
        let mut interval = interval(state.config.outbox_poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { state, interval }
    }

    /// Start the background delivery loop
    pub async fn run(&mut self) {
        info!(
            every = ?self.state.config.outbox_poll_interval,
            "Starting e-mail outbox service"
        );

        loop {
            self.interval.tick().await;

            match self.process_batch().await {
                Ok(report) if report != BatchReport::default() => {
                    info!(
                        sent = report.sent,
                        retried = report.retried,
                        failed = report.failed,
                        "outbox batch processed"
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Error processing e-mail outbox: {}", e),
            }
        }
    }

    /// Claim due messages and try each once.
    pub async fn process_batch(&self) -> Result<BatchReport, sqlx::Error> {
        let repo = OutboxRepo::new(self.state.db.clone());
        let max_attempts = self.state.config.outbox_max_attempts;
        let mut report = BatchReport {
            failed: repo.fail_abandoned(max_attempts).await? as usize,
            ..BatchReport::default()
        };
        if report.failed > 0 {
            warn!(count = report.failed, "giving up on e-mails interrupted mid-delivery");
        }

        for row in repo.claim_due(BATCH_SIZE, max_attempts).await? {
            match self.deliver(&row).await {
                Ok(()) => {
                    repo.mark_sent(row.id).await?;
                    report.sent += 1;
                }
                Err(reason) => {
                    let status = repo
                        .mark_failed(
                            row.id,
                            &reason,
                            retry_delay(row.attempts),
                            max_attempts,
                        )
                        .await?;
                    if status == OutboxStatus::Failed {
                        error!(
                            outbox_id = %row.id,
                            kind = %row.kind,
                            attempts = row.attempts,
                            "Giving up on e-mail: {}",
                            reason
                        );
                        report.failed += 1;
                    } else {
                        warn!(
                            outbox_id = %row.id,
                            kind = %row.kind,
                            attempts = row.attempts,
                            "E-mail delivery failed, will retry: {}",
                            reason
                        );
                        report.retried += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn deliver(&self, row: &OutboxRow) -> Result<(), String> {
        let message: OutboxMessage = serde_json::from_value(row.payload.clone())
            .map_err(|e| format!("unreadable payload: {e}"))?;
        let email = render(&row.recipient, &message, &self.state.config.public_base_url);

        self.state
            .mailer()
            .send(&email)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Spawn the outbox service as a background task
pub fn spawn_outbox_service(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut service = OutboxService::new(state);
        service.run().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(1), 30.0);
        assert_eq!(retry_delay(2), 60.0);
        assert_eq!(retry_delay(3), 120.0);
        assert_eq!(retry_delay(12), MAX_RETRY_SECONDS);
        assert_eq!(retry_delay(0), 30.0);
    }
}
