use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, Result as SqlxResult};
use uuid::Uuid;

use super::accounts::AccountRole;
use crate::{db::Db, models::OutboxRow, pagination::LimitOffset};

/// E-mail waiting in `email_outbox`. Rendered by the sender at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboxMessage {
    AccountSetup {
        name: String,
        team_name: String,
        role: AccountRole,
        token: String,
    },
    Notification {
        receipt_id: Uuid,
        title: String,
        message: String,
    },
    SpectatorDecision {
        name: String,
        match_label: String,
        kickoff_at: DateTime<Utc>,
        approved: bool,
    },
    RegistrationDecision {
        captain_name: String,
        team_name: String,
        approved: bool,
        reason: Option<String>,
    },
}

impl OutboxMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboxMessage::AccountSetup { .. } => "account_setup",
            OutboxMessage::Notification { .. } => "notification",
            OutboxMessage::SpectatorDecision { .. } => "spectator_decision",
            OutboxMessage::RegistrationDecision { .. } => "registration_decision",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sending => "sending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Failed => "failed",
        }
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "sending" => Ok(OutboxStatus::Sending),
            "sent" => Ok(OutboxStatus::Sent),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct OutboxCounts {
    pub pending: i64,
    pub sending: i64,
    pub sent: i64,
    pub failed: i64,
}

/// How long a claimed message stays invisible to other workers.
const CLAIM_LEASE_SECONDS: f64 = 300.0;

#[derive(Clone)]
pub struct OutboxRepo {
    db: Db,
}

impl OutboxRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Queue a message inside the caller's transaction.
    pub async fn enqueue(
        conn: &mut PgConnection,
        recipient: &str,
        message: &OutboxMessage,
    ) -> SqlxResult<Uuid> {
        sqlx::query_scalar(
            r#"
            INSERT INTO email_outbox (recipient, kind, payload)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(recipient)
        .bind(message.kind())
        .bind(Json(message))
        .fetch_one(conn)
        .await
    }

    /// Fail messages whose lease expired while `sending` and that have no
    /// attempts left. The worker died mid-delivery on each of their attempts.
    pub async fn fail_abandoned(&self, max_attempts: i32) -> SqlxResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE email_outbox
            SET status = 'failed',
                last_error = COALESCE(last_error, 'delivery interrupted'),
                updated_at = NOW()
            WHERE status = 'sending' AND next_attempt_at <= NOW() AND attempts >= $1
            "#,
        )
        .bind(max_attempts)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Claim due messages that still have attempts left. Rows stuck in
    /// `sending` after a crash become due again once their lease expires.
    pub async fn claim_due(&self, limit: i64, max_attempts: i32) -> SqlxResult<Vec<OutboxRow>> {
        sqlx::query_as::<_, OutboxRow>(
            r#"
            UPDATE email_outbox
            SET status = 'sending',
                attempts = attempts + 1,
                next_attempt_at = NOW() + make_interval(secs => $2),
                updated_at = NOW()
            WHERE id IN (
                SELECT id FROM email_outbox
                WHERE status IN ('pending', 'sending') AND next_attempt_at <= NOW()
                  AND attempts < $3
                ORDER BY next_attempt_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, recipient, kind, payload, status, attempts, next_attempt_at,
                      last_error, sent_at, created_at, updated_at
            "#,
        )
        .bind(limit)
        .bind(CLAIM_LEASE_SECONDS)
        .bind(max_attempts)
        .fetch_all(&self.db)
        .await
    }

    pub async fn mark_sent(&self, id: Uuid) -> SqlxResult<()> {
        sqlx::query(
            r#"
            UPDATE email_outbox
            SET status = 'sent', sent_at = NOW(), last_error = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Record a delivery failure. Returns the resulting status: `pending`
    /// with a retry scheduled, or `failed` once `max_attempts` is reached.
    pub async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        retry_in_seconds: f64,
        max_attempts: i32,
    ) -> SqlxResult<OutboxStatus> {
        let status: String = sqlx::query_scalar(
            r#"
            UPDATE email_outbox
            SET status = CASE WHEN attempts >= $3 THEN 'failed' ELSE 'pending' END,
                last_error = $2,
                next_attempt_at = NOW() + make_interval(secs => $4),
                updated_at = NOW()
            WHERE id = $1
            RETURNING status
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(max_attempts)
        .bind(retry_in_seconds)
        .fetch_one(&self.db)
        .await?;

        Ok(status.parse().unwrap_or(OutboxStatus::Failed))
    }

    pub async fn counts(&self) -> SqlxResult<OutboxCounts> {
        sqlx::query_as::<_, OutboxCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'sending') AS sending,
                COUNT(*) FILTER (WHERE status = 'sent') AS sent,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed
            FROM email_outbox
            "#,
        )
        .fetch_one(&self.db)
        .await
    }

    pub async fn list(
        &self,
        status: Option<OutboxStatus>,
        page: Option<LimitOffset>,
    ) -> SqlxResult<Vec<OutboxRow>> {
        let p = page.unwrap_or_default();
        sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, recipient, kind, payload, status, attempts, next_attempt_at,
                   last_error, sent_at, created_at, updated_at
            FROM email_outbox
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.db)
        .await
    }

    /// Give failed messages a fresh set of attempts.
    pub async fn retry_failed(&self) -> SqlxResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE email_outbox
            SET status = 'pending', attempts = 0, next_attempt_at = NOW(), updated_at = NOW()
            WHERE status = 'failed'
            "#,
        )
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_payload_is_tagged_with_kind() {
        let message = OutboxMessage::RegistrationDecision {
            captain_name: "Inès Durand".to_string(),
            team_name: "Les Aigles".to_string(),
            approved: false,
            reason: Some("Dossier incomplet".to_string()),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["kind"], message.kind());

        let back: OutboxMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }
}
