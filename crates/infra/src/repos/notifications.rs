use sqlx::{FromRow, Result as SqlxResult};
use uuid::Uuid;

use super::outbox::{OutboxMessage, OutboxRepo};
use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::models::NotificationRow;
use crate::pagination::LimitOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    AllPlayers,
    AllCoaches,
    Team(Uuid),
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::AllPlayers => "all_players",
            Audience::AllCoaches => "all_coaches",
            Audience::Team(_) => "team",
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            Audience::Team(id) => Some(*id),
            _ => None,
        }
    }
}

impl NotificationRow {
    pub fn audience(&self) -> Option<Audience> {
        match (self.audience.as_str(), self.team_id) {
            ("all_players", _) => Some(Audience::AllPlayers),
            ("all_coaches", _) => Some(Audience::AllCoaches),
            ("team", Some(team_id)) => Some(Audience::Team(team_id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct NotificationStats {
    pub notification_id: Uuid,
    pub recipients: i64,
    pub opened: i64,
}

impl NotificationStats {
    pub fn open_rate(&self) -> f64 {
        if self.recipients == 0 {
            0.0
        } else {
            self.opened as f64 / self.recipients as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub notification: NotificationRow,
    pub recipients: usize,
}

#[derive(Clone)]
pub struct NotificationRepo {
    db: Db,
}

impl NotificationRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> SqlxResult<Option<NotificationRow>> {
        sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, title, message, audience, team_id, created_by, created_at
            FROM notifications WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    pub async fn list(&self, page: Option<LimitOffset>) -> SqlxResult<Vec<NotificationRow>> {
        let p = page.unwrap_or_default();
        sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, title, message, audience, team_id, created_by, created_at
            FROM notifications
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.db)
        .await
    }

    /// Store the notification with one receipt and one queued e-mail per
    /// recipient address.
    pub async fn send(
        &self,
        title: &str,
        message: &str,
        audience: Audience,
        created_by: Option<Uuid>,
    ) -> RepoResult<SentNotification> {
        let mut errors = Vec::new();
        if title.trim().is_empty() {
            errors.push("Le titre est obligatoire".to_string());
        }
        if message.trim().is_empty() {
            errors.push("Le message est obligatoire".to_string());
        }
        RepoError::validation(errors)?;

        let mut tx = self.db.begin().await?;

        let recipients: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT LOWER(email) FROM (
                SELECT email, team_id, 'player' AS role FROM player_accounts
                UNION ALL
                SELECT email, team_id, 'coach' AS role FROM coach_accounts
            ) a
            WHERE CASE $1::text
                WHEN 'all_players' THEN a.role = 'player'
                WHEN 'all_coaches' THEN a.role = 'coach'
                ELSE a.team_id = $2::uuid
            END
            "#,
        )
        .bind(audience.as_str())
        .bind(audience.team_id())
        .fetch_all(&mut *tx)
        .await?;

        if recipients.is_empty() {
            return Err(RepoError::InvalidState(
                "no account matches this audience".to_string(),
            ));
        }

        let notification = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (title, message, audience, team_id, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, message, audience, team_id, created_by, created_at
            "#,
        )
        .bind(title.trim())
        .bind(message.trim())
        .bind(audience.as_str())
        .bind(audience.team_id())
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for email in &recipients {
            let receipt_id: Uuid = sqlx::query_scalar(
                "INSERT INTO notification_receipts (notification_id, email) VALUES ($1, $2) RETURNING id",
            )
            .bind(notification.id)
            .bind(email)
            .fetch_one(&mut *tx)
            .await?;

            OutboxRepo::enqueue(
                &mut tx,
                email,
                &OutboxMessage::Notification {
                    receipt_id,
                    title: notification.title.clone(),
                    message: notification.message.clone(),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            notification_id = %notification.id,
            audience = audience.as_str(),
            recipients = recipients.len(),
            "notification queued"
        );
        Ok(SentNotification {
            notification,
            recipients: recipients.len(),
        })
    }

    pub async fn stats(&self, id: Uuid) -> SqlxResult<NotificationStats> {
        sqlx::query_as::<_, NotificationStats>(
            r#"
            SELECT $1::uuid AS notification_id,
                   COUNT(*) AS recipients,
                   COUNT(opened_at) AS opened
            FROM notification_receipts
            WHERE notification_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
    }

    /// First open wins. Returns false for an unknown receipt.
    pub async fn mark_opened(&self, receipt_id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            "UPDATE notification_receipts SET opened_at = COALESCE(opened_at, NOW()) WHERE id = $1",
        )
        .bind(receipt_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
