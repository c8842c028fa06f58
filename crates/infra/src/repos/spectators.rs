use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Result as SqlxResult};
use uuid::Uuid;

use super::outbox::{OutboxMessage, OutboxRepo};
use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::models::SpectatorRequestRow;
use crate::pagination::LimitOffset;
use crate::text::looks_like_email;

const REQUEST_COLUMNS: &str = r#"
    id, match_id, first_name, last_name, email, phone, status, checked_in, checked_in_at,
    created_at, updated_at
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectatorStatus {
    Pending,
    Approved,
    Rejected,
}

impl SpectatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpectatorStatus::Pending => "pending",
            SpectatorStatus::Approved => "approved",
            SpectatorStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for SpectatorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SpectatorStatus::Pending),
            "approved" => Ok(SpectatorStatus::Approved),
            "rejected" => Ok(SpectatorStatus::Rejected),
            other => Err(format!("unknown spectator status: {other}")),
        }
    }
}

impl SpectatorRequestRow {
    pub fn status(&self) -> SpectatorStatus {
        self.status.parse().unwrap_or(SpectatorStatus::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct SpectatorIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl SpectatorIdentity {
    fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            errors.push("Le nom et le prénom sont obligatoires".to_string());
        }
        if !looks_like_email(&self.email) {
            errors.push("L'adresse e-mail est invalide".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpectatorFilter {
    pub match_id: Option<Uuid>,
    pub status: Option<SpectatorStatus>,
    pub checked_in: Option<bool>,
}

/// Capacity of a match. `max_spectators == None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectatorLimit {
    pub match_id: Uuid,
    pub max_spectators: Option<i32>,
    pub approved: i64,
}

impl SpectatorLimit {
    pub fn remaining(&self) -> Option<i64> {
        self.max_spectators
            .map(|max| (i64::from(max) - self.approved).max(0))
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == Some(0)
    }
}

#[derive(Debug, Clone, FromRow)]
struct MatchHeader {
    status: String,
    kickoff_at: DateTime<Utc>,
    label: String,
}

#[derive(Clone)]
pub struct SpectatorRepo {
    db: Db,
}

impl SpectatorRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> SqlxResult<Option<SpectatorRequestRow>> {
        sqlx::query_as::<_, SpectatorRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM spectator_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    pub async fn list(
        &self,
        filter: SpectatorFilter,
        page: Option<LimitOffset>,
    ) -> SqlxResult<Vec<SpectatorRequestRow>> {
        let p = page.unwrap_or_default();
        sqlx::query_as::<_, SpectatorRequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM spectator_requests
            WHERE ($1::uuid IS NULL OR match_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::bool IS NULL OR checked_in = $3)
            ORDER BY created_at ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.match_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.checked_in)
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.db)
        .await
    }

    /// Public request for a seat. Refused once the match is full.
    pub async fn submit(
        &self,
        match_id: Uuid,
        identity: SpectatorIdentity,
    ) -> RepoResult<SpectatorRequestRow> {
        RepoError::validation(identity.errors())?;

        let mut tx = self.db.begin().await?;
        let header = lock_match(&mut tx, match_id).await?;
        if header.status == "played" {
            return Err(RepoError::InvalidState(format!(
                "match {match_id} has already been played"
            )));
        }

        if limit_of(&mut tx, match_id).await?.is_full() {
            tracing::warn!(match_id = %match_id, "spectator request refused, match is full");
            return Err(RepoError::CapacityReached(match_id));
        }

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM spectator_requests
                WHERE match_id = $1 AND LOWER(email) = LOWER($2) AND status <> 'rejected'
            )
            "#,
        )
        .bind(match_id)
        .bind(identity.email.trim())
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(RepoError::Conflict(format!(
                "Une demande existe déjà pour {} sur ce match",
                identity.email.trim()
            )));
        }

        let row = sqlx::query_as::<_, SpectatorRequestRow>(&format!(
            r#"
            INSERT INTO spectator_requests (match_id, first_name, last_name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(match_id)
        .bind(identity.first_name.trim())
        .bind(identity.last_name.trim())
        .bind(identity.email.trim())
        .bind(identity.phone)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row)
    }

    /// Approve a pending request. The match row is locked while approved
    /// requests are counted, so two approvals cannot both take the last seat.
    pub async fn approve(&self, id: Uuid) -> RepoResult<SpectatorRequestRow> {
        let mut tx = self.db.begin().await?;
        let request = lock_request(&mut tx, id).await?;

        match request.status() {
            SpectatorStatus::Approved => return Ok(request),
            SpectatorStatus::Rejected => {
                return Err(RepoError::InvalidState(format!(
                    "spectator request {id} was rejected"
                )))
            }
            SpectatorStatus::Pending => {}
        }

        let header = lock_match(&mut tx, request.match_id).await?;
        if limit_of(&mut tx, request.match_id).await?.is_full() {
            tracing::warn!(match_id = %request.match_id, request_id = %id, "spectator capacity reached");
            return Err(RepoError::CapacityReached(request.match_id));
        }

        let row = set_status(&mut tx, id, SpectatorStatus::Approved).await?;
        enqueue_decision(&mut tx, &row, &header, true).await?;
        tx.commit().await?;

        tracing::info!(request_id = %id, match_id = %row.match_id, "spectator approved");
        Ok(row)
    }

    pub async fn reject(&self, id: Uuid) -> RepoResult<SpectatorRequestRow> {
        let mut tx = self.db.begin().await?;
        let request = lock_request(&mut tx, id).await?;

        if request.status() == SpectatorStatus::Rejected {
            return Ok(request);
        }
        if request.checked_in {
            return Err(RepoError::InvalidState(format!(
                "spectator request {id} is already checked in"
            )));
        }

        let header = lock_match(&mut tx, request.match_id).await?;
        let row = set_status(&mut tx, id, SpectatorStatus::Rejected).await?;
        enqueue_decision(&mut tx, &row, &header, false).await?;
        tx.commit().await?;

        tracing::info!(request_id = %id, match_id = %row.match_id, "spectator rejected");
        Ok(row)
    }

    /// Mark an approved spectator as arrived. A second check-in keeps the
    /// first timestamp.
    pub async fn check_in(&self, id: Uuid) -> RepoResult<SpectatorRequestRow> {
        let mut tx = self.db.begin().await?;
        let request = lock_request(&mut tx, id).await?;

        if request.status() != SpectatorStatus::Approved {
            return Err(RepoError::InvalidState(format!(
                "spectator request {id} is {}, only approved spectators can check in",
                request.status
            )));
        }
        if request.checked_in {
            return Ok(request);
        }

        let row = sqlx::query_as::<_, SpectatorRequestRow>(&format!(
            r#"
            UPDATE spectator_requests
            SET checked_in = TRUE, checked_in_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn get_limit(&self, match_id: Uuid) -> RepoResult<SpectatorLimit> {
        let mut conn = self.db.acquire().await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM matches WHERE id = $1)")
            .bind(match_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            return Err(RepoError::NotFound("match"));
        }
        Ok(limit_of(&mut conn, match_id).await?)
    }

    /// `None` removes the limit. A limit below the number of already
    /// approved spectators is refused.
    pub async fn set_limit(
        &self,
        match_id: Uuid,
        max_spectators: Option<i32>,
    ) -> RepoResult<SpectatorLimit> {
        let mut tx = self.db.begin().await?;
        lock_match(&mut tx, match_id).await?;
        let current = limit_of(&mut tx, match_id).await?;

        match max_spectators {
            Some(max) if max < 0 => {
                return Err(RepoError::Validation(vec![
                    "La capacité ne peut pas être négative".to_string(),
                ]))
            }
            Some(max) if i64::from(max) < current.approved => {
                return Err(RepoError::InvalidState(format!(
                    "{} spectators are already approved for match {match_id}",
                    current.approved
                )))
            }
            Some(max) => {
                sqlx::query(
                    r#"
                    INSERT INTO spectator_limits (match_id, max_spectators)
                    VALUES ($1, $2)
                    ON CONFLICT (match_id) DO UPDATE
                    SET max_spectators = EXCLUDED.max_spectators, updated_at = NOW()
                    "#,
                )
                .bind(match_id)
                .bind(max)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM spectator_limits WHERE match_id = $1")
                    .bind(match_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;

        Ok(SpectatorLimit {
            max_spectators,
            ..current
        })
    }
}

async fn lock_match(conn: &mut PgConnection, match_id: Uuid) -> RepoResult<MatchHeader> {
    sqlx::query_as::<_, MatchHeader>(
        r#"
        SELECT m.status, m.kickoff_at, h.name || ' - ' || a.name AS label
        FROM matches m
        JOIN teams h ON h.id = m.home_team_id
        JOIN teams a ON a.id = m.away_team_id
        WHERE m.id = $1
        FOR UPDATE OF m
        "#,
    )
    .bind(match_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepoError::NotFound("match"))
}

async fn lock_request(conn: &mut PgConnection, id: Uuid) -> RepoResult<SpectatorRequestRow> {
    sqlx::query_as::<_, SpectatorRequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM spectator_requests WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepoError::NotFound("spectator request"))
}

async fn limit_of(conn: &mut PgConnection, match_id: Uuid) -> SqlxResult<SpectatorLimit> {
    let (max_spectators, approved): (Option<i32>, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT max_spectators FROM spectator_limits WHERE match_id = $1),
            (SELECT COUNT(*) FROM spectator_requests WHERE match_id = $1 AND status = 'approved')
        "#,
    )
    .bind(match_id)
    .fetch_one(conn)
    .await?;

    Ok(SpectatorLimit {
        match_id,
        max_spectators,
        approved,
    })
}

async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: SpectatorStatus,
) -> SqlxResult<SpectatorRequestRow> {
    sqlx::query_as::<_, SpectatorRequestRow>(&format!(
        r#"
        UPDATE spectator_requests
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.as_str())
    .fetch_one(conn)
    .await
}

async fn enqueue_decision(
    conn: &mut PgConnection,
    row: &SpectatorRequestRow,
    header: &MatchHeader,
    approved: bool,
) -> SqlxResult<Uuid> {
    OutboxRepo::enqueue(
        conn,
        &row.email,
        &OutboxMessage::SpectatorDecision {
            name: format!("{} {}", row.first_name, row.last_name),
            match_label: header.label.clone(),
            kickoff_at: header.kickoff_at,
            approved,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_seats() {
        let limit = SpectatorLimit {
            match_id: Uuid::new_v4(),
            max_spectators: Some(30),
            approved: 12,
        };
        assert_eq!(limit.remaining(), Some(18));
        assert!(!limit.is_full());

        let full = SpectatorLimit {
            approved: 30,
            ..limit
        };
        assert_eq!(full.remaining(), Some(0));
        assert!(full.is_full());
    }

    #[test]
    fn test_no_limit_is_never_full() {
        let limit = SpectatorLimit {
            match_id: Uuid::new_v4(),
            max_spectators: None,
            approved: 500,
        };
        assert_eq!(limit.remaining(), None);
        assert!(!limit.is_full());
    }

    #[test]
    fn test_identity_errors() {
        let identity = SpectatorIdentity {
            first_name: "".to_string(),
            last_name: "Roux".to_string(),
            email: "roux.example.fr".to_string(),
            phone: None,
        };
        assert_eq!(identity.errors().len(), 2);
    }
}
