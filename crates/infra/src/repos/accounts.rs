use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Result as SqlxResult};
use uuid::Uuid;

use super::outbox::{OutboxMessage, OutboxRepo};
use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::tokens::{generate_token, setup_token_expiry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Admin,
    Player,
    Coach,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Admin => "admin",
            AccountRole::Player => "player",
            AccountRole::Coach => "coach",
        }
    }
}

impl FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AccountRole::Admin),
            "player" => Ok(AccountRole::Player),
            "coach" => Ok(AccountRole::Coach),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Credentials of any kind of account, admins included.
#[derive(Debug, Clone, FromRow)]
pub struct LoginRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub team_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct SetupTarget {
    email: String,
    name: String,
    team_name: String,
}

const LOGIN_UNION: &str = r#"
    SELECT id, email, password_hash, 'admin' AS role, NULL::uuid AS team_id, is_active, 0 AS rank
    FROM users
    UNION ALL
    SELECT id, email, password_hash, 'player' AS role, team_id, TRUE AS is_active, 1 AS rank
    FROM player_accounts
    UNION ALL
    SELECT id, email, password_hash, 'coach' AS role, team_id, TRUE AS is_active, 2 AS rank
    FROM coach_accounts
"#;

#[derive(Clone)]
pub struct AccountRepo {
    db: Db,
}

impl AccountRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn find_login(&self, email: &str) -> SqlxResult<Option<LoginRow>> {
        sqlx::query_as::<_, LoginRow>(&format!(
            "SELECT * FROM ({LOGIN_UNION}) a WHERE LOWER(a.email) = LOWER($1) ORDER BY a.rank LIMIT 1"
        ))
        .bind(email.trim())
        .fetch_optional(&self.db)
        .await
    }

    pub async fn get_login(&self, id: Uuid) -> SqlxResult<Option<LoginRow>> {
        sqlx::query_as::<_, LoginRow>(&format!(
            "SELECT * FROM ({LOGIN_UNION}) a WHERE a.id = $1 ORDER BY a.rank LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    /// Player and coach accounts, optionally for one team.
    pub async fn list(&self, team_id: Option<Uuid>) -> SqlxResult<Vec<AccountSummary>> {
        sqlx::query_as::<_, AccountSummary>(
            r#"
            SELECT * FROM (
                SELECT pa.id, pa.email, 'player' AS role,
                       p.first_name || ' ' || p.last_name AS name,
                       pa.team_id, t.name AS team_name,
                       pa.password_hash IS NOT NULL AS has_password, pa.created_at
                FROM player_accounts pa
                JOIN players p ON p.id = pa.player_id
                JOIN teams t ON t.id = pa.team_id
                UNION ALL
                SELECT ca.id, ca.email, 'coach' AS role,
                       ca.first_name || ' ' || ca.last_name AS name,
                       ca.team_id, t.name AS team_name,
                       ca.password_hash IS NOT NULL AS has_password, ca.created_at
                FROM coach_accounts ca
                JOIN teams t ON t.id = ca.team_id
            ) a
            WHERE ($1::uuid IS NULL OR a.team_id = $1)
            ORDER BY a.team_name, a.role DESC, a.name
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.db)
        .await
    }

    /// Store the password of a player or coach from a setup link.
    pub async fn complete_setup(&self, token: &str, password_hash: &str) -> RepoResult<LoginRow> {
        for (table, role) in [("player_accounts", "player"), ("coach_accounts", "coach")] {
            let row = sqlx::query_as::<_, LoginRow>(&format!(
                r#"
                UPDATE {table}
                SET password_hash = $2, setup_token = NULL, setup_token_expires_at = NULL,
                    updated_at = NOW()
                WHERE setup_token = $1 AND setup_token_expires_at > NOW()
                RETURNING id, email, password_hash, '{role}' AS role, team_id, TRUE AS is_active
                "#
            ))
            .bind(token)
            .bind(password_hash)
            .fetch_optional(&self.db)
            .await?;

            if let Some(row) = row {
                return Ok(row);
            }
        }
        Err(RepoError::NotFound("setup token"))
    }

    /// Issue a new setup link for an account, by id (admin resend) or by
    /// e-mail (forgotten password). Returns the address the link goes to.
    pub async fn reissue_setup(
        &self,
        account_id: Option<Uuid>,
        email: Option<&str>,
    ) -> RepoResult<String> {
        if account_id.is_none() && email.is_none() {
            return Err(RepoError::InvalidState(
                "an account id or an e-mail is required".to_string(),
            ));
        }

        let token = generate_token();
        let expires_at = setup_token_expiry(Utc::now());
        let mut tx = self.db.begin().await?;

        let player = sqlx::query_as::<_, SetupTarget>(
            r#"
            UPDATE player_accounts pa
            SET setup_token = $3, setup_token_expires_at = $4, updated_at = NOW()
            FROM players p, teams t
            WHERE p.id = pa.player_id AND t.id = pa.team_id
              AND ($1::uuid IS NULL OR pa.id = $1)
              AND ($2::text IS NULL OR LOWER(pa.email) = LOWER($2))
            RETURNING pa.email, p.first_name || ' ' || p.last_name AS name, t.name AS team_name
            "#,
        )
        .bind(account_id)
        .bind(email)
        .bind(&token)
        .bind(expires_at)
        .fetch_optional(&mut *tx)
        .await?;

        let (target, role) = match player {
            Some(target) => (target, AccountRole::Player),
            None => {
                let coach = sqlx::query_as::<_, SetupTarget>(
                    r#"
                    UPDATE coach_accounts ca
                    SET setup_token = $3, setup_token_expires_at = $4, updated_at = NOW()
                    FROM teams t
                    WHERE t.id = ca.team_id
                      AND ($1::uuid IS NULL OR ca.id = $1)
                      AND ($2::text IS NULL OR LOWER(ca.email) = LOWER($2))
                    RETURNING ca.email, ca.first_name || ' ' || ca.last_name AS name, t.name AS team_name
                    "#,
                )
                .bind(account_id)
                .bind(email)
                .bind(&token)
                .bind(expires_at)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepoError::NotFound("account"))?;
                (coach, AccountRole::Coach)
            }
        };

        OutboxRepo::enqueue(
            &mut tx,
            &target.email,
            &OutboxMessage::AccountSetup {
                name: target.name,
                team_name: target.team_name,
                role,
                token,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(target.email)
    }
}
