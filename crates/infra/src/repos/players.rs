use chrono::Utc;
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

use super::accounts::AccountRole;
use super::outbox::{OutboxMessage, OutboxRepo};
use super::teams::TEAM_COLUMNS;
use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::fantasy::default_price;
use crate::models::{PlayerAccountRow, PlayerInfo, PlayerRow, Position, TeamRow};
use crate::pagination::LimitOffset;
use crate::roster::roster_errors;
use crate::tokens::{generate_token, setup_token_expiry};

const PLAYER_COLUMNS: &str = r#"
    id, team_id, first_name, last_name, email, phone, position, foot, jersey_number,
    birth_date, height_cm, weight_kg, created_at, updated_at
"#;

#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub team_id: Option<Uuid>,
    pub position: Option<Position>,
    pub search: Option<String>,
}

/// A player written to `players`, with its login account when it has an e-mail.
#[derive(Debug, Clone)]
pub struct MaterializedPlayer {
    pub player: PlayerRow,
    pub account: Option<PlayerAccountRow>,
}

#[derive(Clone)]
pub struct PlayerRepo {
    db: Db,
}

impl PlayerRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> SqlxResult<Option<PlayerRow>> {
        sqlx::query_as::<_, PlayerRow>(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    pub async fn list_by_team(&self, team_id: Uuid) -> SqlxResult<Vec<PlayerRow>> {
        sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE team_id = $1 ORDER BY jersey_number ASC"
        ))
        .bind(team_id)
        .fetch_all(&self.db)
        .await
    }

    pub async fn list(
        &self,
        filter: PlayerFilter,
        page: Option<LimitOffset>,
    ) -> SqlxResult<Vec<PlayerRow>> {
        let p = page.unwrap_or_default();
        let search = filter.search.map(|s| format!("%{}%", s.to_lowercase()));

        sqlx::query_as::<_, PlayerRow>(&format!(
            r#"
            SELECT {PLAYER_COLUMNS}
            FROM players
            WHERE ($1::uuid IS NULL OR team_id = $1)
              AND ($2::text IS NULL OR position = $2)
              AND ($3::text IS NULL OR LOWER(first_name || ' ' || last_name) LIKE $3)
            ORDER BY last_name ASC, first_name ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.team_id)
        .bind(filter.position.map(|p| p.as_str()))
        .bind(search)
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.db)
        .await
    }

    /// Add a player to an approved team, with account and setup e-mail.
    pub async fn add_to_team(&self, team_id: Uuid, info: PlayerInfo) -> RepoResult<MaterializedPlayer> {
        RepoError::validation(roster_errors(std::slice::from_ref(&info)))?;

        let mut tx = self.db.begin().await?;
        let team = sqlx::query_as::<_, TeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1 FOR UPDATE"
        ))
        .bind(team_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepoError::NotFound("team"))?;

        let created = materialize(&mut tx, &team, &info).await?;
        tx.commit().await?;

        tracing::info!(team_id = %team.id, player_id = %created.player.id, "player added to team");
        Ok(created)
    }

    /// Update a player and keep its account e-mail in step.
    pub async fn update(&self, id: Uuid, info: PlayerInfo) -> RepoResult<PlayerRow> {
        RepoError::validation(roster_errors(std::slice::from_ref(&info)))?;

        let mut tx = self.db.begin().await?;
        let player = sqlx::query_as::<_, PlayerRow>(&format!(
            r#"
            UPDATE players
            SET first_name = $2, last_name = $3, email = $4, phone = $5, position = $6,
                foot = $7, jersey_number = $8, birth_date = $9, height_cm = $10,
                weight_kg = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING {PLAYER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(info.first_name.trim())
        .bind(info.last_name.trim())
        .bind(info.email.as_deref().map(str::trim))
        .bind(&info.phone)
        .bind(info.position.as_str())
        .bind(info.foot.as_str())
        .bind(info.jersey_number)
        .bind(info.birth_date)
        .bind(info.height_cm)
        .bind(info.weight_kg)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepoError::on_unique(e, format!("Le numéro {} est déjà pris", info.jersey_number)))?
        .ok_or(RepoError::NotFound("player"))?;

        if let Some(email) = &player.email {
            let updated = sqlx::query(
                "UPDATE player_accounts SET email = $2, updated_at = NOW() WHERE player_id = $1",
            )
            .bind(player.id)
            .bind(email)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::on_unique(e, format!("L'adresse {email} a déjà un compte")))?;

            if updated.rows_affected() == 0 {
                let team_name: String = sqlx::query_scalar("SELECT name FROM teams WHERE id = $1")
                    .bind(player.team_id)
                    .fetch_one(&mut *tx)
                    .await?;
                create_account(&mut tx, &player, email, &team_name).await?;
            }
        }

        tx.commit().await?;
        Ok(player)
    }

    pub async fn delete(&self, id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query("DELETE FROM players WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Write one registered player into `players`, seed its fantasy price and,
/// when it has an e-mail, create its account and queue the setup e-mail.
pub(crate) async fn materialize(
    conn: &mut PgConnection,
    team: &TeamRow,
    info: &PlayerInfo,
) -> RepoResult<MaterializedPlayer> {
    let player = sqlx::query_as::<_, PlayerRow>(&format!(
        r#"
        INSERT INTO players (team_id, first_name, last_name, email, phone, position, foot,
                             jersey_number, birth_date, height_cm, weight_kg)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {PLAYER_COLUMNS}
        "#
    ))
    .bind(team.id)
    .bind(info.first_name.trim())
    .bind(info.last_name.trim())
    .bind(info.email.as_deref().map(str::trim))
    .bind(&info.phone)
    .bind(info.position.as_str())
    .bind(info.foot.as_str())
    .bind(info.jersey_number)
    .bind(info.birth_date)
    .bind(info.height_cm)
    .bind(info.weight_kg)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepoError::on_unique(e, format!("Le numéro {} est déjà pris", info.jersey_number)))?;

    sqlx::query("INSERT INTO fantasy_player_stats (player_id, price_tenths) VALUES ($1, $2)")
        .bind(player.id)
        .bind(default_price(info.position).tenths())
        .execute(&mut *conn)
        .await?;

    let account = match player.email.clone() {
        Some(email) => Some(create_account(conn, &player, &email, &team.name).await?),
        None => None,
    };

    Ok(MaterializedPlayer { player, account })
}

async fn create_account(
    conn: &mut PgConnection,
    player: &PlayerRow,
    email: &str,
    team_name: &str,
) -> RepoResult<PlayerAccountRow> {
    let token = generate_token();
    let account = sqlx::query_as::<_, PlayerAccountRow>(
        r#"
        INSERT INTO player_accounts (player_id, team_id, email, setup_token, setup_token_expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, player_id, team_id, email, password_hash, setup_token,
                  setup_token_expires_at, created_at, updated_at
        "#,
    )
    .bind(player.id)
    .bind(player.team_id)
    .bind(email)
    .bind(&token)
    .bind(setup_token_expiry(Utc::now()))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepoError::on_unique(e, format!("L'adresse {email} a déjà un compte")))?;

    OutboxRepo::enqueue(
        conn,
        email,
        &OutboxMessage::AccountSetup {
            name: format!("{} {}", player.first_name, player.last_name),
            team_name: team_name.to_string(),
            role: AccountRole::Player,
            token,
        },
    )
    .await?;

    Ok(account)
}
