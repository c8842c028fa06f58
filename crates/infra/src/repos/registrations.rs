use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

use super::accounts::AccountRole;
use super::outbox::{OutboxMessage, OutboxRepo};
use super::players::{materialize, MaterializedPlayer};
use super::teams::TEAM_COLUMNS;
use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::models::{CoachAccountRow, Contact, PlayerInfo, TeamRegistrationRow, TeamRow};
use crate::pagination::LimitOffset;
use crate::roster::{contact_errors, roster_errors};
use crate::tokens::{generate_token, setup_token_expiry};

const REGISTRATION_COLUMNS: &str = r#"
    id, team_name, school, grade, captain_first_name, captain_last_name, captain_email,
    captain_phone, coach_first_name, coach_last_name, coach_email, coach_phone, players,
    status, invite_token, waiting_list, team_id, rejection_reason, created_at, updated_at
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    PendingPlayers,
    PendingValidation,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::PendingPlayers => "pending_players",
            RegistrationStatus::PendingValidation => "pending_validation",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationStatus::Approved | RegistrationStatus::Rejected)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "approved" => Ok(RegistrationStatus::Approved),
            "rejected" => Ok(RegistrationStatus::Rejected),
            "pending_players" => Ok(RegistrationStatus::PendingPlayers),
            "pending_validation" => Ok(RegistrationStatus::PendingValidation),
            other => Err(format!("unknown registration status: {other}")),
        }
    }
}

impl TeamRegistrationRow {
    pub fn status(&self) -> RegistrationStatus {
        self.status.parse().unwrap_or(RegistrationStatus::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct CreateRegistration {
    pub team_name: String,
    pub school: String,
    pub grade: String,
    pub captain: Contact,
    pub coach: Option<Contact>,
    pub players: Vec<PlayerInfo>,
}

impl CreateRegistration {
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.team_name.trim().is_empty() {
            errors.push("Le nom de l'équipe est obligatoire".to_string());
        }
        if self.school.trim().is_empty() {
            errors.push("L'établissement est obligatoire".to_string());
        }
        if self.grade.trim().is_empty() {
            errors.push("La classe est obligatoire".to_string());
        }
        errors.extend(contact_errors("capitaine", &self.captain));
        if let Some(coach) = &self.coach {
            errors.extend(contact_errors("coach", coach));
        }
        errors.extend(roster_errors(&self.players));
        errors
    }
}

/// Admin edit of a registration still under review. `None` keeps the field.
#[derive(Debug, Clone, Default)]
pub struct RegistrationEdit {
    pub team_name: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub captain: Option<Contact>,
    pub coach: Option<Contact>,
    pub players: Option<Vec<PlayerInfo>>,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    pub waiting_list: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub registration: TeamRegistrationRow,
    pub team: TeamRow,
    pub players: Vec<MaterializedPlayer>,
    pub coach_account: Option<CoachAccountRow>,
    pub emails_queued: usize,
    /// True when the registration had been approved by an earlier call.
    pub already_approved: bool,
}

#[derive(Clone)]
pub struct RegistrationRepo {
    db: Db,
}

impl RegistrationRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> SqlxResult<Option<TeamRegistrationRow>> {
        sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM team_registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    pub async fn get_by_invite_token(&self, token: &str) -> SqlxResult<Option<TeamRegistrationRow>> {
        sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM team_registrations WHERE invite_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await
    }

    pub async fn list(
        &self,
        filter: RegistrationFilter,
        page: Option<LimitOffset>,
    ) -> SqlxResult<Vec<TeamRegistrationRow>> {
        let p = page.unwrap_or_default();
        let search = filter.search.map(|s| format!("%{}%", s.to_lowercase()));

        sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS}
            FROM team_registrations
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::bool IS NULL OR waiting_list = $2)
              AND ($3::text IS NULL OR LOWER(team_name) LIKE $3 OR LOWER(school) LIKE $3)
            ORDER BY created_at ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.waiting_list)
        .bind(search)
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.db)
        .await
    }

    /// Public submission. Goes to the waiting list while registrations are closed.
    pub async fn submit(&self, data: CreateRegistration) -> RepoResult<TeamRegistrationRow> {
        RepoError::validation(data.errors())?;
        if data.players.is_empty() {
            return Err(RepoError::Validation(vec![
                "L'équipe doit compter au moins un joueur".to_string(),
            ]));
        }

        let mut tx = self.db.begin().await?;
        let open = registration_open(&mut tx).await?;
        let status = if open {
            RegistrationStatus::Pending
        } else {
            RegistrationStatus::PendingValidation
        };

        let row = insert(&mut tx, &data, status, !open, None).await?;
        tx.commit().await?;

        tracing::info!(
            registration_id = %row.id,
            team = %row.team_name,
            waiting_list = row.waiting_list,
            "registration submitted"
        );
        Ok(row)
    }

    /// Start a registration that collects players through a shared invite link.
    pub async fn create_collaborative(
        &self,
        data: CreateRegistration,
    ) -> RepoResult<TeamRegistrationRow> {
        RepoError::validation(data.errors())?;

        let mut tx = self.db.begin().await?;
        let row = insert(
            &mut tx,
            &data,
            RegistrationStatus::PendingPlayers,
            false,
            Some(generate_token()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(registration_id = %row.id, team = %row.team_name, "collaborative registration created");
        Ok(row)
    }

    pub async fn add_player_by_token(
        &self,
        token: &str,
        player: PlayerInfo,
    ) -> RepoResult<TeamRegistrationRow> {
        let mut tx = self.db.begin().await?;
        let mut row = lock_by_token(&mut tx, token).await?;

        row.players.0.push(player);
        RepoError::validation(roster_errors(&row.players.0))?;

        let row = store_players(&mut tx, row.id, &row.players.0).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn remove_player_by_token(
        &self,
        token: &str,
        jersey_number: i32,
    ) -> RepoResult<TeamRegistrationRow> {
        let mut tx = self.db.begin().await?;
        let mut row = lock_by_token(&mut tx, token).await?;

        let before = row.players.0.len();
        row.players.0.retain(|p| p.jersey_number != jersey_number);
        if row.players.0.len() == before {
            return Err(RepoError::NotFound("player"));
        }

        let row = store_players(&mut tx, row.id, &row.players.0).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Close the invite link and hand the registration over for review.
    pub async fn finalize_collaborative(&self, token: &str) -> RepoResult<TeamRegistrationRow> {
        let mut tx = self.db.begin().await?;
        let row = lock_by_token(&mut tx, token).await?;
        if row.players.0.is_empty() {
            return Err(RepoError::Validation(vec![
                "L'équipe doit compter au moins un joueur".to_string(),
            ]));
        }

        let open = registration_open(&mut tx).await?;
        let status = if open {
            RegistrationStatus::Pending
        } else {
            RegistrationStatus::PendingValidation
        };

        let row = sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            r#"
            UPDATE team_registrations
            SET status = $2, waiting_list = $3, invite_token = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(row.id)
        .bind(status.as_str())
        .bind(!open)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(registration_id = %row.id, status = %status, "collaborative registration finalized");
        Ok(row)
    }

    pub async fn update(&self, id: Uuid, edit: RegistrationEdit) -> RepoResult<TeamRegistrationRow> {
        let mut tx = self.db.begin().await?;
        let current = lock(&mut tx, id).await?;
        if current.status().is_terminal() {
            return Err(RepoError::InvalidState(format!(
                "registration {id} is {} and can no longer be edited",
                current.status
            )));
        }

        let merged = CreateRegistration {
            team_name: edit.team_name.unwrap_or(current.team_name.clone()),
            school: edit.school.unwrap_or(current.school.clone()),
            grade: edit.grade.unwrap_or(current.grade.clone()),
            captain: edit.captain.unwrap_or_else(|| current.captain()),
            coach: edit.coach.or_else(|| current.coach()),
            players: edit.players.unwrap_or(current.players.0.clone()),
        };
        RepoError::validation(merged.errors())?;

        let coach = merged.coach.as_ref();
        let row = sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            r#"
            UPDATE team_registrations
            SET team_name = $2, school = $3, grade = $4,
                captain_first_name = $5, captain_last_name = $6, captain_email = $7, captain_phone = $8,
                coach_first_name = $9, coach_last_name = $10, coach_email = $11, coach_phone = $12,
                players = $13, updated_at = NOW()
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(merged.team_name.trim())
        .bind(merged.school.trim())
        .bind(merged.grade.trim())
        .bind(merged.captain.first_name.trim())
        .bind(merged.captain.last_name.trim())
        .bind(merged.captain.email.trim())
        .bind(&merged.captain.phone)
        .bind(coach.map(|c| c.first_name.trim()))
        .bind(coach.map(|c| c.last_name.trim()))
        .bind(coach.map(|c| c.email.trim()))
        .bind(coach.map(|c| c.phone.as_str()))
        .bind(Json(&merged.players))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn promote_from_waiting_list(&self, id: Uuid) -> RepoResult<TeamRegistrationRow> {
        sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            r#"
            UPDATE team_registrations
            SET status = 'pending', waiting_list = FALSE, updated_at = NOW()
            WHERE id = $1 AND status = 'pending_validation'
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            RepoError::InvalidState(format!("registration {id} is not on the waiting list"))
        })
    }

    /// Turn a pending registration into a team with its players, accounts and
    /// statistics, queueing every credential e-mail. All of it commits or
    /// nothing does; approving twice returns the team created the first time.
    pub async fn approve(&self, id: Uuid, notify_captain: bool) -> RepoResult<ApprovalOutcome> {
        let mut tx = self.db.begin().await?;
        let registration = lock(&mut tx, id).await?;

        match registration.status() {
            RegistrationStatus::Pending => {}
            RegistrationStatus::Approved => {
                let team_id = registration
                    .team_id
                    .ok_or(RepoError::NotFound("approved team"))?;
                let team = sqlx::query_as::<_, TeamRow>(&format!(
                    "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"
                ))
                .bind(team_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepoError::NotFound("approved team"))?;
                tx.commit().await?;

                return Ok(ApprovalOutcome {
                    registration,
                    team,
                    players: Vec::new(),
                    coach_account: None,
                    emails_queued: 0,
                    already_approved: true,
                });
            }
            other => {
                return Err(RepoError::InvalidState(format!(
                    "registration {id} is {other}, only pending registrations can be approved"
                )));
            }
        }

        let captain = registration.captain();
        let coach = registration.coach();
        let team = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            INSERT INTO teams (name, school, grade, captain_first_name, captain_last_name,
                               captain_email, captain_phone, coach_first_name, coach_last_name,
                               coach_email, coach_phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(&registration.team_name)
        .bind(&registration.school)
        .bind(&registration.grade)
        .bind(&captain.first_name)
        .bind(&captain.last_name)
        .bind(&captain.email)
        .bind(&captain.phone)
        .bind(&registration.coach_first_name)
        .bind(&registration.coach_last_name)
        .bind(&registration.coach_email)
        .bind(&registration.coach_phone)
        .fetch_one(&mut *tx)
        .await?;

        let mut players = Vec::with_capacity(registration.players.0.len());
        for info in &registration.players.0 {
            players.push(materialize(&mut tx, &team, info).await?);
        }
        let mut emails_queued = players.iter().filter(|p| p.account.is_some()).count();

        let coach_account = match &coach {
            Some(contact) => {
                emails_queued += 1;
                Some(create_coach_account(&mut tx, &team, contact).await?)
            }
            None => None,
        };

        sqlx::query("INSERT INTO team_statistics (team_id) VALUES ($1)")
            .bind(team.id)
            .execute(&mut *tx)
            .await?;

        let registration = sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            r#"
            UPDATE team_registrations
            SET status = 'approved', team_id = $2, waiting_list = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(team.id)
        .fetch_one(&mut *tx)
        .await?;

        if notify_captain {
            OutboxRepo::enqueue(
                &mut tx,
                &captain.email,
                &OutboxMessage::RegistrationDecision {
                    captain_name: captain.full_name(),
                    team_name: team.name.clone(),
                    approved: true,
                    reason: None,
                },
            )
            .await?;
            emails_queued += 1;
        }

        tx.commit().await?;

        tracing::info!(
            registration_id = %id,
            team_id = %team.id,
            players = players.len(),
            emails_queued,
            "registration approved"
        );

        Ok(ApprovalOutcome {
            registration,
            team,
            players,
            coach_account,
            emails_queued,
            already_approved: false,
        })
    }

    pub async fn reject(
        &self,
        id: Uuid,
        reason: Option<String>,
        notify_captain: bool,
    ) -> RepoResult<TeamRegistrationRow> {
        let mut tx = self.db.begin().await?;
        let current = lock(&mut tx, id).await?;
        if current.status().is_terminal() {
            return Err(RepoError::InvalidState(format!(
                "registration {id} is already {}",
                current.status
            )));
        }

        let row = sqlx::query_as::<_, TeamRegistrationRow>(&format!(
            r#"
            UPDATE team_registrations
            SET status = 'rejected', rejection_reason = $2, invite_token = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;

        if notify_captain {
            let captain = row.captain();
            OutboxRepo::enqueue(
                &mut tx,
                &captain.email,
                &OutboxMessage::RegistrationDecision {
                    captain_name: captain.full_name(),
                    team_name: row.team_name.clone(),
                    approved: false,
                    reason,
                },
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(registration_id = %id, "registration rejected");
        Ok(row)
    }

    /// Only rejected registrations can be removed.
    pub async fn delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM team_registrations WHERE id = $1 AND status = 'rejected'")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                Some(row) => Err(RepoError::InvalidState(format!(
                    "registration {id} is {}, only rejected registrations can be deleted",
                    row.status
                ))),
                None => Err(RepoError::NotFound("registration")),
            };
        }
        Ok(())
    }
}

async fn registration_open(conn: &mut PgConnection) -> SqlxResult<bool> {
    sqlx::query_scalar("SELECT registration_open FROM app_settings WHERE id")
        .fetch_one(conn)
        .await
}

async fn lock(conn: &mut PgConnection, id: Uuid) -> RepoResult<TeamRegistrationRow> {
    sqlx::query_as::<_, TeamRegistrationRow>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM team_registrations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepoError::NotFound("registration"))
}

async fn lock_by_token(conn: &mut PgConnection, token: &str) -> RepoResult<TeamRegistrationRow> {
    let row = sqlx::query_as::<_, TeamRegistrationRow>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM team_registrations WHERE invite_token = $1 FOR UPDATE"
    ))
    .bind(token)
    .fetch_optional(conn)
    .await?
    .ok_or(RepoError::NotFound("invitation"))?;

    if row.status() != RegistrationStatus::PendingPlayers {
        return Err(RepoError::InvalidState(
            "this invitation is no longer accepting players".to_string(),
        ));
    }
    Ok(row)
}

async fn store_players(
    conn: &mut PgConnection,
    id: Uuid,
    players: &[PlayerInfo],
) -> SqlxResult<TeamRegistrationRow> {
    sqlx::query_as::<_, TeamRegistrationRow>(&format!(
        r#"
        UPDATE team_registrations
        SET players = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {REGISTRATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(Json(players))
    .fetch_one(conn)
    .await
}

async fn insert(
    conn: &mut PgConnection,
    data: &CreateRegistration,
    status: RegistrationStatus,
    waiting_list: bool,
    invite_token: Option<String>,
) -> SqlxResult<TeamRegistrationRow> {
    let coach = data.coach.as_ref();
    sqlx::query_as::<_, TeamRegistrationRow>(&format!(
        r#"
        INSERT INTO team_registrations (
            team_name, school, grade, captain_first_name, captain_last_name, captain_email,
            captain_phone, coach_first_name, coach_last_name, coach_email, coach_phone,
            players, status, waiting_list, invite_token
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {REGISTRATION_COLUMNS}
        "#
    ))
    .bind(data.team_name.trim())
    .bind(data.school.trim())
    .bind(data.grade.trim())
    .bind(data.captain.first_name.trim())
    .bind(data.captain.last_name.trim())
    .bind(data.captain.email.trim())
    .bind(&data.captain.phone)
    .bind(coach.map(|c| c.first_name.trim()))
    .bind(coach.map(|c| c.last_name.trim()))
    .bind(coach.map(|c| c.email.trim()))
    .bind(coach.map(|c| c.phone.as_str()))
    .bind(Json(&data.players))
    .bind(status.as_str())
    .bind(waiting_list)
    .bind(invite_token)
    .fetch_one(conn)
    .await
}

async fn create_coach_account(
    conn: &mut PgConnection,
    team: &TeamRow,
    coach: &Contact,
) -> RepoResult<CoachAccountRow> {
    let token = generate_token();
    let account = sqlx::query_as::<_, CoachAccountRow>(
        r#"
        INSERT INTO coach_accounts (team_id, first_name, last_name, email, phone,
                                    setup_token, setup_token_expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, team_id, first_name, last_name, email, phone, password_hash,
                  setup_token, setup_token_expires_at, created_at, updated_at
        "#,
    )
    .bind(team.id)
    .bind(&coach.first_name)
    .bind(&coach.last_name)
    .bind(coach.email.trim())
    .bind(&coach.phone)
    .bind(&token)
    .bind(setup_token_expiry(Utc::now()))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepoError::on_unique(e, format!("L'adresse {} a déjà un compte", coach.email)))?;

    OutboxRepo::enqueue(
        conn,
        &account.email,
        &OutboxMessage::AccountSetup {
            name: coach.full_name(),
            team_name: team.name.clone(),
            role: AccountRole::Coach,
            token,
        },
    )
    .await?;

    Ok(account)
}
