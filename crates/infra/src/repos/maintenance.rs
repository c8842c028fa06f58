//! One-off data repairs run by admins. Each operation is a single
//! transaction and reports how many rows it changed per table.

use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::models::TeamRegistrationRow;
use crate::text::{capitalize_name, fix_email, looks_like_email};

const NAME_COLUMNS: &[(&str, &str)] = &[
    ("players", "first_name"),
    ("players", "last_name"),
    ("coach_accounts", "first_name"),
    ("coach_accounts", "last_name"),
    ("teams", "captain_first_name"),
    ("teams", "captain_last_name"),
    ("teams", "coach_first_name"),
    ("teams", "coach_last_name"),
];

const EMAIL_COLUMNS: &[(&str, &str)] = &[
    ("players", "email"),
    ("player_accounts", "email"),
    ("coach_accounts", "email"),
    ("teams", "captain_email"),
    ("teams", "coach_email"),
    ("spectator_requests", "email"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub tables: Vec<(String, u64)>,
}

impl MaintenanceReport {
    fn add(&mut self, table: &str, count: u64) {
        match self.tables.iter_mut().find(|(name, _)| name == table) {
            Some((_, total)) => *total += count,
            None => self.tables.push((table.to_string(), count)),
        }
    }

    pub fn total(&self) -> u64 {
        self.tables.iter().map(|(_, count)| count).sum()
    }
}

#[derive(Debug, FromRow)]
struct CellRow {
    id: Uuid,
    value: String,
}

#[derive(Clone)]
pub struct MaintenanceRepo {
    db: Db,
}

impl MaintenanceRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn capitalize_names(&self) -> RepoResult<MaintenanceReport> {
        let mut tx = self.db.begin().await?;
        let mut report = MaintenanceReport::default();

        for (table, column) in NAME_COLUMNS {
            let count = rewrite_column(&mut tx, table, column, |name| {
                Some(capitalize_name(name))
            })
            .await?;
            report.add(table, count);
        }

        let count = rewrite_registrations(&mut tx, |row| {
            let mut changed = false;
            changed |= set_if_changed(&mut row.captain_first_name, capitalize_name);
            changed |= set_if_changed(&mut row.captain_last_name, capitalize_name);
            if let Some(name) = row.coach_first_name.as_mut() {
                changed |= set_if_changed(name, capitalize_name);
            }
            if let Some(name) = row.coach_last_name.as_mut() {
                changed |= set_if_changed(name, capitalize_name);
            }
            for player in row.players.0.iter_mut() {
                changed |= set_if_changed(&mut player.first_name, capitalize_name);
                changed |= set_if_changed(&mut player.last_name, capitalize_name);
            }
            changed
        })
        .await?;
        report.add("team_registrations", count);

        tx.commit().await?;
        tracing::info!(updated = report.total(), "names capitalized");
        Ok(report)
    }

    pub async fn fix_email_typos(&self) -> RepoResult<MaintenanceReport> {
        let mut tx = self.db.begin().await?;
        let mut report = MaintenanceReport::default();

        for (table, column) in EMAIL_COLUMNS {
            let count = rewrite_column(&mut tx, table, column, fix_email).await?;
            report.add(table, count);
        }

        let count = rewrite_registrations(&mut tx, |row| {
            let mut changed = false;
            changed |= set_if_fixed(&mut row.captain_email);
            if let Some(email) = row.coach_email.as_mut() {
                changed |= set_if_fixed(email);
            }
            for player in row.players.0.iter_mut() {
                if let Some(email) = player.email.as_mut() {
                    changed |= set_if_fixed(email);
                }
            }
            changed
        })
        .await?;
        report.add("team_registrations", count);

        tx.commit().await?;
        tracing::info!(updated = report.total(), "e-mail typos fixed");
        Ok(report)
    }

    /// Replace one address everywhere it is stored, case-insensitively.
    pub async fn replace_email(&self, old: &str, new: &str) -> RepoResult<MaintenanceReport> {
        let old = old.trim().to_lowercase();
        let new = new.trim().to_string();
        if !looks_like_email(&new) {
            return Err(RepoError::Validation(vec![format!(
                "L'adresse {new} est invalide"
            )]));
        }

        let mut tx = self.db.begin().await?;
        let mut report = MaintenanceReport::default();

        for (table, column) in EMAIL_COLUMNS {
            let count = rewrite_column(&mut tx, table, column, |email| {
                (email.trim().to_lowercase() == old).then(|| new.clone())
            })
            .await?;
            report.add(table, count);
        }

        let matches = |email: &str| email.trim().to_lowercase() == old;
        let count = rewrite_registrations(&mut tx, |row| {
            let mut changed = false;
            if matches(&row.captain_email) {
                row.captain_email = new.clone();
                changed = true;
            }
            if let Some(email) = row.coach_email.as_mut().filter(|e| matches(e)) {
                *email = new.clone();
                changed = true;
            }
            for player in row.players.0.iter_mut() {
                if let Some(email) = player.email.as_mut().filter(|e| matches(e)) {
                    *email = new.clone();
                    changed = true;
                }
            }
            changed
        })
        .await?;
        report.add("team_registrations", count);

        if report.total() == 0 {
            return Err(RepoError::NotFound("e-mail address"));
        }

        tx.commit().await?;
        tracing::info!(updated = report.total(), "e-mail address replaced");
        Ok(report)
    }

    /// Copy each team's current name back into its approved registration.
    pub async fn sync_team_names(&self) -> RepoResult<MaintenanceReport> {
        let result = sqlx::query(
            r#"
            UPDATE team_registrations r
            SET team_name = t.name, updated_at = NOW()
            FROM teams t
            WHERE r.team_id = t.id AND r.team_name <> t.name
            "#,
        )
        .execute(&self.db)
        .await?;

        let mut report = MaintenanceReport::default();
        report.add("team_registrations", result.rows_affected());
        Ok(report)
    }
}

fn set_if_changed(value: &mut String, f: impl Fn(&str) -> String) -> bool {
    let fixed = f(value.as_str());
    if fixed != *value {
        *value = fixed;
        true
    } else {
        false
    }
}

fn set_if_fixed(value: &mut String) -> bool {
    match fix_email(value.as_str()) {
        Some(fixed) => {
            *value = fixed;
            true
        }
        None => false,
    }
}

/// Apply `f` to every non-null value of `table.column`, writing back the
/// values it changes.
async fn rewrite_column(
    conn: &mut PgConnection,
    table: &str,
    column: &str,
    f: impl Fn(&str) -> Option<String>,
) -> RepoResult<u64> {
    let rows = sqlx::query_as::<_, CellRow>(&format!(
        "SELECT id, {column} AS value FROM {table} WHERE {column} IS NOT NULL FOR UPDATE"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut count = 0;
    for row in rows {
        let Some(value) = f(row.value.as_str()).filter(|value| *value != row.value) else {
            continue;
        };
        sqlx::query(&format!("UPDATE {table} SET {column} = $2 WHERE id = $1"))
            .bind(row.id)
            .bind(&value)
            .execute(&mut *conn)
            .await
            .map_err(|e| RepoError::on_unique(e, format!("L'adresse {value} a déjà un compte")))?;
        count += 1;
    }
    Ok(count)
}

async fn rewrite_registrations(
    conn: &mut PgConnection,
    mut f: impl FnMut(&mut TeamRegistrationRow) -> bool,
) -> RepoResult<u64> {
    let rows = sqlx::query_as::<_, TeamRegistrationRow>(
        r#"
        SELECT id, team_name, school, grade, captain_first_name, captain_last_name, captain_email,
               captain_phone, coach_first_name, coach_last_name, coach_email, coach_phone, players,
               status, invite_token, waiting_list, team_id, rejection_reason, created_at, updated_at
        FROM team_registrations
        FOR UPDATE
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut count = 0;
    for mut row in rows {
        if !f(&mut row) {
            continue;
        }
        sqlx::query(
            r#"
            UPDATE team_registrations
            SET captain_first_name = $2, captain_last_name = $3, captain_email = $4,
                coach_first_name = $5, coach_last_name = $6, coach_email = $7,
                players = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(&row.captain_first_name)
        .bind(&row.captain_last_name)
        .bind(&row.captain_email)
        .bind(&row.coach_first_name)
        .bind(&row.coach_last_name)
        .bind(&row.coach_email)
        .bind(Json(&row.players.0))
        .execute(&mut *conn)
        .await?;
        count += 1;
    }
    Ok(count)
}
