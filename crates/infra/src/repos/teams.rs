use crate::{
    db::Db,
    models::{TeamRow, TeamStatisticsRow},
};
use sqlx::Result as SqlxResult;
use uuid::Uuid;

pub(crate) const TEAM_COLUMNS: &str = r#"
    id, name, school, grade, captain_first_name, captain_last_name, captain_email,
    captain_phone, coach_first_name, coach_last_name, coach_email, coach_phone,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
}

#[derive(Clone)]
pub struct TeamRepo {
    pool: Db,
}

impl TeamRepo {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> SqlxResult<Vec<TeamRow>> {
        sqlx::query_as::<_, TeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get(&self, id: Uuid) -> SqlxResult<Option<TeamRow>> {
        sqlx::query_as::<_, TeamRow>(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_many(&self, ids: &[Uuid]) -> SqlxResult<Vec<TeamRow>> {
        sqlx::query_as::<_, TeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update(&self, id: Uuid, data: UpdateTeam) -> SqlxResult<Option<TeamRow>> {
        sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            UPDATE teams
            SET name = COALESCE($2, name),
                school = COALESCE($3, school),
                grade = COALESCE($4, grade),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.school)
        .bind(data.grade)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn statistics(&self, team_id: Uuid) -> SqlxResult<Option<TeamStatisticsRow>> {
        sqlx::query_as::<_, TeamStatisticsRow>(
            r#"
            SELECT team_id, played, wins, draws, losses, goals_for, goals_against, points, updated_at
            FROM team_statistics
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
    }
}
