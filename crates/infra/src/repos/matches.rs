use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Result as SqlxResult};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::fantasy::{match_points, MatchLine};
use crate::models::{MatchRow, Position};
use crate::pagination::LimitOffset;
use crate::standings::{result_deltas, sort_standings, StandingEntry, TeamRecord};

/// Highest score or per-player goal/assist count accepted for one match.
pub const MAX_SCORE: i32 = 99;

const MATCH_COLUMNS: &str = r#"
    id, home_team_id, away_team_id, kickoff_at, venue, status, home_score, away_score,
    created_at, updated_at
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Scheduled,
    Played,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Played => "played",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "played" => Ok(MatchStatus::Played),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMatch {
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub kickoff_at: DateTime<Utc>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub team_id: Option<Uuid>,
    pub status: Option<MatchStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerStatLine {
    pub player_id: Uuid,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlayerMatchStatsRow {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ScorerRow {
    pub player_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub goals: i64,
    pub assists: i64,
    pub matches: i64,
}

#[derive(Debug, Clone, FromRow)]
struct StandingRow {
    team_id: Uuid,
    team_name: String,
    played: i32,
    wins: i32,
    draws: i32,
    losses: i32,
    goals_for: i32,
    goals_against: i32,
    points: i32,
}

impl From<StandingRow> for StandingEntry {
    fn from(row: StandingRow) -> Self {
        StandingEntry {
            team_id: row.team_id,
            team_name: row.team_name,
            record: TeamRecord {
                played: row.played,
                wins: row.wins,
                draws: row.draws,
                losses: row.losses,
                goals_for: row.goals_for,
                goals_against: row.goals_against,
                points: row.points,
            },
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct SquadMember {
    id: Uuid,
    team_id: Uuid,
    position: String,
}

#[derive(Clone)]
pub struct MatchRepo {
    db: Db,
}

impl MatchRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, data: CreateMatch) -> RepoResult<MatchRow> {
        if data.home_team_id == data.away_team_id {
            return Err(RepoError::Validation(vec![
                "Une équipe ne peut pas se rencontrer elle-même".to_string(),
            ]));
        }

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE id = ANY($1)")
            .bind(vec![data.home_team_id, data.away_team_id])
            .fetch_one(&self.db)
            .await?;
        if known != 2 {
            return Err(RepoError::NotFound("team"));
        }

        let row = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            INSERT INTO matches (home_team_id, away_team_id, kickoff_at, venue)
            VALUES ($1, $2, $3, $4)
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(data.home_team_id)
        .bind(data.away_team_id)
        .bind(data.kickoff_at)
        .bind(data.venue)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(match_id = %row.id, "match scheduled");
        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> SqlxResult<Option<MatchRow>> {
        sqlx::query_as::<_, MatchRow>(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    pub async fn list(
        &self,
        filter: MatchFilter,
        page: Option<LimitOffset>,
    ) -> SqlxResult<Vec<MatchRow>> {
        let p = page.unwrap_or_default();
        sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE ($1::uuid IS NULL OR home_team_id = $1 OR away_team_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::timestamptz IS NULL OR kickoff_at >= $3)
              AND ($4::timestamptz IS NULL OR kickoff_at <= $4)
            ORDER BY kickoff_at ASC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.team_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.db)
        .await
    }

    pub async fn player_stats(&self, match_id: Uuid) -> SqlxResult<Vec<PlayerMatchStatsRow>> {
        sqlx::query_as::<_, PlayerMatchStatsRow>(
            r#"
            SELECT match_id, player_id, goals, assists, yellow_cards, red_cards
            FROM player_match_stats
            WHERE match_id = $1
            ORDER BY goals DESC, assists DESC
            "#,
        )
        .bind(match_id)
        .fetch_all(&self.db)
        .await
    }

    /// Record the final score and per-player lines. Team statistics and
    /// fantasy points move in the same transaction.
    pub async fn record_result(
        &self,
        match_id: Uuid,
        home_score: i32,
        away_score: i32,
        lines: Vec<PlayerStatLine>,
    ) -> RepoResult<MatchRow> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
        ))
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepoError::NotFound("match"))?;

        if current.status == MatchStatus::Played.as_str() {
            return Err(RepoError::InvalidState(format!(
                "match {match_id} already has a result"
            )));
        }

        let members = sqlx::query_as::<_, SquadMember>(
            "SELECT id, team_id, position FROM players WHERE team_id = ANY($1)",
        )
        .bind(vec![current.home_team_id, current.away_team_id])
        .fetch_all(&mut *tx)
        .await?;
        let members: HashMap<Uuid, SquadMember> = members.into_iter().map(|m| (m.id, m)).collect();

        RepoError::validation(result_errors(
            &current, home_score, away_score, &lines, &members,
        ))?;

        let updated = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            UPDATE matches
            SET status = 'played', home_score = $2, away_score = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(match_id)
        .bind(home_score)
        .bind(away_score)
        .fetch_one(&mut *tx)
        .await?;

        let (home, away) = result_deltas(home_score, away_score);
        for (team_id, delta) in [(current.home_team_id, home), (current.away_team_id, away)] {
            sqlx::query(
                r#"
                INSERT INTO team_statistics
                    (team_id, played, wins, draws, losses, goals_for, goals_against, points)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (team_id) DO UPDATE SET
                    played = team_statistics.played + EXCLUDED.played,
                    wins = team_statistics.wins + EXCLUDED.wins,
                    draws = team_statistics.draws + EXCLUDED.draws,
                    losses = team_statistics.losses + EXCLUDED.losses,
                    goals_for = team_statistics.goals_for + EXCLUDED.goals_for,
                    goals_against = team_statistics.goals_against + EXCLUDED.goals_against,
                    points = team_statistics.points + EXCLUDED.points,
                    updated_at = NOW()
                "#,
            )
            .bind(team_id)
            .bind(delta.played)
            .bind(delta.wins)
            .bind(delta.draws)
            .bind(delta.losses)
            .bind(delta.goals_for)
            .bind(delta.goals_against)
            .bind(delta.points)
            .execute(&mut *tx)
            .await?;
        }

        for line in &lines {
            let Some(member) = members.get(&line.player_id) else {
                continue;
            };
            sqlx::query(
                r#"
                INSERT INTO player_match_stats
                    (match_id, player_id, goals, assists, yellow_cards, red_cards)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(match_id)
            .bind(line.player_id)
            .bind(line.goals)
            .bind(line.assists)
            .bind(line.yellow_cards)
            .bind(line.red_cards)
            .execute(&mut *tx)
            .await?;

            let conceded = if member.team_id == current.home_team_id {
                away_score
            } else {
                home_score
            };
            let position: Position = member.position.parse().map_err(|e: String| {
                RepoError::InvalidState(e)
            })?;
            let points = match_points(
                position,
                &MatchLine {
                    goals: line.goals,
                    assists: line.assists,
                    yellow_cards: line.yellow_cards,
                    red_cards: line.red_cards,
                    clean_sheet: conceded == 0,
                },
            );

            sqlx::query(
                r#"
                UPDATE fantasy_player_stats
                SET total_points = total_points + $2, updated_at = NOW()
                WHERE player_id = $1
                "#,
            )
            .bind(line.player_id)
            .bind(points)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(match_id = %match_id, home_score, away_score, lines = lines.len(), "match result recorded");
        Ok(updated)
    }

    /// Every team, ranked. Teams without statistics count as zero.
    pub async fn standings(&self) -> SqlxResult<Vec<StandingEntry>> {
        let rows = sqlx::query_as::<_, StandingRow>(
            r#"
            SELECT t.id AS team_id, t.name AS team_name,
                   COALESCE(s.played, 0) AS played,
                   COALESCE(s.wins, 0) AS wins,
                   COALESCE(s.draws, 0) AS draws,
                   COALESCE(s.losses, 0) AS losses,
                   COALESCE(s.goals_for, 0) AS goals_for,
                   COALESCE(s.goals_against, 0) AS goals_against,
                   COALESCE(s.points, 0) AS points
            FROM teams t
            LEFT JOIN team_statistics s ON s.team_id = t.id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut entries: Vec<StandingEntry> = rows.into_iter().map(Into::into).collect();
        sort_standings(&mut entries);
        Ok(entries)
    }

    pub async fn top_scorers(&self, limit: i64) -> SqlxResult<Vec<ScorerRow>> {
        sqlx::query_as::<_, ScorerRow>(
            r#"
            SELECT p.id AS player_id, p.first_name, p.last_name, t.id AS team_id,
                   t.name AS team_name,
                   SUM(s.goals)::bigint AS goals,
                   SUM(s.assists)::bigint AS assists,
                   COUNT(*) AS matches
            FROM player_match_stats s
            JOIN players p ON p.id = s.player_id
            JOIN teams t ON t.id = p.team_id
            GROUP BY p.id, t.id
            HAVING SUM(s.goals) > 0
            ORDER BY goals DESC, assists DESC, p.last_name ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
    }
}

fn result_errors(
    fixture: &MatchRow,
    home_score: i32,
    away_score: i32,
    lines: &[PlayerStatLine],
    members: &HashMap<Uuid, SquadMember>,
) -> Vec<String> {
    let mut errors = Vec::new();
    if home_score < 0 || away_score < 0 {
        errors.push("Un score ne peut pas être négatif".to_string());
    }
    if home_score > MAX_SCORE || away_score > MAX_SCORE {
        errors.push(format!("Un score ne peut pas dépasser {MAX_SCORE}"));
    }

    let mut home_goals: i64 = 0;
    let mut away_goals: i64 = 0;
    let mut seen = Vec::with_capacity(lines.len());
    for line in lines {
        if seen.contains(&line.player_id) {
            errors.push(format!("Le joueur {} apparaît deux fois", line.player_id));
            continue;
        }
        seen.push(line.player_id);

        if line.goals < 0 || line.assists < 0 || line.yellow_cards < 0 || line.red_cards < 0 {
            errors.push(format!("Statistiques négatives pour le joueur {}", line.player_id));
        }
        if line.goals > MAX_SCORE
            || line.assists > MAX_SCORE
            || line.yellow_cards > 2
            || line.red_cards > 1
        {
            errors.push(format!("Statistiques impossibles pour le joueur {}", line.player_id));
            continue;
        }
        match members.get(&line.player_id) {
            Some(member) if member.team_id == fixture.home_team_id => home_goals += i64::from(line.goals),
            Some(_) => away_goals += i64::from(line.goals),
            None => errors.push(format!(
                "Le joueur {} ne joue dans aucune des deux équipes",
                line.player_id
            )),
        }
    }

    if home_goals > i64::from(home_score) {
        errors.push(format!(
            "Les buteurs de l'équipe à domicile totalisent {home_goals} buts pour un score de {home_score}"
        ));
    }
    if away_goals > i64::from(away_score) {
        errors.push(format!(
            "Les buteurs de l'équipe à l'extérieur totalisent {away_goals} buts pour un score de {away_score}"
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MatchRow {
        let now = Utc::now();
        MatchRow {
            id: Uuid::new_v4(),
            home_team_id: Uuid::new_v4(),
            away_team_id: Uuid::new_v4(),
            kickoff_at: now,
            venue: None,
            status: "scheduled".to_string(),
            home_score: None,
            away_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn member(team_id: Uuid) -> SquadMember {
        SquadMember {
            id: Uuid::new_v4(),
            team_id,
            position: "Attaquant".to_string(),
        }
    }

    fn line(player_id: Uuid, goals: i32) -> PlayerStatLine {
        PlayerStatLine {
            player_id,
            goals,
            assists: 0,
            yellow_cards: 0,
            red_cards: 0,
        }
    }

    #[test]
    fn test_consistent_result_passes() {
        let fixture = fixture();
        let scorer = member(fixture.home_team_id);
        let lines = vec![line(scorer.id, 2)];
        let members = HashMap::from([(scorer.id, scorer)]);

        assert!(result_errors(&fixture, 2, 1, &lines, &members).is_empty());
    }

    #[test]
    fn test_goals_beyond_score_and_unknown_player_are_reported() {
        let fixture = fixture();
        let scorer = member(fixture.away_team_id);
        let lines = vec![line(scorer.id, 3), line(Uuid::new_v4(), 0)];
        let members = HashMap::from([(scorer.id, scorer)]);

        let errors = result_errors(&fixture, 0, 1, &lines, &members);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("aucune des deux équipes"));
        assert!(errors[1].contains("extérieur"));
    }

    #[test]
    fn test_oversized_stats_are_refused_before_summing() {
        let fixture = fixture();
        let first = member(fixture.home_team_id);
        let second = member(fixture.home_team_id);
        let lines = vec![line(first.id, i32::MAX), line(second.id, i32::MAX)];
        let members = HashMap::from([(first.id, first), (second.id, second)]);

        let errors = result_errors(&fixture, 2, 0, &lines, &members);

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.starts_with("Statistiques impossibles")));
    }

    #[test]
    fn test_score_above_cap_is_refused() {
        let fixture = fixture();
        let errors = result_errors(&fixture, MAX_SCORE + 1, 0, &[], &HashMap::new());
        assert_eq!(errors, vec![format!("Un score ne peut pas dépasser {MAX_SCORE}")]);
    }

    #[test]
    fn test_duplicate_line_is_reported_once() {
        let fixture = fixture();
        let scorer = member(fixture.home_team_id);
        let lines = vec![line(scorer.id, 1), line(scorer.id, 1)];
        let members = HashMap::from([(scorer.id, scorer)]);

        let errors = result_errors(&fixture, 2, 0, &lines, &members);
        assert_eq!(errors, vec![format!("Le joueur {} apparaît deux fois", lines[0].player_id)]);
    }
}
