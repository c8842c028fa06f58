use std::collections::{HashMap, HashSet};

use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, Result as SqlxResult};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{RepoError, RepoResult};
use crate::fantasy::{
    apply_transfer, set_captain, squad_points, transfer_penalty, validate_team, FantasySlot,
    Formation, Price, SquadDraft,
};
use crate::models::{FantasyTeamRow, Position};
use crate::pagination::LimitOffset;

const TEAM_COLUMNS: &str = r#"
    id, owner_id, name, formation, slots, transfers_made, penalty_points, created_at, updated_at
"#;

#[derive(Debug, Clone, FromRow)]
pub struct MarketPlayer {
    pub player_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub position: String,
    pub price_tenths: i32,
    pub total_points: i32,
    pub selected_by: i32,
}

impl MarketPlayer {
    pub fn price(&self) -> Price {
        Price::from_tenths(self.price_tenths)
    }

    fn slot(&self, is_captain: bool) -> RepoResult<FantasySlot> {
        Ok(FantasySlot {
            player_id: self.player_id,
            position: self.position.parse().map_err(RepoError::InvalidState)?,
            price: self.price(),
            points: self.total_points,
            is_captain,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSort {
    Price,
    Points,
    Popularity,
}

#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    pub position: Option<Position>,
    pub team_id: Option<Uuid>,
    pub max_price: Option<Price>,
    pub sort: Option<MarketSort>,
}

#[derive(Debug, Clone, Copy)]
pub struct SquadPick {
    pub player_id: Uuid,
    pub is_captain: bool,
}

#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub team: FantasyTeamRow,
    pub points: i32,
}

impl FantasyTeamRow {
    pub fn formation(&self) -> Option<Formation> {
        self.formation.parse().ok()
    }
}

#[derive(Clone)]
pub struct FantasyRepo {
    db: Db,
}

impl FantasyRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn market(
        &self,
        filter: MarketFilter,
        page: Option<LimitOffset>,
    ) -> SqlxResult<Vec<MarketPlayer>> {
        let p = page.unwrap_or_default();
        let order = match filter.sort.unwrap_or(MarketSort::Points) {
            MarketSort::Price => "s.price_tenths DESC",
            MarketSort::Points => "s.total_points DESC",
            MarketSort::Popularity => "s.selected_by DESC",
        };

        sqlx::query_as::<_, MarketPlayer>(&format!(
            r#"
            SELECT p.id AS player_id, p.first_name, p.last_name, p.team_id, t.name AS team_name,
                   p.position, s.price_tenths, s.total_points, s.selected_by
            FROM fantasy_player_stats s
            JOIN players p ON p.id = s.player_id
            JOIN teams t ON t.id = p.team_id
            WHERE ($1::text IS NULL OR p.position = $1)
              AND ($2::uuid IS NULL OR p.team_id = $2)
              AND ($3::int IS NULL OR s.price_tenths <= $3)
            ORDER BY {order}, p.last_name ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.position.map(|p| p.as_str()))
        .bind(filter.team_id)
        .bind(filter.max_price.map(Price::tenths))
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.db)
        .await
    }

    pub async fn set_price(&self, player_id: Uuid, price: Price) -> RepoResult<MarketPlayer> {
        if price.tenths() <= 0 {
            return Err(RepoError::Validation(vec![
                "Le prix doit être positif".to_string(),
            ]));
        }

        let updated = sqlx::query(
            "UPDATE fantasy_player_stats SET price_tenths = $2, updated_at = NOW() WHERE player_id = $1",
        )
        .bind(player_id)
        .bind(price.tenths())
        .execute(&self.db)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound("player"));
        }

        let mut conn = self.db.acquire().await?;
        market_players(&mut conn, &[player_id])
            .await?
            .remove(&player_id)
            .ok_or(RepoError::NotFound("player"))
    }

    pub async fn get_team(&self, owner_id: Uuid) -> SqlxResult<Option<FantasyTeamRow>> {
        sqlx::query_as::<_, FantasyTeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM fantasy_teams WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await
    }

    /// Create or replace a squad. Prices are taken from the market, never
    /// from the caller. Replacing players of an existing squad counts as
    /// transfers.
    pub async fn save_team(
        &self,
        owner_id: Uuid,
        name: &str,
        formation: Formation,
        picks: &[SquadPick],
    ) -> RepoResult<FantasyTeamRow> {
        let mut tx = self.db.begin().await?;

        let ids: Vec<Uuid> = picks.iter().map(|p| p.player_id).collect();
        let market = market_players(&mut tx, &ids).await?;

        let mut slots = Vec::with_capacity(picks.len());
        let mut seen = HashSet::new();
        for pick in picks {
            if !seen.insert(pick.player_id) {
                return Err(RepoError::Validation(vec![
                    "Ce joueur fait déjà partie de votre équipe".to_string(),
                ]));
            }
            let player = market.get(&pick.player_id).ok_or(RepoError::NotFound("player"))?;
            slots.push(player.slot(pick.is_captain)?);
        }

        let draft = SquadDraft {
            name: name.trim().to_string(),
            formation,
            slots,
        };
        RepoError::validation(validate_team(&draft).errors)?;

        let existing = lock_team(&mut tx, owner_id).await?;
        let row = match existing {
            None => {
                let row = sqlx::query_as::<_, FantasyTeamRow>(&format!(
                    r#"
                    INSERT INTO fantasy_teams (owner_id, name, formation, slots)
                    VALUES ($1, $2, $3, $4)
                    RETURNING {TEAM_COLUMNS}
                    "#
                ))
                .bind(owner_id)
                .bind(&draft.name)
                .bind(formation.as_str())
                .bind(Json(&draft.slots))
                .fetch_one(&mut *tx)
                .await?;
                adjust_selection(&mut tx, &[], &ids).await?;
                row
            }
            Some(current) => {
                let before: Vec<Uuid> = current.slots.0.iter().map(|s| s.player_id).collect();
                let added: Vec<Uuid> = ids.iter().filter(|id| !before.contains(*id)).copied().collect();
                let removed: Vec<Uuid> = before.iter().filter(|id| !ids.contains(*id)).copied().collect();

                let row = store_squad(
                    &mut tx,
                    &current,
                    &draft.name,
                    formation,
                    &draft.slots,
                    added.len() as i32,
                )
                .await?;
                adjust_selection(&mut tx, &removed, &added).await?;
                row
            }
        };

        tx.commit().await?;
        tracing::info!(owner_id = %owner_id, fantasy_team_id = %row.id, "fantasy squad saved");
        Ok(row)
    }

    pub async fn transfer(
        &self,
        owner_id: Uuid,
        outgoing: Uuid,
        incoming: Uuid,
    ) -> RepoResult<FantasyTeamRow> {
        let mut tx = self.db.begin().await?;
        let current = lock_team(&mut tx, owner_id)
            .await?
            .ok_or(RepoError::NotFound("fantasy team"))?;
        let formation = current
            .formation()
            .ok_or_else(|| RepoError::InvalidState(format!("unknown formation {}", current.formation)))?;

        let incoming_slot = market_players(&mut tx, &[incoming])
            .await?
            .get(&incoming)
            .ok_or(RepoError::NotFound("player"))?
            .slot(false)?;

        let slots = apply_transfer(&current.slots.0, outgoing, incoming_slot)
            .map_err(RepoError::Validation)?;

        let row = store_squad(&mut tx, &current, &current.name, formation, &slots, 1).await?;
        adjust_selection(&mut tx, &[outgoing], &[incoming]).await?;
        tx.commit().await?;

        tracing::info!(
            owner_id = %owner_id,
            transfers_made = row.transfers_made,
            penalty_points = row.penalty_points,
            "fantasy transfer"
        );
        Ok(row)
    }

    pub async fn set_captain(&self, owner_id: Uuid, player_id: Uuid) -> RepoResult<FantasyTeamRow> {
        let mut tx = self.db.begin().await?;
        let mut current = lock_team(&mut tx, owner_id)
            .await?
            .ok_or(RepoError::NotFound("fantasy team"))?;

        set_captain(&mut current.slots.0, player_id)
            .map_err(|message| RepoError::Validation(vec![message]))?;

        let row = sqlx::query_as::<_, FantasyTeamRow>(&format!(
            r#"
            UPDATE fantasy_teams SET slots = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(current.id)
        .bind(Json(&current.slots.0))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Start a new gameweek: everyone gets their free transfers back.
    /// Penalties already incurred stay.
    pub async fn reset_gameweek(&self) -> SqlxResult<u64> {
        let result = sqlx::query(
            "UPDATE fantasy_teams SET transfers_made = 0, updated_at = NOW() WHERE transfers_made <> 0",
        )
        .execute(&self.db)
        .await?;

        tracing::info!(teams = result.rows_affected(), "fantasy gameweek reset");
        Ok(result.rows_affected())
    }

    /// Squads ranked by current player points (captain doubled) minus
    /// transfer penalties.
    pub async fn leaderboard(&self, limit: usize) -> SqlxResult<Vec<LeaderboardEntry>> {
        let teams = sqlx::query_as::<_, FantasyTeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM fantasy_teams"
        ))
        .fetch_all(&self.db)
        .await?;

        let points: HashMap<Uuid, i32> = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT player_id, total_points FROM fantasy_player_stats",
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let mut entries: Vec<LeaderboardEntry> = teams
            .into_iter()
            .map(|mut team| {
                for slot in team.slots.0.iter_mut() {
                    slot.points = points.get(&slot.player_id).copied().unwrap_or(0);
                }
                let score = squad_points(&team.slots.0).saturating_sub(team.penalty_points);
                LeaderboardEntry {
                    rank: 0,
                    team,
                    points: score,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.team.name.cmp(&b.team.name)));
        entries.truncate(limit);
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index + 1;
        }
        Ok(entries)
    }
}

async fn market_players(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> SqlxResult<HashMap<Uuid, MarketPlayer>> {
    let rows = sqlx::query_as::<_, MarketPlayer>(
        r#"
        SELECT p.id AS player_id, p.first_name, p.last_name, p.team_id, t.name AS team_name,
               p.position, s.price_tenths, s.total_points, s.selected_by
        FROM fantasy_player_stats s
        JOIN players p ON p.id = s.player_id
        JOIN teams t ON t.id = p.team_id
        WHERE p.id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(|row| (row.player_id, row)).collect())
}

async fn lock_team(conn: &mut PgConnection, owner_id: Uuid) -> SqlxResult<Option<FantasyTeamRow>> {
    sqlx::query_as::<_, FantasyTeamRow>(&format!(
        "SELECT {TEAM_COLUMNS} FROM fantasy_teams WHERE owner_id = $1 FOR UPDATE"
    ))
    .bind(owner_id)
    .fetch_optional(conn)
    .await
}

/// Write new slots and charge `new_transfers`. Penalty points grow by the
/// difference the extra transfers make.
async fn store_squad(
    conn: &mut PgConnection,
    current: &FantasyTeamRow,
    name: &str,
    formation: Formation,
    slots: &[FantasySlot],
    new_transfers: i32,
) -> SqlxResult<FantasyTeamRow> {
    let before = current.transfers_made.max(0) as u32;
    let after = before.saturating_add(new_transfers.max(0) as u32);
    let extra_penalty = (transfer_penalty(after) - transfer_penalty(before)) as i32;

    sqlx::query_as::<_, FantasyTeamRow>(&format!(
        r#"
        UPDATE fantasy_teams
        SET name = $2, formation = $3, slots = $4, transfers_made = $5,
            penalty_points = penalty_points + $6, updated_at = NOW()
        WHERE id = $1
        RETURNING {TEAM_COLUMNS}
        "#
    ))
    .bind(current.id)
    .bind(name)
    .bind(formation.as_str())
    .bind(Json(slots))
    .bind(after as i32)
    .bind(extra_penalty)
    .fetch_one(conn)
    .await
}

async fn adjust_selection(
    conn: &mut PgConnection,
    removed: &[Uuid],
    added: &[Uuid],
) -> SqlxResult<()> {
    sqlx::query(
        r#"
        UPDATE fantasy_player_stats
        SET selected_by = GREATEST(
                selected_by
                + CASE WHEN player_id = ANY($2) THEN 1 ELSE 0 END
                - CASE WHEN player_id = ANY($1) THEN 1 ELSE 0 END,
                0),
            updated_at = NOW()
        WHERE player_id = ANY($1) OR player_id = ANY($2)
        "#,
    )
    .bind(removed)
    .bind(added)
    .execute(conn)
    .await?;
    Ok(())
}
