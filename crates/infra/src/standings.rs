use std::cmp::Ordering;
use std::ops::AddAssign;

use uuid::Uuid;

use crate::models::TeamStatisticsRow;

pub const WIN_POINTS: i32 = 3;
pub const DRAW_POINTS: i32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamRecord {
    pub played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub points: i32,
}

impl TeamRecord {
    pub fn goal_difference(&self) -> i32 {
        self.goals_for - self.goals_against
    }
}

impl AddAssign for TeamRecord {
    fn add_assign(&mut self, rhs: TeamRecord) {
        self.played += rhs.played;
        self.wins += rhs.wins;
        self.draws += rhs.draws;
        self.losses += rhs.losses;
        self.goals_for += rhs.goals_for;
        self.goals_against += rhs.goals_against;
        self.points += rhs.points;
    }
}

impl From<&TeamStatisticsRow> for TeamRecord {
    fn from(row: &TeamStatisticsRow) -> Self {
        Self {
            played: row.played,
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            points: row.points,
        }
    }
}

/// Record deltas for the home and away side of a finished match.
pub fn result_deltas(home_score: i32, away_score: i32) -> (TeamRecord, TeamRecord) {
    let side = |scored: i32, conceded: i32| {
        let (wins, draws, losses, points) = match scored.cmp(&conceded) {
            Ordering::Greater => (1, 0, 0, WIN_POINTS),
            Ordering::Equal => (0, 1, 0, DRAW_POINTS),
            Ordering::Less => (0, 0, 1, 0),
        };
        TeamRecord {
            played: 1,
            wins,
            draws,
            losses,
            goals_for: scored,
            goals_against: conceded,
            points,
        }
    };
    (side(home_score, away_score), side(away_score, home_score))
}

#[derive(Debug, Clone)]
pub struct StandingEntry {
    pub team_id: Uuid,
    pub team_name: String,
    pub record: TeamRecord,
}

/// Points, then goal difference, then goals scored, then name.
pub fn sort_standings(entries: &mut [StandingEntry]) {
    entries.sort_by(|a, b| {
        b.record
            .points
            .cmp(&a.record.points)
            .then_with(|| b.record.goal_difference().cmp(&a.record.goal_difference()))
            .then_with(|| b.record.goals_for.cmp(&a.record.goals_for))
            .then_with(|| a.team_name.cmp(&b.team_name))
    });
}
