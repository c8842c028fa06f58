use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "Gardien")]
    Goalkeeper,
    #[serde(rename = "Défenseur")]
    Defender,
    #[serde(rename = "Milieu")]
    Midfielder,
    #[serde(rename = "Attaquant")]
    Attacker,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Attacker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "Gardien",
            Position::Defender => "Défenseur",
            Position::Midfielder => "Milieu",
            Position::Attacker => "Attaquant",
        }
    }

    /// Label agreed with a count, e.g. "Défenseurs" for 2.
    pub fn label(&self, count: usize) -> String {
        if count > 1 {
            format!("{}s", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gardien" => Ok(Position::Goalkeeper),
            "Défenseur" => Ok(Position::Defender),
            "Milieu" => Ok(Position::Midfielder),
            "Attaquant" => Ok(Position::Attacker),
            other => Err(format!("Poste inconnu: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Foot {
    #[serde(rename = "droit")]
    Right,
    #[serde(rename = "gauche")]
    Left,
    #[serde(rename = "les deux")]
    Both,
}

impl Foot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Foot::Right => "droit",
            Foot::Left => "gauche",
            Foot::Both => "les deux",
        }
    }
}

impl FromStr for Foot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "droit" => Ok(Foot::Right),
            "gauche" => Ok(Foot::Left),
            "les deux" => Ok(Foot::Both),
            other => Err(format!("Pied inconnu: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Player as entered on a registration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Position,
    pub foot: Foot,
    pub jersey_number: i32,
    pub birth_date: Option<NaiveDate>,
    pub height_cm: Option<i32>,
    pub weight_kg: Option<i32>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TeamRegistrationRow {
    pub id: Uuid,
    pub team_name: String,
    pub school: String,
    pub grade: String,
    pub captain_first_name: String,
    pub captain_last_name: String,
    pub captain_email: String,
    pub captain_phone: String,
    pub coach_first_name: Option<String>,
    pub coach_last_name: Option<String>,
    pub coach_email: Option<String>,
    pub coach_phone: Option<String>,
    pub players: Json<Vec<PlayerInfo>>,
    pub status: String,
    pub invite_token: Option<String>,
    pub waiting_list: bool,
    pub team_id: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamRegistrationRow {
    pub fn captain(&self) -> Contact {
        Contact {
            first_name: self.captain_first_name.clone(),
            last_name: self.captain_last_name.clone(),
            email: self.captain_email.clone(),
            phone: self.captain_phone.clone(),
        }
    }

    pub fn coach(&self) -> Option<Contact> {
        coach_contact(
            &self.coach_first_name,
            &self.coach_last_name,
            &self.coach_email,
            &self.coach_phone,
        )
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamRow {
    pub id: Uuid,
    pub name: String,
    pub school: String,
    pub grade: String,
    pub captain_first_name: String,
    pub captain_last_name: String,
    pub captain_email: String,
    pub captain_phone: String,
    pub coach_first_name: Option<String>,
    pub coach_last_name: Option<String>,
    pub coach_email: Option<String>,
    pub coach_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamRow {
    pub fn captain(&self) -> Contact {
        Contact {
            first_name: self.captain_first_name.clone(),
            last_name: self.captain_last_name.clone(),
            email: self.captain_email.clone(),
            phone: self.captain_phone.clone(),
        }
    }

    pub fn coach(&self) -> Option<Contact> {
        coach_contact(
            &self.coach_first_name,
            &self.coach_last_name,
            &self.coach_email,
            &self.coach_phone,
        )
    }
}

fn coach_contact(
    first_name: &Option<String>,
    last_name: &Option<String>,
    email: &Option<String>,
    phone: &Option<String>,
) -> Option<Contact> {
    match (first_name, last_name, email) {
        (Some(first_name), Some(last_name), Some(email)) => Some(Contact {
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            email: email.clone(),
            phone: phone.clone().unwrap_or_default(),
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlayerRow {
    pub id: Uuid,
    pub team_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: String,
    pub foot: String,
    pub jersey_number: i32,
    pub birth_date: Option<NaiveDate>,
    pub height_cm: Option<i32>,
    pub weight_kg: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlayerAccountRow {
    pub id: Uuid,
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub setup_token: Option<String>,
    pub setup_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CoachAccountRow {
    pub id: Uuid,
    pub team_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub setup_token: Option<String>,
    pub setup_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamStatisticsRow {
    pub team_id: Uuid,
    pub played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub points: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MatchRow {
    pub id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub kickoff_at: DateTime<Utc>,
    pub venue: Option<String>,
    pub status: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SpectatorRequestRow {
    pub id: Uuid,
    pub match_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub audience: String,
    pub team_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OutboxRow {
    pub id: Uuid,
    pub recipient: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FantasyTeamRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub formation: String,
    pub slots: Json<Vec<crate::fantasy::FantasySlot>>,
    pub transfers_made: i32,
    pub penalty_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
