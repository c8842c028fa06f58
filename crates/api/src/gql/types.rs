use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::error::{require_found, RepoResultExt};
use super::scalars::Price;
use crate::auth::require_team_access;
use crate::state::AppState;
use infra::repos::{MatchRepo, NotificationRepo, PlayerRepo, SpectatorRepo, TeamRepo};
use infra::{fantasy, models, repos};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Role {
    Admin,
    Player,
    Coach,
}

impl From<repos::AccountRole> for Role {
    fn from(role: repos::AccountRole) -> Self {
        match role {
            repos::AccountRole::Admin => Role::Admin,
            repos::AccountRole::Player => Role::Player,
            repos::AccountRole::Coach => Role::Coach,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        role.parse::<repos::AccountRole>()
            .map(Role::from)
            .unwrap_or(Role::Player)
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Attacker,
}

impl From<models::Position> for Position {
    fn from(position: models::Position) -> Self {
        match position {
            models::Position::Goalkeeper => Position::Goalkeeper,
            models::Position::Defender => Position::Defender,
            models::Position::Midfielder => Position::Midfielder,
            models::Position::Attacker => Position::Attacker,
        }
    }
}

impl From<Position> for models::Position {
    fn from(position: Position) -> Self {
        match position {
            Position::Goalkeeper => models::Position::Goalkeeper,
            Position::Defender => models::Position::Defender,
            Position::Midfielder => models::Position::Midfielder,
            Position::Attacker => models::Position::Attacker,
        }
    }
}

impl From<String> for Position {
    fn from(position: String) -> Self {
        position
            .parse::<models::Position>()
            .map(Position::from)
            .unwrap_or(Position::Midfielder)
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Foot {
    Right,
    Left,
    Both,
}

impl From<models::Foot> for Foot {
    fn from(foot: models::Foot) -> Self {
        match foot {
            models::Foot::Right => Foot::Right,
            models::Foot::Left => Foot::Left,
            models::Foot::Both => Foot::Both,
        }
    }
}

impl From<Foot> for models::Foot {
    fn from(foot: Foot) -> Self {
        match foot {
            Foot::Right => models::Foot::Right,
            Foot::Left => models::Foot::Left,
            Foot::Both => models::Foot::Both,
        }
    }
}

impl From<String> for Foot {
    fn from(foot: String) -> Self {
        foot.parse::<models::Foot>()
            .map(Foot::from)
            .unwrap_or(Foot::Right)
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    PendingPlayers,
    PendingValidation,
}

impl From<repos::RegistrationStatus> for RegistrationStatus {
    fn from(status: repos::RegistrationStatus) -> Self {
        match status {
            repos::RegistrationStatus::Pending => RegistrationStatus::Pending,
            repos::RegistrationStatus::Approved => RegistrationStatus::Approved,
            repos::RegistrationStatus::Rejected => RegistrationStatus::Rejected,
            repos::RegistrationStatus::PendingPlayers => RegistrationStatus::PendingPlayers,
            repos::RegistrationStatus::PendingValidation => RegistrationStatus::PendingValidation,
        }
    }
}

impl From<RegistrationStatus> for repos::RegistrationStatus {
    fn from(status: RegistrationStatus) -> Self {
        match status {
            RegistrationStatus::Pending => repos::RegistrationStatus::Pending,
            RegistrationStatus::Approved => repos::RegistrationStatus::Approved,
            RegistrationStatus::Rejected => repos::RegistrationStatus::Rejected,
            RegistrationStatus::PendingPlayers => repos::RegistrationStatus::PendingPlayers,
            RegistrationStatus::PendingValidation => repos::RegistrationStatus::PendingValidation,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum SpectatorStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<repos::SpectatorStatus> for SpectatorStatus {
    fn from(status: repos::SpectatorStatus) -> Self {
        match status {
            repos::SpectatorStatus::Pending => SpectatorStatus::Pending,
            repos::SpectatorStatus::Approved => SpectatorStatus::Approved,
            repos::SpectatorStatus::Rejected => SpectatorStatus::Rejected,
        }
    }
}

impl From<SpectatorStatus> for repos::SpectatorStatus {
    fn from(status: SpectatorStatus) -> Self {
        match status {
            SpectatorStatus::Pending => repos::SpectatorStatus::Pending,
            SpectatorStatus::Approved => repos::SpectatorStatus::Approved,
            SpectatorStatus::Rejected => repos::SpectatorStatus::Rejected,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum MatchStatus {
    Scheduled,
    Played,
}

impl From<String> for MatchStatus {
    fn from(status: String) -> Self {
        match status.parse::<repos::MatchStatus>() {
            Ok(repos::MatchStatus::Played) => MatchStatus::Played,
            _ => MatchStatus::Scheduled,
        }
    }
}

impl From<MatchStatus> for repos::MatchStatus {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Scheduled => repos::MatchStatus::Scheduled,
            MatchStatus::Played => repos::MatchStatus::Played,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Formation {
    #[graphql(name = "F_4_2_0")]
    F420,
    #[graphql(name = "F_3_3_0")]
    F330,
    #[graphql(name = "F_3_2_1")]
    F321,
    #[graphql(name = "F_2_3_1")]
    F231,
    #[graphql(name = "F_2_2_2")]
    F222,
}

impl From<fantasy::Formation> for Formation {
    fn from(formation: fantasy::Formation) -> Self {
        match formation {
            fantasy::Formation::F420 => Formation::F420,
            fantasy::Formation::F330 => Formation::F330,
            fantasy::Formation::F321 => Formation::F321,
            fantasy::Formation::F231 => Formation::F231,
            fantasy::Formation::F222 => Formation::F222,
        }
    }
}

impl From<Formation> for fantasy::Formation {
    fn from(formation: Formation) -> Self {
        match formation {
            Formation::F420 => fantasy::Formation::F420,
            Formation::F330 => fantasy::Formation::F330,
            Formation::F321 => fantasy::Formation::F321,
            Formation::F231 => fantasy::Formation::F231,
            Formation::F222 => fantasy::Formation::F222,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum MarketSort {
    Price,
    Points,
    Popularity,
}

impl From<MarketSort> for repos::MarketSort {
    fn from(sort: MarketSort) -> Self {
        match sort {
            MarketSort::Price => repos::MarketSort::Price,
            MarketSort::Points => repos::MarketSort::Points,
            MarketSort::Popularity => repos::MarketSort::Popularity,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum AudienceKind {
    AllPlayers,
    AllCoaches,
    Team,
}

impl From<String> for AudienceKind {
    fn from(audience: String) -> Self {
        match audience.as_str() {
            "all_coaches" => AudienceKind::AllCoaches,
            "team" => AudienceKind::Team,
            _ => AudienceKind::AllPlayers,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum OutboxStatus {
    Pending,
    Sending,
    Sent,
    Failed,
}

impl From<String> for OutboxStatus {
    fn from(status: String) -> Self {
        match status.parse::<repos::OutboxStatus>() {
            Ok(repos::OutboxStatus::Pending) => OutboxStatus::Pending,
            Ok(repos::OutboxStatus::Sending) => OutboxStatus::Sending,
            Ok(repos::OutboxStatus::Sent) => OutboxStatus::Sent,
            _ => OutboxStatus::Failed,
        }
    }
}

impl From<OutboxStatus> for repos::OutboxStatus {
    fn from(status: OutboxStatus) -> Self {
        match status {
            OutboxStatus::Pending => repos::OutboxStatus::Pending,
            OutboxStatus::Sending => repos::OutboxStatus::Sending,
            OutboxStatus::Sent => repos::OutboxStatus::Sent,
            OutboxStatus::Failed => repos::OutboxStatus::Failed,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum RegistrationEventType {
    Submitted,
    Approved,
    Rejected,
}

// Accounts

#[derive(SimpleObject, Clone)]
pub struct AuthPayload {
    pub token: String,
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
    pub team_id: Option<Uuid>,
}

/// The authenticated account.
#[derive(SimpleObject, Clone)]
pub struct Viewer {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub team_id: Option<Uuid>,
}

impl From<crate::auth::AuthUser> for Viewer {
    fn from(user: crate::auth::AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role.into(),
            team_id: user.team_id,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl From<repos::AccountSummary> for Account {
    fn from(row: repos::AccountSummary) -> Self {
        Self {
            id: row.id,
            email: row.email,
            role: Role::from(row.role),
            name: row.name,
            team_id: row.team_id,
            team_name: row.team_name,
            has_password: row.has_password,
            created_at: row.created_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<models::UserRow> for Admin {
    fn from(row: models::UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(InputObject)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

// Registrations

#[derive(SimpleObject, Clone)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl From<models::Contact> for Contact {
    fn from(contact: models::Contact) -> Self {
        Self {
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone: contact.phone,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[graphql(default)]
    pub phone: String,
}

impl From<ContactInput> for models::Contact {
    fn from(input: ContactInput) -> Self {
        Self {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
        }
    }
}

/// Player as entered on a registration.
#[derive(SimpleObject, Clone)]
pub struct RegisteredPlayer {
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

impl From<models::PlayerInfo> for RegisteredPlayer {
    fn from(info: models::PlayerInfo) -> Self {
        Self {
            first_name: info.first_name,
            last_name: info.last_name,
            email: info.email,
            phone: info.phone,
            position: info.position.into(),
            foot: info.foot.into(),
            jersey_number: info.jersey_number,
            birth_date: info.birth_date,
            height_cm: info.height_cm,
            weight_kg: info.weight_kg,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct PlayerInput {
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

impl From<PlayerInput> for models::PlayerInfo {
    fn from(input: PlayerInput) -> Self {
        Self {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email.filter(|e| !e.trim().is_empty()),
            phone: input.phone,
            position: input.position.into(),
            foot: input.foot.into(),
            jersey_number: input.jersey_number,
            birth_date: input.birth_date,
            height_cm: input.height_cm,
            weight_kg: input.weight_kg,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct TeamRegistration {
    pub id: Uuid,
    pub team_name: String,
    pub school: String,
    pub grade: String,
    pub captain: Contact,
    pub coach: Option<Contact>,
    pub players: Vec<RegisteredPlayer>,
    pub status: RegistrationStatus,
    pub invite_token: Option<String>,
    pub waiting_list: bool,
    pub team_id: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<models::TeamRegistrationRow> for TeamRegistration {
    fn from(row: models::TeamRegistrationRow) -> Self {
        Self {
            id: row.id,
            captain: row.captain().into(),
            coach: row.coach().map(Into::into),
            status: row.status().into(),
            team_name: row.team_name,
            school: row.school,
            grade: row.grade,
            players: row.players.0.into_iter().map(Into::into).collect(),
            invite_token: row.invite_token,
            waiting_list: row.waiting_list,
            team_id: row.team_id,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(InputObject)]
pub struct RegistrationInput {
    pub team_name: String,
    pub school: String,
    pub grade: String,
    pub captain: ContactInput,
    pub coach: Option<ContactInput>,
    #[graphql(default)]
    pub players: Vec<PlayerInput>,
}

impl From<RegistrationInput> for repos::CreateRegistration {
    fn from(input: RegistrationInput) -> Self {
        Self {
            team_name: input.team_name,
            school: input.school,
            grade: input.grade,
            captain: input.captain.into(),
            coach: input.coach.map(Into::into),
            players: input.players.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(InputObject, Default)]
pub struct RegistrationEditInput {
    pub team_name: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub captain: Option<ContactInput>,
    pub coach: Option<ContactInput>,
    pub players: Option<Vec<PlayerInput>>,
}

impl From<RegistrationEditInput> for repos::RegistrationEdit {
    fn from(input: RegistrationEditInput) -> Self {
        Self {
            team_name: input.team_name,
            school: input.school,
            grade: input.grade,
            captain: input.captain.map(Into::into),
            coach: input.coach.map(Into::into),
            players: input
                .players
                .map(|players| players.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct ApprovalResult {
    pub registration: TeamRegistration,
    pub team: Team,
    pub accounts_created: i32,
    pub emails_queued: i32,
    pub already_approved: bool,
}

impl From<repos::ApprovalOutcome> for ApprovalResult {
    fn from(outcome: repos::ApprovalOutcome) -> Self {
        let accounts = outcome.players.iter().filter(|p| p.account.is_some()).count()
            + usize::from(outcome.coach_account.is_some());
        Self {
            registration: outcome.registration.into(),
            team: outcome.team.into(),
            accounts_created: accounts as i32,
            emails_queued: outcome.emails_queued as i32,
            already_approved: outcome.already_approved,
        }
    }
}

/// Broadcast to subscribers. Carries no contact details.
#[derive(SimpleObject, Clone)]
pub struct RegistrationEvent {
    pub event_type: RegistrationEventType,
    pub registration_id: Uuid,
    pub team_name: String,
    pub status: RegistrationStatus,
    pub occurred_at: DateTime<Utc>,
}

impl RegistrationEvent {
    pub fn new(event_type: RegistrationEventType, registration: &models::TeamRegistrationRow) -> Self {
        Self {
            event_type,
            registration_id: registration.id,
            team_name: registration.team_name.clone(),
            status: registration.status().into(),
            occurred_at: Utc::now(),
        }
    }
}

// Teams and players

#[derive(SimpleObject, Clone)]
#[graphql(complex)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub school: String,
    pub grade: String,
    #[graphql(skip)]
    pub captain: Contact,
    #[graphql(skip)]
    pub coach: Option<Contact>,
    pub created_at: DateTime<Utc>,
}

impl From<models::TeamRow> for Team {
    fn from(row: models::TeamRow) -> Self {
        Self {
            id: row.id,
            captain: row.captain().into(),
            coach: row.coach().map(Into::into),
            name: row.name,
            school: row.school,
            grade: row.grade,
            created_at: row.created_at,
        }
    }
}

#[derive(InputObject)]
pub struct UpdateTeamInput {
    pub name: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
}

#[derive(SimpleObject, Clone)]
pub struct Player {
    pub id: Uuid,
    pub team_id: Uuid,
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

impl From<models::PlayerRow> for Player {
    fn from(row: models::PlayerRow) -> Self {
        Self {
            id: row.id,
            team_id: row.team_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            position: row.position.into(),
            foot: row.foot.into(),
            jersey_number: row.jersey_number,
            birth_date: row.birth_date,
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct TeamStatistics {
    pub team_id: Uuid,
    pub played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
    pub points: i32,
}

impl From<models::TeamStatisticsRow> for TeamStatistics {
    fn from(row: models::TeamStatisticsRow) -> Self {
        Self {
            team_id: row.team_id,
            played: row.played,
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            goal_difference: row.goals_for - row.goals_against,
            points: row.points,
        }
    }
}

// Matches

#[derive(SimpleObject, Clone)]
#[graphql(complex)]
pub struct Match {
    pub id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub kickoff_at: DateTime<Utc>,
    pub venue: Option<String>,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl From<models::MatchRow> for Match {
    fn from(row: models::MatchRow) -> Self {
        Self {
            id: row.id,
            home_team_id: row.home_team_id,
            away_team_id: row.away_team_id,
            kickoff_at: row.kickoff_at,
            venue: row.venue,
            status: row.status.into(),
            home_score: row.home_score,
            away_score: row.away_score,
        }
    }
}

#[derive(InputObject)]
pub struct CreateMatchInput {
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub kickoff_at: DateTime<Utc>,
    pub venue: Option<String>,
}

#[derive(InputObject, Clone, Copy)]
pub struct PlayerStatInput {
    pub player_id: Uuid,
    #[graphql(default)]
    pub goals: i32,
    #[graphql(default)]
    pub assists: i32,
    #[graphql(default)]
    pub yellow_cards: i32,
    #[graphql(default)]
    pub red_cards: i32,
}

impl From<PlayerStatInput> for repos::PlayerStatLine {
    fn from(input: PlayerStatInput) -> Self {
        Self {
            player_id: input.player_id,
            goals: input.goals,
            assists: input.assists,
            yellow_cards: input.yellow_cards,
            red_cards: input.red_cards,
        }
    }
}

#[derive(InputObject)]
pub struct MatchResultInput {
    pub match_id: Uuid,
    pub home_score: i32,
    pub away_score: i32,
    #[graphql(default)]
    pub players: Vec<PlayerStatInput>,
}

#[derive(SimpleObject, Clone)]
pub struct PlayerMatchStats {
    pub player_id: Uuid,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
}

impl From<repos::matches::PlayerMatchStatsRow> for PlayerMatchStats {
    fn from(row: repos::matches::PlayerMatchStatsRow) -> Self {
        Self {
            player_id: row.player_id,
            goals: row.goals,
            assists: row.assists,
            yellow_cards: row.yellow_cards,
            red_cards: row.red_cards,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Standing {
    pub rank: i32,
    pub team_id: Uuid,
    pub team_name: String,
    pub played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
    pub points: i32,
}

impl Standing {
    pub fn new(rank: usize, entry: infra::standings::StandingEntry) -> Self {
        let record = entry.record;
        Self {
            rank: rank as i32,
            team_id: entry.team_id,
            team_name: entry.team_name,
            played: record.played,
            wins: record.wins,
            draws: record.draws,
            losses: record.losses,
            goals_for: record.goals_for,
            goals_against: record.goals_against,
            goal_difference: record.goal_difference(),
            points: record.points,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Scorer {
    pub player_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub goals: i64,
    pub assists: i64,
    pub matches: i64,
}

impl From<repos::ScorerRow> for Scorer {
    fn from(row: repos::ScorerRow) -> Self {
        Self {
            player_id: row.player_id,
            first_name: row.first_name,
            last_name: row.last_name,
            team_id: row.team_id,
            team_name: row.team_name,
            goals: row.goals,
            assists: row.assists,
            matches: row.matches,
        }
    }
}

// Spectators

#[derive(SimpleObject, Clone)]
pub struct SpectatorRequest {
    pub id: Uuid,
    pub match_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: SpectatorStatus,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<models::SpectatorRequestRow> for SpectatorRequest {
    fn from(row: models::SpectatorRequestRow) -> Self {
        Self {
            id: row.id,
            status: row.status().into(),
            match_id: row.match_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            checked_in: row.checked_in,
            checked_in_at: row.checked_in_at,
            created_at: row.created_at,
        }
    }
}

#[derive(InputObject)]
pub struct SpectatorRequestInput {
    pub match_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(SimpleObject, Clone, Copy)]
pub struct SpectatorLimit {
    pub match_id: Uuid,
    /// Null when the match has no limit.
    pub max_spectators: Option<i32>,
    pub approved: i64,
    pub remaining: Option<i64>,
}

impl From<repos::SpectatorLimit> for SpectatorLimit {
    fn from(limit: repos::SpectatorLimit) -> Self {
        Self {
            match_id: limit.match_id,
            max_spectators: limit.max_spectators,
            approved: limit.approved,
            remaining: limit.remaining(),
        }
    }
}

// Notifications and e-mail

#[derive(SimpleObject, Clone)]
#[graphql(complex)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub audience: AudienceKind,
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<models::NotificationRow> for Notification {
    fn from(row: models::NotificationRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            message: row.message,
            audience: row.audience.into(),
            team_id: row.team_id,
            created_at: row.created_at,
        }
    }
}

#[derive(InputObject)]
pub struct NotificationInput {
    pub title: String,
    pub message: String,
    pub audience: AudienceKind,
    /// Required when the audience is a team.
    pub team_id: Option<Uuid>,
}

#[derive(SimpleObject, Clone, Copy)]
pub struct NotificationStats {
    pub recipients: i64,
    pub opened: i64,
    pub open_rate: f64,
}

impl From<repos::NotificationStats> for NotificationStats {
    fn from(stats: repos::NotificationStats) -> Self {
        Self {
            recipients: stats.recipients,
            opened: stats.opened,
            open_rate: stats.open_rate(),
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct SentNotification {
    pub notification: Notification,
    pub recipients: i32,
}

#[derive(SimpleObject, Clone, Copy)]
pub struct OutboxSummary {
    pub pending: i64,
    pub sending: i64,
    pub sent: i64,
    pub failed: i64,
}

impl From<repos::OutboxCounts> for OutboxSummary {
    fn from(counts: repos::OutboxCounts) -> Self {
        Self {
            pending: counts.pending,
            sending: counts.sending,
            sent: counts.sent,
            failed: counts.failed,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct OutboxEmail {
    pub id: Uuid,
    pub recipient: String,
    pub kind: String,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<models::OutboxRow> for OutboxEmail {
    fn from(row: models::OutboxRow) -> Self {
        Self {
            id: row.id,
            recipient: row.recipient,
            kind: row.kind,
            status: row.status.into(),
            attempts: row.attempts,
            next_attempt_at: row.next_attempt_at,
            last_error: row.last_error,
            sent_at: row.sent_at,
            created_at: row.created_at,
        }
    }
}

// Maintenance

#[derive(SimpleObject, Clone)]
pub struct TableCount {
    pub table: String,
    pub updated: i64,
}

#[derive(SimpleObject, Clone)]
pub struct MaintenanceReport {
    pub total: i64,
    pub tables: Vec<TableCount>,
}

impl From<repos::MaintenanceReport> for MaintenanceReport {
    fn from(report: repos::MaintenanceReport) -> Self {
        Self {
            total: report.total() as i64,
            tables: report
                .tables
                .into_iter()
                .map(|(table, updated)| TableCount {
                    table,
                    updated: updated as i64,
                })
                .collect(),
        }
    }
}

// Fantasy

#[derive(SimpleObject, Clone)]
pub struct FantasySlot {
    pub player_id: Uuid,
    pub position: Position,
    pub price: Price,
    pub points: i32,
    pub is_captain: bool,
}

impl From<fantasy::FantasySlot> for FantasySlot {
    fn from(slot: fantasy::FantasySlot) -> Self {
        Self {
            player_id: slot.player_id,
            position: slot.position.into(),
            price: slot.price.into(),
            points: slot.points,
            is_captain: slot.is_captain,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct FantasySlotInput {
    pub player_id: Uuid,
    pub position: Position,
    pub price: Price,
    #[graphql(default)]
    pub points: i32,
    #[graphql(default)]
    pub is_captain: bool,
}

impl From<FantasySlotInput> for fantasy::FantasySlot {
    fn from(input: FantasySlotInput) -> Self {
        Self {
            player_id: input.player_id,
            position: input.position.into(),
            price: input.price.into(),
            points: input.points,
            is_captain: input.is_captain,
        }
    }
}

#[derive(InputObject, Clone, Copy)]
pub struct SquadPickInput {
    pub player_id: Uuid,
    #[graphql(default)]
    pub is_captain: bool,
}

impl From<SquadPickInput> for repos::SquadPick {
    fn from(input: SquadPickInput) -> Self {
        Self {
            player_id: input.player_id,
            is_captain: input.is_captain,
        }
    }
}

#[derive(InputObject)]
pub struct SaveFantasyTeamInput {
    pub name: String,
    pub formation: Formation,
    pub players: Vec<SquadPickInput>,
}

#[derive(SimpleObject, Clone)]
pub struct SquadValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl From<fantasy::Validation> for SquadValidation {
    fn from(validation: fantasy::Validation) -> Self {
        Self {
            valid: validation.valid,
            errors: validation.errors,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct FantasyTeam {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub formation: Option<Formation>,
    pub slots: Vec<FantasySlot>,
    pub transfers_made: i32,
    pub penalty_points: i32,
    pub total_cost: Price,
    pub remaining_budget: Price,
    pub updated_at: DateTime<Utc>,
}

impl From<models::FantasyTeamRow> for FantasyTeam {
    fn from(row: models::FantasyTeamRow) -> Self {
        let slots = row.slots.0;
        Self {
            id: row.id,
            owner_id: row.owner_id,
            formation: row.formation.parse::<fantasy::Formation>().ok().map(Into::into),
            name: row.name,
            total_cost: fantasy::total_cost(&slots).into(),
            remaining_budget: fantasy::remaining_budget(&slots).into(),
            slots: slots.into_iter().map(Into::into).collect(),
            transfers_made: row.transfers_made,
            penalty_points: row.penalty_points,
            updated_at: row.updated_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct MarketPlayer {
    pub player_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub position: Position,
    pub price: Price,
    pub total_points: i32,
    pub selected_by: i32,
}

impl From<repos::MarketPlayer> for MarketPlayer {
    fn from(row: repos::MarketPlayer) -> Self {
        Self {
            price: row.price().into(),
            player_id: row.player_id,
            first_name: row.first_name,
            last_name: row.last_name,
            team_id: row.team_id,
            team_name: row.team_name,
            position: row.position.into(),
            total_points: row.total_points,
            selected_by: row.selected_by,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct LeaderboardEntry {
    pub rank: i32,
    pub team: FantasyTeam,
    pub points: i32,
}

impl From<repos::LeaderboardEntry> for LeaderboardEntry {
    fn from(entry: repos::LeaderboardEntry) -> Self {
        Self {
            rank: entry.rank as i32,
            team: entry.team.into(),
            points: entry.points,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct FormationInfo {
    pub formation: Formation,
    pub label: String,
    pub defenders: i32,
    pub midfielders: i32,
    pub attackers: i32,
}

#[derive(SimpleObject, Clone)]
pub struct FantasyRules {
    pub squad_size: i32,
    pub budget: Price,
    pub free_transfers: i32,
    pub transfer_penalty: i32,
    pub formations: Vec<FormationInfo>,
}

impl FantasyRules {
    pub fn current() -> Self {
        Self {
            squad_size: fantasy::SQUAD_SIZE as i32,
            budget: fantasy::TOTAL_BUDGET.into(),
            free_transfers: fantasy::FREE_TRANSFERS as i32,
            transfer_penalty: fantasy::TRANSFER_PENALTY as i32,
            formations: fantasy::Formation::ALL
                .into_iter()
                .map(|formation| {
                    let (defenders, midfielders, attackers) = formation.lines();
                    FormationInfo {
                        formation: formation.into(),
                        label: formation.as_str().to_string(),
                        defenders: defenders as i32,
                        midfielders: midfielders as i32,
                        attackers: attackers as i32,
                    }
                })
                .collect(),
        }
    }
}

#[ComplexObject]
impl Team {
    /// Contacts and the roster are limited to admins and the team's accounts.
    async fn captain(&self, ctx: &Context<'_>) -> Result<Option<Contact>> {
        require_team_access(ctx, self.id).await?;
        Ok(Some(self.captain.clone()))
    }

    async fn coach(&self, ctx: &Context<'_>) -> Result<Option<Contact>> {
        require_team_access(ctx, self.id).await?;
        Ok(self.coach.clone())
    }

    async fn players(&self, ctx: &Context<'_>) -> Result<Option<Vec<Player>>> {
        require_team_access(ctx, self.id).await?;
        let state = ctx.data::<AppState>()?;
        let rows = PlayerRepo::new(state.db.clone())
            .list_by_team(self.id)
            .await
            .gql()?;
        Ok(Some(rows.into_iter().map(Into::into).collect()))
    }

    async fn statistics(&self, ctx: &Context<'_>) -> Result<Option<TeamStatistics>> {
        let state = ctx.data::<AppState>()?;
        let row = TeamRepo::new(state.db.clone())
            .statistics(self.id)
            .await
            .gql()?;
        Ok(row.map(Into::into))
    }
}

#[ComplexObject]
impl Match {
    async fn home_team(&self, ctx: &Context<'_>) -> Result<Team> {
        load_team(ctx, self.home_team_id).await
    }

    async fn away_team(&self, ctx: &Context<'_>) -> Result<Team> {
        load_team(ctx, self.away_team_id).await
    }

    async fn player_stats(&self, ctx: &Context<'_>) -> Result<Vec<PlayerMatchStats>> {
        let state = ctx.data::<AppState>()?;
        let rows = MatchRepo::new(state.db.clone())
            .player_stats(self.id)
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn spectator_limit(&self, ctx: &Context<'_>) -> Result<SpectatorLimit> {
        let state = ctx.data::<AppState>()?;
        let limit = SpectatorRepo::new(state.db.clone())
            .get_limit(self.id)
            .await
            .gql()?;
        Ok(limit.into())
    }
}

async fn load_team(ctx: &Context<'_>, team_id: Uuid) -> Result<Team> {
    let state = ctx.data::<AppState>()?;
    let row = TeamRepo::new(state.db.clone()).get(team_id).await.gql()?;
    require_found(row, "team").map(Into::into)
}

#[ComplexObject]
impl Notification {
    async fn stats(&self, ctx: &Context<'_>) -> Result<NotificationStats> {
        let state = ctx.data::<AppState>()?;
        let stats = NotificationRepo::new(state.db.clone())
            .stats(self.id)
            .await
            .gql()?;
        Ok(stats.into())
    }
}
