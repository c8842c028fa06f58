pub mod accounts;
pub mod fantasy;
pub mod maintenance;
pub mod matches;
pub mod notifications;
pub mod outbox;
pub mod players;
pub mod registrations;
pub mod settings;
pub mod spectators;
pub mod teams;
pub mod users;

pub use accounts::{AccountRepo, AccountRole, AccountSummary, LoginRow};
pub use fantasy::{FantasyRepo, LeaderboardEntry, MarketFilter, MarketPlayer, MarketSort, SquadPick};
pub use maintenance::{MaintenanceReport, MaintenanceRepo};
pub use matches::{CreateMatch, MatchFilter, MatchRepo, MatchStatus, PlayerStatLine, ScorerRow};
pub use notifications::{Audience, NotificationRepo, NotificationStats, SentNotification};
pub use outbox::{OutboxCounts, OutboxMessage, OutboxRepo, OutboxStatus};
pub use players::{MaterializedPlayer, PlayerFilter, PlayerRepo};
pub use registrations::{
    ApprovalOutcome, CreateRegistration, RegistrationEdit, RegistrationFilter, RegistrationRepo,
    RegistrationStatus,
};
pub use settings::SettingsRepo;
pub use spectators::{SpectatorFilter, SpectatorIdentity, SpectatorLimit, SpectatorRepo, SpectatorStatus};
pub use teams::{TeamRepo, UpdateTeam};
pub use users::{UserFilter, UserRepo};
