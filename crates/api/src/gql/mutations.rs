use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use super::error::{forbidden, not_found, require_found, unauthorized, validation, RepoResultExt};
use super::scalars::Price;
use super::subscriptions::publish_registration_event;
use super::types::{
    ApprovalResult, AudienceKind, AuthPayload, CreateMatchInput, FantasyTeam, LoginInput, Match,
    MatchResultInput, MaintenanceReport, MarketPlayer, NotificationInput, Player, PlayerInput,
    RegistrationEditInput, RegistrationEvent, RegistrationEventType, RegistrationInput,
    SaveFantasyTeamInput, SentNotification, SpectatorLimit, SpectatorRequest,
    SpectatorRequestInput, Team, TeamRegistration, UpdateTeamInput,
};
use crate::auth::password::PasswordService;
use crate::auth::{current_user, require_admin, require_role, AuthUser};
use crate::state::AppState;
use infra::error::RepoError;
use infra::repos::{
    AccountRepo, AccountRole, Audience, CreateMatch, FantasyRepo, MaintenanceRepo, MatchRepo,
    NotificationRepo, OutboxRepo, PlayerRepo, RegistrationRepo, SettingsRepo, SpectatorIdentity,
    SpectatorRepo, SquadPick, TeamRepo, UpdateTeam,
};

/// Admins manage every team; coaches manage their own.
async fn require_team_manager(ctx: &Context<'_>, team_id: Uuid) -> Result<AuthUser> {
    let user = require_role(ctx, &[AccountRole::Admin, AccountRole::Coach]).await?;
    if user.is_admin() || user.team_id == Some(team_id) {
        Ok(user)
    } else {
        Err(forbidden("You can only manage your own team"))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    // Accounts

    /// Sign in as an admin, a player or a coach.
    async fn login(&self, ctx: &Context<'_>, input: LoginInput) -> Result<AuthPayload> {
        let state = ctx.data::<AppState>()?;
        let login = AccountRepo::new(state.db.clone())
            .find_login(&input.email)
            .await
            .gql()?
            .ok_or_else(|| unauthorized("Identifiants invalides"))?;

        let Some(hash) = login.password_hash.as_deref() else {
            return Err(unauthorized(
                "Compte non activé : utilisez le lien reçu par e-mail",
            ));
        };
        if !PasswordService::verify_password(&input.password, hash).gql()? {
            return Err(unauthorized("Identifiants invalides"));
        }
        if !login.is_active {
            return Err(forbidden("Account is disabled"));
        }

        let role: AccountRole = login
            .role
            .parse()
            .map_err(|_| forbidden("Unknown role"))?;
        let token = state
            .jwt_service()
            .create_token(login.id, login.email.clone(), role, login.team_id)
            .gql()?;

        tracing::info!(account_id = %login.id, role = role.as_str(), "login");
        Ok(AuthPayload {
            token,
            account_id: login.id,
            email: login.email,
            role: role.into(),
            team_id: login.team_id,
        })
    }

    /// Send a fresh setup link. Always succeeds so addresses cannot be enumerated.
    async fn request_password_reset(&self, ctx: &Context<'_>, email: String) -> Result<bool> {
        let state = ctx.data::<AppState>()?;
        match AccountRepo::new(state.db.clone())
            .reissue_setup(None, Some(email.trim()))
            .await
        {
            Ok(_) | Err(RepoError::NotFound(_)) => Ok(true),
            Err(e) => Err(e).gql(),
        }
    }

    /// Regenerate the setup link of a player or coach account. Returns the
    /// address the e-mail was queued for.
    async fn resend_credentials(&self, ctx: &Context<'_>, account_id: Uuid) -> Result<String> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        AccountRepo::new(state.db.clone())
            .reissue_setup(Some(account_id), None)
            .await
            .gql()
    }

    // Registrations

    async fn submit_registration(
        &self,
        ctx: &Context<'_>,
        input: RegistrationInput,
    ) -> Result<TeamRegistration> {
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .submit(input.into())
            .await
            .gql()?;

        publish_registration_event(RegistrationEvent::new(RegistrationEventType::Submitted, &row));
        Ok(row.into())
    }

    /// Open a registration that teammates complete through its invite token.
    async fn create_collaborative_registration(
        &self,
        ctx: &Context<'_>,
        input: RegistrationInput,
    ) -> Result<TeamRegistration> {
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .create_collaborative(input.into())
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn add_registration_player(
        &self,
        ctx: &Context<'_>,
        token: String,
        player: PlayerInput,
    ) -> Result<TeamRegistration> {
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .add_player_by_token(&token, player.into())
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn remove_registration_player(
        &self,
        ctx: &Context<'_>,
        token: String,
        jersey_number: i32,
    ) -> Result<TeamRegistration> {
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .remove_player_by_token(&token, jersey_number)
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn finalize_registration(
        &self,
        ctx: &Context<'_>,
        token: String,
    ) -> Result<TeamRegistration> {
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .finalize_collaborative(&token)
            .await
            .gql()?;

        publish_registration_event(RegistrationEvent::new(RegistrationEventType::Submitted, &row));
        Ok(row.into())
    }

    async fn update_registration(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: RegistrationEditInput,
    ) -> Result<TeamRegistration> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .update(id, input.into())
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn promote_registration(&self, ctx: &Context<'_>, id: Uuid) -> Result<TeamRegistration> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .promote_from_waiting_list(id)
            .await
            .gql()?;
        Ok(row.into())
    }

    /// Create the team, its players and their accounts. Approving an already
    /// approved registration returns the existing team.
    async fn approve_registration(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        #[graphql(default = true)] notify_captain: bool,
    ) -> Result<ApprovalResult> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let outcome = RegistrationRepo::new(state.db.clone())
            .approve(id, notify_captain)
            .await
            .gql()?;

        if !outcome.already_approved {
            publish_registration_event(RegistrationEvent::new(
                RegistrationEventType::Approved,
                &outcome.registration,
            ));
        }
        Ok(outcome.into())
    }

    async fn reject_registration(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        reason: Option<String>,
        #[graphql(default = true)] notify_captain: bool,
    ) -> Result<TeamRegistration> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let reason = reason.filter(|r| !r.trim().is_empty());
        let row = RegistrationRepo::new(state.db.clone())
            .reject(id, reason, notify_captain)
            .await
            .gql()?;

        publish_registration_event(RegistrationEvent::new(RegistrationEventType::Rejected, &row));
        Ok(row.into())
    }

    /// Only rejected registrations can be deleted.
    async fn delete_registration(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        RegistrationRepo::new(state.db.clone())
            .delete(id)
            .await
            .gql()?;
        Ok(true)
    }

    async fn set_registration_open(&self, ctx: &Context<'_>, open: bool) -> Result<bool> {
        let admin = require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let open = SettingsRepo::new(state.db.clone())
            .set_registration_open(open)
            .await
            .gql()?;
        tracing::info!(admin_id = %admin.id, open, "registration intake toggled");
        Ok(open)
    }

    // Teams and players

    async fn update_team(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateTeamInput,
    ) -> Result<Team> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let data = UpdateTeam {
            name: input.name,
            school: input.school,
            grade: input.grade,
        };
        let row = TeamRepo::new(state.db.clone()).update(id, data).await.gql()?;
        require_found(row, "team").map(Into::into)
    }

    async fn add_player(
        &self,
        ctx: &Context<'_>,
        team_id: Uuid,
        input: PlayerInput,
    ) -> Result<Player> {
        require_team_manager(ctx, team_id).await?;
        let state = ctx.data::<AppState>()?;
        let created = PlayerRepo::new(state.db.clone())
            .add_to_team(team_id, input.into())
            .await
            .gql()?;
        Ok(created.player.into())
    }

    /// Updates the player and its account e-mail together.
    async fn update_player(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: PlayerInput,
    ) -> Result<Player> {
        let state = ctx.data::<AppState>()?;
        let repo = PlayerRepo::new(state.db.clone());
        let current = require_found(repo.get(id).await.gql()?, "player")?;
        require_team_manager(ctx, current.team_id).await?;

        let row = repo.update(id, input.into()).await.gql()?;
        Ok(row.into())
    }

    async fn delete_player(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let deleted = PlayerRepo::new(state.db.clone()).delete(id).await.gql()?;
        if !deleted {
            return Err(not_found("player"));
        }
        Ok(true)
    }

    // Matches

    async fn create_match(&self, ctx: &Context<'_>, input: CreateMatchInput) -> Result<Match> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let data = CreateMatch {
            home_team_id: input.home_team_id,
            away_team_id: input.away_team_id,
            kickoff_at: input.kickoff_at,
            venue: input.venue,
        };
        let row = MatchRepo::new(state.db.clone()).create(data).await.gql()?;
        Ok(row.into())
    }

    /// Mark a match played and credit standings, player stats and fantasy points.
    async fn record_match_result(
        &self,
        ctx: &Context<'_>,
        input: MatchResultInput,
    ) -> Result<Match> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let lines = input.players.into_iter().map(Into::into).collect();
        let row = MatchRepo::new(state.db.clone())
            .record_result(input.match_id, input.home_score, input.away_score, lines)
            .await
            .gql()?;
        Ok(row.into())
    }

    // Spectators

    async fn request_spectator_seat(
        &self,
        ctx: &Context<'_>,
        input: SpectatorRequestInput,
    ) -> Result<SpectatorRequest> {
        let state = ctx.data::<AppState>()?;
        let identity = SpectatorIdentity {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
        };
        let row = SpectatorRepo::new(state.db.clone())
            .submit(input.match_id, identity)
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn approve_spectator(&self, ctx: &Context<'_>, id: Uuid) -> Result<SpectatorRequest> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = SpectatorRepo::new(state.db.clone())
            .approve(id)
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn reject_spectator(&self, ctx: &Context<'_>, id: Uuid) -> Result<SpectatorRequest> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = SpectatorRepo::new(state.db.clone())
            .reject(id)
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn check_in_spectator(&self, ctx: &Context<'_>, id: Uuid) -> Result<SpectatorRequest> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = SpectatorRepo::new(state.db.clone())
            .check_in(id)
            .await
            .gql()?;
        Ok(row.into())
    }

    /// `maxSpectators: null` removes the limit.
    async fn set_spectator_limit(
        &self,
        ctx: &Context<'_>,
        match_id: Uuid,
        max_spectators: Option<i32>,
    ) -> Result<SpectatorLimit> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let limit = SpectatorRepo::new(state.db.clone())
            .set_limit(match_id, max_spectators)
            .await
            .gql()?;
        Ok(limit.into())
    }

    // Notifications and e-mail

    async fn send_notification(
        &self,
        ctx: &Context<'_>,
        input: NotificationInput,
    ) -> Result<SentNotification> {
        let admin = require_admin(ctx).await?;
        let audience = match (input.audience, input.team_id) {
            (AudienceKind::AllPlayers, _) => Audience::AllPlayers,
            (AudienceKind::AllCoaches, _) => Audience::AllCoaches,
            (AudienceKind::Team, Some(team_id)) => Audience::Team(team_id),
            (AudienceKind::Team, None) => {
                return Err(validation(vec![
                    "Une équipe doit être choisie pour ce destinataire".to_string(),
                ]))
            }
        };

        let state = ctx.data::<AppState>()?;
        let sent = NotificationRepo::new(state.db.clone())
            .send(&input.title, &input.message, audience, Some(admin.id))
            .await
            .gql()?;
        Ok(SentNotification {
            notification: sent.notification.into(),
            recipients: sent.recipients as i32,
        })
    }

    /// Put failed e-mails back in the queue. Returns how many were requeued.
    async fn retry_failed_emails(&self, ctx: &Context<'_>) -> Result<i64> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let count = OutboxRepo::new(state.db.clone())
            .retry_failed()
            .await
            .gql()?;
        Ok(count as i64)
    }

    // Data maintenance

    async fn capitalize_names(&self, ctx: &Context<'_>) -> Result<MaintenanceReport> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let report = MaintenanceRepo::new(state.db.clone())
            .capitalize_names()
            .await
            .gql()?;
        Ok(report.into())
    }

    async fn fix_email_typos(&self, ctx: &Context<'_>) -> Result<MaintenanceReport> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let report = MaintenanceRepo::new(state.db.clone())
            .fix_email_typos()
            .await
            .gql()?;
        Ok(report.into())
    }

    async fn replace_email(
        &self,
        ctx: &Context<'_>,
        old_email: String,
        new_email: String,
    ) -> Result<MaintenanceReport> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let report = MaintenanceRepo::new(state.db.clone())
            .replace_email(&old_email, &new_email)
            .await
            .gql()?;
        Ok(report.into())
    }

    async fn sync_team_names(&self, ctx: &Context<'_>) -> Result<MaintenanceReport> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let report = MaintenanceRepo::new(state.db.clone())
            .sync_team_names()
            .await
            .gql()?;
        Ok(report.into())
    }

    // Fantasy

    /// Create or replace the caller's squad. Prices come from the market.
    async fn save_fantasy_team(
        &self,
        ctx: &Context<'_>,
        input: SaveFantasyTeamInput,
    ) -> Result<FantasyTeam> {
        let user = current_user(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let picks: Vec<SquadPick> = input.players.into_iter().map(Into::into).collect();
        let row = FantasyRepo::new(state.db.clone())
            .save_team(user.id, &input.name, input.formation.into(), &picks)
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn transfer_fantasy_player(
        &self,
        ctx: &Context<'_>,
        outgoing: Uuid,
        incoming: Uuid,
    ) -> Result<FantasyTeam> {
        let user = current_user(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = FantasyRepo::new(state.db.clone())
            .transfer(user.id, outgoing, incoming)
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn set_fantasy_captain(&self, ctx: &Context<'_>, player_id: Uuid) -> Result<FantasyTeam> {
        let user = current_user(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = FantasyRepo::new(state.db.clone())
            .set_captain(user.id, player_id)
            .await
            .gql()?;
        Ok(row.into())
    }

    async fn set_fantasy_price(
        &self,
        ctx: &Context<'_>,
        player_id: Uuid,
        price: Price,
    ) -> Result<MarketPlayer> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = FantasyRepo::new(state.db.clone())
            .set_price(player_id, price.into())
            .await
            .gql()?;
        Ok(row.into())
    }

    /// Start a new gameweek: every squad gets its free transfer back.
    async fn reset_fantasy_gameweek(&self, ctx: &Context<'_>) -> Result<i64> {
        let admin = require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let count = FantasyRepo::new(state.db.clone())
            .reset_gameweek()
            .await
            .gql()?;
        tracing::info!(admin_id = %admin.id, teams = count, "fantasy gameweek reset");
        Ok(count as i64)
    }
}
