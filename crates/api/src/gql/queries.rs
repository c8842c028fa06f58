use async_graphql::{Context, Object, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::{forbidden, require_found, RepoResultExt};
use super::scalars::Price;
use super::types::{
    Account, Admin, FantasyRules, FantasySlotInput, FantasyTeam, Formation, LeaderboardEntry,
    Match, MatchStatus, MarketPlayer, MarketSort, Notification, NotificationStats, OutboxEmail,
    OutboxStatus, OutboxSummary, Player, Position, RegistrationStatus, Scorer, SpectatorLimit,
    SpectatorRequest, SpectatorStatus, SquadValidation, Standing, Team, TeamRegistration, Viewer,
};
use crate::auth::{current_user, require_admin};
use crate::state::AppState;
use infra::fantasy::{self, FantasySlot, SquadDraft};
use infra::pagination::LimitOffset;
use infra::repos::{
    AccountRepo, FantasyRepo, MarketFilter, MatchFilter, MatchRepo, NotificationRepo, OutboxRepo,
    PlayerFilter, PlayerRepo, RegistrationFilter, RegistrationRepo, SettingsRepo, SpectatorFilter,
    SpectatorRepo, TeamRepo, UserFilter, UserRepo,
};

fn page(limit: Option<i64>, offset: Option<i64>) -> Option<LimitOffset> {
    Some(LimitOffset {
        limit: limit.unwrap_or(50).clamp(1, 200),
        offset: offset.unwrap_or(0).max(0),
    })
}

fn to_slots(input: Vec<FantasySlotInput>) -> Vec<FantasySlot> {
    input.into_iter().map(Into::into).collect()
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Current server time (UTC).
    async fn server_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn me(&self, ctx: &Context<'_>) -> Result<Viewer> {
        Ok(current_user(ctx).await?.into())
    }

    /// Whether new registrations go straight to review or to the waiting list.
    async fn registration_open(&self, ctx: &Context<'_>) -> Result<bool> {
        let state = ctx.data::<AppState>()?;
        SettingsRepo::new(state.db.clone())
            .registration_open()
            .await
            .gql()
    }

    // Registrations

    async fn registrations(
        &self,
        ctx: &Context<'_>,
        status: Option<RegistrationStatus>,
        waiting_list: Option<bool>,
        search: Option<String>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<TeamRegistration>> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let filter = RegistrationFilter {
            status: status.map(Into::into),
            waiting_list,
            search,
        };
        let rows = RegistrationRepo::new(state.db.clone())
            .list(filter, page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn registration(&self, ctx: &Context<'_>, id: Uuid) -> Result<TeamRegistration> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone()).get(id).await.gql()?;
        require_found(row, "registration").map(Into::into)
    }

    /// A collaborative registration, for whoever holds its invite link.
    async fn registration_by_invite(
        &self,
        ctx: &Context<'_>,
        token: String,
    ) -> Result<TeamRegistration> {
        let state = ctx.data::<AppState>()?;
        let row = RegistrationRepo::new(state.db.clone())
            .get_by_invite_token(&token)
            .await
            .gql()?;
        require_found(row, "registration").map(Into::into)
    }

    // Teams and players

    async fn teams(&self, ctx: &Context<'_>) -> Result<Vec<Team>> {
        let state = ctx.data::<AppState>()?;
        let rows = TeamRepo::new(state.db.clone()).list_all().await.gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn team(&self, ctx: &Context<'_>, id: Uuid) -> Result<Team> {
        let state = ctx.data::<AppState>()?;
        let row = TeamRepo::new(state.db.clone()).get(id).await.gql()?;
        require_found(row, "team").map(Into::into)
    }

    /// Admins see every player; team members see their own roster.
    async fn players(
        &self,
        ctx: &Context<'_>,
        team_id: Option<Uuid>,
        position: Option<Position>,
        search: Option<String>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Player>> {
        let user = current_user(ctx).await?;
        let team_id = if user.is_admin() {
            team_id
        } else {
            let own = user
                .team_id
                .ok_or_else(|| forbidden("You can only access your own team"))?;
            if team_id.is_some_and(|id| id != own) {
                return Err(forbidden("You can only access your own team"));
            }
            Some(own)
        };

        let state = ctx.data::<AppState>()?;
        let filter = PlayerFilter {
            team_id,
            position: position.map(Into::into),
            search,
        };
        let rows = PlayerRepo::new(state.db.clone())
            .list(filter, page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn accounts(&self, ctx: &Context<'_>, team_id: Option<Uuid>) -> Result<Vec<Account>> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let rows = AccountRepo::new(state.db.clone()).list(team_id).await.gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn admins(
        &self,
        ctx: &Context<'_>,
        search: Option<String>,
        is_active: Option<bool>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Admin>> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let filter = UserFilter { search, is_active };
        let rows = UserRepo::new(state.db.clone())
            .list(filter, page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // Matches and statistics

    async fn matches(
        &self,
        ctx: &Context<'_>,
        team_id: Option<Uuid>,
        status: Option<MatchStatus>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Match>> {
        let state = ctx.data::<AppState>()?;
        let filter = MatchFilter {
            team_id,
            status: status.map(Into::into),
            from,
            to,
        };
        let rows = MatchRepo::new(state.db.clone())
            .list(filter, page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[graphql(name = "match")]
    async fn match_by_id(&self, ctx: &Context<'_>, id: Uuid) -> Result<Match> {
        let state = ctx.data::<AppState>()?;
        let row = MatchRepo::new(state.db.clone()).get(id).await.gql()?;
        require_found(row, "match").map(Into::into)
    }

    /// League table: points, goal difference, goals scored, then name.
    async fn standings(&self, ctx: &Context<'_>) -> Result<Vec<Standing>> {
        let state = ctx.data::<AppState>()?;
        let entries = MatchRepo::new(state.db.clone()).standings().await.gql()?;
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| Standing::new(i + 1, entry))
            .collect())
    }

    async fn top_scorers(&self, ctx: &Context<'_>, limit: Option<i64>) -> Result<Vec<Scorer>> {
        let state = ctx.data::<AppState>()?;
        let rows = MatchRepo::new(state.db.clone())
            .top_scorers(limit.unwrap_or(10).clamp(1, 100))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // Spectators

    async fn spectator_requests(
        &self,
        ctx: &Context<'_>,
        match_id: Option<Uuid>,
        status: Option<SpectatorStatus>,
        checked_in: Option<bool>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<SpectatorRequest>> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let filter = SpectatorFilter {
            match_id,
            status: status.map(Into::into),
            checked_in,
        };
        let rows = SpectatorRepo::new(state.db.clone())
            .list(filter, page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn spectator_limit(&self, ctx: &Context<'_>, match_id: Uuid) -> Result<SpectatorLimit> {
        let state = ctx.data::<AppState>()?;
        let limit = SpectatorRepo::new(state.db.clone())
            .get_limit(match_id)
            .await
            .gql()?;
        Ok(limit.into())
    }

    // Notifications and e-mail

    async fn notifications(
        &self,
        ctx: &Context<'_>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Notification>> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let rows = NotificationRepo::new(state.db.clone())
            .list(page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn notification_stats(&self, ctx: &Context<'_>, id: Uuid) -> Result<NotificationStats> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let repo = NotificationRepo::new(state.db.clone());
        require_found(repo.get(id).await.gql()?, "notification")?;
        Ok(repo.stats(id).await.gql()?.into())
    }

    async fn outbox_status(&self, ctx: &Context<'_>) -> Result<OutboxSummary> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let counts = OutboxRepo::new(state.db.clone()).counts().await.gql()?;
        Ok(counts.into())
    }

    async fn outbox_emails(
        &self,
        ctx: &Context<'_>,
        status: Option<OutboxStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<OutboxEmail>> {
        require_admin(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let rows = OutboxRepo::new(state.db.clone())
            .list(status.map(Into::into), page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // Fantasy

    async fn fantasy_rules(&self) -> FantasyRules {
        FantasyRules::current()
    }

    /// Full check of a squad before it is saved.
    async fn validate_fantasy_team(
        &self,
        name: String,
        formation: Formation,
        slots: Vec<FantasySlotInput>,
    ) -> SquadValidation {
        let draft = SquadDraft {
            name,
            formation: formation.into(),
            slots: to_slots(slots),
        };
        fantasy::validate_team(&draft).into()
    }

    async fn can_add_fantasy_player(
        &self,
        formation: Formation,
        slots: Vec<FantasySlotInput>,
        candidate: FantasySlotInput,
    ) -> SquadValidation {
        fantasy::can_add_player(&to_slots(slots), formation.into(), &candidate.into()).into()
    }

    async fn validate_fantasy_transfer(
        &self,
        slots: Vec<FantasySlotInput>,
        outgoing: Uuid,
        incoming: FantasySlotInput,
    ) -> SquadValidation {
        fantasy::validate_transfer(&to_slots(slots), outgoing, &incoming.into()).into()
    }

    async fn fantasy_market(
        &self,
        ctx: &Context<'_>,
        position: Option<Position>,
        team_id: Option<Uuid>,
        max_price: Option<Price>,
        sort: Option<MarketSort>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<MarketPlayer>> {
        let state = ctx.data::<AppState>()?;
        let filter = MarketFilter {
            position: position.map(Into::into),
            team_id,
            max_price: max_price.map(Into::into),
            sort: sort.map(Into::into),
        };
        let rows = FantasyRepo::new(state.db.clone())
            .market(filter, page(limit, offset))
            .await
            .gql()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn my_fantasy_team(&self, ctx: &Context<'_>) -> Result<Option<FantasyTeam>> {
        let user = current_user(ctx).await?;
        let state = ctx.data::<AppState>()?;
        let row = FantasyRepo::new(state.db.clone())
            .get_team(user.id)
            .await
            .gql()?;
        Ok(row.map(Into::into))
    }

    async fn fantasy_leaderboard(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let state = ctx.data::<AppState>()?;
        let limit = limit.unwrap_or(20).clamp(1, 100) as usize;
        let entries = FantasyRepo::new(state.db.clone())
            .leaderboard(limit)
            .await
            .gql()?;
        Ok(entries.into_iter().map(Into::into).collect())
    }
}
