use async_graphql::{Context, Result};
use uuid::Uuid;

use crate::auth::Claims;
use crate::gql::error::{forbidden, unauthorized};
use crate::state::AppState;
use infra::repos::{AccountRepo, AccountRole};

/// Account behind the bearer token, re-read from the database.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: AccountRole,
    pub team_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }
}

pub async fn current_user(ctx: &Context<'_>) -> Result<AuthUser> {
    let claims = ctx
        .data::<Claims>()
        .map_err(|_| unauthorized("Authentication required"))?;

    let account_id =
        Uuid::parse_str(&claims.sub).map_err(|_| unauthorized("Invalid token subject"))?;

    let state = ctx.data::<AppState>()?;
    let login = AccountRepo::new(state.db.clone())
        .get_login(account_id)
        .await?
        .ok_or_else(|| unauthorized("Account no longer exists"))?;

    if !login.is_active {
        return Err(forbidden("Account is disabled"));
    }

    Ok(AuthUser {
        id: login.id,
        email: login.email,
        role: login.role.parse().map_err(|_| forbidden("Unknown role"))?,
        team_id: login.team_id,
    })
}

/// Check the authenticated account has one of `allowed` roles.
pub async fn require_role(ctx: &Context<'_>, allowed: &[AccountRole]) -> Result<AuthUser> {
    let user = current_user(ctx).await?;

    if !allowed.contains(&user.role) {
        return Err(forbidden(format!(
            "Insufficient permissions. Required role: {}",
            allowed
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(" or ")
        )));
    }

    Ok(user)
}

pub async fn require_admin(ctx: &Context<'_>) -> Result<AuthUser> {
    require_role(ctx, &[AccountRole::Admin]).await
}

/// Admins, or accounts of the given team.
pub async fn require_team_access(ctx: &Context<'_>, team_id: Uuid) -> Result<AuthUser> {
    let user = current_user(ctx).await?;
    if user.is_admin() || user.team_id == Some(team_id) {
        Ok(user)
    } else {
        Err(forbidden("You can only access your own team"))
    }
}
