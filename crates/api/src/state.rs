use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::services::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    jwt_service: JwtService,
    mailer: Mailer,
}

impl AppState {
    pub fn new(db: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let jwt_service = JwtService::new(&config.jwt_secret, config.jwt_expiration_hours);
        let mailer = Mailer::from_config(&config.email)?;

        Ok(Self {
            db,
            config: Arc::new(config),
            jwt_service,
            mailer,
        })
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn mailer(&self) -> &Mailer {
        &self.mailer
    }
}
