use sqlx::Result as SqlxResult;

use crate::db::Db;

#[derive(Clone)]
pub struct SettingsRepo {
    db: Db,
}

impl SettingsRepo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// When closed, new registrations go to the waiting list.
    pub async fn registration_open(&self) -> SqlxResult<bool> {
        sqlx::query_scalar("SELECT registration_open FROM app_settings WHERE id")
            .fetch_one(&self.db)
            .await
    }

    pub async fn set_registration_open(&self, open: bool) -> SqlxResult<bool> {
        sqlx::query_scalar(
            r#"
            UPDATE app_settings
            SET registration_open = $1, updated_at = NOW()
            WHERE id
            RETURNING registration_open
            "#,
        )
        .bind(open)
        .fetch_one(&self.db)
        .await
    }
}
