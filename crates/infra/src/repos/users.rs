use sqlx::{PgPool, Result};

use crate::{models::UserRow, pagination::LimitOffset};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, role, is_active, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// League administrators.
pub struct UserRepo {
    db: PgPool,
}

impl UserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: UserFilter, page: Option<LimitOffset>) -> Result<Vec<UserRow>> {
        let page = page.unwrap_or_default();
        let pattern = filter
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL
                   OR LOWER(email) LIKE $1
                   OR LOWER(first_name || ' ' || COALESCE(last_name, '')) LIKE $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY LOWER(email)
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(pattern)
        .bind(filter.is_active)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await
    }

    /// Create the admin or reset its password.
    pub async fn upsert_admin(
        &self,
        email: &str,
        first_name: &str,
        password_hash: &str,
    ) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, first_name, password_hash, role)
            VALUES (LOWER($1), $2, $3, 'admin')
            ON CONFLICT (email) DO UPDATE SET
                password_hash = EXCLUDED.password_hash,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email.trim())
        .bind(first_name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
    }
}
