use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use airbear_core::repository::ProfileRepository;
use airbear_core::{CoreError, CoreResult, Role, UserProfile};

use crate::database::storage;

pub struct StoreProfileRepository {
    pool: PgPool,
}

impl StoreProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: Option<String>,
    role: String,
    assigned_airbear_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = CoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: CoreError| CoreError::StorageError(e.to_string()))?;

        Ok(UserProfile {
            id: row.id,
            email: row.email,
            role,
            assigned_airbear_id: row.assigned_airbear_id,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ProfileRepository for StoreProfileRepository {
    async fn get_profile(&self, id: Uuid) -> CoreResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, role, assigned_airbear_id, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn ensure_profile(&self, profile: &UserProfile) -> CoreResult<UserProfile> {
        // an existing role or assignment is never overwritten
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (id, email, role, assigned_airbear_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET email = COALESCE(profiles.email, EXCLUDED.email)
            RETURNING id, email, role, assigned_airbear_id, created_at
            "#,
        )
        .bind(profile.id)
        .bind(profile.email.as_deref())
        .bind(profile.role.as_str())
        .bind(profile.assigned_airbear_id)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        UserProfile::try_from(row)
    }
}
