use carbonledger_core::models::Profile;
use carbonledger_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Make sure a profile row exists for an authenticated identity.
    /// Idempotent; called from the auth callback on every sign-in.
    pub async fn ensure(&self, user_id: Uuid, email: &str) -> Result<Profile, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, updated_at = NOW()
            RETURNING id, email, display_name, job_title, email_notifications,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to ensure profile: {}", e);
            AppError::Internal("Failed to load profile".to_string())
        })?;

        Ok(profile)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, display_name, job_title, email_notifications,
                   created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch profile: {}", e);
            AppError::Internal("Failed to load profile".to_string())
        })?;

        Ok(profile)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        display_name: Option<&str>,
        job_title: Option<&str>,
        email_notifications: bool,
    ) -> Result<Profile, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET display_name = $2, job_title = $3, email_notifications = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, display_name, job_title, email_notifications,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(job_title)
        .bind(email_notifications)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update profile: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Profile not found".to_string())
            } else {
                AppError::Internal("Failed to update profile".to_string())
            }
        })?;

        Ok(profile)
    }
}
