use carbonledger_core::models::Subscription;
use carbonledger_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The organization's subscription row. Created alongside the
    /// organization, so a missing row is a data problem, reported as absent.
    pub async fn get_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, organization_id, plan, status, current_period_start,
                   current_period_end, cancel_at_period_end, created_at, updated_at
            FROM subscriptions
            WHERE organization_id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch subscription: {}", e);
            AppError::Internal("Failed to load subscription".to_string())
        })?;

        Ok(subscription)
    }
}
