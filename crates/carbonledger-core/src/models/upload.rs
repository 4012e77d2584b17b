use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "upload_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Processing,
    Completed,
    Failed,
}

/// Record of a file uploaded for AI extraction. The file content itself is
/// forwarded to the analysis endpoint; only metadata is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Upload {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub size: i64,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}
