//! Audit domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub subject_name: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub changes: Option<serde_json::Value>,
    pub changes_summary: Option<String>,
    pub trace_id: Option<String>,
    pub result: String,
    pub error_message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Audit log filters
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogFilters {
    pub subject_id: Option<Uuid>,
    pub resource_type: Option<String>,
    pub action: Option<String>,
    pub result: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
