//! Audit repository (审计数据访问)

use crate::{error::AppError, models::audit::*};
use sqlx::PgPool;

pub struct AuditRepository {
    db: PgPool,
}

impl AuditRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 插入审计日志
    pub async fn insert_audit_log(&self, log: &AuditLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, subject_id, subject_name, action, resource_type, resource_id,
                changes, changes_summary, trace_id, result, error_message, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(log.id)
        .bind(log.subject_id)
        .bind(&log.subject_name)
        .bind(&log.action)
        .bind(&log.resource_type)
        .bind(&log.resource_id)
        .bind(&log.changes)
        .bind(&log.changes_summary)
        .bind(&log.trace_id)
        .bind(&log.result)
        .bind(&log.error_message)
        .bind(log.occurred_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 查询审计日志
    pub async fn query_audit_logs(
        &self,
        filters: &AuditLogFilters,
    ) -> Result<Vec<AuditLog>, AppError> {
        let limit = filters.limit.unwrap_or(50).clamp(1, 500);
        let offset = filters.offset.unwrap_or(0).max(0);

        let logs = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE ($1::uuid IS NULL OR subject_id = $1)
              AND ($2::text IS NULL OR resource_type = $2)
              AND ($3::text IS NULL OR action = $3)
              AND ($4::text IS NULL OR result = $4)
            ORDER BY occurred_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filters.subject_id)
        .bind(&filters.resource_type)
        .bind(&filters.action)
        .bind(&filters.result)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }
}
