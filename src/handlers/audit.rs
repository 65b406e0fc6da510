//! 审计日志的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::audit::AuditLogFilters,
    models::permission::CrudAction,
    services::access_service::SECURITY_ROLES_AREA,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// 查询审计日志
pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(filters): Query<AuditLogFilters>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Read)
        .await?;

    let logs = state.audit_service.query_logs(&filters).await?;

    Ok(Json(json!({
        "logs": logs,
        "count": logs.len()
    })))
}
