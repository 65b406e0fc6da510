//! 权限矩阵与能力解析的 HTTP 处理器
//!
//! `/capabilities` 是每个受保护界面渲染前读取的端点；矩阵编辑端点
//! 由安全角色界面调用。变更端点的鉴权在服务层基于调用者自己的
//! 解析结果完成，与客户端声明无关。

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::permission::{
        AreaPermissionPatch, CrudAction, SaveApplicationPermissionRequest,
    },
    services::access_service::SECURITY_ROLES_AREA,
    services::audit_service::AuditAction,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// 当前主体的有效能力集
pub async fn get_capabilities(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let capabilities = state.access_service.capabilities(&auth_context).await?;

    Ok(Json(json!({
        "capabilities": *capabilities
    })))
}

/// 矩阵编辑界面的读取端：某角色的区域按应用分组
pub async fn get_area_lists(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(role_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Read)
        .await?;

    let lists = state.access_service.area_lists(role_id).await?;

    Ok(Json(json!({
        "role_id": role_id,
        "applications": lists
    })))
}

/// 保存单个区域权限行的部分字段
pub async fn save_area_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path((role_id, area_id)): Path<(i32, i32)>,
    Json(patch): Json<AreaPermissionPatch>,
) -> Result<impl IntoResponse, AppError> {
    let row = state
        .access_service
        .save_area_permission(&auth_context, role_id, area_id, &patch)
        .await?;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::AreaPermissionSave,
            Some(format!("{}:{}", role_id, area_id)),
            serde_json::to_value(&patch).ok(),
            None,
        )
        .await?;

    Ok(Json(json!({
        "message": "Area permission saved",
        "permission": row
    })))
}

/// 某角色对某应用的门禁状态
pub async fn get_application_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path((role_id, application_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Read)
        .await?;

    let permission = state
        .access_service
        .application_permission_state(role_id, application_id)
        .await?;

    Ok(Json(permission))
}

/// 保存应用门禁行
pub async fn save_application_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path((role_id, application_id)): Path<(i32, i32)>,
    Json(req): Json<SaveApplicationPermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let row = state
        .access_service
        .save_application_permission(&auth_context, role_id, application_id, req.permission)
        .await?;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::ApplicationPermissionSave,
            Some(format!("{}:{}", role_id, application_id)),
            Some(json!({ "permission": req.permission })),
            None,
        )
        .await?;

    Ok(Json(json!({
        "message": "Application permission saved",
        "permission": row
    })))
}
