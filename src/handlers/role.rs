//! 角色管理的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::permission::CrudAction,
    models::role::*,
    repository::role_repo::RoleRepository,
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
use validator::Validate;

/// 列出所有角色
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    // 检查权限
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Read)
        .await?;

    let repo = RoleRepository::new(state.db.clone());
    let roles = repo.list().await?;

    Ok(Json(json!({
        "roles": roles,
        "count": roles.len()
    })))
}

/// 获取角色详情
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Read)
        .await?;

    let repo = RoleRepository::new(state.db.clone());
    let role = repo.find_by_id(id).await?.ok_or(AppError::NotFound)?;

    Ok(Json(role))
}

/// 创建角色
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Create)
        .await?;

    req.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = RoleRepository::new(state.db.clone());
    let role = repo.create(&req).await?;

    // 审计日志
    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::RoleCreate,
            Some(role.id.to_string()),
            None,
            Some(&format!("Created role: {}", role.name)),
        )
        .await?;

    Ok(Json(json!({
        "message": "Role created",
        "role": role
    })))
}

/// 更新角色
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Update)
        .await?;

    req.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = RoleRepository::new(state.db.clone());
    let role = repo.update(id, &req).await?.ok_or(AppError::NotFound)?;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::RoleUpdate,
            Some(role.id.to_string()),
            None,
            Some(&format!("Updated role: {}", role.name)),
        )
        .await?;

    Ok(Json(json!({
        "message": "Role updated",
        "role": role
    })))
}

/// 删除角色（级联删除其权限矩阵行）
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Delete)
        .await?;

    let repo = RoleRepository::new(state.db.clone());
    repo.delete(id).await?;

    // 持有该角色的主体立即失去其授权
    state.access_service.invalidate_role(id).await;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::RoleDelete,
            Some(id.to_string()),
            None,
            None,
        )
        .await?;

    Ok(Json(json!({
        "message": "Role deleted"
    })))
}
