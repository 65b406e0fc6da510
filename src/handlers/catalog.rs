//! 实体目录的 HTTP 处理器
//! 应用、区域与数据访问层级

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::catalog::*,
    models::permission::CrudAction,
    repository::catalog_repo::CatalogRepository,
    services::access_service::{APPLICATIONS_AREA, AREAS_AREA, SECURITY_ROLES_AREA},
    services::audit_service::AuditAction,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

// ==================== Applications ====================

/// 列出应用
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    // 检查权限
    state
        .access_service
        .require_capability(&auth_context, APPLICATIONS_AREA, CrudAction::Read)
        .await?;

    let repo = CatalogRepository::new(state.db.clone());
    let applications = repo.list_applications().await?;

    Ok(Json(json!({
        "applications": applications,
        "count": applications.len()
    })))
}

/// 获取应用详情
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, APPLICATIONS_AREA, CrudAction::Read)
        .await?;

    let repo = CatalogRepository::new(state.db.clone());
    let application = repo.find_application(id).await?.ok_or(AppError::NotFound)?;

    Ok(Json(application))
}

/// 创建应用
pub async fn create_application(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, APPLICATIONS_AREA, CrudAction::Create)
        .await?;

    req.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = CatalogRepository::new(state.db.clone());
    let application = repo.create_application(&req).await?;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::ApplicationCreate,
            Some(application.id.to_string()),
            None,
            Some(&format!("Created application: {}", application.name)),
        )
        .await?;

    Ok(Json(json!({
        "message": "Application created",
        "application": application
    })))
}

/// 更新应用
pub async fn update_application(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, APPLICATIONS_AREA, CrudAction::Update)
        .await?;

    req.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = CatalogRepository::new(state.db.clone());
    let application = repo.update_application(id, &req).await?.ok_or(AppError::NotFound)?;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::ApplicationUpdate,
            Some(application.id.to_string()),
            None,
            Some(&format!("Updated application: {}", application.name)),
        )
        .await?;

    Ok(Json(json!({
        "message": "Application updated",
        "application": application
    })))
}

/// 删除应用
pub async fn delete_application(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, APPLICATIONS_AREA, CrudAction::Delete)
        .await?;

    let repo = CatalogRepository::new(state.db.clone());
    if !repo.delete_application(id).await? {
        return Err(AppError::NotFound);
    }

    // 留下的矩阵行成为孤儿，解析时会被跳过；缓存整体失效
    state.access_service.invalidate_all().await;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::ApplicationDelete,
            Some(id.to_string()),
            None,
            None,
        )
        .await?;

    Ok(Json(json!({
        "message": "Application deleted"
    })))
}

// ==================== Areas ====================

/// 列出区域，可按应用过滤
pub async fn list_areas(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(query): Query<AreaListQuery>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, AREAS_AREA, CrudAction::Read)
        .await?;

    let repo = CatalogRepository::new(state.db.clone());
    let areas = repo.list_areas(query.application_id).await?;

    Ok(Json(json!({
        "areas": areas,
        "count": areas.len()
    })))
}

/// 创建区域
pub async fn create_area(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreateAreaRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, AREAS_AREA, CrudAction::Create)
        .await?;

    req.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = CatalogRepository::new(state.db.clone());
    let area = repo.create_area(&req).await?;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::AreaCreate,
            Some(area.id.to_string()),
            None,
            Some(&format!("Created area: {}", area.name)),
        )
        .await?;

    Ok(Json(json!({
        "message": "Area created",
        "area": area
    })))
}

/// 更新区域
pub async fn update_area(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
    Json(req): Json<UpdateAreaRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, AREAS_AREA, CrudAction::Update)
        .await?;

    req.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = CatalogRepository::new(state.db.clone());
    let area = repo.update_area(id, &req).await?.ok_or(AppError::NotFound)?;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::AreaUpdate,
            Some(area.id.to_string()),
            None,
            Some(&format!("Updated area: {}", area.name)),
        )
        .await?;

    Ok(Json(json!({
        "message": "Area updated",
        "area": area
    })))
}

/// 删除区域
pub async fn delete_area(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access_service
        .require_capability(&auth_context, AREAS_AREA, CrudAction::Delete)
        .await?;

    let repo = CatalogRepository::new(state.db.clone());
    if !repo.delete_area(id).await? {
        return Err(AppError::NotFound);
    }

    // 留下的矩阵行成为孤儿，解析时会被跳过；缓存整体失效
    state.access_service.invalidate_all().await;

    state
        .audit_service
        .log_action(
            auth_context.user_id,
            Some(&auth_context.username),
            AuditAction::AreaDelete,
            Some(id.to_string()),
            None,
            None,
        )
        .await?;

    Ok(Json(json!({
        "message": "Area deleted"
    })))
}

// ==================== Data access tiers ====================

/// 列出数据访问层级
pub async fn list_data_access_tiers(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    // 层级枚举由矩阵编辑界面使用
    state
        .access_service
        .require_capability(&auth_context, SECURITY_ROLES_AREA, CrudAction::Read)
        .await?;

    let repo = CatalogRepository::new(state.db.clone());
    let tiers = repo.list_data_access_tiers().await?;

    Ok(Json(json!({
        "data_access_tiers": tiers,
        "count": tiers.len()
    })))
}
