//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
};

use crate::{handlers, middleware::AppState};

/// 请求体大小上限（1 MiB，表单负载远小于此）
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        // 当前主体的有效能力集
        .route("/api/v1/capabilities", get(handlers::permission::get_capabilities))

        // 实体目录：应用
        .route(
            "/api/v1/applications",
            get(handlers::catalog::list_applications)
                .post(handlers::catalog::create_application)
        )
        .route(
            "/api/v1/applications/{id}",
            get(handlers::catalog::get_application)
                .put(handlers::catalog::update_application)
                .delete(handlers::catalog::delete_application)
        )

        // 实体目录：区域
        .route(
            "/api/v1/areas",
            get(handlers::catalog::list_areas)
                .post(handlers::catalog::create_area)
        )
        .route(
            "/api/v1/areas/{id}",
            put(handlers::catalog::update_area)
                .delete(handlers::catalog::delete_area)
        )

        // 实体目录：数据访问层级
        .route(
            "/api/v1/data-access-tiers",
            get(handlers::catalog::list_data_access_tiers)
        )

        // 角色
        .route(
            "/api/v1/roles",
            get(handlers::role::list_roles)
                .post(handlers::role::create_role)
        )
        .route(
            "/api/v1/roles/{id}",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role)
        )

        // 权限矩阵
        .route(
            "/api/v1/roles/{id}/area-permissions",
            get(handlers::permission::get_area_lists)
        )
        .route(
            "/api/v1/roles/{id}/areas/{area_id}/permission",
            put(handlers::permission::save_area_permission)
        )
        .route(
            "/api/v1/roles/{id}/applications/{application_id}/permission",
            get(handlers::permission::get_application_permission)
                .put(handlers::permission::save_application_permission)
        )

        // 审计日志
        .route("/api/v1/audit/logs", get(handlers::audit::list_audit_logs))
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 指标端点
    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics_export));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(metrics_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::ip_whitelist_middleware,
        ))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
