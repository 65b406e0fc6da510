//! 访问 API 服务
//!
//! 外部协作方（各 CRUD 界面）的边界：读取解析后的能力集、读写权限
//! 矩阵。每个变更操作都在服务端基于调用者自己的解析结果重新鉴权，
//! 客户端能力标志只是体验优化，从来不是授权边界。

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    models::permission::{
        ApplicationAreaList, ApplicationPermission, ApplicationPermissionState,
        AreaPermission, AreaPermissionEntry, AreaPermissionPatch, CapabilityMap, CrudAction,
    },
    repository::{CatalogRepository, PermissionRepository, RoleRepository},
    services::resolver::CapabilityResolver,
};

/// 承载管理界面自身区域的应用（由迁移种子创建）
pub const ADMIN_CONSOLE_APPLICATION: &str = "Admin Console";

/// 管理权限矩阵所需的元权限挂在这个区域上
pub const SECURITY_ROLES_AREA: &str = "Security Roles";

/// 应用目录维护界面对应的区域
pub const APPLICATIONS_AREA: &str = "Applications";

/// 区域目录维护界面对应的区域
pub const AREAS_AREA: &str = "Areas";

pub struct AccessService {
    db: PgPool,
    resolver: Arc<CapabilityResolver>,
}

impl AccessService {
    pub fn new(db: PgPool, resolver: Arc<CapabilityResolver>) -> Self {
        Self { db, resolver }
    }

    /// 当前主体的有效能力集
    pub async fn capabilities(
        &self,
        ctx: &AuthContext,
    ) -> Result<Arc<CapabilityMap>, AppError> {
        self.resolver.resolve(&ctx.role_ids).await
    }

    /// 要求调用者对管理台某区域持有指定操作的能力。
    ///
    /// 门禁区域缺失视为拒绝：任何歧义都解析为拒绝，绝不意外放行。
    pub async fn require_capability(
        &self,
        ctx: &AuthContext,
        area_name: &str,
        action: CrudAction,
    ) -> Result<(), AppError> {
        let capabilities = self.resolver.resolve(&ctx.role_ids).await?;

        let catalog = CatalogRepository::new(self.db.clone());
        let gate_area = catalog
            .find_area_by_name(ADMIN_CONSOLE_APPLICATION, area_name)
            .await?;

        let allowed = gate_area
            .map(|area| {
                capabilities
                    .get(&area.application_id)
                    .and_then(|app| app.areas.get(&area.id))
                    .map(|cap| cap.allows(action))
                    .unwrap_or(false)
            })
            .unwrap_or(false);

        if !allowed {
            tracing::warn!(
                user_id = %ctx.user_id,
                area = %area_name,
                action = action.as_str(),
                "Permission denied"
            );
            return Err(AppError::Forbidden);
        }

        Ok(())
    }

    /// 管理权限矩阵的元权限检查
    pub async fn require_manage_roles(&self, ctx: &AuthContext) -> Result<(), AppError> {
        self.require_capability(ctx, SECURITY_ROLES_AREA, CrudAction::Update).await
    }

    /// 矩阵编辑界面的读取端：某角色的全部区域按应用分组，
    /// 每个区域带上已存储的权限行或文档化的默认值。
    pub async fn area_lists(&self, role_id: i32) -> Result<Vec<ApplicationAreaList>, AppError> {
        let roles = RoleRepository::new(self.db.clone());
        roles.find_by_id(role_id).await?.ok_or(AppError::NotFound)?;

        let catalog = CatalogRepository::new(self.db.clone());
        let permissions = PermissionRepository::new(self.db.clone());

        let applications = catalog.list_applications().await?;
        let areas = catalog.list_areas(None).await?;
        let application_rows = permissions.application_permissions(role_id).await?;
        let area_rows = permissions.area_permissions(role_id).await?;

        let lists = applications
            .iter()
            .map(|application| {
                let gate = application_rows
                    .iter()
                    .find(|row| row.application_id == application.id)
                    .map(|row| row.permission)
                    .unwrap_or(false);

                let entries = areas
                    .iter()
                    .filter(|area| area.application_id == application.id)
                    .map(|area| {
                        let row = area_rows.iter().find(|row| row.area_id == area.id);
                        AreaPermissionEntry::new(area, row)
                    })
                    .collect();

                ApplicationAreaList {
                    application_id: application.id,
                    application_name: application.name.clone(),
                    permission: gate,
                    areas: entries,
                }
            })
            .collect();

        Ok(lists)
    }

    /// 保存单个区域权限行的部分字段，并使受影响的缓存失效
    pub async fn save_area_permission(
        &self,
        ctx: &AuthContext,
        role_id: i32,
        area_id: i32,
        patch: &AreaPermissionPatch,
    ) -> Result<AreaPermission, AppError> {
        self.require_manage_roles(ctx).await?;

        if patch.is_empty() {
            return Err(AppError::BadRequest("Permission patch has no fields".to_string()));
        }

        let permissions = PermissionRepository::new(self.db.clone());
        let row = permissions.upsert_area_permission(role_id, area_id, patch).await?;

        self.resolver.invalidate_role(role_id).await;
        metrics::counter!("permission.area.saves").increment(1);

        Ok(row)
    }

    /// 保存应用门禁行，并使受影响的缓存失效
    pub async fn save_application_permission(
        &self,
        ctx: &AuthContext,
        role_id: i32,
        application_id: i32,
        permission: bool,
    ) -> Result<ApplicationPermission, AppError> {
        self.require_manage_roles(ctx).await?;

        let permissions = PermissionRepository::new(self.db.clone());
        let row = permissions
            .upsert_application_permission(role_id, application_id, permission)
            .await?;

        self.resolver.invalidate_role(role_id).await;
        metrics::counter!("permission.application.saves").increment(1);

        Ok(row)
    }

    /// 某角色对某应用的门禁状态（无行时为 permission=false）
    pub async fn application_permission_state(
        &self,
        role_id: i32,
        application_id: i32,
    ) -> Result<ApplicationPermissionState, AppError> {
        let roles = RoleRepository::new(self.db.clone());
        roles.find_by_id(role_id).await?.ok_or(AppError::NotFound)?;

        let catalog = CatalogRepository::new(self.db.clone());
        catalog.find_application(application_id).await?.ok_or(AppError::NotFound)?;

        let permissions = PermissionRepository::new(self.db.clone());
        let state = match permissions.application_permission(role_id, application_id).await? {
            Some(row) => ApplicationPermissionState {
                role_id: row.role_id,
                application_id: row.application_id,
                permission: row.permission,
            },
            None => ApplicationPermissionState { role_id, application_id, permission: false },
        };

        Ok(state)
    }

    /// 目录删除等全局变更后调用
    pub async fn invalidate_all(&self) {
        self.resolver.invalidate_all().await;
    }

    /// 单角色矩阵变更后调用
    pub async fn invalidate_role(&self, role_id: i32) {
        self.resolver.invalidate_role(role_id).await;
    }
}
