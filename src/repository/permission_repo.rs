//! Permission matrix repository (权限矩阵数据访问)
//!
//! Authoritative store for the role × area and role × application
//! authorization rows. Rows are created lazily on first save; updates are
//! field-level so two administrators editing different cells of the same
//! row cannot clobber each other.

use crate::{
    error::AppError,
    models::permission::{
        ApplicationPermission, AreaPermission, AreaPermissionPatch, DEFAULT_DATA_ACCESS_TIER_ID,
    },
};
use sqlx::{PgPool, Row};

pub struct PermissionRepository {
    db: PgPool,
}

impl PermissionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Area permissions ====================

    /// 某角色的全部区域权限行（所有应用）
    pub async fn area_permissions(&self, role_id: i32) -> Result<Vec<AreaPermission>, AppError> {
        let rows = sqlx::query_as::<_, AreaPermission>(
            "SELECT * FROM area_permissions WHERE role_id = $1 ORDER BY area_id",
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// 一组角色的全部区域权限行（供解析器做并集归约）
    pub async fn area_permissions_for_roles(
        &self,
        role_ids: &[i32],
    ) -> Result<Vec<AreaPermission>, AppError> {
        let rows = sqlx::query_as::<_, AreaPermission>(
            "SELECT * FROM area_permissions WHERE role_id = ANY($1) ORDER BY area_id",
        )
        .bind(role_ids.to_vec())
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// 保存单个区域权限行的部分字段。
    ///
    /// 单条 SQL 完成插入或更新：未指定的字段保留已存储的值（新行则取
    /// 默认值）。引用不存在的角色或区域返回 NotFound，绝不为其静默建行。
    pub async fn upsert_area_permission(
        &self,
        role_id: i32,
        area_id: i32,
        patch: &AreaPermissionPatch,
    ) -> Result<AreaPermission, AppError> {
        if !self.role_exists(role_id).await? {
            return Err(AppError::NotFound);
        }
        if !self.area_exists(area_id).await? {
            return Err(AppError::NotFound);
        }

        let row = sqlx::query_as::<_, AreaPermission>(
            r#"
            INSERT INTO area_permissions
                (role_id, area_id, permission, data_access_id,
                 can_read, can_create, can_update, can_delete)
            VALUES
                ($1, $2, COALESCE($3, FALSE), COALESCE($4, $9),
                 COALESCE($5, FALSE), COALESCE($6, FALSE),
                 COALESCE($7, FALSE), COALESCE($8, FALSE))
            ON CONFLICT (role_id, area_id) DO UPDATE SET
                permission     = COALESCE($3, area_permissions.permission),
                data_access_id = COALESCE($4, area_permissions.data_access_id),
                can_read       = COALESCE($5, area_permissions.can_read),
                can_create     = COALESCE($6, area_permissions.can_create),
                can_update     = COALESCE($7, area_permissions.can_update),
                can_delete     = COALESCE($8, area_permissions.can_delete),
                updated_at     = NOW()
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(area_id)
        .bind(patch.permission)
        .bind(patch.data_access_id)
        .bind(patch.read)
        .bind(patch.create)
        .bind(patch.update)
        .bind(patch.delete)
        .bind(DEFAULT_DATA_ACCESS_TIER_ID)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    // ==================== Application permissions ====================

    /// 某角色对某应用的门禁行（不存在时返回 None，语义为 permission=false）
    pub async fn application_permission(
        &self,
        role_id: i32,
        application_id: i32,
    ) -> Result<Option<ApplicationPermission>, AppError> {
        let row = sqlx::query_as::<_, ApplicationPermission>(
            "SELECT * FROM application_permissions WHERE role_id = $1 AND application_id = $2",
        )
        .bind(role_id)
        .bind(application_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    /// 某角色的全部应用门禁行
    pub async fn application_permissions(
        &self,
        role_id: i32,
    ) -> Result<Vec<ApplicationPermission>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationPermission>(
            "SELECT * FROM application_permissions WHERE role_id = $1 ORDER BY application_id",
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// 一组角色的全部应用门禁行（供解析器做并集归约）
    pub async fn application_permissions_for_roles(
        &self,
        role_ids: &[i32],
    ) -> Result<Vec<ApplicationPermission>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationPermission>(
            "SELECT * FROM application_permissions WHERE role_id = ANY($1) ORDER BY application_id",
        )
        .bind(role_ids.to_vec())
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// 保存应用门禁行（幂等：重复保存同一值得到同一存储状态）
    pub async fn upsert_application_permission(
        &self,
        role_id: i32,
        application_id: i32,
        permission: bool,
    ) -> Result<ApplicationPermission, AppError> {
        if !self.role_exists(role_id).await? {
            return Err(AppError::NotFound);
        }
        if !self.application_exists(application_id).await? {
            return Err(AppError::NotFound);
        }

        let row = sqlx::query_as::<_, ApplicationPermission>(
            r#"
            INSERT INTO application_permissions (role_id, application_id, permission)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, application_id) DO UPDATE SET
                permission = $3,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(application_id)
        .bind(permission)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    // ==================== Existence checks ====================

    async fn role_exists(&self, role_id: i32) -> Result<bool, AppError> {
        let exists: bool = sqlx::query("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
            .bind(role_id)
            .fetch_one(&self.db)
            .await?
            .get(0);

        Ok(exists)
    }

    async fn area_exists(&self, area_id: i32) -> Result<bool, AppError> {
        let exists: bool = sqlx::query("SELECT EXISTS(SELECT 1 FROM areas WHERE id = $1)")
            .bind(area_id)
            .fetch_one(&self.db)
            .await?
            .get(0);

        Ok(exists)
    }

    async fn application_exists(&self, application_id: i32) -> Result<bool, AppError> {
        let exists: bool = sqlx::query("SELECT EXISTS(SELECT 1 FROM applications WHERE id = $1)")
            .bind(application_id)
            .fetch_one(&self.db)
            .await?
            .get(0);

        Ok(exists)
    }
}
