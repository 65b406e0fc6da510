//! Catalog repository (实体目录数据访问)

use crate::{error::AppError, models::catalog::*};
use sqlx::PgPool;

pub struct CatalogRepository {
    db: PgPool,
}

impl CatalogRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Applications ====================

    /// 列出所有应用
    pub async fn list_applications(&self) -> Result<Vec<Application>, AppError> {
        let applications =
            sqlx::query_as::<_, Application>("SELECT * FROM applications ORDER BY name")
                .fetch_all(&self.db)
                .await?;

        Ok(applications)
    }

    /// 根据 ID 查找应用
    pub async fn find_application(&self, id: i32) -> Result<Option<Application>, AppError> {
        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(application)
    }

    /// 创建应用
    pub async fn create_application(
        &self,
        req: &CreateApplicationRequest,
    ) -> Result<Application, AppError> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (name, url)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.url)
        .fetch_one(&self.db)
        .await?;

        Ok(application)
    }

    /// 更新应用
    pub async fn update_application(
        &self,
        id: i32,
        req: &UpdateApplicationRequest,
    ) -> Result<Option<Application>, AppError> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET
                name = COALESCE($2, name),
                url = COALESCE($3, url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.url)
        .fetch_optional(&self.db)
        .await?;

        Ok(application)
    }

    /// 删除应用（级联删除其下的区域）
    pub async fn delete_application(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Areas ====================

    /// 列出区域，可按应用过滤
    pub async fn list_areas(&self, application_id: Option<i32>) -> Result<Vec<Area>, AppError> {
        let areas = match application_id {
            Some(app_id) => {
                sqlx::query_as::<_, Area>(
                    "SELECT * FROM areas WHERE application_id = $1 ORDER BY name",
                )
                .bind(app_id)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Area>("SELECT * FROM areas ORDER BY application_id, name")
                    .fetch_all(&self.db)
                    .await?
            }
        };

        Ok(areas)
    }

    /// 根据 ID 查找区域
    pub async fn find_area(&self, id: i32) -> Result<Option<Area>, AppError> {
        let area = sqlx::query_as::<_, Area>("SELECT * FROM areas WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(area)
    }

    /// 在指定应用内按名称查找区域
    pub async fn find_area_by_name(
        &self,
        application_name: &str,
        area_name: &str,
    ) -> Result<Option<Area>, AppError> {
        let area = sqlx::query_as::<_, Area>(
            r#"
            SELECT a.*
            FROM areas a
            JOIN applications ap ON ap.id = a.application_id
            WHERE ap.name = $1 AND a.name = $2
            "#,
        )
        .bind(application_name)
        .bind(area_name)
        .fetch_optional(&self.db)
        .await?;

        Ok(area)
    }

    /// 创建区域
    pub async fn create_area(&self, req: &CreateAreaRequest) -> Result<Area, AppError> {
        // 区域必须隶属于一个存在的应用
        self.find_application(req.application_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let area = sqlx::query_as::<_, Area>(
            r#"
            INSERT INTO areas (name, application_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(req.application_id)
        .fetch_one(&self.db)
        .await?;

        Ok(area)
    }

    /// 更新区域
    pub async fn update_area(
        &self,
        id: i32,
        req: &UpdateAreaRequest,
    ) -> Result<Option<Area>, AppError> {
        let area = sqlx::query_as::<_, Area>(
            r#"
            UPDATE areas
            SET
                name = COALESCE($2, name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .fetch_optional(&self.db)
        .await?;

        Ok(area)
    }

    /// 删除区域
    pub async fn delete_area(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM areas WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Data access tiers ====================

    /// 列出数据访问层级（静态枚举，按序返回）
    pub async fn list_data_access_tiers(&self) -> Result<Vec<DataAccessTier>, AppError> {
        let tiers =
            sqlx::query_as::<_, DataAccessTier>("SELECT * FROM data_access_tiers ORDER BY id")
                .fetch_all(&self.db)
                .await?;

        Ok(tiers)
    }
}
