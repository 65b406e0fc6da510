//! Role repository (角色数据访问)

use crate::{error::AppError, models::role::*};
use sqlx::PgPool;

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 列出所有角色
    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name")
            .fetch_all(&self.db)
            .await?;

        Ok(roles)
    }

    /// 根据名称查找角色
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// 根据 ID 查找角色
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// 创建角色
    pub async fn create(&self, req: &CreateRoleRequest) -> Result<Role, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .fetch_one(&self.db)
        .await?;

        Ok(role)
    }

    /// 更新角色
    pub async fn update(&self, id: i32, req: &UpdateRoleRequest) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET
                name = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// 删除角色，并在同一事务内级联删除其权限矩阵行。
    /// 孤儿权限行是数据损坏，不是可恢复状态。
    pub async fn delete(&self, id: i32) -> Result<bool, AppError> {
        self.find_by_id(id).await?.ok_or(AppError::NotFound)?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM area_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM application_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
