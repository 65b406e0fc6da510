//! 审计日志服务

use crate::{error::AppError, models::audit::*, repository::audit_repo::AuditRepository};
use sqlx::PgPool;
use uuid::Uuid;

/// 审计操作类型
#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    // 角色
    RoleCreate,
    RoleUpdate,
    RoleDelete,

    // 目录
    ApplicationCreate,
    ApplicationUpdate,
    ApplicationDelete,
    AreaCreate,
    AreaUpdate,
    AreaDelete,

    // 权限矩阵
    AreaPermissionSave,
    ApplicationPermissionSave,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RoleCreate => "role.create",
            AuditAction::RoleUpdate => "role.update",
            AuditAction::RoleDelete => "role.delete",

            AuditAction::ApplicationCreate => "application.create",
            AuditAction::ApplicationUpdate => "application.update",
            AuditAction::ApplicationDelete => "application.delete",
            AuditAction::AreaCreate => "area.create",
            AuditAction::AreaUpdate => "area.update",
            AuditAction::AreaDelete => "area.delete",

            AuditAction::AreaPermissionSave => "permission.area.save",
            AuditAction::ApplicationPermissionSave => "permission.application.save",
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            AuditAction::RoleCreate | AuditAction::RoleUpdate | AuditAction::RoleDelete => "role",
            AuditAction::ApplicationCreate
            | AuditAction::ApplicationUpdate
            | AuditAction::ApplicationDelete => "application",
            AuditAction::AreaCreate | AuditAction::AreaUpdate | AuditAction::AreaDelete => "area",
            AuditAction::AreaPermissionSave | AuditAction::ApplicationPermissionSave => {
                "permission"
            }
        }
    }
}

pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 记录一条审计日志
    pub async fn log_action(
        &self,
        subject_id: Uuid,
        subject_name: Option<&str>,
        action: AuditAction,
        resource_id: Option<String>,
        changes: Option<serde_json::Value>,
        changes_summary: Option<&str>,
    ) -> Result<(), AppError> {
        let log = AuditLog {
            id: Uuid::new_v4(),
            subject_id,
            subject_name: subject_name.map(|s| s.to_string()),
            action: action.as_str().to_string(),
            resource_type: action.resource_type().to_string(),
            resource_id,
            changes,
            changes_summary: changes_summary.map(|s| s.to_string()),
            trace_id: None,
            result: "success".to_string(),
            error_message: None,
            occurred_at: chrono::Utc::now(),
        };

        let repo = AuditRepository::new(self.db.clone());
        repo.insert_audit_log(&log).await?;

        Ok(())
    }

    /// 查询审计日志
    pub async fn query_logs(&self, filters: &AuditLogFilters) -> Result<Vec<AuditLog>, AppError> {
        let repo = AuditRepository::new(self.db.clone());
        repo.query_audit_logs(filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_are_stable() {
        assert_eq!(AuditAction::RoleDelete.as_str(), "role.delete");
        assert_eq!(AuditAction::AreaPermissionSave.as_str(), "permission.area.save");
        assert_eq!(AuditAction::AreaPermissionSave.resource_type(), "permission");
    }
}
