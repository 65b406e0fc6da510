//! 能力解析服务
//!
//! 把权限矩阵行归约为主体的有效能力集。归约本身是一个纯函数，
//! 可以在没有任何 I/O 的情况下做单元测试；服务层负责装载矩阵行、
//! 缓存结果并在矩阵写入时显式失效。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        catalog::{Application, Area},
        permission::{
            ApplicationCapability, ApplicationPermission, AreaCapability, AreaPermission,
            CapabilityMap,
        },
    },
    repository::{CatalogRepository, PermissionRepository},
};

/// Reduce matrix rows for a role set into the effective capability map.
///
/// Union rule: boolean fields OR across roles, the data access tier takes
/// the highest id among contributing rows. Applications whose gate
/// resolves false are omitted entirely; areas whose own gate resolves
/// false are omitted from the application's navigable set. Rows pointing
/// at deleted areas or applications are skipped, never fatal.
pub fn resolve_rows(
    applications: &[Application],
    areas: &[Area],
    application_rows: &[ApplicationPermission],
    area_rows: &[AreaPermission],
) -> CapabilityMap {
    let live_applications: HashSet<i32> = applications.iter().map(|a| a.id).collect();
    let area_owner: HashMap<i32, i32> =
        areas.iter().map(|a| (a.id, a.application_id)).collect();

    // 应用门禁：跨角色按位或
    let mut gates: HashMap<i32, bool> = HashMap::new();
    for row in application_rows {
        if !live_applications.contains(&row.application_id) {
            tracing::warn!(
                role_id = row.role_id,
                application_id = row.application_id,
                "Skipping orphaned application permission row"
            );
            continue;
        }
        *gates.entry(row.application_id).or_insert(false) |= row.permission;
    }

    // 区域能力：布尔字段取或，数据访问层级取最高
    let mut area_caps: HashMap<i32, AreaCapability> = HashMap::new();
    for row in area_rows {
        if !area_owner.contains_key(&row.area_id) {
            tracing::warn!(
                role_id = row.role_id,
                area_id = row.area_id,
                "Skipping orphaned area permission row"
            );
            continue;
        }
        area_caps
            .entry(row.area_id)
            .and_modify(|cap| cap.merge_row(row))
            .or_insert_with(|| AreaCapability::from(row));
    }

    // 组装：门禁关闭的应用整体不可达
    let mut map = CapabilityMap::new();
    for (application_id, open) in gates {
        if open {
            map.insert(
                application_id,
                ApplicationCapability { permission: true, areas: BTreeMap::new() },
            );
        }
    }

    for (area_id, cap) in area_caps {
        if !cap.permission {
            continue;
        }
        let application_id = area_owner[&area_id];
        if let Some(app_cap) = map.get_mut(&application_id) {
            app_cap.areas.insert(area_id, cap);
        }
    }

    map
}

/// 能力解析器
///
/// 解析结果按排序后的角色集缓存；任何矩阵写入都会显式丢弃受影响的
/// 缓存条目。过期的能力数据会把已拒绝的操作显示为允许，这是安全
/// 缺陷而非体验问题，因此不用 TTL。
pub struct CapabilityResolver {
    db: PgPool,
    cache: RwLock<HashMap<Vec<i32>, Arc<CapabilityMap>>>,
}

impl CapabilityResolver {
    pub fn new(db: PgPool) -> Self {
        Self { db, cache: RwLock::new(HashMap::new()) }
    }

    /// 解析主体角色集的有效能力
    pub async fn resolve(&self, role_ids: &[i32]) -> Result<Arc<CapabilityMap>, AppError> {
        let mut key = role_ids.to_vec();
        key.sort_unstable();
        key.dedup();

        // 无角色的主体没有任何能力
        if key.is_empty() {
            return Ok(Arc::new(CapabilityMap::new()));
        }

        if let Some(cached) = self.cache.read().await.get(&key).cloned() {
            metrics::counter!("capability.cache.hits").increment(1);
            return Ok(cached);
        }
        metrics::counter!("capability.cache.misses").increment(1);

        let catalog = CatalogRepository::new(self.db.clone());
        let permissions = PermissionRepository::new(self.db.clone());

        let applications = catalog.list_applications().await?;
        let areas = catalog.list_areas(None).await?;
        let application_rows = permissions.application_permissions_for_roles(&key).await?;
        let area_rows = permissions.area_permissions_for_roles(&key).await?;

        let map =
            Arc::new(resolve_rows(&applications, &areas, &application_rows, &area_rows));

        self.cache.write().await.insert(key, map.clone());
        Ok(map)
    }

    /// 丢弃包含该角色的所有缓存条目（该角色的矩阵行变更后调用）
    pub async fn invalidate_role(&self, role_id: i32) {
        self.cache.write().await.retain(|key, _| !key.contains(&role_id));
    }

    /// 清空缓存（目录删除、角色删除等全局性变更后调用）
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::permission::{CrudAction, DEFAULT_DATA_ACCESS_TIER_ID};
    use chrono::Utc;

    fn application(id: i32, name: &str) -> Application {
        let now = Utc::now();
        Application {
            id,
            name: name.to_string(),
            url: format!("/{}", name.to_lowercase()),
            created_at: now,
            updated_at: now,
        }
    }

    fn area(id: i32, name: &str, application_id: i32) -> Area {
        let now = Utc::now();
        Area { id, name: name.to_string(), application_id, created_at: now, updated_at: now }
    }

    fn application_row(role_id: i32, application_id: i32, permission: bool) -> ApplicationPermission {
        let now = Utc::now();
        ApplicationPermission { role_id, application_id, permission, created_at: now, updated_at: now }
    }

    #[allow(clippy::too_many_arguments)]
    fn area_row(
        role_id: i32,
        area_id: i32,
        permission: bool,
        data_access_id: i32,
        read: bool,
        create: bool,
        update: bool,
        delete: bool,
    ) -> AreaPermission {
        let now = Utc::now();
        AreaPermission {
            role_id,
            area_id,
            permission,
            data_access_id,
            read,
            create,
            update,
            delete,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_rows_resolves_to_empty_map() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1)];

        let map = resolve_rows(&applications, &areas, &[], &[]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_admin_scenario() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1), area(6, "Reports", 1)];

        let application_rows = vec![application_row(10, 1, true)];
        // 区域 6 没有 permission=true 的行，不应出现在可导航集中
        let area_rows = vec![
            area_row(10, 5, true, 1, true, true, true, false),
            area_row(10, 6, false, 7, true, false, false, false),
        ];

        let map = resolve_rows(&applications, &areas, &application_rows, &area_rows);

        let app = map.get(&1).expect("application 1 should be visible");
        assert!(app.permission);
        assert_eq!(app.areas.len(), 1);

        let cap = app.areas.get(&5).expect("area 5 should be navigable");
        assert!(cap.permission);
        assert!(cap.read);
        assert!(cap.create);
        assert!(cap.update);
        assert!(!cap.delete);
        assert_eq!(cap.data_access_id, 1);
        assert!(cap.allows(CrudAction::Update));
        assert!(!cap.allows(CrudAction::Delete));
    }

    #[test]
    fn test_closed_application_gate_hides_all_areas() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1)];

        let application_rows = vec![application_row(10, 1, false)];
        let area_rows = vec![area_row(10, 5, true, 7, true, true, true, true)];

        let map = resolve_rows(&applications, &areas, &application_rows, &area_rows);
        assert!(!map.contains_key(&1));
        assert!(map.is_empty());
    }

    #[test]
    fn test_missing_application_row_means_closed_gate() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1)];

        // 区域行存在，但该应用没有门禁行：默认拒绝
        let area_rows = vec![area_row(10, 5, true, 7, true, false, false, false)];

        let map = resolve_rows(&applications, &areas, &[], &area_rows);
        assert!(map.is_empty());
    }

    #[test]
    fn test_multi_role_union_is_monotonic() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1)];

        let r1_app = vec![application_row(10, 1, true)];
        let r1_area = vec![area_row(10, 5, true, 2, true, false, false, false)];

        let r2_app = vec![application_row(11, 1, false)];
        let r2_area = vec![area_row(11, 5, true, 5, false, true, false, false)];

        let solo1 = resolve_rows(&applications, &areas, &r1_app, &r1_area);
        let solo2 = resolve_rows(&applications, &areas, &r2_app, &r2_area);

        let both_app: Vec<_> = r1_app.iter().chain(&r2_app).cloned().collect();
        let both_area: Vec<_> = r1_area.iter().chain(&r2_area).cloned().collect();
        let both = resolve_rows(&applications, &areas, &both_app, &both_area);

        let cap = both.get(&1).unwrap().areas.get(&5).unwrap();

        // 并集按字段或支配任一单角色结果
        for solo in [&solo1, &solo2] {
            if let Some(solo_cap) = solo.get(&1).and_then(|a| a.areas.get(&5)) {
                assert!(cap.read || !solo_cap.read);
                assert!(cap.create || !solo_cap.create);
                assert!(cap.update || !solo_cap.update);
                assert!(cap.delete || !solo_cap.delete);
                assert!(cap.data_access_id >= solo_cap.data_access_id);
            }
        }

        assert!(cap.read);
        assert!(cap.create);
        assert_eq!(cap.data_access_id, 5);
    }

    #[test]
    fn test_extra_role_never_revokes_access() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1)];

        let power_app = vec![application_row(10, 1, true)];
        let power_area = vec![area_row(10, 5, true, 6, true, true, true, true)];

        // 再挂一个完全没有授权的窄角色
        let narrow_area = vec![area_row(11, 5, false, 1, false, false, false, false)];

        let both_area: Vec<_> = power_area.iter().chain(&narrow_area).cloned().collect();
        let map = resolve_rows(&applications, &areas, &power_app, &both_area);

        let cap = map.get(&1).unwrap().areas.get(&5).unwrap();
        assert!(cap.permission && cap.read && cap.create && cap.update && cap.delete);
        assert_eq!(cap.data_access_id, 6);
    }

    #[test]
    fn test_orphaned_rows_are_skipped_not_fatal() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1)];

        let application_rows = vec![
            application_row(10, 1, true),
            // 应用 99 已被删除
            application_row(10, 99, true),
        ];
        let area_rows = vec![
            area_row(10, 5, true, 7, true, false, false, false),
            // 区域 42 已被删除
            area_row(10, 42, true, 7, true, true, true, true),
        ];

        let map = resolve_rows(&applications, &areas, &application_rows, &area_rows);

        assert_eq!(map.len(), 1);
        let app = map.get(&1).unwrap();
        assert_eq!(app.areas.len(), 1);
        assert!(app.areas.contains_key(&5));
    }

    #[test]
    fn test_default_tier_only_applies_without_rows() {
        let applications = vec![application(1, "CRM")];
        let areas = vec![area(5, "Accounts", 1)];

        // 单一角色授了低层级：并集结果必须保持低层级，
        // 而不是被缺省层级 7 抬高
        let application_rows = vec![application_row(10, 1, true)];
        let area_rows = vec![area_row(10, 5, true, 2, true, false, false, false)];

        let map = resolve_rows(&applications, &areas, &application_rows, &area_rows);
        let cap = map.get(&1).unwrap().areas.get(&5).unwrap();
        assert_eq!(cap.data_access_id, 2);
        assert_ne!(cap.data_access_id, DEFAULT_DATA_ACCESS_TIER_ID);
    }
}
