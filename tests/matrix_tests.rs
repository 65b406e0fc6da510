//! 权限矩阵与解析器的集成测试
//!
//! 这些用例需要 PostgreSQL（通过 TEST_DATABASE_URL 指定），
//! 因此默认 #[ignore]，在有数据库的环境下用 --ignored 运行。

use access_system::{
    error::AppError,
    models::permission::{AreaPermissionPatch, DEFAULT_DATA_ACCESS_TIER_ID},
    repository::{PermissionRepository, RoleRepository},
    services::CapabilityResolver,
};

mod common;
use common::{
    admin_context, auth_context, create_test_app_state, create_test_application,
    create_test_area, create_test_config, create_test_role, setup_test_db,
};

fn patch(
    permission: Option<bool>,
    data_access_id: Option<i32>,
    read: Option<bool>,
    create: Option<bool>,
) -> AreaPermissionPatch {
    AreaPermissionPatch {
        permission,
        data_access_id,
        read,
        create,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_new_row_gets_documented_defaults() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "viewer").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let repo = PermissionRepository::new(pool.clone());
    let row = repo
        .upsert_area_permission(role_id, area_id, &patch(None, None, Some(true), None))
        .await
        .unwrap();

    // 未指定的字段取文档化的默认值
    assert!(!row.permission);
    assert_eq!(row.data_access_id, DEFAULT_DATA_ACCESS_TIER_ID);
    assert!(row.read);
    assert!(!row.create);
    assert!(!row.update);
    assert!(!row.delete);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_partial_update_does_not_clobber_sibling_fields() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "editor").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let repo = PermissionRepository::new(pool.clone());

    // 第一次保存：create + 层级
    repo.upsert_area_permission(role_id, area_id, &patch(Some(true), Some(3), None, Some(true)))
        .await
        .unwrap();

    // 第二次只动 read
    repo.upsert_area_permission(role_id, area_id, &patch(None, None, Some(true), None))
        .await
        .unwrap();

    let rows = repo.area_permissions(role_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];

    assert!(row.read);
    // 先前保存的字段原样保留
    assert!(row.permission);
    assert!(row.create);
    assert_eq!(row.data_access_id, 3);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_upsert_for_missing_role_or_area_is_not_found() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "editor").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let repo = PermissionRepository::new(pool.clone());

    let missing_role = repo
        .upsert_area_permission(999_999, area_id, &patch(None, None, Some(true), None))
        .await;
    assert!(matches!(missing_role, Err(AppError::NotFound)));

    let missing_area = repo
        .upsert_area_permission(role_id, 999_999, &patch(None, None, Some(true), None))
        .await;
    assert!(matches!(missing_area, Err(AppError::NotFound)));

    // 不存在的实体不会被静默建行
    assert!(repo.area_permissions(role_id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_application_permission_upsert_is_idempotent() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "editor").await;
    let app_id = create_test_application(&pool, "CRM").await;

    let repo = PermissionRepository::new(pool.clone());

    let first = repo.upsert_application_permission(role_id, app_id, true).await.unwrap();
    let second = repo.upsert_application_permission(role_id, app_id, true).await.unwrap();

    assert!(first.permission);
    assert!(second.permission);
    assert_eq!(first.created_at, second.created_at);

    let rows = repo.application_permissions(role_id).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_absent_application_permission_reads_as_denied() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "viewer").await;
    let app_id = create_test_application(&pool, "CRM").await;

    let state = create_test_app_state(pool.clone());
    let gate = state
        .access_service
        .application_permission_state(role_id, app_id)
        .await
        .unwrap();

    assert!(!gate.permission);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_role_delete_cascades_matrix_rows() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "doomed").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let permissions = PermissionRepository::new(pool.clone());
    permissions
        .upsert_area_permission(role_id, area_id, &patch(Some(true), None, Some(true), None))
        .await
        .unwrap();
    permissions.upsert_application_permission(role_id, app_id, true).await.unwrap();

    let roles = RoleRepository::new(pool.clone());
    assert!(roles.delete(role_id).await.unwrap());

    // 角色与其矩阵行全部消失，不留孤儿
    assert!(roles.find_by_id(role_id).await.unwrap().is_none());
    assert!(permissions.area_permissions(role_id).await.unwrap().is_empty());
    assert!(permissions.application_permissions(role_id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_save_then_area_lists_round_trip() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "editor").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let state = create_test_app_state(pool.clone());
    let admin = admin_context(&pool).await;

    state
        .access_service
        .save_area_permission(&admin, role_id, area_id, &patch(None, None, Some(true), None))
        .await
        .unwrap();

    let lists = state.access_service.area_lists(role_id).await.unwrap();
    let group = lists
        .iter()
        .find(|g| g.application_id == app_id)
        .expect("application group should be present");
    let entry = group
        .areas
        .iter()
        .find(|a| a.area_id == area_id)
        .expect("area entry should be present");

    assert!(entry.read);
    assert!(!entry.create);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_area_lists_for_missing_role_is_not_found() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let state = create_test_app_state(pool.clone());
    let result = state.access_service.area_lists(999_999).await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_resolver_reflects_matrix_writes_immediately() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "editor").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let state = create_test_app_state(pool.clone());
    let admin = admin_context(&pool).await;

    // 没有任何行时解析为空
    let before = state.resolver.resolve(&[role_id]).await.unwrap();
    assert!(before.is_empty());

    state
        .access_service
        .save_application_permission(&admin, role_id, app_id, true)
        .await
        .unwrap();
    state
        .access_service
        .save_area_permission(
            &admin,
            role_id,
            area_id,
            &patch(Some(true), Some(2), Some(true), None),
        )
        .await
        .unwrap();

    let granted = state.resolver.resolve(&[role_id]).await.unwrap();
    let cap = granted
        .get(&app_id)
        .and_then(|app| app.areas.get(&area_id))
        .expect("granted area should resolve");
    assert!(cap.read);
    assert_eq!(cap.data_access_id, 2);

    // 收回区域门禁后，缓存必须立即失效
    state
        .access_service
        .save_area_permission(&admin, role_id, area_id, &patch(Some(false), None, None, None))
        .await
        .unwrap();

    let revoked = state.resolver.resolve(&[role_id]).await.unwrap();
    let area_still_navigable = revoked
        .get(&app_id)
        .map(|app| app.areas.contains_key(&area_id))
        .unwrap_or(false);
    assert!(!area_still_navigable);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_resolver_cache_is_per_role_set() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_a = create_test_role(&pool, "alpha").await;
    let role_b = create_test_role(&pool, "beta").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let resolver = CapabilityResolver::new(pool.clone());
    let permissions = PermissionRepository::new(pool.clone());

    permissions.upsert_application_permission(role_a, app_id, true).await.unwrap();
    permissions
        .upsert_area_permission(role_a, area_id, &patch(Some(true), None, Some(true), None))
        .await
        .unwrap();

    // 两个角色集各自缓存；角色顺序不影响缓存键
    let combined_1 = resolver.resolve(&[role_a, role_b]).await.unwrap();
    let combined_2 = resolver.resolve(&[role_b, role_a]).await.unwrap();
    assert_eq!(*combined_1, *combined_2);

    // role_b 的矩阵变更使包含它的条目失效
    permissions.upsert_application_permission(role_b, app_id, true).await.unwrap();
    permissions
        .upsert_area_permission(role_b, area_id, &patch(Some(true), None, None, Some(true)))
        .await
        .unwrap();
    resolver.invalidate_role(role_b).await;

    let refreshed = resolver.resolve(&[role_a, role_b]).await.unwrap();
    let cap = refreshed.get(&app_id).unwrap().areas.get(&area_id).unwrap();
    assert!(cap.read && cap.create);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_save_requires_manage_privilege() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "editor").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let state = create_test_app_state(pool.clone());

    // 无角色的调用者：服务端拒绝，与客户端曾经看到什么无关
    let stranger = auth_context(vec![]);
    let denied = state
        .access_service
        .save_area_permission(&stranger, role_id, area_id, &patch(None, None, Some(true), None))
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let denied_gate = state
        .access_service
        .save_application_permission(&stranger, role_id, app_id, true)
        .await;
    assert!(matches!(denied_gate, Err(AppError::Forbidden)));

    // 矩阵未被碰过
    let permissions = PermissionRepository::new(pool.clone());
    assert!(permissions.area_permissions(role_id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_seeded_administrators_hold_manage_privilege() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let state = create_test_app_state(pool.clone());
    let admin = admin_context(&pool).await;

    state.access_service.require_manage_roles(&admin).await.unwrap();
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_empty_patch_is_rejected() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let role_id = create_test_role(&pool, "editor").await;
    let app_id = create_test_application(&pool, "CRM").await;
    let area_id = create_test_area(&pool, "Accounts", app_id).await;

    let state = create_test_app_state(pool.clone());
    let admin = admin_context(&pool).await;

    let result = state
        .access_service
        .save_area_permission(&admin, role_id, area_id, &AreaPermissionPatch::default())
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}
