use admin_storage::{
    DataPermissionStore, DepartmentStore, InMemoryDataPermissionStore, InMemoryDepartmentStore,
    InMemoryNoticeStore, InMemoryRowStore, InMemoryUserStore, NoticeCreate, NoticeStore, RowQuery,
    UserRecord, UserStore,
};
use domain::{
    CompareOp, Condition, DataPermission, DepartmentNode, FieldValue, GrantScope, ModeType,
    NoticeLevel, NoticeTarget, NoticeType, Predicate, TenantContext,
};
use serde_json::json;

fn ctx() -> TenantContext {
    TenantContext::new("tenant-1", "user-1", Vec::new(), Vec::new(), None)
}

fn dept(id: &str, parent: Option<&str>) -> DepartmentNode {
    DepartmentNode {
        dept_id: id.to_string(),
        tenant_id: "tenant-1".to_string(),
        parent_id: parent.map(str::to_string),
        name: id.to_string(),
        mode: ModeType::Or,
        is_active: true,
    }
}

fn user(id: &str, dept_id: &str, roles: &[&str]) -> UserRecord {
    UserRecord {
        tenant_id: "tenant-1".to_string(),
        user_id: id.to_string(),
        username: id.to_string(),
        dept_id: Some(dept_id.to_string()),
        roles: roles.iter().map(|role| role.to_string()).collect(),
        permissions: Vec::new(),
        is_superuser: false,
        push_enabled: true,
        is_active: true,
    }
}

#[tokio::test]
async fn department_ancestors_and_descendants() {
    let store = InMemoryDepartmentStore::new();
    store.upsert(dept("root", None)).expect("root");
    store.upsert(dept("d2", Some("root"))).expect("d2");
    store.upsert(dept("d1", Some("d2"))).expect("d1");
    store.upsert(dept("d1a", Some("d1"))).expect("d1a");
    store.upsert(dept("other", Some("root"))).expect("other");

    let chain: Vec<String> = store
        .ancestors(&ctx(), "d1")
        .await
        .expect("ancestors")
        .into_iter()
        .map(|node| node.dept_id)
        .collect();
    assert_eq!(chain, vec!["d1", "d2", "root"]);

    let below = store.descendants(&ctx(), "d2").await.expect("descendants");
    assert_eq!(below, vec!["d1", "d1a", "d2"]);

    assert!(store.descendants(&ctx(), "missing").await.expect("none").is_empty());
}

#[tokio::test]
async fn department_cycle_is_cut() {
    let store = InMemoryDepartmentStore::new();
    store.upsert(dept("a", Some("b"))).expect("a");
    store.upsert(dept("b", Some("a"))).expect("b");
    let chain = store.ancestors(&ctx(), "a").await.expect("ancestors");
    assert_eq!(chain.len(), 2);
}

#[tokio::test]
async fn data_permissions_filtered_by_scope_and_active() {
    let store = InMemoryDataPermissionStore::new();
    let grant = |id: &str, scope: GrantScope, active: bool| DataPermission {
        permission_id: id.to_string(),
        tenant_id: "tenant-1".to_string(),
        name: id.to_string(),
        scope,
        mode: ModeType::Or,
        rules: Vec::new(),
        is_active: active,
    };
    store
        .upsert(grant("p1", GrantScope::User("user-1".into()), true))
        .expect("p1");
    store
        .upsert(grant("p2", GrantScope::User("user-1".into()), false))
        .expect("p2");
    store
        .upsert(grant("p3", GrantScope::Department("d1".into()), true))
        .expect("p3");

    let own = store.list_for_user(&ctx(), "user-1").await.expect("own");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].permission_id, "p1");
    let at_dept = store.list_for_department(&ctx(), "d1").await.expect("dept");
    assert_eq!(at_dept[0].permission_id, "p3");
}

#[tokio::test]
async fn users_selected_by_department_and_role() {
    let store = InMemoryUserStore::new();
    store.upsert(user("u1", "d1", &["ops"])).expect("u1");
    store.upsert(user("u2", "d2", &["dev"])).expect("u2");
    let mut inactive = user("u3", "d1", &["ops"]);
    inactive.is_active = false;
    store.upsert(inactive).expect("u3");

    let by_dept = store
        .list_user_ids_by_departments(&ctx(), &["d1".to_string()])
        .await
        .expect("dept");
    assert_eq!(by_dept, vec!["u1"]);
    let by_role = store
        .list_user_ids_by_roles(&ctx(), &["dev".to_string()])
        .await
        .expect("role");
    assert_eq!(by_role, vec!["u2"]);
    let all = store.list_active_user_ids(&ctx()).await.expect("all");
    assert_eq!(all, vec!["u1", "u2"]);
}

#[tokio::test]
async fn notices_listed_for_recipient_newest_first() {
    let store = InMemoryNoticeStore::new();
    for (id, at) in [("n1", 1_000), ("n2", 2_000)] {
        store
            .create_notice(
                &ctx(),
                NoticeCreate {
                    notice_id: id.to_string(),
                    title: id.to_string(),
                    content: String::new(),
                    level: NoticeLevel::Info,
                    notice_type: NoticeType::User,
                    target: NoticeTarget::Users(vec!["u1".to_string()]),
                    recipient_ids: vec!["u1".to_string()],
                    created_by: "user-1".to_string(),
                    created_at_ms: at,
                },
            )
            .await
            .expect("create");
    }
    let mine = store.list_notices_for_user(&ctx(), "u1").await.expect("mine");
    let ids: Vec<&str> = mine.iter().map(|notice| notice.notice_id.as_str()).collect();
    assert_eq!(ids, vec!["n2", "n1"]);
    assert!(store.list_notices_for_user(&ctx(), "u2").await.expect("none").is_empty());
}

#[tokio::test]
async fn rows_filtered_by_predicate_and_tenant() {
    let store = InMemoryRowStore::new();
    store
        .insert_rows(
            "tenant-1",
            "system.users",
            vec![json!({"id": 1, "creator_id": "u1"}), json!({"id": 2, "creator_id": "u2"})],
        )
        .expect("rows");
    store
        .insert_rows("tenant-2", "system.users", vec![json!({"id": 3, "creator_id": "u1"})])
        .expect("rows");

    let predicate = Predicate::condition(Condition::Compare {
        field: "creator_id".into(),
        op: CompareOp::Exact,
        value: FieldValue::Str("u1".into()),
    });
    let rows = store
        .apply_predicate(&ctx(), "system.users", &predicate)
        .await
        .expect("rows");
    assert_eq!(rows, vec![json!({"id": 1, "creator_id": "u1"})]);

    let none = store
        .apply_predicate(&ctx(), "system.users", &Predicate::False)
        .await
        .expect("rows");
    assert!(none.is_empty());
}

#[tokio::test]
async fn tenant_required() {
    let store = InMemoryRowStore::new();
    let err = store
        .apply_predicate(&TenantContext::default(), "system.users", &Predicate::True)
        .await
        .expect_err("tenant");
    assert!(err.is_validation());
}
