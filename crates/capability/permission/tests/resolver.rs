use admin_permission::{DataScope, DataScopeResolver, GrantCatalog, resolve};
use admin_storage::{InMemoryDataPermissionStore, InMemoryDepartmentStore, InMemoryRowStore, RowQuery};
use domain::{
    DataPermission, DepartmentNode, GrantScope, MatchOp, ModeType, PermissionRule, Predicate,
    RuleKind, TenantContext,
};
use serde_json::{Value, json};
use std::sync::Arc;

const TABLE: &str = "system.users";
const NOW: i64 = 1_700_000_000;

fn user_ctx(dept: Option<&str>) -> TenantContext {
    TenantContext::new("tenant-1", "u1", Vec::new(), Vec::new(), dept.map(str::to_string))
}

fn grant(id: &str, scope: GrantScope, mode: ModeType, rules: Vec<PermissionRule>) -> DataPermission {
    DataPermission {
        permission_id: id.to_string(),
        tenant_id: "tenant-1".to_string(),
        name: id.to_string(),
        scope,
        mode,
        rules,
        is_active: true,
    }
}

fn own(mode: ModeType, rules: Vec<PermissionRule>) -> DataPermission {
    grant("own", GrantScope::User("u1".into()), mode, rules)
}

fn owner_rule() -> PermissionRule {
    PermissionRule::new(TABLE, "creator_id", RuleKind::Owner, MatchOp::Exact)
}

fn all_rule() -> PermissionRule {
    PermissionRule::new("*", "", RuleKind::All, MatchOp::All)
}

fn field_rule(field: &str, value: Value, match_op: &str) -> PermissionRule {
    PermissionRule::new(TABLE, field, RuleKind::Field(value), MatchOp::parse(match_op))
}

fn resolve_own(rules: Vec<PermissionRule>, mode: ModeType) -> DataScope {
    let catalog = GrantCatalog {
        own: vec![own(mode, rules)],
        ..GrantCatalog::default()
    };
    resolve(&user_ctx(None), TABLE, &catalog, NOW)
}

fn rows() -> Vec<Value> {
    vec![
        json!({"id": 1, "creator_id": "u1", "ip": "10.0.0.0", "roles": [1, 2], "name": "alpha"}),
        json!({"id": 2, "creator_id": "u2", "ip": "10.0.0.1", "roles": [1], "name": "beta"}),
        json!({"id": 3, "creator_id": "u3", "ip": "10.0.0.2", "roles": [2, 3], "name": "gamma"}),
        json!({"id": 4, "creator_id": "u1", "ip": "10.0.0.3", "roles": [], "name": "delta"}),
    ]
}

fn matching_ids(scope: &DataScope) -> Vec<i64> {
    let predicate = scope.predicate();
    rows()
        .into_iter()
        .filter(|row| predicate.matches(row))
        .filter_map(|row| row["id"].as_i64())
        .collect()
}

#[test]
fn single_rule_is_forced_to_or() {
    // 单条 ALL 规则即便声明为 AND 也按 OR 处理，结果为全部放行
    assert_eq!(resolve_own(vec![all_rule()], ModeType::And), DataScope::AllowAll);
    assert_eq!(
        resolve_own(vec![owner_rule()], ModeType::And),
        resolve_own(vec![owner_rule()], ModeType::Or)
    );
}

#[test]
fn ip_in_cidr_matches_host_addresses_only() {
    let scope = resolve_own(vec![field_rule("ip", json!("10.0.0.0/30"), "ip_in")], ModeType::Or);
    assert_eq!(matching_ids(&scope), vec![2, 3]);
}

#[test]
fn ip_in_wildcard_allows_everything() {
    let scope = resolve_own(vec![field_rule("ip", json!(["*"]), "ip_in")], ModeType::Or);
    assert_eq!(scope, DataScope::AllowAll);
    assert_eq!(matching_ids(&scope), vec![1, 2, 3, 4]);
}

#[test]
fn invalid_regex_yields_no_rows() {
    let scope = resolve_own(vec![field_rule("name", json!("(unclosed"), "regex")], ModeType::Or);
    assert_eq!(scope, DataScope::DenyAll);
    assert!(matching_ids(&scope).is_empty());
}

#[test]
fn m2m_all_requires_both_values_in_requires_either() {
    let all = resolve_own(vec![field_rule("roles", json!([1, 2]), "m2m_all")], ModeType::Or);
    assert_eq!(matching_ids(&all), vec![1]);
    let any = resolve_own(vec![field_rule("roles", json!([1, 2]), "m2m_in")], ModeType::Or);
    assert_eq!(matching_ids(&any), vec![1, 2, 3]);
}

#[test]
fn all_is_neutral_under_and() {
    let with_all = resolve_own(vec![all_rule(), owner_rule()], ModeType::And);
    let owner_only = resolve_own(vec![owner_rule()], ModeType::Or);
    assert_eq!(with_all, owner_only);
    assert_eq!(matching_ids(&with_all), vec![1, 4]);
}

#[test]
fn all_short_circuits_or() {
    assert_eq!(
        resolve_own(vec![all_rule(), owner_rule()], ModeType::Or),
        DataScope::AllowAll
    );
}

#[test]
fn and_grant_with_only_all_rules_denies() {
    let scope = resolve_own(
        vec![all_rule(), PermissionRule::new(TABLE, "", RuleKind::All, MatchOp::All)],
        ModeType::And,
    );
    assert_eq!(scope, DataScope::DenyAll);
}

#[test]
fn superuser_always_allowed() {
    let catalog = GrantCatalog {
        own: vec![own(ModeType::Or, vec![field_rule("name", json!("(bad"), "regex")])],
        ..GrantCatalog::default()
    };
    let ctx = user_ctx(None).with_superuser(true);
    assert_eq!(resolve(&ctx, TABLE, &catalog, NOW), DataScope::AllowAll);
}

#[test]
fn no_grants_denies() {
    assert_eq!(
        resolve(&user_ctx(None), TABLE, &GrantCatalog::default(), NOW),
        DataScope::DenyAll
    );
}

#[test]
fn rules_for_other_tables_contribute_nothing() {
    let rule = PermissionRule::new("system.roles", "creator_id", RuleKind::Owner, MatchOp::Exact);
    assert_eq!(resolve_own(vec![rule], ModeType::Or), DataScope::DenyAll);
}

#[test]
fn owner_without_user_matches_nothing() {
    let catalog = GrantCatalog {
        own: vec![own(ModeType::Or, vec![owner_rule()])],
        ..GrantCatalog::default()
    };
    let anonymous = TenantContext::new("tenant-1", "", Vec::new(), Vec::new(), None);
    let scope = resolve(&anonymous, TABLE, &catalog, NOW);
    assert!(matching_ids(&scope).is_empty());
}

#[test]
fn date_rule_uses_offset_into_past() {
    let rule = PermissionRule::new(
        TABLE,
        "created_at",
        RuleKind::Date { offset_seconds: -3_600 },
        MatchOp::Gte,
    );
    let scope = resolve_own(vec![rule], ModeType::Or);
    let predicate = scope.predicate();
    assert!(predicate.matches(&json!({"created_at": NOW - 60})));
    assert!(!predicate.matches(&json!({"created_at": NOW - 7_200})));
}

fn department(id: &str, parent: Option<&str>, mode: ModeType) -> DepartmentNode {
    DepartmentNode {
        dept_id: id.to_string(),
        tenant_id: "tenant-1".to_string(),
        parent_id: parent.map(str::to_string),
        name: id.to_string(),
        mode,
        is_active: true,
    }
}

struct Fixture {
    departments: Arc<InMemoryDepartmentStore>,
    permissions: Arc<InMemoryDataPermissionStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            departments: Arc::new(InMemoryDepartmentStore::new()),
            permissions: Arc::new(InMemoryDataPermissionStore::new()),
        }
    }

    fn resolver(&self) -> DataScopeResolver {
        DataScopeResolver::new(self.departments.clone(), self.permissions.clone())
    }
}

/// A 在 D1，D1 的父部门是 D2。D1 上有 OR 授权“仅本人”，D2 上有 AND 授权“ALL”（两条 ALL 规则）。
/// D1 层得到本人谓词；D2 层 ALL 被丢弃后为空，退化为拒绝全部。
/// 两层按 D2 的组合方式合并：AND 时整体拒绝，OR 时保持本人谓词。
async fn end_to_end_with_parent_mode(parent_mode: ModeType) -> DataScope {
    let fixture = Fixture::new();
    fixture
        .departments
        .upsert(department("d2", None, parent_mode))
        .expect("d2");
    fixture
        .departments
        .upsert(department("d1", Some("d2"), ModeType::Or))
        .expect("d1");
    fixture
        .permissions
        .upsert(grant(
            "g-d1",
            GrantScope::Department("d1".into()),
            ModeType::Or,
            vec![owner_rule()],
        ))
        .expect("g-d1");
    fixture
        .permissions
        .upsert(grant(
            "g-d2",
            GrantScope::Department("d2".into()),
            ModeType::And,
            vec![all_rule(), PermissionRule::new(TABLE, "", RuleKind::All, MatchOp::All)],
        ))
        .expect("g-d2");
    fixture
        .resolver()
        .resolve_at(&user_ctx(Some("d1")), TABLE, NOW)
        .await
        .expect("resolve")
}

#[tokio::test]
async fn end_to_end_parent_and_level_denies() {
    assert_eq!(end_to_end_with_parent_mode(ModeType::And).await, DataScope::DenyAll);
}

#[tokio::test]
async fn end_to_end_parent_or_level_keeps_owner() {
    let scope = end_to_end_with_parent_mode(ModeType::Or).await;
    assert_eq!(matching_ids(&scope), vec![1, 4]);
}

#[tokio::test]
async fn levels_fold_from_own_grants_outward() {
    // own: name=delta；d1 (OR): creator=u3；d2 (AND): id<=3
    // 由内向外 ((delta OR u3) AND id<=3) => {3}；由根向内 (delta OR (u3 AND id<=3)) 会得到 {3, 4}
    let fixture = Fixture::new();
    fixture
        .departments
        .upsert(department("d2", None, ModeType::And))
        .expect("d2");
    fixture
        .departments
        .upsert(department("d1", Some("d2"), ModeType::Or))
        .expect("d1");
    fixture
        .permissions
        .upsert(own(ModeType::Or, vec![field_rule("name", json!("delta"), "exact")]))
        .expect("own");
    fixture
        .permissions
        .upsert(grant(
            "g-d1",
            GrantScope::Department("d1".into()),
            ModeType::Or,
            vec![field_rule("creator_id", json!("u3"), "exact")],
        ))
        .expect("g-d1");
    fixture
        .permissions
        .upsert(grant(
            "g-d2",
            GrantScope::Department("d2".into()),
            ModeType::Or,
            vec![field_rule("id", json!(3), "lte")],
        ))
        .expect("g-d2");

    let scope = fixture
        .resolver()
        .resolve_at(&user_ctx(Some("d1")), TABLE, NOW)
        .await
        .expect("resolve");
    assert_eq!(matching_ids(&scope), vec![3]);
}

#[tokio::test]
async fn inactive_department_skipped_but_chain_continues() {
    let fixture = Fixture::new();
    fixture
        .departments
        .upsert(department("root", None, ModeType::Or))
        .expect("root");
    let mut middle = department("mid", Some("root"), ModeType::Or);
    middle.is_active = false;
    fixture.departments.upsert(middle).expect("mid");
    fixture
        .departments
        .upsert(department("leaf", Some("mid"), ModeType::Or))
        .expect("leaf");
    fixture
        .permissions
        .upsert(grant("g-mid", GrantScope::Department("mid".into()), ModeType::Or, vec![all_rule()]))
        .expect("g-mid");
    fixture
        .permissions
        .upsert(grant("g-root", GrantScope::Department("root".into()), ModeType::Or, vec![owner_rule()]))
        .expect("g-root");

    let scope = fixture
        .resolver()
        .resolve_at(&user_ctx(Some("leaf")), TABLE, NOW)
        .await
        .expect("resolve");
    assert_eq!(matching_ids(&scope), vec![1, 4]);
}

#[tokio::test]
async fn owner_departments_expands_descendants() {
    let fixture = Fixture::new();
    fixture
        .departments
        .upsert(department("d1", None, ModeType::Or))
        .expect("d1");
    fixture
        .departments
        .upsert(department("d1a", Some("d1"), ModeType::Or))
        .expect("d1a");
    fixture
        .departments
        .upsert(department("d2", None, ModeType::Or))
        .expect("d2");
    fixture
        .permissions
        .upsert(own(
            ModeType::Or,
            vec![PermissionRule::new(TABLE, "dept_id", RuleKind::OwnerDepartments, MatchOp::In)],
        ))
        .expect("own");

    let scope = fixture
        .resolver()
        .resolve_at(&user_ctx(Some("d1")), TABLE, NOW)
        .await
        .expect("resolve");

    let store = InMemoryRowStore::new();
    store
        .insert_rows(
            "tenant-1",
            TABLE,
            vec![
                json!({"id": 1, "dept_id": "d1"}),
                json!({"id": 2, "dept_id": "d1a"}),
                json!({"id": 3, "dept_id": "d2"}),
            ],
        )
        .expect("rows");
    let visible = store
        .apply_predicate(&user_ctx(Some("d1")), TABLE, &scope.predicate())
        .await
        .expect("query");
    let ids: Vec<i64> = visible.iter().filter_map(|row| row["id"].as_i64()).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn superuser_skips_store_reads() {
    let fixture = Fixture::new();
    let ctx = user_ctx(Some("missing")).with_superuser(true);
    let scope = fixture
        .resolver()
        .resolve_at(&ctx, TABLE, NOW)
        .await
        .expect("resolve");
    assert_eq!(scope, DataScope::AllowAll);
    assert_eq!(scope.predicate(), Predicate::True);
}
