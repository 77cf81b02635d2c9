use admin_api::{AppState, AppStores, build_app};
use admin_auth::JwtManager;
use admin_storage::{
    InMemoryDataPermissionStore, InMemoryDepartmentStore, InMemoryNoticeStore,
    InMemoryPresenceStore, InMemoryRowStore, InMemoryUserStore, PresenceExpiry, UserRecord,
};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use domain::{
    DataPermission, GrantScope, MatchOp, ModeType, PermissionRule, RuleKind, TenantContext,
    permissions,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const TENANT: &str = "tenant-1";
const SECRET: &str = "test-secret";

fn user_record(id: &str, perms: &[&str], superuser: bool) -> UserRecord {
    UserRecord {
        tenant_id: TENANT.to_string(),
        user_id: id.to_string(),
        username: format!("name-{id}"),
        dept_id: None,
        roles: Vec::new(),
        permissions: perms.iter().map(|code| code.to_string()).collect(),
        is_superuser: superuser,
        push_enabled: true,
        is_active: true,
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    jwt: JwtManager,
}

impl TestApp {
    fn new() -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        users.upsert(user_record("admin", &[], true)).expect("user");
        users
            .upsert(user_record(
                "u2",
                &[
                    permissions::NOTICE_READ,
                    permissions::DATA_SCOPE_READ,
                    permissions::TABLE_ROW_READ,
                ],
                false,
            ))
            .expect("user");

        let grants = Arc::new(InMemoryDataPermissionStore::new());
        grants
            .upsert(DataPermission {
                permission_id: "own-orders".to_string(),
                tenant_id: TENANT.to_string(),
                name: "own orders".to_string(),
                scope: GrantScope::User("u2".to_string()),
                mode: ModeType::And,
                rules: vec![PermissionRule::new(
                    "app.orders",
                    "owner_id",
                    RuleKind::Owner,
                    MatchOp::Exact,
                )],
                is_active: true,
            })
            .expect("grant");

        let rows = Arc::new(InMemoryRowStore::new());
        rows.insert_rows(
            TENANT,
            "app.orders",
            [
                json!({"id": 1, "owner_id": "u2"}),
                json!({"id": 2, "owner_id": "u3"}),
            ],
        )
        .expect("rows");

        let stores = AppStores {
            users,
            departments: Arc::new(InMemoryDepartmentStore::new()),
            permissions: grants,
            notices: Arc::new(InMemoryNoticeStore::new()),
            rows,
            presence: Arc::new(InMemoryPresenceStore::new(PresenceExpiry::default())),
        };
        let state = AppState::new(
            Arc::new(JwtManager::new(SECRET.to_string(), 3600)),
            stores,
            "user_",
        );
        Self {
            router: build_app(state.clone()),
            state,
            jwt: JwtManager::new(SECRET.to_string(), 3600),
        }
    }

    fn token_for(&self, user_id: &str, perms: &[&str], superuser: bool) -> String {
        let ctx = TenantContext::new(
            TENANT,
            user_id,
            Vec::new(),
            perms.iter().map(|code| code.to_string()).collect(),
            None,
        )
        .with_superuser(superuser);
        self.jwt.issue_access_token(&ctx).expect("token").token
    }

    fn admin_token(&self) -> String {
        self.token_for("admin", &[], true)
    }

    fn user_token(&self) -> String {
        self.token_for(
            "u2",
            &[
                permissions::NOTICE_READ,
                permissions::DATA_SCOPE_READ,
                permissions::TABLE_ROW_READ,
            ],
            false,
        )
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn health_sets_request_id_headers() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-trace-id"));
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/online-users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("AUTH.UNAUTHORIZED"));

    let (status, _) = app
        .send("GET", "/online-users", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_permission_is_forbidden() {
    let app = TestApp::new();
    let token = app.user_token();
    let (status, body) = app.send("GET", "/online-users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("AUTH.FORBIDDEN"));
}

#[tokio::test]
async fn data_scope_and_rows_follow_grants() {
    let app = TestApp::new();
    let token = app.user_token();

    let (status, body) = app
        .send("GET", "/data-scope/app.orders", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["scope"], json!("filter"));
    assert!(body["data"]["predicate"].is_object());

    let (status, body) = app
        .send("GET", "/tables/app.orders/rows", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"]["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(1));

    // 没有授权的表拒绝全部
    let (_, body) = app
        .send("GET", "/tables/app.invoices/rows", Some(&token), None)
        .await;
    assert_eq!(body["data"]["scope"], json!("deny_all"));
    assert_eq!(body["data"]["rows"], json!([]));

    let admin = app.admin_token();
    let (_, body) = app
        .send("GET", "/tables/app.orders/rows", Some(&admin), None)
        .await;
    assert_eq!(body["data"]["scope"], json!("allow_all"));
    assert_eq!(body["data"]["rows"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn online_users_and_forced_logout() {
    let app = TestApp::new();
    app.state
        .presence
        .connect(TENANT, "u2", "conn-a")
        .await
        .expect("connect");
    let mut signals = app.state.hub.register("conn-a").expect("register");
    let admin = app.admin_token();

    let (status, body) = app.send("GET", "/online-users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["userId"], json!("u2"));
    assert_eq!(body["data"][0]["connections"], json!(["conn-a"]));

    let (status, body) = app
        .send("POST", "/online-users/u2/logout", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], json!(["conn-a"]));
    assert!(signals.recv().await.expect("signal").is_logout());

    let (_, body) = app.send("GET", "/online-users", Some(&admin), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn logout_rejects_invalid_connection_name() {
    let app = TestApp::new();
    let admin = app.admin_token();
    let (status, body) = app
        .send(
            "POST",
            "/online-users/u2/logout",
            Some(&admin),
            Some(json!({"connections": ["bad name"]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("INVALID.REQUEST"));
}

#[tokio::test]
async fn notice_reaches_recipient_inbox() {
    let app = TestApp::new();
    let admin = app.admin_token();
    let (status, body) = app
        .send(
            "POST",
            "/notices",
            Some(&admin),
            Some(json!({
                "title": "hello",
                "content": "world",
                "noticeType": "USER",
                "targetUsers": ["u2"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notice"]["recipientCount"], json!(1));

    let token = app.user_token();
    let (status, body) = app.send("GET", "/notices/mine", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], json!("hello"));
}

#[tokio::test]
async fn notice_with_unknown_type_is_bad_request() {
    let app = TestApp::new();
    let admin = app.admin_token();
    let (status, _) = app
        .send(
            "POST",
            "/notices",
            Some(&admin),
            Some(json!({"title": "x", "noticeType": "BROADCAST"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_is_limited_to_callers_tenant() {
    let app = TestApp::new();
    app.state
        .presence
        .connect("tenant-2", "u2", "conn-remote")
        .await
        .expect("connect");
    app.state
        .presence
        .connect(TENANT, "u2", "conn-local")
        .await
        .expect("connect");
    let mut remote = app.state.hub.register("conn-remote").expect("register");
    let admin = app.admin_token();

    let (status, body) = app
        .send(
            "POST",
            "/online-users/u2/logout",
            Some(&admin),
            Some(json!({"connections": ["conn-remote", "conn-local"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], json!(["conn-local"]));
    assert!(remote.try_recv().is_err());
    assert!(
        app.state
            .presence
            .is_online("tenant-2", "u2")
            .await
            .expect("online")
    );

    let (status, body) = app
        .send("POST", "/online-users/stranger/logout", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("RESOURCE.NOT_FOUND"));
}
