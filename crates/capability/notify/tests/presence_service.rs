use admin_notify::{LocalConnectionHub, MessageType, PresenceService};
use admin_storage::{InMemoryPresenceStore, PresenceExpiry, PresenceStore};
use serde_json::json;
use std::sync::Arc;

const TENANT: &str = "t1";

fn fixed_now() -> i64 {
    1_000
}

fn setup() -> (Arc<InMemoryPresenceStore>, Arc<LocalConnectionHub>, PresenceService) {
    let store = Arc::new(InMemoryPresenceStore::new(PresenceExpiry::new(30, 86_400)));
    let hub = Arc::new(LocalConnectionHub::new());
    let service = PresenceService::new(store.clone(), hub.clone(), "user_").with_clock(fixed_now);
    (store, hub, service)
}

#[tokio::test]
async fn push_fans_out_and_reports_failed_connections() {
    let (_store, hub, service) = setup();
    let mut rx_a = hub.register("conn-a").expect("register");
    let mut rx_b = hub.register("conn-b").expect("register");
    service.connect(TENANT, "u1", "conn-a").await.expect("connect");
    service.connect(TENANT, "u1", "conn-b").await.expect("connect");
    // 存储中存活但未在本进程注册的连接
    service.connect(TENANT, "u1", "conn-gone").await.expect("connect");

    let report = service
        .push(TENANT, "u1", json!({"text": "hello"}), MessageType::Info)
        .await
        .expect("push");
    assert_eq!(report.delivered, vec!["conn-a".to_string(), "conn-b".to_string()]);
    assert_eq!(report.failed, vec!["conn-gone".to_string()]);

    let received = rx_a.recv().await.expect("message");
    assert_eq!(received.content, json!({"text": "hello"}));
    assert_eq!(received.message_type, MessageType::Info);
    assert!(rx_b.recv().await.is_some());
}

#[tokio::test]
async fn push_to_offline_user_is_empty() {
    let (_store, _hub, service) = setup();
    let report = service
        .push(TENANT, "nobody", json!("x"), MessageType::System)
        .await
        .expect("push");
    assert!(report.delivered.is_empty());
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn force_logout_signals_then_removes_every_connection() {
    let (store, hub, service) = setup();
    let mut rx = hub.register("conn-a").expect("register");
    service.connect(TENANT, "u1", "conn-a").await.expect("connect");
    service.connect(TENANT, "u1", "conn-dead").await.expect("connect");

    let report = service.force_logout(TENANT, "u1", None).await.expect("logout");
    assert_eq!(report.removed.len(), 2);
    assert_eq!(report.signal_failed, vec!["conn-dead".to_string()]);
    assert!(rx.recv().await.expect("signal").is_logout());

    let alive = store.list_alive("user_t1.u1", fixed_now()).await.expect("list");
    assert!(alive.is_empty());
    assert!(!service.is_online(TENANT, "u1").await.expect("online"));
}

#[tokio::test]
async fn force_logout_with_explicit_connections_keeps_others() {
    let (_store, _hub, service) = setup();
    service.connect(TENANT, "u1", "conn-a").await.expect("connect");
    service.connect(TENANT, "u1", "conn-b").await.expect("connect");

    let targets = vec!["conn-a".to_string()];
    service
        .force_logout(TENANT, "u1", Some(&targets))
        .await
        .expect("logout");
    assert_eq!(
        service.alive_connections(TENANT, "u1").await.expect("alive"),
        vec!["conn-b".to_string()]
    );
}

#[tokio::test]
async fn force_logout_rejects_invalid_connection_before_signalling() {
    let (_store, _hub, service) = setup();
    service.connect(TENANT, "u1", "conn-a").await.expect("connect");
    let targets = vec!["conn-a".to_string(), "bad name".to_string()];
    let err = service
        .force_logout(TENANT, "u1", Some(&targets))
        .await
        .expect_err("invalid");
    assert!(err.is_invalid_input());
    assert!(service.is_online(TENANT, "u1").await.expect("online"));
}

#[tokio::test]
async fn online_users_lists_only_groups_with_alive_connections() {
    let (store, _hub, service) = setup();
    service.connect(TENANT, "u1", "conn-a").await.expect("connect");
    service.connect(TENANT, "u2", "conn-b").await.expect("connect");
    // 心跳过期的连接
    store.touch("user_t1.u3", "conn-c", 900).await.expect("touch");
    store.touch("other_group", "conn-d", fixed_now()).await.expect("touch");

    let online = service.online_user_ids(TENANT).await.expect("online");
    assert_eq!(online, vec!["u1".to_string(), "u2".to_string()]);

    service.disconnect(TENANT, "u2", "conn-b").await.expect("disconnect");
    let online = service.online_user_ids(TENANT).await.expect("online");
    assert_eq!(online, vec!["u1".to_string()]);
}

#[tokio::test]
async fn noop_sender_counts_every_alive_connection_as_delivered() {
    let store = Arc::new(InMemoryPresenceStore::new(PresenceExpiry::new(30, 86_400)));
    let service = PresenceService::new(store, Arc::new(admin_notify::NoopSender), "user_")
        .with_clock(fixed_now);
    service.connect(TENANT, "u9", "conn-1").await.expect("connect");
    service.connect(TENANT, "u9", "conn-2").await.expect("connect");
    let report = service
        .push(TENANT, "u9", json!({}), MessageType::System)
        .await
        .expect("push");
    assert_eq!(report.delivered.len(), 2);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn force_logout_ignores_connections_of_other_users() {
    let (store, hub, service) = setup();
    let mut rx_b = hub.register("conn-b").expect("register");
    service.connect(TENANT, "u1", "conn-a").await.expect("connect");
    service.connect(TENANT, "u2", "conn-b").await.expect("connect");

    let targets = vec!["conn-b".to_string()];
    let report = service
        .force_logout(TENANT, "u1", Some(&targets))
        .await
        .expect("logout");
    assert!(report.removed.is_empty());
    assert!(rx_b.try_recv().is_err());
    assert_eq!(
        store.list_alive("user_t1.u2", fixed_now()).await.expect("list"),
        vec!["conn-b".to_string()]
    );
    assert!(service.is_online(TENANT, "u1").await.expect("online"));
}

#[tokio::test]
async fn force_logout_rejects_invalid_group_before_signalling() {
    let (_store, hub, service) = setup();
    let mut rx = hub.register("conn-a").expect("register");
    service.connect(TENANT, "u1", "conn-a").await.expect("connect");

    let targets = vec!["conn-a".to_string()];
    let err = service
        .force_logout(TENANT, "bad user", Some(&targets))
        .await
        .expect_err("invalid group");
    assert!(err.is_invalid_input());
    assert!(rx.try_recv().is_err());

    let err = service
        .force_logout("t.1", "u1", None)
        .await
        .expect_err("invalid tenant");
    assert!(err.is_invalid_input());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn groups_are_separated_by_tenant() {
    let (_store, hub, service) = setup();
    let mut rx_one = hub.register("conn-one").expect("register");
    let mut rx_two = hub.register("conn-two").expect("register");
    service.connect("t1", "u1", "conn-one").await.expect("connect");
    service.connect("t2", "u1", "conn-two").await.expect("connect");

    let report = service
        .push("t1", "u1", json!({"text": "only t1"}), MessageType::Notice)
        .await
        .expect("push");
    assert_eq!(report.delivered, vec!["conn-one".to_string()]);
    assert!(rx_one.recv().await.is_some());
    assert!(rx_two.try_recv().is_err());

    assert_eq!(
        service.online_user_ids("t2").await.expect("online"),
        vec!["u1".to_string()]
    );
    service.force_logout("t1", "u1", None).await.expect("logout");
    assert!(service.is_online("t2", "u1").await.expect("online"));
    assert!(service.online_user_ids("t1").await.expect("online").is_empty());
}
