use admin_telemetry::{metrics, new_request_ids, record_push_failed};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn counters_accumulate() {
    let before = metrics().snapshot().push_failed;
    record_push_failed();
    assert!(metrics().snapshot().push_failed > before);
}
