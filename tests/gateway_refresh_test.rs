mod common;

use common::*;
use futures_util::future::join_all;
use gymtrack::domain_model::*;
use gymtrack::domain_port::SessionStorage;
use gymtrack::gateway::*;
use std::sync::Arc;

#[tokio::test]
async fn valid_token_passes_through_without_refresh() {
    let h = signed_in().await;

    let response = h.gateway.request(ApiRequest::get("/groups")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(h.transport.refresh_calls(), 0);
    assert_eq!(h.transport.paths_sent_with(OLD_TOKEN), vec!["/groups"]);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let h = signed_in().await;
    h.transport.expire();

    let response = h.gateway.request(ApiRequest::get("/history")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(h.transport.refresh_calls(), 1);
    assert_eq!(h.transport.paths_sent_with(NEW_TOKEN), vec!["/history"]);
    assert_eq!(h.gateway.access_token(), Some(AccessToken(NEW_TOKEN.to_string())));
    assert_eq!(
        h.storage.get().await.unwrap(),
        Some(Session::new(NEW_TOKEN, NEW_REFRESH))
    );
    assert!(!h.gateway.is_refreshing());
    assert_eq!(h.sign_out.calls(), 0);
}

#[tokio::test]
async fn refresh_exchange_sends_stored_refresh_token() {
    let h = signed_in().await;
    h.transport.expire();

    h.gateway.request(ApiRequest::get("/history")).await.unwrap();

    let refresh = h
        .transport
        .calls()
        .into_iter()
        .find(|c| c.path == REFRESH_PATH)
        .unwrap();
    assert_eq!(refresh.method, Method::Post);
    assert_eq!(
        refresh.body,
        RequestBody::Json(serde_json::json!({ "refresh_token": OLD_REFRESH }))
    );
}

#[tokio::test]
async fn invalid_token_reason_also_refreshes() {
    let h = signed_in().await;
    h.transport.expire();
    h.transport.set_rejection(TOKEN_INVALID);

    let response = h.gateway.request(ApiRequest::get("/groups")).await;

    assert!(response.is_ok());
    assert_eq!(h.transport.refresh_calls(), 1);
}

#[tokio::test]
async fn queued_requests_resume_in_arrival_order_after_one_refresh() {
    let h = signed_in().await;
    h.transport.expire();
    h.transport.hold_refresh();

    let gateway = h.gateway.clone();
    let a = tokio::spawn(async move { gateway.request(ApiRequest::get("/a")).await });
    h.transport.refresh_started.notified().await;
    assert!(h.gateway.is_refreshing());

    let gateway = h.gateway.clone();
    let b = tokio::spawn(async move { gateway.request(ApiRequest::get("/b")).await });
    wait_for_queue(&h.gateway, 1).await;

    let gateway = h.gateway.clone();
    let c = tokio::spawn(async move { gateway.request(ApiRequest::get("/c")).await });
    wait_for_queue(&h.gateway, 2).await;

    h.transport.release_refresh();

    for handle in [a, b, c] {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, 200);
    }

    assert_eq!(h.transport.refresh_calls(), 1);
    assert_eq!(h.transport.paths_sent_with(NEW_TOKEN), vec!["/a", "/b", "/c"]);
    assert_eq!(h.gateway.access_token(), Some(AccessToken(NEW_TOKEN.to_string())));
    assert_eq!(h.gateway.queued_requests(), 0);
    assert!(!h.gateway.is_refreshing());
}

#[tokio::test]
async fn many_concurrent_expired_requests_share_one_refresh() {
    let h = signed_in().await;
    h.transport.expire();
    h.transport.hold_refresh();

    let paths: Vec<String> = (0..8).map(|i| format!("/exercises/{}", i)).collect();
    let gateway = h.gateway.clone();
    let calls = paths.iter().map(|p| {
        let gateway = gateway.clone();
        let path = p.clone();
        tokio::spawn(async move { gateway.request(ApiRequest::get(path)).await })
    });
    let handles: Vec<_> = calls.collect();

    wait_for_queue(&h.gateway, paths.len() - 1).await;
    h.transport.release_refresh();

    for result in join_all(handles).await {
        assert_eq!(result.unwrap().unwrap().status, 200);
    }
    assert_eq!(h.transport.refresh_calls(), 1);
    let mut replayed = h.transport.paths_sent_with(NEW_TOKEN);
    replayed.sort();
    let mut expected = paths.clone();
    expected.sort();
    assert_eq!(replayed, expected);
}

#[tokio::test]
async fn queued_requests_survive_owner_dropped_during_its_replay() {
    let h = signed_in().await;
    h.transport.expire();
    h.transport.hold_refresh();

    let gateway = h.gateway.clone();
    let owner = tokio::spawn(async move { gateway.request(ApiRequest::get("/hang")).await });
    h.transport.refresh_started.notified().await;

    let gateway = h.gateway.clone();
    let queued = tokio::spawn(async move { gateway.request(ApiRequest::get("/b")).await });
    wait_for_queue(&h.gateway, 1).await;

    h.transport.release_refresh();
    wait_for_send(&h.transport, "/hang", NEW_TOKEN).await;
    owner.abort();
    assert!(owner.await.unwrap_err().is_cancelled());

    let response = queued.await.unwrap().unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(h.transport.refresh_calls(), 1);
    assert_eq!(h.transport.paths_sent_with(NEW_TOKEN), vec!["/hang", "/b"]);
    assert!(!h.gateway.is_refreshing());
    assert_eq!(h.sign_out.calls(), 0);
}

#[tokio::test]
async fn subsequent_requests_use_the_refreshed_token() {
    let h = signed_in().await;
    h.transport.expire();
    h.gateway.request(ApiRequest::get("/groups")).await.unwrap();

    h.gateway.request(ApiRequest::get("/history")).await.unwrap();

    assert_eq!(h.transport.refresh_calls(), 1);
    let last = h.transport.calls().pop().unwrap();
    assert_eq!(last.path, "/history");
    assert_eq!(last.bearer.as_deref(), Some(NEW_TOKEN));
}

#[tokio::test]
async fn failed_refresh_rejects_everyone_and_signs_out_once() {
    let h = signed_in().await;
    h.transport.expire();
    h.transport.hold_refresh();
    h.transport
        .answer_refresh(ApiResponse::error(401, "refresh token not found"));

    let gateway = h.gateway.clone();
    let owner = tokio::spawn(async move { gateway.request(ApiRequest::get("/a")).await });
    h.transport.refresh_started.notified().await;

    let mut queued = Vec::new();
    for (i, path) in ["/b", "/c", "/d"].into_iter().enumerate() {
        let gateway = h.gateway.clone();
        queued.push(tokio::spawn(async move {
            gateway.request(ApiRequest::get(path)).await
        }));
        wait_for_queue(&h.gateway, i + 1).await;
    }
    h.transport.release_refresh();

    let err = owner.await.unwrap().unwrap_err();
    assert_eq!(err.app_message(), Some("refresh token not found"));
    for handle in queued {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ApiError::App { status: 401, .. }));
    }

    assert_eq!(h.transport.refresh_calls(), 1);
    assert_eq!(h.sign_out.calls(), 1);
    assert_eq!(h.gateway.access_token(), None);
    assert!(h.transport.paths_sent_with(NEW_TOKEN).is_empty());
    assert!(!h.gateway.is_refreshing());
}

#[tokio::test]
async fn refresh_timeout_is_a_refresh_failure() {
    let h = signed_in().await;
    h.transport.expire();
    h.transport.refresh_offline();

    let err = h.gateway.request(ApiRequest::get("/groups")).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(h.sign_out.calls(), 1);
}

#[tokio::test]
async fn storage_failure_while_saving_refreshed_pair_fails_the_refresh() {
    let h = signed_in().await;
    h.transport.expire();
    h.store.fail_writes(true);

    let err = h.gateway.request(ApiRequest::get("/groups")).await.unwrap_err();

    assert!(matches!(err, ApiError::Storage(_)));
    assert_eq!(h.sign_out.calls(), 1);
    assert!(!h.gateway.is_refreshing());
}

#[tokio::test]
async fn missing_refresh_token_signs_out_without_refreshing() {
    let h = signed_in().await;
    h.storage.remove().await.unwrap();
    h.transport.expire();

    let err = h.gateway.request(ApiRequest::get("/groups")).await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(h.transport.refresh_calls(), 0);
    assert_eq!(h.sign_out.calls(), 1);
}

#[tokio::test]
async fn other_unauthorized_reasons_sign_out_without_refreshing() {
    let h = signed_in().await;

    let err = h.gateway.request(ApiRequest::get("/blocked")).await.unwrap_err();

    assert_eq!(err.app_message(), Some("user.blocked"));
    assert_eq!(err.status(), Some(401));
    assert_eq!(h.transport.refresh_calls(), 0);
    assert_eq!(h.sign_out.calls(), 1);
}

#[tokio::test]
async fn sign_out_may_fire_once_per_failure() {
    let h = signed_in().await;

    for _ in 0..3 {
        let _ = h.gateway.request(ApiRequest::get("/blocked")).await;
    }

    assert_eq!(h.sign_out.calls(), 3);
}

#[tokio::test]
async fn replayed_request_is_not_refreshed_again() {
    let h = signed_in().await;
    h.transport.expire();
    // The freshly issued token is rejected too.
    h.transport
        .answer_refresh(ApiResponse::json(200, &Session::new("token-3", "refresh-3")).unwrap());

    let err = h.gateway.request(ApiRequest::get("/groups")).await.unwrap_err();

    assert_eq!(err.app_message(), Some(TOKEN_EXPIRED));
    assert_eq!(h.transport.refresh_calls(), 1);
    assert_eq!(h.transport.paths_sent_with("token-3"), vec!["/groups"]);
}

#[tokio::test]
async fn late_failure_after_rotation_replays_without_second_refresh() {
    let h = signed_in().await;
    h.transport.expire();
    h.transport.hold_slow();

    // Sent with the old token, answered only after the refresh settled.
    let gateway = h.gateway.clone();
    let slow = tokio::spawn(async move { gateway.request(ApiRequest::get("/slow")).await });
    tokio::task::yield_now().await;

    h.gateway.request(ApiRequest::get("/groups")).await.unwrap();
    assert_eq!(h.transport.refresh_calls(), 1);

    h.transport.release_slow();
    let response = slow.await.unwrap().unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(h.transport.refresh_calls(), 1);
    assert_eq!(h.transport.paths_sent_with(NEW_TOKEN), vec!["/groups", "/slow"]);
}

#[tokio::test]
async fn ejected_token_manager_leaves_401_untouched() {
    let h = signed_in().await;
    let sign_out = Arc::new(CountingSignOut::default());
    let id = h.gateway.register_token_manager(sign_out.clone());
    assert!(h.gateway.eject_token_manager(id));
    assert!(!h.gateway.eject_token_manager(id));
    h.transport.expire();

    let err = h.gateway.request(ApiRequest::get("/groups")).await.unwrap_err();

    assert_eq!(err.app_message(), Some(TOKEN_EXPIRED));
    assert_eq!(h.transport.refresh_calls(), 0);
    assert_eq!(sign_out.calls(), 0);
    assert_eq!(h.sign_out.calls(), 0);
}

#[tokio::test]
async fn closure_can_serve_as_sign_out_hook() {
    let h = signed_in().await;
    let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = fired.clone();
    h.gateway.register_token_manager(Arc::new(move || {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }));

    let _ = h.gateway.request(ApiRequest::get("/blocked")).await;

    assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
}
