//! Integration tests for the session gateway.
//!
//! The auth service and the records API are both played by a
//! `MockTransport`. Tests that need requests to overlap run with paused
//! time (`start_paused`) and give the refresh route a delay: the delay only
//! elapses once every task is waiting, so by then all concurrent callers
//! have hit their 401 and joined the refresh.

use std::time::Duration;

use futures_util::future::join_all;
use registrar_protocol::{Endpoint, Secret, Timestamp};
use registrar_session::{
    ManualClock, SessionConfig, SessionError, SessionGateway, SessionSnapshot,
};
use registrar_transport::{ApiRequest, Method, MockTransport};

// =========================================================================
// Helpers
// =========================================================================

const LOGIN: &str = "/api/user/login";
const LOGOUT: &str = "/api/user/logout";
const REFRESH: &str = "/api/user/refresh";
const ME: &str = "/api/user/me";
const STUDENTS: &str = "/api/students";

/// 2023-11-14T22:13:20Z, the "now" every test starts at.
const NOW: u64 = 1_700_000_000_000;

fn in_secs(secs: u64) -> Timestamp {
    Timestamp::from_millis(NOW + secs * 1_000)
}

fn setup() -> (MockTransport, ManualClock, SessionGateway<MockTransport>) {
    let mock = MockTransport::new();
    let clock = ManualClock::new(Timestamp::from_millis(NOW));
    let gateway = SessionGateway::new(mock.clone(), SessionConfig::default())
        .with_clock(clock.clone());
    (mock, clock, gateway)
}

fn refresh_body(expires_at: Timestamp) -> String {
    format!(r#"{{"accessTokenExpiresAt":{}}}"#, expires_at.as_millis())
}

fn expire_refresh_cookie(mock: &MockTransport) {
    mock.respond(
        Method::Post,
        REFRESH,
        401,
        r#"{"error":"Refresh token has expired"}"#,
    );
}

/// Signs in as "dean" with a token valid for `secs` more seconds.
async fn signed_in(
    mock: &MockTransport,
    gateway: &SessionGateway<MockTransport>,
    secs: u64,
) {
    mock.respond(
        Method::Post,
        LOGIN,
        200,
        r#"{"message":"Welcome back!","username":"dean","accessToken":"eyJ"}"#,
    );
    gateway
        .login("dean@college.edu", &Secret::new("pw"))
        .await
        .expect("login should succeed");

    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(secs)));
    gateway.refresh().await.expect("refresh should succeed");
    mock.reset(Method::Post, LOGIN).reset(Method::Post, REFRESH);
}

fn assert_signed_out(snapshot: &SessionSnapshot) {
    assert!(!snapshot.is_authenticated);
    assert_eq!(snapshot.username, None);
    assert_eq!(snapshot.access_token_expires_at, None);
}

// =========================================================================
// Retry on 401
// =========================================================================

#[tokio::test]
async fn test_unauthorized_request_refreshes_and_retries_once() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Get, STUDENTS, 401, "")
        .respond(Method::Get, STUDENTS, 200, r#"[{"name":"Ada"}]"#);
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)));

    let response = gateway
        .authenticated_request(ApiRequest::get(STUDENTS))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), br#"[{"name":"Ada"}]"#);
    assert_eq!(mock.calls(Method::Post, REFRESH), 1);
    assert_eq!(mock.calls(Method::Get, STUDENTS), 2);
    assert_eq!(
        gateway.snapshot().access_token_expires_at,
        Some(in_secs(900))
    );
}

#[tokio::test]
async fn test_second_unauthorized_is_returned_without_another_refresh() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Get, STUDENTS, 401, r#"{"error":"forbidden"}"#);
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)));

    let response = gateway
        .authenticated_request(ApiRequest::get(STUDENTS))
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(mock.calls(Method::Post, REFRESH), 1);
    assert_eq!(mock.calls(Method::Get, STUDENTS), 2);
}

#[tokio::test]
async fn test_non_401_status_is_returned_unchanged() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Get, STUDENTS, 500, "boom");

    let response = gateway
        .authenticated_request(ApiRequest::get(STUDENTS))
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(mock.calls(Method::Post, REFRESH), 0);
    assert_eq!(mock.calls(Method::Get, STUDENTS), 1);
}

#[tokio::test]
async fn test_transport_failure_does_not_refresh() {
    let (mock, _clock, gateway) = setup();
    mock.fail(Method::Get, STUDENTS);

    let err = gateway
        .authenticated_request(ApiRequest::get(STUDENTS))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    assert_eq!(mock.calls(Method::Post, REFRESH), 0);
}

#[tokio::test]
async fn test_requests_are_sent_with_credentials() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Get, STUDENTS, 200, "[]");

    gateway
        .authenticated_request(ApiRequest::get(STUDENTS))
        .await
        .unwrap();

    let call = &mock.recorded()[0];
    assert_eq!(
        call.request.credentials(),
        registrar_transport::Credentials::Include
    );
}

#[tokio::test]
async fn test_failed_refresh_returns_refresh_error_and_clears_session() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 600).await;
    mock.respond(Method::Get, STUDENTS, 401, "");
    expire_refresh_cookie(&mock);

    let err = gateway
        .authenticated_request(ApiRequest::get(STUDENTS))
        .await
        .unwrap_err();

    assert_eq!(err.endpoint(), Some(Endpoint::Refresh));
    assert!(err.is_unauthorized());
    assert_eq!(mock.calls(Method::Get, STUDENTS), 1, "no retry after failed refresh");
    assert_signed_out(&gateway.snapshot());
}

// =========================================================================
// Single flight
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    const CALLERS: usize = 8;
    let (mock, _clock, gateway) = setup();
    for _ in 0..CALLERS {
        mock.respond(Method::Get, STUDENTS, 401, "");
    }
    mock.respond(Method::Get, STUDENTS, 200, "[]");
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)))
        .delay(Method::Post, REFRESH, Duration::from_millis(100));

    let requests = (0..CALLERS)
        .map(|_| gateway.authenticated_request(ApiRequest::get(STUDENTS)));
    let responses = join_all(requests).await;

    assert_eq!(mock.calls(Method::Post, REFRESH), 1);
    assert_eq!(gateway.refreshes_started(), 1);
    for response in responses {
        assert_eq!(response.unwrap().status(), 200);
    }
    assert_eq!(mock.calls(Method::Get, STUDENTS), CALLERS * 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_all_fail_when_shared_refresh_fails() {
    const CALLERS: usize = 5;
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 600).await;
    mock.respond(Method::Get, STUDENTS, 401, "");
    expire_refresh_cookie(&mock);
    mock.delay(Method::Post, REFRESH, Duration::from_millis(100));

    let requests = (0..CALLERS)
        .map(|_| gateway.authenticated_request(ApiRequest::get(STUDENTS)));
    let results = join_all(requests).await;

    // One refresh from signing in, one shared by the failing batch.
    assert_eq!(mock.calls(Method::Post, REFRESH), 2);
    assert!(results.iter().all(|r| matches!(
        r,
        Err(SessionError::Rejected { endpoint: Endpoint::Refresh, status: 401, .. })
    )));
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_navigations_inside_margin_refresh_once() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 5).await;
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)))
        .delay(Method::Post, REFRESH, Duration::from_millis(100));

    let checks = (0..5).map(|_| gateway.ensure_session_fresh());
    for result in join_all(checks).await {
        result.unwrap();
    }
    // Later navigations find the token fresh.
    for _ in 0..5 {
        gateway.ensure_session_fresh().await.unwrap();
    }

    assert_eq!(mock.calls(Method::Post, REFRESH), 2, "sign-in refresh plus one");
    assert_eq!(mock.calls(Method::Get, ME), 0);
}

// =========================================================================
// Navigation freshness
// =========================================================================

#[tokio::test]
async fn test_fresh_session_makes_no_network_call() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 600).await;
    let before = mock.total_calls();

    gateway.ensure_session_fresh().await.unwrap();

    assert_eq!(mock.total_calls(), before);
}

#[tokio::test]
async fn test_expiring_session_refreshes_once_and_updates_expiry() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 5).await;
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)));

    gateway.ensure_session_fresh().await.unwrap();

    assert_eq!(mock.calls(Method::Post, REFRESH), 2);
    assert_eq!(
        gateway.snapshot().access_token_expires_at,
        Some(in_secs(900))
    );
}

#[tokio::test]
async fn test_session_goes_stale_as_clock_advances() {
    let (mock, clock, gateway) = setup();
    signed_in(&mock, &gateway, 600).await;
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(1_500)));

    clock.advance(Duration::from_secs(580));
    gateway.ensure_session_fresh().await.unwrap();

    assert_eq!(mock.calls(Method::Post, REFRESH), 2);
    assert_eq!(
        gateway.snapshot().access_token_expires_at,
        Some(in_secs(1_500))
    );
}

#[tokio::test]
async fn test_custom_margin_is_respected() {
    let mock = MockTransport::new();
    let gateway = SessionGateway::new(
        mock.clone(),
        SessionConfig::with_margin(Duration::from_secs(2)),
    )
    .with_clock(ManualClock::new(Timestamp::from_millis(NOW)));
    signed_in(&mock, &gateway, 5).await;

    gateway.ensure_session_fresh().await.unwrap();

    assert_eq!(mock.calls(Method::Post, REFRESH), 1, "5s left is outside a 2s margin");
}

#[tokio::test]
async fn test_unknown_identity_is_fetched() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)));
    mock.respond(Method::Get, ME, 200, r#"{"username":"registrar"}"#);

    gateway.ensure_session_fresh().await.unwrap();

    let snapshot = gateway.snapshot();
    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.username.unwrap().as_str(), "registrar");
    assert_eq!(snapshot.access_token_expires_at, Some(in_secs(900)));
}

#[tokio::test]
async fn test_identity_failure_clears_session() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)));
    mock.respond(Method::Get, ME, 401, r#"{"error":"Unauthorized"}"#);

    let err = gateway.ensure_session_fresh().await.unwrap_err();

    assert_eq!(err.endpoint(), Some(Endpoint::CurrentUser));
    // The 401 earns one extra refresh and one retry, no more.
    assert_eq!(mock.calls(Method::Post, REFRESH), 2);
    assert_eq!(mock.calls(Method::Get, ME), 2);
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_navigations_share_one_identity_fetch() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)))
        .delay(Method::Post, REFRESH, Duration::from_millis(100));
    mock.respond(Method::Get, ME, 200, r#"{"username":"registrar"}"#)
        .delay(Method::Get, ME, Duration::from_millis(50));

    let checks = (0..5).map(|_| gateway.ensure_session_fresh());
    for result in join_all(checks).await {
        result.unwrap();
    }

    assert_eq!(mock.calls(Method::Post, REFRESH), 1);
    assert_eq!(mock.calls(Method::Get, ME), 1);
    assert!(gateway.snapshot().is_authenticated);
}

#[tokio::test]
async fn test_refresh_failure_during_navigation_clears_session() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 5).await;
    expire_refresh_cookie(&mock);

    let err = gateway.ensure_session_fresh().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test]
async fn test_malformed_refresh_response_clears_session() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 5).await;
    mock.respond(Method::Post, REFRESH, 200, r#"{"accessTokenExpiresAt":0}"#);

    let err = gateway.ensure_session_fresh().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol { endpoint: Endpoint::Refresh, .. }
    ));
    assert_signed_out(&gateway.snapshot());
}

// =========================================================================
// Sign-in lifecycle
// =========================================================================

#[tokio::test]
async fn test_login_stores_username_and_returns_message() {
    let (mock, _clock, gateway) = setup();
    mock.respond(
        Method::Post,
        LOGIN,
        200,
        r#"{"message":"Welcome back!","username":"dean","accessToken":"eyJ"}"#,
    );

    let message = gateway
        .login("dean@college.edu", &Secret::new("pw"))
        .await
        .unwrap();

    assert_eq!(message, "Welcome back!");
    let snapshot = gateway.snapshot();
    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.access_token_expires_at, None);
}

#[tokio::test]
async fn test_rejected_login_does_not_refresh() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Post, LOGIN, 401, r#"{"error":"Invalid credentials."}"#);

    let err = gateway
        .login("dean@college.edu", &Secret::new("wrong"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(mock.calls(Method::Post, REFRESH), 0);
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test]
async fn test_signup_leaves_session_untouched() {
    let (mock, _clock, gateway) = setup();
    mock.respond(
        Method::Post,
        "/api/user/signup",
        201,
        r#"{"messageTitle":"Account created","message":"You can now log in."}"#,
    );

    let response = gateway
        .signup("dean", "dean@college.edu", &Secret::new("pw"))
        .await
        .unwrap();

    assert_eq!(response.message, "You can now log in.");
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test]
async fn test_logout_clears_session_on_success() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 600).await;
    mock.respond(
        Method::Post,
        LOGOUT,
        200,
        r#"{"messageTitle":"Logged out","message":"See you soon."}"#,
    );

    gateway.logout().await.unwrap();

    assert_signed_out(&gateway.snapshot());
}

#[tokio::test]
async fn test_logout_clears_session_when_server_errors() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 600).await;
    mock.respond(Method::Post, LOGOUT, 500, r#"{"error":"database down"}"#);

    let err = gateway.logout().await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { status: 500, .. }));
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test]
async fn test_logout_clears_session_when_unreachable() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 600).await;
    mock.fail(Method::Post, LOGOUT);

    let err = gateway.logout().await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test(start_paused = true)]
async fn test_logout_during_refresh_stays_signed_out() {
    let (mock, _clock, gateway) = setup();
    signed_in(&mock, &gateway, 5).await;
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)))
        .delay(Method::Post, REFRESH, Duration::from_millis(100));
    mock.respond(Method::Post, LOGOUT, 200, r#"{"message":"bye"}"#);

    let (refreshed, logged_out) =
        tokio::join!(gateway.refresh(), gateway.logout());

    // The refresh itself succeeded, but its result arrived after logout.
    assert_eq!(refreshed.unwrap(), in_secs(900));
    logged_out.unwrap();
    assert_signed_out(&gateway.snapshot());
}

#[tokio::test]
async fn test_bootstrap_resolves_existing_session() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Get, ME, 200, r#"{"username":"dean"}"#);

    let snapshot = gateway.bootstrap().await;

    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.username.unwrap().as_str(), "dean");
    assert_eq!(mock.calls(Method::Post, REFRESH), 0);
}

#[tokio::test]
async fn test_bootstrap_without_session_is_signed_out() {
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Get, ME, 401, r#"{"error":"Unauthorized"}"#);
    expire_refresh_cookie(&mock);

    let snapshot = gateway.bootstrap().await;

    assert_signed_out(&snapshot);
    assert_eq!(mock.calls(Method::Post, REFRESH), 1);
    assert_eq!(mock.calls(Method::Get, ME), 1, "no retry after failed refresh");
}

#[tokio::test]
async fn test_bootstrap_recovers_session_from_refresh_cookie() {
    // Access token expired while the console was closed; the refresh
    // cookie is still good.
    let (mock, _clock, gateway) = setup();
    mock.respond(Method::Get, ME, 401, r#"{"error":"Token has expired"}"#)
        .respond(Method::Get, ME, 200, r#"{"username":"dean"}"#);
    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)));

    let snapshot = gateway.bootstrap().await;

    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.username.unwrap().as_str(), "dean");
    assert_eq!(snapshot.access_token_expires_at, Some(in_secs(900)));
    assert_eq!(mock.calls(Method::Post, REFRESH), 1);
    assert_eq!(mock.calls(Method::Get, ME), 2);
}

// =========================================================================
// Observed state
// =========================================================================

#[tokio::test]
async fn test_every_observed_state_is_consistent() {
    let (mock, _clock, gateway) = setup();
    let mut watch = gateway.subscribe();
    let mut observed = vec![watch.current()];

    mock.respond(
        Method::Post,
        LOGIN,
        200,
        r#"{"username":"dean"}"#,
    );
    gateway
        .login("dean@college.edu", &Secret::new("pw"))
        .await
        .unwrap();
    observed.push(watch.changed().await.unwrap());

    mock.respond(Method::Post, REFRESH, 200, refresh_body(in_secs(900)));
    gateway.refresh().await.unwrap();
    observed.push(watch.changed().await.unwrap());

    mock.respond(Method::Post, LOGOUT, 200, r#"{"message":"bye"}"#);
    gateway.logout().await.unwrap();
    observed.push(watch.changed().await.unwrap());

    for snapshot in &observed {
        assert_eq!(snapshot.is_authenticated, snapshot.username.is_some());
    }
    assert!(observed[1].is_authenticated);
    assert_eq!(observed[2].access_token_expires_at, Some(in_secs(900)));
    assert_signed_out(&observed[3]);
}
