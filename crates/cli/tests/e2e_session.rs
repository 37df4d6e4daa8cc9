//! End-to-end: a demo session driven through a full day and nightfall, with
//! the liveness endpoint reading the same status channel.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use steadyhand_agent::SessionManager;
use steadyhand_config::AppConfig;
use steadyhand_core::MovementProfile;
use steadyhand_gateway::{GatewayState, build_router};
use steadyhand_sim::{ConnectScript, SimConnector};

#[tokio::test(start_paused = true)]
async fn demo_session_eats_rests_and_fights() {
    let mut config = AppConfig::default();
    config.behavior.confinement.enabled = true;
    config.behavior.confinement.x = 0.5;
    config.behavior.confinement.y = 64.0;
    config.behavior.confinement.z = 0.5;
    config.behavior.confinement.radius = 3.0;
    // The zombie only stays three seconds; check on it while asleep.
    config.rest.sleeping_recheck_ms = 1_000;

    let connector = Arc::new(SimConnector::demo());
    let manager = SessionManager::new(connector.clone(), config)
        .unwrap()
        .with_seed(42);
    let mut status = manager.subscribe();
    let app = build_router(Arc::new(GatewayState::new(manager.subscribe())));

    let checker = async move {
        status.wait_for(|s| s.spawned).await.unwrap();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["session"]["state"], "connected");
        assert_eq!(json["session"]["spawned"], true);
        assert_eq!(json["session"]["consecutive_failures"], 0);
    };

    let (end, ()) = tokio::join!(
        manager.run_until(tokio::time::sleep(Duration::from_secs(120))),
        checker
    );
    assert!(end.is_none(), "the demo session never ends on its own");

    let sessions = connector.sessions();
    assert_eq!(sessions.len(), 1);
    let world = &sessions[0].world;

    assert_eq!(world.profile(), Some(MovementProfile::safe()));
    assert!(world.count("consume") >= 1, "food starts below the threshold");
    assert!(world.count("sleep") >= 1, "night falls at 90s");
    assert!(world.count("attack") >= 1, "a zombie visits after nightfall");
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_spawn_leaves_no_session_tasks() {
    let connector = Arc::new(SimConnector::demo());
    let manager = SessionManager::new(connector.clone(), AppConfig::default()).unwrap();

    // The demo spawn arrives 500ms after connect.
    let end = manager
        .run_until(tokio::time::sleep(Duration::from_millis(100)))
        .await;
    assert!(end.is_none());

    tokio::time::sleep(Duration::from_secs(30)).await;
    let sessions = connector.sessions();
    let world = &sessions[0].world;
    assert_eq!(world.profile(), None);
    assert_eq!(world.count("consume"), 0);
}

#[tokio::test(start_paused = true)]
async fn health_reports_disconnected_once_reconnect_gives_up() {
    let mut config = AppConfig::default();
    config.reconnect.enabled = false;
    let connector = Arc::new(SimConnector::new(vec![ConnectScript::Refuse(
        "ECONNREFUSED".into(),
    )]));
    let manager = SessionManager::new(connector.clone(), config).unwrap();
    let app = build_router(Arc::new(GatewayState::new(manager.subscribe())));

    let end = manager
        .run_until(tokio::time::sleep(Duration::from_secs(60)))
        .await;
    assert!(end.is_some(), "the manager returns after the refused connect");
    assert_eq!(connector.attempts(), 1);

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["session"]["state"], "disconnected");
    assert_eq!(json["session"]["spawned"], false);
    assert_eq!(json["session"]["consecutive_failures"], 1);
    assert!(json["session"]["reconnect_in_ms"].is_null());
}
