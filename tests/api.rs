use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::{Duration, Utc};
use http::{Request, StatusCode, header::AUTHORIZATION};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use ecosphere_server::api::server::{AppState, router};
use ecosphere_server::config::Config;
use ecosphere_server::db::memory::MemoryStore;
use ecosphere_server::db::models::challenge::NewChallenge;
use ecosphere_server::db::models::goal::NewCommunityGoal;
use ecosphere_server::db::store::Store;

const ADMIN_TOKEN: &str = "test-admin-token";

fn test_app() -> (Arc<AppState<MemoryStore>>, Router) {
    let state = Arc::new(AppState {
        store: MemoryStore::new(),
        config: Config {
            port: 0,
            database_url: String::new(),
            admin_token: ADMIN_TOKEN.into(),
        },
    });

    (state.clone(), router(state))
}

fn json_request(method: &str, uri: &str, user: Option<i64>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed_active_challenge(store: &MemoryStore, points: i64) -> i64 {
    let now = Utc::now();
    store
        .insert_challenge(&NewChallenge {
            title: "meatless monday".into(),
            description: "plant-based meals for a day".into(),
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
            points,
        })
        .await
        .unwrap()
        .id
}

async fn seed_goal(store: &MemoryStore, target: f64) -> i64 {
    let now = Utc::now();
    store
        .insert_goal(&NewCommunityGoal {
            title: "summer load shed".into(),
            description: "community kWh reduction drive".into(),
            target_energy_reduction: target,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn complete_endpoint_awards_once_and_reports_status() {
    let (state, app) = test_app();
    let challenge_id = seed_active_challenge(&state.store, 10).await;
    let uri = format!("/challenges/{challenge_id}/complete");

    let res = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(7), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Challenge completed successfully!");
    assert_eq!(body["points_awarded"], 10);

    let res = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(7), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Challenge already completed.");
    assert!(body.get("points_awarded").is_none());

    let res = app
        .oneshot(json_request("GET", "/leaderboard", None, None))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body, json!([{ "user_id": 7, "points": 10 }]));
}

#[tokio::test]
async fn completing_unknown_challenge_is_404() {
    let (_state, app) = test_app();

    let res = app
        .oneshot(json_request("POST", "/challenges/9999/complete", Some(1), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_challenge_is_400() {
    let (state, app) = test_app();
    let now = Utc::now();
    let challenge = state
        .store
        .insert_challenge(&NewChallenge {
            title: "last month's drive".into(),
            description: "over and done".into(),
            start_date: now - Duration::days(30),
            end_date: now - Duration::days(1),
            points: 10,
        })
        .await
        .unwrap();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/challenges/{}/complete", challenge.id),
            Some(1),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"], "Challenge is not active.");
}

#[tokio::test]
async fn user_routes_require_identity_header() {
    let (state, app) = test_app();
    let challenge_id = seed_active_challenge(&state.store, 5).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/challenges/{challenge_id}/complete"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Leaderboard stays public.
    let res = app
        .oneshot(json_request("GET", "/leaderboard", None, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn contribution_validation_maps_to_http_statuses() {
    let (state, app) = test_app();
    let goal_id = seed_goal(&state.store, 100.0).await;
    let uri = format!("/goals/{goal_id}/contribute");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            Some(3),
            Some(json!({ "energy_reduced": "garbage" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"], "energy_reduced must be a positive number.");

    let res = app
        .clone()
        .oneshot(json_request("POST", &uri, Some(3), Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"], "Please provide energy_reduced value.");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/goals/40400/contribute",
            Some(3),
            Some(json!({ "energy_reduced": 10 })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .oneshot(json_request(
            "POST",
            &uri,
            Some(3),
            Some(json!({ "energy_reduced": 50 })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Energy contribution updated successfully.");
}

#[tokio::test]
async fn admin_routes_enforce_the_shared_token() {
    let (_state, app) = test_app();
    let now = Utc::now();
    let payload = json!({
        "title": "no-mow may",
        "description": "let the pollinators have the lawn",
        "start_date": now,
        "end_date": now + Duration::days(31),
        "points": 15,
    });

    let res = app
        .clone()
        .oneshot(json_request("POST", "/challenges", None, Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let mut req = json_request("POST", "/challenges", None, Some(payload.clone()));
    req.headers_mut()
        .insert(AUTHORIZATION, "wrong-token".parse().unwrap());
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let mut req = json_request("POST", "/challenges", None, Some(payload));
    req.headers_mut()
        .insert(AUTHORIZATION, ADMIN_TOKEN.parse().unwrap());
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created = body_json(res).await;
    assert_eq!(created["points"], 15);

    let res = app
        .oneshot(json_request("GET", "/challenges", None, None))
        .await
        .unwrap();
    let listed = body_json(res).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_admin_payloads_are_rejected() {
    let (_state, app) = test_app();
    let now = Utc::now();

    let mut req = json_request(
        "POST",
        "/challenges",
        None,
        Some(json!({
            "title": "zero value",
            "description": "cannot award nothing",
            "start_date": now,
            "end_date": now + Duration::days(1),
            "points": 0,
        })),
    );
    req.headers_mut()
        .insert(AUTHORIZATION, ADMIN_TOKEN.parse().unwrap());
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let mut req = json_request(
        "POST",
        "/goals",
        None,
        Some(json!({
            "title": "backwards window",
            "description": "ends before it starts",
            "target_energy_reduction": 10.0,
            "start_date": now,
            "end_date": now - Duration::days(1),
        })),
    );
    req.headers_mut()
        .insert(AUTHORIZATION, ADMIN_TOKEN.parse().unwrap());
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recommendation_flow_over_http() {
    let (state, app) = test_app();

    let res = app
        .clone()
        .oneshot(json_request("GET", "/recommendations/generate", Some(11), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let recs = body_json(res).await;
    let recs = recs.as_array().unwrap();
    assert_eq!(recs.len(), 1);
    let rec_id = recs[0]["id"].as_i64().unwrap();

    // A stranger cannot mark it read.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/recommendations/{rec_id}/read"),
            Some(12),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The owner can, repeatedly.
    for _ in 0..2 {
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/recommendations/{rec_id}/read"),
                Some(11),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["message"], "Recommendation marked as read.");
    }

    let all = state.store.list_recommendations(
        ecosphere_server::db::models::UserId(11),
    )
    .await
    .unwrap();
    assert!(all.iter().all(|r| r.is_read));
}

#[tokio::test]
async fn device_and_waste_surfaces_round_trip() {
    let (_state, app) = test_app();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/devices",
            Some(21),
            Some(json!({ "device_name": "attic thermostat", "device_type": "thermostat" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let device = body_json(res).await;
    let device_id = device["id"].as_i64().unwrap();
    assert!(!device["device_identifier"].as_str().unwrap().is_empty());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/devices/{device_id}/readings"),
            Some(21),
            Some(json!({ "energy_consumed": 12.5 })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Foreign device: not found, not forbidden.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/devices/{device_id}/readings"),
            Some(22),
            Some(json!({ "energy_consumed": 1.0 })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    for quantity in [2.0, 3.5] {
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/waste",
                Some(21),
                Some(json!({ "waste_type": "plastic", "quantity": quantity })),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .oneshot(json_request("GET", "/waste/summary", Some(21), None))
        .await
        .unwrap();
    let summary = body_json(res).await;
    assert_eq!(summary, json!([{ "waste_type": "plastic", "total_quantity": 5.5 }]));
}
