mod common;

use airbear_core::repository::RideRepository;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{get, post_json, spawn_app};

#[tokio::test]
async fn test_public_listings() {
    let app = spawn_app().await;

    let (status, body) = app.send(get("/api/spots", None)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|s| s["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Cathedral of Learning", "Market Square"]);

    let (status, body) = app.send(get("/api/airbears", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["battery_level"], 90);

    let (status, _) = app.send(get(&format!("/api/airbears/{}", app.airbear.id), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(get(&format!("/api/airbears/{}", Uuid::new_v4()), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assigned_driver_reports_location() {
    let app = spawn_app().await;
    let driver = app.driver(Some(app.airbear.id)).await;

    let (status, body) = app
        .send(post_json(
            "/api/airbear/location",
            Some(driver),
            json!({
                "airbear_id": app.airbear.id,
                "latitude": 40.4443,
                "longitude": -79.9532,
                "heading": 270.0,
                "battery_level": 64,
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latitude"], 40.4443);
    assert_eq!(body["heading"], 270.0);
    assert_eq!(body["battery_level"], 64);
}

#[tokio::test]
async fn test_location_out_of_range_is_rejected() {
    let app = spawn_app().await;
    let driver = app.driver(Some(app.airbear.id)).await;

    let cases = [
        json!({ "airbear_id": app.airbear.id, "latitude": 90.5, "longitude": 0.0 }),
        json!({ "airbear_id": app.airbear.id, "latitude": -91.0, "longitude": 0.0 }),
        json!({ "airbear_id": app.airbear.id, "latitude": 0.0, "longitude": 180.1 }),
        json!({ "airbear_id": app.airbear.id, "latitude": 0.0, "longitude": -181.0 }),
        json!({ "airbear_id": app.airbear.id, "latitude": 0.0, "longitude": 0.0, "heading": 361.0 }),
        json!({ "airbear_id": app.airbear.id, "latitude": 0.0, "longitude": 0.0, "battery_level": 101 }),
        json!({ "airbear_id": app.airbear.id, "longitude": 0.0 }),
    ];

    for case in cases {
        let (status, _) = app.send(post_json("/api/airbear/location", Some(driver), case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", case);
    }

    // boundaries are inclusive
    let (status, _) = app
        .send(post_json(
            "/api/airbear/location",
            Some(driver),
            json!({ "airbear_id": app.airbear.id, "latitude": -90.0, "longitude": 180.0 }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_location_requires_assignment() {
    let app = spawn_app().await;
    let body = json!({ "airbear_id": app.airbear.id, "latitude": 40.0, "longitude": -79.0 });

    let rider = app.rider().await;
    let (status, _) = app.send(post_json("/api/airbear/location", Some(rider), body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let unassigned = app.driver(Some(Uuid::new_v4())).await;
    let (status, _) = app.send(post_json("/api/airbear/location", Some(unassigned), body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(post_json("/api/airbear/location", None, body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_toggle() {
    let app = spawn_app().await;
    let driver = app.driver(Some(app.airbear.id)).await;

    let (status, body) = app
        .send(post_json(
            "/api/airbear/status",
            Some(driver),
            json!({ "airbear_id": app.airbear.id, "is_charging": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_charging"], true);
    assert_eq!(body["is_available"], true);

    // a charging AirBear is not handed to new rides
    let ride = app.book(app.rider().await).await;
    let ride = app.store.get_ride(ride).await.unwrap().unwrap();
    assert_eq!(ride.airbear_id, None);

    let (status, _) = app
        .send(post_json("/api/airbear/status", Some(driver), json!({ "airbear_id": app.airbear.id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
