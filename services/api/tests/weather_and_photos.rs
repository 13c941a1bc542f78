mod common;

use common::{expect, spawn_app};
use reqwest::{multipart, StatusCode};
use serde_json::json;

#[tokio::test]
async fn weather_logs_carry_a_pressure_trend_per_location() {
    let app = spawn_app().await;
    let token = app.register("angler@example.com").await;

    for (pressure, recorded_at) in [(1008.0, "2024-05-31T06:00:00Z"), (1013.5, "2024-06-01T06:00:00Z")] {
        let body = expect(
            app.post(
                &token,
                "/weather-logs",
                json!({
                    "latitude": 32.88,
                    "longitude": -95.63,
                    "location_name": "Lake Fork",
                    "temperature": 21.0,
                    "humidity": 70,
                    "pressure": pressure,
                    "wind_speed": 3.0,
                    "wind_direction": 90,
                    "weather_main": "Clouds",
                    "recorded_at": recorded_at,
                }),
            )
            .await,
            StatusCode::CREATED,
        )
        .await;
        assert_eq!(body["message"], "Weather logged successfully");
        assert_eq!(body["weather_log"]["api_source"], "openweathermap");
    }

    let logs = expect(app.get(&token, "/weather-logs").await, StatusCode::OK).await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["pressure"], 1013.5);
    assert_eq!(logs[0]["pressure_trend"], "rising");
    assert_eq!(logs[1]["pressure_trend"], "stable");
    assert_eq!(logs[0]["is_fishing_friendly"], true);

    let filtered = expect(
        app.get(&token, "/weather-logs?location=blue%20river").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(filtered, json!([]));
}

#[tokio::test]
async fn weather_readings_are_range_checked() {
    let app = spawn_app().await;
    let token = app.register("angler@example.com").await;

    let body = expect(
        app.post(
            &token,
            "/weather-logs",
            json!({
                "latitude": 32.88,
                "longitude": -95.63,
                "location_name": "Lake Fork",
                "temperature": 75.0,
                "humidity": 120,
                "weather_main": "Clear",
            }),
        )
        .await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert!(body["errors"]["temperature"].is_array());
    assert!(body["errors"]["humidity"].is_array());
    assert!(body["errors"]["pressure"].is_array());
}

#[tokio::test]
async fn uploaded_photos_are_stored_and_cleaned_up_with_their_catch() {
    let app = spawn_app().await;
    let token = app.register("angler@example.com").await;

    let part = multipart::Part::bytes(b"\xFF\xD8\xFF\xE0 fake jpeg".to_vec())
        .file_name("bass.jpg")
        .mime_str("image/jpeg")
        .unwrap();
    let res = app
        .client
        .post(app.url("/photos"))
        .bearer_auth(&token)
        .multipart(multipart::Form::new().part("photo", part))
        .send()
        .await
        .unwrap();
    let body = expect(res, StatusCode::CREATED).await;
    let path = body["path"].as_str().unwrap().to_string();
    assert!(app.photo_dir.join(&path).exists());

    let catch = app
        .log_catch(
            &token,
            json!({
                "species": "Smallmouth Bass",
                "location": "Lake Fork",
                "caught_at": "2024-05-30T07:00:00Z",
                "photos": [path],
            }),
        )
        .await;
    assert_eq!(catch["photos"][0], path.as_str());

    let res = app
        .delete(&token, &format!("/catches/{}", catch["id"].as_str().unwrap()))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!app.photo_dir.join(&path).exists());
}

async fn upload_photo(app: &common::TestApp, token: &str) -> String {
    let part = multipart::Part::bytes(b"\xFF\xD8\xFF\xE0 fake jpeg".to_vec())
        .file_name("walleye.jpg")
        .mime_str("image/jpeg")
        .unwrap();
    let res = app
        .client
        .post(app.url("/photos"))
        .bearer_auth(token)
        .multipart(multipart::Form::new().part("photo", part))
        .send()
        .await
        .unwrap();
    let body = expect(res, StatusCode::CREATED).await;
    body["path"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn another_users_photo_cannot_be_attached_or_deleted() {
    let app = spawn_app().await;
    let owner = app.register("owner@example.com").await;
    let other = app.register("other@example.com").await;
    let path = upload_photo(&app, &owner).await;

    let body = expect(
        app.post(
            &other,
            "/catches",
            json!({
                "species": "Walleye",
                "location": "Mille Lacs",
                "caught_at": "2024-05-30T07:00:00Z",
                "photos": [path],
            }),
        )
        .await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(body["errors"]["photos.0"][0], "The selected photo is invalid.");

    let catch = app
        .log_catch(
            &other,
            json!({
                "species": "Walleye",
                "location": "Mille Lacs",
                "caught_at": "2024-05-30T07:00:00Z",
            }),
        )
        .await;
    let res = app
        .put(
            &other,
            &format!("/catches/{}", catch["id"].as_str().unwrap()),
            json!({ "photos": [path] }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.photo_dir.join(&path).exists());
}

#[tokio::test]
async fn non_image_uploads_are_rejected() {
    let app = spawn_app().await;
    let token = app.register("angler@example.com").await;

    let part = multipart::Part::bytes(b"just some notes".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let res = app
        .client
        .post(app.url("/photos"))
        .bearer_auth(&token)
        .multipart(multipart::Form::new().part("photo", part))
        .send()
        .await
        .unwrap();
    let body = expect(res, StatusCode::UNPROCESSABLE_ENTITY).await;
    assert_eq!(body["errors"]["photo"][0], "The photo field must be an image.");
}
