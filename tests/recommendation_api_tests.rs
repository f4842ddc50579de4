// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation request API tests.

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

mod common;

fn request_body(deadline: DateTime<Utc>) -> Value {
    json!({
        "student_name": "Sam Student",
        "recommender": {
            "name": "Dr. Rivera",
            "email": "rivera@example.edu",
            "title": "Professor of Physics"
        },
        "purpose": "Gates Scholarship",
        "message": "Thank you for considering this!",
        "deadline": deadline,
    })
}

async fn create(app: &axum::Router, token: &str, deadline: DateTime<Utc>) -> Value {
    let (status, body) = common::send(
        app,
        "POST",
        "/api/recommendations",
        Some(token),
        Some(request_body(deadline)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn test_create_sends_initial_email_and_schedules() {
    let (app, state) = common::create_test_app();
    let token = common::token_for(&state, "student-1");
    let deadline = Utc::now() + Duration::days(14);

    let request = create(&app, &token, deadline).await;

    assert_eq!(request["student_id"], "student-1");
    // Initial email went out through the log notifier
    assert_eq!(request["status"], "sent");
    assert_eq!(request["reminders_sent"], 0);
    assert_eq!(request["reminder_intervals"], json!([7, 3, 1]));
    assert_eq!(request["urgency"], "low");

    let next: DateTime<Utc> = serde_json::from_value(request["next_reminder_date"].clone()).unwrap();
    assert_eq!(next, deadline - Duration::days(7));

    let stored = state
        .db
        .get_request(request["id"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.next_reminder_date, Some(next));
}

#[tokio::test]
async fn test_create_validation() {
    let (app, state) = common::create_test_app();
    let token = common::token_for(&state, "student-1");
    let future = Utc::now() + Duration::days(14);

    let mut past = request_body(Utc::now() - Duration::days(1));
    past["purpose"] = json!("Late scholarship");

    let mut bad_email = request_body(future);
    bad_email["recommender"]["email"] = json!("not-an-email");

    let mut zero_interval = request_body(future);
    zero_interval["reminder_intervals"] = json!([3, 0]);

    let mut huge_interval = request_body(future);
    huge_interval["reminder_intervals"] = json!([4_000_000_000u32]);

    let mut no_purpose = request_body(future);
    no_purpose["purpose"] = json!("");

    for body in [past, bad_email, zero_interval, huge_interval, no_purpose] {
        let (status, err) = common::send(
            &app,
            "POST",
            "/api/recommendations",
            Some(&token),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(err["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_custom_intervals_are_normalized() {
    let (app, state) = common::create_test_app();
    let token = common::token_for(&state, "student-1");

    let mut body = request_body(Utc::now() + Duration::days(30));
    body["reminder_intervals"] = json!([2, 14, 2]);

    let (status, request) =
        common::send(&app, "POST", "/api/recommendations", Some(&token), Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["reminder_intervals"], json!([14, 2]));
}

#[tokio::test]
async fn test_list_only_own_requests_soonest_first() {
    let (app, state) = common::create_test_app();
    let sam = common::token_for(&state, "sam");
    let alex = common::token_for(&state, "alex");

    let later = create(&app, &sam, Utc::now() + Duration::days(20)).await;
    let sooner = create(&app, &sam, Utc::now() + Duration::days(5)).await;
    create(&app, &alex, Utc::now() + Duration::days(10)).await;

    let (status, list) = common::send(&app, "GET", "/api/recommendations", Some(&sam), None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![sooner["id"].as_str().unwrap(), later["id"].as_str().unwrap()]
    );
}

#[tokio::test]
async fn test_other_students_requests_are_hidden() {
    let (app, state) = common::create_test_app();
    let sam = common::token_for(&state, "sam");
    let alex = common::token_for(&state, "alex");
    let request = create(&app, &sam, Utc::now() + Duration::days(10)).await;
    let id = request["id"].as_str().unwrap();

    let (status, _) = common::send(
        &app,
        "GET",
        &format!("/api/recommendations/{}", id),
        Some(&alex),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(
        &app,
        "POST",
        &format!("/api/recommendations/{}/cancel", id),
        Some(&alex),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, fetched) = common::send(
        &app,
        "GET",
        &format!("/api/recommendations/{}", id),
        Some(&sam),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "sent");
}

#[tokio::test]
async fn test_received_is_terminal() {
    let (app, state) = common::create_test_app();
    let token = common::token_for(&state, "sam");
    let request = create(&app, &token, Utc::now() + Duration::days(10)).await;
    let id = request["id"].as_str().unwrap();

    let (status, received) = common::send(
        &app,
        "POST",
        &format!("/api/recommendations/{}/received", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(received["status"], "received");
    assert!(received["received_at"].is_string());
    assert!(received["next_reminder_date"].is_null());

    let (status, err) = common::send(
        &app,
        "POST",
        &format!("/api/recommendations/{}/cancel", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "conflict");
}

#[tokio::test]
async fn test_cancel_stops_reminders() {
    let (app, state) = common::create_test_app();
    let token = common::token_for(&state, "sam");
    let request = create(&app, &token, Utc::now() + Duration::days(2)).await;
    let id = request["id"].as_str().unwrap();
    assert_eq!(request["urgency"], "high");

    let (status, cancelled) = common::send(
        &app,
        "POST",
        &format!("/api/recommendations/{}/cancel", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let active = state.db.list_active_requests(100).await.unwrap();
    assert!(active.is_empty());
}
