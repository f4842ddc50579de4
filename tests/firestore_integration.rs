// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set); they are skipped otherwise.

use chrono::{DateTime, Duration, TimeZone, Utc};
use squad_tracker::error::AppError;
use squad_tracker::models::{
    GoalType, NewGoal, NewRecommendationRequest, RecommendationRequest, Recommender,
    RequestStatus, Squad, Timeframe,
};

mod common;
use common::test_db;

/// Unique user ID so runs against a shared emulator don't collide.
fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

// ═══════════════════════════════════════════════════════════════════════════
// SQUAD TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_squad_round_trip_with_progress() {
    require_emulator!();
    let db = test_db().await;
    let now = Utc::now();
    let creator = unique_user("creator");

    let mut squad = Squad::new("Emulator squad", None, &creator, None, now);
    let goal_id = squad
        .add_goal(
            NewGoal {
                title: "Peer reviews".to_string(),
                description: None,
                goal_type: GoalType::PeerReviewsProvided,
                target: 10,
                individual_target: Some(5),
                timeframe: Timeframe::Weekly,
                start_date: now,
                end_date: None,
                created_by: creator.clone(),
            },
            now,
        )
        .unwrap()
        .id
        .clone();
    db.upsert_squad(&squad).await.unwrap();

    let current = db
        .update_squad_atomic(&squad.id, |s| {
            Ok(s.record_progress(&goal_id, &creator, 4, now)?
                .current_progress())
        })
        .await
        .unwrap();
    assert_eq!(current, 4);

    let stored = db.get_squad(&squad.id).await.unwrap().unwrap();
    let goal = stored.goal(&goal_id).unwrap();
    assert_eq!(goal.progress_percentage(), 40);
    assert_eq!(goal.member(&creator).unwrap().percentage(), 80);
}

#[tokio::test]
async fn test_failed_mutation_is_not_persisted() {
    require_emulator!();
    let db = test_db().await;
    let creator = unique_user("creator");
    let squad = Squad::new("Rollback squad", None, &creator, Some(2), Utc::now());
    db.upsert_squad(&squad).await.unwrap();

    let result: Result<(), AppError> = db
        .update_squad_atomic(&squad.id, |s| {
            s.join("someone", Utc::now())?;
            Err(AppError::BadRequest("abort".to_string()))
        })
        .await;
    assert!(result.is_err());

    let stored = db.get_squad(&squad.id).await.unwrap().unwrap();
    assert_eq!(stored.members.len(), 1);
}

#[tokio::test]
async fn test_concurrent_joins_are_all_kept() {
    require_emulator!();
    let db = test_db().await;
    let creator = unique_user("creator");
    let squad = Squad::new("Busy squad", None, &creator, None, Utc::now());
    db.upsert_squad(&squad).await.unwrap();

    let joiners = [unique_user("joiner"), unique_user("joiner")];
    let handles: Vec<_> = joiners
        .iter()
        .cloned()
        .map(|user| {
            let db = db.clone();
            let squad_id = squad.id.clone();
            tokio::spawn(async move {
                db.update_squad_atomic(&squad_id, |s| {
                    s.join(&user, Utc::now())?;
                    Ok(())
                })
                .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = db.get_squad(&squad.id).await.unwrap().unwrap();
    assert_eq!(stored.members.len(), 3);
    for user in &joiners {
        assert!(stored.is_member(user));
    }
}

#[tokio::test]
async fn test_update_missing_squad_not_found() {
    require_emulator!();
    let db = test_db().await;

    let result = db
        .update_squad_atomic(&unique_user("missing"), |_| Ok(()))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// RECOMMENDATION REQUEST TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_requests_listed_by_student_and_status() {
    require_emulator!();
    let db = test_db().await;
    let now = Utc::now();
    let student = unique_user("student");

    let make = |days: i64| {
        RecommendationRequest::new(
            NewRecommendationRequest {
                student_id: student.clone(),
                student_name: "Emulator Student".to_string(),
                recommender: Recommender {
                    name: "Dr. Rivera".to_string(),
                    email: "rivera@example.edu".to_string(),
                    title: None,
                },
                purpose: "Integration".to_string(),
                message: None,
                deadline: now + Duration::days(days),
                reminder_intervals: None,
            },
            now,
        )
        .unwrap()
    };

    let open = make(3);
    let mut done = make(1);
    done.set_status(RequestStatus::Received, now).unwrap();
    db.upsert_request(&open).await.unwrap();
    db.upsert_request(&done).await.unwrap();

    let mine = db.list_requests_for_student(&student).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, done.id);

    let active = db.list_active_requests(1000).await.unwrap();
    assert!(active.iter().any(|r| r.id == open.id));
    assert!(active.iter().all(|r| r.id != done.id));

    let fetched = db.get_request(&open.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RequestStatus::Pending);
    assert_eq!(fetched.reminder_intervals, vec![7, 3, 1]);
}

#[tokio::test]
async fn test_active_requests_limit_keeps_soonest_deadlines() {
    require_emulator!();
    let db = test_db().await;
    let now = Utc::now();
    let student = unique_user("student");

    // Earlier than anything a previous run left behind.
    let base: DateTime<Utc> =
        Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap() - Duration::seconds(now.timestamp());

    let mut requests = Vec::new();
    // Written latest deadline first so storage order differs from deadline order.
    for days in [2, 0, 1] {
        let mut request = RecommendationRequest::new(
            NewRecommendationRequest {
                student_id: student.clone(),
                student_name: "Emulator Student".to_string(),
                recommender: Recommender {
                    name: "Dr. Rivera".to_string(),
                    email: "rivera@example.edu".to_string(),
                    title: None,
                },
                purpose: "Ordering".to_string(),
                message: None,
                deadline: now + Duration::days(30),
                reminder_intervals: None,
            },
            now,
        )
        .unwrap();
        request.deadline = base + Duration::days(days);
        db.upsert_request(&request).await.unwrap();
        requests.push(request);
    }

    let active = db.list_active_requests(2).await.unwrap();
    let ids: Vec<&str> = active.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![requests[1].id.as_str(), requests[2].id.as_str()]);

    for mut request in requests {
        request.set_status(RequestStatus::Cancelled, now).unwrap();
        db.upsert_request(&request).await.unwrap();
    }
}
