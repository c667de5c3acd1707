use chrono::{Duration, Utc};
use serde_json::json;

use ecosphere_server::db::memory::MemoryStore;
use ecosphere_server::db::models::UserId;
use ecosphere_server::db::models::challenge::{CompletionStatus, NewChallenge};
use ecosphere_server::db::models::energy::DeviceType;
use ecosphere_server::db::models::goal::NewCommunityGoal;
use ecosphere_server::db::models::recommendation::{
    GOAL_PROGRESS_TEXT, HIGH_USAGE_TEXT, THERMOSTAT_MISSING_TEXT, THERMOSTAT_OWNED_TEXT,
};
use ecosphere_server::db::store::Store;
use ecosphere_server::error::AppError;
use ecosphere_server::service::{challenges, goals, recommendations};

fn test_user() -> UserId {
    UserId(rand::random_range(100_000_000..=999_999_999))
}

fn active_challenge(points: i64) -> NewChallenge {
    let now = Utc::now();
    NewChallenge {
        title: "bring your own cup".into(),
        description: "skip disposable cups for a week".into(),
        start_date: now - Duration::hours(1),
        end_date: now + Duration::hours(1),
        points,
    }
}

fn goal_with_target(target: f64) -> NewCommunityGoal {
    let now = Utc::now();
    NewCommunityGoal {
        title: "neighborhood kWh diet".into(),
        description: "shave the block's summer consumption".into(),
        target_energy_reduction: target,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(30),
    }
}

#[tokio::test]
async fn completing_a_challenge_twice_awards_points_once() {
    let store = MemoryStore::new();
    let user = test_user();
    let challenge = store.insert_challenge(&active_challenge(10)).await.unwrap();

    let first = challenges::complete_challenge(&store, user, challenge.id)
        .await
        .unwrap();
    assert!(matches!(
        first,
        CompletionStatus::Completed { points_awarded: 10, total: 10 }
    ));

    let entry = store.leaderboard_entry(user).await.unwrap().unwrap();
    assert_eq!(entry.points, 10);

    let second = challenges::complete_challenge(&store, user, challenge.id)
        .await
        .unwrap();
    assert_eq!(second, CompletionStatus::AlreadyCompleted);

    let entry = store.leaderboard_entry(user).await.unwrap().unwrap();
    assert_eq!(entry.points, 10);
}

#[tokio::test]
async fn inactive_challenge_leaves_leaderboard_untouched() {
    let store = MemoryStore::new();
    let user = test_user();
    let now = Utc::now();

    let expired = store
        .insert_challenge(&NewChallenge {
            end_date: now - Duration::hours(1),
            start_date: now - Duration::days(2),
            ..active_challenge(25)
        })
        .await
        .unwrap();

    let err = challenges::complete_challenge(&store, user, expired.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let upcoming = store
        .insert_challenge(&NewChallenge {
            start_date: now + Duration::hours(1),
            end_date: now + Duration::days(2),
            ..active_challenge(25)
        })
        .await
        .unwrap();

    let err = challenges::complete_challenge(&store, user, upcoming.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    assert!(store.leaderboard_entry(user).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_challenge_is_not_found() {
    let store = MemoryStore::new();

    let err = challenges::complete_challenge(&store, test_user(), 424242)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn window_bounds_are_inclusive() {
    let store = MemoryStore::new();
    let now = Utc::now();

    // end_date far enough out that "now" inside the handler still falls
    // within the window; the boundary itself is covered by is_active_at.
    let challenge = store
        .insert_challenge(&NewChallenge {
            start_date: now,
            end_date: now + Duration::hours(1),
            ..active_challenge(5)
        })
        .await
        .unwrap();
    assert!(challenge.is_active_at(challenge.start_date));
    assert!(challenge.is_active_at(challenge.end_date));
    assert!(!challenge.is_active_at(challenge.end_date + Duration::milliseconds(1)));
}

#[tokio::test]
async fn leaderboard_ranks_by_points_descending() {
    let store = MemoryStore::new();
    let (alpha, beta, gamma) = (test_user(), test_user(), test_user());

    for (user, points) in [(alpha, 10), (beta, 30), (gamma, 20)] {
        let challenge = store.insert_challenge(&active_challenge(points)).await.unwrap();
        challenges::complete_challenge(&store, user, challenge.id)
            .await
            .unwrap();
    }

    let top = challenges::top_leaderboard(&store, 10).await.unwrap();
    let totals: Vec<i64> = top.iter().map(|e| e.points).collect();
    assert_eq!(totals, vec![30, 20, 10]);

    let top_two = challenges::top_leaderboard(&store, 2).await.unwrap();
    assert_eq!(top_two.len(), 2);
    assert_eq!(top_two[0].user_id, beta);
}

#[tokio::test]
async fn contributions_accumulate_in_both_aggregates() {
    let store = MemoryStore::new();
    let user = test_user();
    let goal = store.insert_goal(&goal_with_target(1000.0)).await.unwrap();

    goals::contribute_to_goal(&store, user, goal.id, Some(&json!(30.0)))
        .await
        .unwrap();
    let summary = goals::contribute_to_goal(&store, user, goal.id, Some(&json!(20.0)))
        .await
        .unwrap();

    assert_eq!(summary.energy_contributed, 50.0);
    assert_eq!(summary.current_progress, 50.0);

    let refreshed = store.get_goal(goal.id).await.unwrap().unwrap();
    assert_eq!(refreshed.current_progress, 50.0);

    let contributions = store.user_contributions(user).await.unwrap();
    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].energy_contributed, 50.0);
}

#[tokio::test]
async fn bad_amounts_are_rejected_without_mutation() {
    let store = MemoryStore::new();
    let user = test_user();
    let goal = store.insert_goal(&goal_with_target(100.0)).await.unwrap();

    for raw in [
        None,
        Some(json!(0)),
        Some(json!(-4.2)),
        Some(json!("not a number")),
        Some(json!(true)),
        Some(json!(null)),
    ] {
        let err = goals::contribute_to_goal(&store, user, goal.id, raw.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)), "raw = {raw:?}");
    }

    let refreshed = store.get_goal(goal.id).await.unwrap().unwrap();
    assert_eq!(refreshed.current_progress, 0.0);
    assert!(store.user_contributions(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn numeric_strings_are_accepted() {
    let store = MemoryStore::new();
    let user = test_user();
    let goal = store.insert_goal(&goal_with_target(1000.0)).await.unwrap();

    let summary = goals::contribute_to_goal(&store, user, goal.id, Some(&json!("25.5")))
        .await
        .unwrap();
    assert_eq!(summary.energy_contributed, 25.5);
}

#[tokio::test]
async fn unknown_goal_wins_over_bad_amount() {
    let store = MemoryStore::new();

    let err = goals::contribute_to_goal(&store, test_user(), 99, Some(&json!("junk")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn threshold_congratulation_fires_on_every_crossing_call() {
    let store = MemoryStore::new();
    let user = test_user();
    let goal = store.insert_goal(&goal_with_target(100.0)).await.unwrap();

    // 80 >= 75% of 100: first congratulation.
    goals::contribute_to_goal(&store, user, goal.id, Some(&json!(80.0)))
        .await
        .unwrap();
    let recs = store.unread_recommendations(user).await.unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].text, GOAL_PROGRESS_TEXT);

    // Progress keeps rising past the target; no already-notified guard.
    goals::contribute_to_goal(&store, user, goal.id, Some(&json!(80.0)))
        .await
        .unwrap();
    let recs = store.unread_recommendations(user).await.unwrap();
    assert_eq!(recs.len(), 2);

    let refreshed = store.get_goal(goal.id).await.unwrap().unwrap();
    assert_eq!(refreshed.current_progress, 160.0);
}

#[tokio::test]
async fn below_threshold_contribution_stays_silent() {
    let store = MemoryStore::new();
    let user = test_user();
    let goal = store.insert_goal(&goal_with_target(100.0)).await.unwrap();

    goals::contribute_to_goal(&store, user, goal.id, Some(&json!(10.0)))
        .await
        .unwrap();
    assert!(store.unread_recommendations(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn generate_always_emits_exactly_one_thermostat_line() {
    let store = MemoryStore::new();
    let user = test_user();

    // No devices at all: only the install suggestion.
    let recs = recommendations::generate_recommendations(&store, user)
        .await
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].text, THERMOSTAT_MISSING_TEXT);

    // Once a thermostat exists the optimize line replaces it.
    store
        .insert_device(user, "hallway", DeviceType::Thermostat, "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap();
    let recs = recommendations::generate_recommendations(&store, user)
        .await
        .unwrap();
    let optimize_count = recs
        .iter()
        .filter(|r| r.text == THERMOSTAT_OWNED_TEXT)
        .count();
    assert_eq!(optimize_count, 1);
    assert!(!recs.iter().any(|r| r.text == HIGH_USAGE_TEXT));
}

#[tokio::test]
async fn generate_flags_high_usage_and_accumulates_duplicates() {
    let store = MemoryStore::new();
    let user = test_user();

    let device = store
        .insert_device(user, "heat pump", DeviceType::Thermostat, "11:22:33:44:55:66")
        .await
        .unwrap();
    store
        .insert_reading(user, device.id, 60.0, Utc::now())
        .await
        .unwrap()
        .unwrap();
    store
        .insert_reading(user, device.id, 55.0, Utc::now())
        .await
        .unwrap()
        .unwrap();

    let recs = recommendations::generate_recommendations(&store, user)
        .await
        .unwrap();
    assert_eq!(recs.len(), 2);
    assert!(recs.iter().any(|r| r.text == HIGH_USAGE_TEXT));
    assert!(recs.iter().any(|r| r.text == THERMOSTAT_OWNED_TEXT));

    // Second run: no de-duplication, unread rows pile up.
    let recs = recommendations::generate_recommendations(&store, user)
        .await
        .unwrap();
    assert_eq!(recs.len(), 4);
    assert_eq!(
        recs.iter().filter(|r| r.text == HIGH_USAGE_TEXT).count(),
        2
    );
}

#[tokio::test]
async fn exactly_100_total_is_not_high_usage() {
    let store = MemoryStore::new();
    let user = test_user();

    let device = store
        .insert_device(user, "dryer plug", DeviceType::Plug, "plug-01")
        .await
        .unwrap();
    store
        .insert_reading(user, device.id, 100.0, Utc::now())
        .await
        .unwrap()
        .unwrap();

    let recs = recommendations::generate_recommendations(&store, user)
        .await
        .unwrap();
    assert!(!recs.iter().any(|r| r.text == HIGH_USAGE_TEXT));
}

#[tokio::test]
async fn mark_read_is_owner_scoped_and_idempotent() {
    let store = MemoryStore::new();
    let (owner, stranger) = (test_user(), test_user());

    let rec = store
        .insert_recommendation(owner, "turn the lights off")
        .await
        .unwrap();

    let err = recommendations::mark_read(&store, stranger, rec.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    recommendations::mark_read(&store, owner, rec.id).await.unwrap();
    recommendations::mark_read(&store, owner, rec.id).await.unwrap();

    let all = store.list_recommendations(owner).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_read);
    assert!(store.unread_recommendations(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn readings_against_foreign_devices_are_rejected() {
    let store = MemoryStore::new();
    let (owner, stranger) = (test_user(), test_user());

    let device = store
        .insert_device(owner, "porch light", DeviceType::Light, "light-7")
        .await
        .unwrap();

    let rejected = store
        .insert_reading(stranger, device.id, 1.5, Utc::now())
        .await
        .unwrap();
    assert!(rejected.is_none());
    assert!(store.user_readings(owner).await.unwrap().is_empty());
}
