//! Feedback collector tests against a real SQLite file

use chrono::{Duration, Utc};
use devguide_persistence::FeedbackCollector;
use devguide_types::{FeedbackFilter, RecordCall};
use serde_json::json;
use std::sync::Arc;

async fn collector(dir: &tempfile::TempDir) -> FeedbackCollector {
    let path = dir.path().join("feedback.db");
    FeedbackCollector::new(path.to_str().unwrap())
        .await
        .expect("Failed to open feedback database")
}

#[tokio::test]
async fn test_record_and_query() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = collector(&dir).await;

    feedback
        .record(
            RecordCall::new("get_coding_rules", json!({}))
                .with_response(1200, 300)
                .with_elapsed_ms(1.5),
        )
        .await;
    feedback
        .record(
            RecordCall::new("get_custom_guidance", json!({"query": "testing"}))
                .failed("API timeout")
                .with_metadata(json!({"model": "gpt-4o-mini"})),
        )
        .await;

    let all = feedback.query(&FeedbackFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].operation, "get_coding_rules");
    assert_eq!(all[0].tokens, 300);
    assert!(all[0].success);

    let failures = feedback
        .query(&FeedbackFilter::default().success(false))
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error.as_deref(), Some("API timeout"));
    assert_eq!(failures[0].arguments, json!({"query": "testing"}));
    assert_eq!(failures[0].metadata["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn test_filters_combine() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = collector(&dir).await;

    for _ in 0..3 {
        feedback
            .record(RecordCall::new("get_development_skills", json!({})))
            .await;
    }
    feedback
        .record(RecordCall::new("get_steering_instructions", json!({})))
        .await;

    let skills = feedback
        .query(
            &FeedbackFilter::default()
                .operation("get_development_skills")
                .success(true),
        )
        .await
        .unwrap();
    assert_eq!(skills.len(), 3);

    let future = feedback
        .query(&FeedbackFilter::default().since(Utc::now() + Duration::hours(1)))
        .await
        .unwrap();
    assert!(future.is_empty());

    let limited = feedback
        .query(&FeedbackFilter::default().limit(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_summary_aggregates_by_operation() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = collector(&dir).await;

    feedback
        .record(RecordCall::new("get_coding_rules", json!({})).with_response(400, 100))
        .await;
    feedback
        .record(RecordCall::new("get_coding_rules", json!({})).with_response(400, 100))
        .await;
    feedback
        .record(RecordCall::new("get_custom_guidance", json!({})).failed("boom"))
        .await;

    let summary = feedback.summary(7).await.unwrap();
    assert_eq!(summary.period_days, 7);
    assert_eq!(summary.total_calls, 3);
    assert_eq!(summary.successful_calls, 2);
    assert_eq!(summary.total_tokens, 200);
    assert_eq!(summary.tool_usage["get_coding_rules"], 2);
    assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_summary() {
    let dir = tempfile::tempdir().unwrap();
    let summary = collector(&dir).await.summary(30).await.unwrap();
    assert_eq!(summary.total_calls, 0);
    assert_eq!(summary.success_rate, 0.0);
    assert!(summary.tool_usage.is_empty());
}

#[tokio::test]
async fn test_summary_over_huge_window_covers_everything() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = collector(&dir).await;
    feedback
        .record(RecordCall::new("get_coding_rules", json!({})).with_response(40, 10))
        .await;

    for days in [1_000_000_000, i64::MAX] {
        let summary = feedback.summary(days).await.unwrap();
        assert_eq!(summary.period_days, days);
        assert_eq!(summary.total_calls, 1);
        assert_eq!(summary.tool_usage["get_coding_rules"], 1);
    }
}

#[tokio::test]
async fn test_user_feedback_rating_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = collector(&dir).await;

    feedback
        .record_user_feedback("get_coding_rules", 9, Some("very useful"), Some(true))
        .await;
    feedback
        .record_user_feedback("get_development_skills", 0, None, None)
        .await;

    let rules = feedback
        .user_feedback(Some("get_coding_rules"))
        .await
        .unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].rating, 5);
    assert_eq!(rules[0].helpful, Some(true));

    let all = feedback.user_feedback(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].rating, 1);
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let feedback = collector(&dir).await;
        feedback
            .record(RecordCall::new("get_coding_rules", json!({})))
            .await;
        feedback.close().await;
    }

    let reopened = collector(&dir).await;
    reopened
        .record(RecordCall::new("get_coding_rules", json!({})))
        .await;
    let all = reopened.query(&FeedbackFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_ne!(all[0].id, all[1].id);
}

#[tokio::test]
async fn test_record_after_close_does_not_fail() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = collector(&dir).await;
    feedback.close().await;

    // dropped with a warning
    feedback
        .record(RecordCall::new("get_coding_rules", json!({})))
        .await;
    assert!(feedback.query(&FeedbackFilter::default()).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_are_all_kept() {
    let dir = tempfile::tempdir().unwrap();
    let feedback = Arc::new(collector(&dir).await);

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let feedback = Arc::clone(&feedback);
            tokio::spawn(async move {
                feedback
                    .record(RecordCall::new("get_coding_rules", json!({ "call": i })))
                    .await;
            })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        task.unwrap();
    }

    let all = feedback.query(&FeedbackFilter::default()).await.unwrap();
    assert_eq!(all.len(), 50);
}
