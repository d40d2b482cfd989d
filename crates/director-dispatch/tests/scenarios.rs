// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end routing scenarios through the dispatcher.

use std::sync::Arc;

use director_core::{
    DirectorError, EventKind, FailureKind, FallbackReason, JobStatus, QualityTier, ReasonCode,
    WorkerProfile,
};
use director_dispatch::CompletionOutcome;
use director_test_utils::{DEFAULT_POOL, TestHarness};

async fn image_harness(available: u64) -> TestHarness {
    TestHarness::builder()
        .with_image_tiers()
        .with_available(DEFAULT_POOL, available)
        .build()
        .await
}

#[tokio::test]
async fn high_request_with_ten_free_lands_on_standard() {
    let harness = image_harness(10).await;
    let job = harness.submit("create_image", QualityTier::High).await;

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.resolved_tier, Some(QualityTier::Standard));
    assert_eq!(job.fallback_reason, Some(FallbackReason::InsufficientResources));
    assert_eq!(harness.backend.backend_for(job.id).await.as_deref(), Some("sdxl"));

    let events = harness.transport.events_for(job.id).await;
    assert_eq!(events[0].kind, EventKind::Downgraded);
    assert_eq!(events[0].reason_code, ReasonCode::ReducedQuality);
    assert_eq!(
        events[0].message,
        "Generated at reduced quality due to high demand"
    );
    assert_eq!(events[1].kind, EventKind::Queued);
}

#[tokio::test]
async fn high_request_with_twenty_free_is_served_as_asked() {
    let harness = image_harness(20).await;
    let job = harness.submit("create_image", QualityTier::High).await;

    assert_eq!(job.resolved_tier, Some(QualityTier::High));
    assert_eq!(job.fallback_reason, None);
    assert_eq!(
        harness.transport.kinds_for(job.id).await,
        [EventKind::Queued]
    );
}

#[tokio::test]
async fn low_request_with_two_free_is_exhausted() {
    let harness = image_harness(2).await;
    let job = harness.submit("create_image", QualityTier::Low).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.failure.as_ref().map(|f| f.kind),
        Some(FailureKind::ResourceExhausted)
    );
    assert!(harness.backend.executions().await.is_empty());
    let events = harness.transport.events_for(job.id).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason_code, ReasonCode::CapacityUnavailable);
}

#[tokio::test]
async fn unregistered_capability_is_unsupported() {
    let harness = image_harness(100).await;
    let job = harness.submit("create_audio", QualityTier::Low).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.failure.as_ref().map(|f| f.kind),
        Some(FailureKind::UnsupportedCapability)
    );
}

#[tokio::test]
async fn cancelled_job_ignores_late_completion() {
    let harness = image_harness(20).await;
    let job = harness.submit("create_image", QualityTier::Standard).await;

    let cancelled = harness.dispatcher.cancel(job.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    let outcome = harness
        .dispatcher
        .on_backend_complete(job.id, Ok(()))
        .await
        .unwrap();
    assert_eq!(outcome, CompletionOutcome::Ignored);

    let after = harness.dispatcher.get(job.id).unwrap();
    assert_eq!(after.status, JobStatus::Cancelled);
    assert_eq!(after.finished_at, cancelled.finished_at);
    assert_eq!(harness.backend.cancels().await, [job.id]);
}

#[tokio::test]
async fn finished_jobs_never_change_again() {
    let harness = image_harness(20).await;
    let job = harness.submit("create_image", QualityTier::Low).await;
    let done = harness.run_to_success(&job).await.unwrap();

    let d = &harness.dispatcher;
    assert_eq!(
        d.on_backend_complete(job.id, Err("late failure".into()))
            .await
            .unwrap(),
        CompletionOutcome::Ignored
    );
    assert!(matches!(
        d.cancel(job.id).await,
        Err(DirectorError::AlreadyTerminal {
            status: JobStatus::Succeeded,
            ..
        })
    ));
    d.on_backend_started(job.id).await.unwrap();
    d.on_backend_progress(job.id, 10).await.unwrap();

    let after = d.get(job.id).unwrap();
    assert_eq!(after.status, JobStatus::Succeeded);
    assert_eq!(after.started_at, done.started_at);
    assert_eq!(after.finished_at, done.finished_at);
    assert_eq!(after.progress, 100);
}

/// Each submission routes against its own snapshot read and nothing is
/// reserved, so both of these are placed even though 8 + 4 exceeds the 8
/// free units. Admission control across jobs is not the dispatcher's job.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_submits_may_overcommit() {
    let harness = image_harness(8).await;

    let (standard, low) = tokio::join!(
        harness.submit("create_image", QualityTier::Standard),
        harness.submit("create_image", QualityTier::Low),
    );

    assert_eq!(standard.status, JobStatus::Queued);
    assert_eq!(standard.resolved_tier, Some(QualityTier::Standard));
    assert_eq!(low.status, JobStatus::Queued);
    assert_eq!(low.resolved_tier, Some(QualityTier::Low));
    assert_eq!(harness.backend.executions().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_completions_and_cancels_finish_a_job_once() {
    let harness = image_harness(100).await;

    for _ in 0..20 {
        let job = harness.submit("create_image", QualityTier::Low).await;
        harness.dispatcher.on_backend_started(job.id).await.unwrap();

        let mut tasks = Vec::new();
        for n in 0..16 {
            let d = Arc::clone(&harness.dispatcher);
            tasks.push(tokio::spawn(async move {
                if n % 2 == 0 {
                    matches!(
                        d.on_backend_complete(job.id, Ok(())).await,
                        Ok(CompletionOutcome::Applied(_))
                    )
                } else {
                    d.cancel(job.id).await.is_ok()
                }
            }));
        }
        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let terminal: Vec<EventKind> = harness
            .transport
            .kinds_for(job.id)
            .await
            .into_iter()
            .filter(|kind| {
                matches!(
                    kind,
                    EventKind::Succeeded | EventKind::Failed | EventKind::Cancelled
                )
            })
            .collect();
        assert_eq!(terminal.len(), 1);

        let settled = harness.dispatcher.get(job.id).unwrap();
        assert!(settled.is_terminal());
        assert_eq!(
            harness
                .dispatcher
                .on_backend_complete(job.id, Err("late failure".into()))
                .await
                .unwrap(),
            CompletionOutcome::Ignored
        );
        let after = harness.dispatcher.get(job.id).unwrap();
        assert_eq!(after.status, settled.status);
        assert_eq!(after.finished_at, settled.finished_at);
    }
}

#[tokio::test]
async fn capacity_change_is_picked_up_on_refresh() {
    let harness = image_harness(20).await;
    let first = harness.submit("create_image", QualityTier::High).await;
    assert_eq!(first.resolved_tier, Some(QualityTier::High));

    harness.set_available(DEFAULT_POOL, 5).await;
    let second = harness.submit("create_image", QualityTier::High).await;
    assert_eq!(second.resolved_tier, Some(QualityTier::Low));
}

#[tokio::test]
async fn failed_probe_keeps_routing_on_last_snapshot() {
    let harness = image_harness(20).await;
    harness.probe.fail_next(1);
    assert!(!harness.monitor.refresh().await);

    let job = harness.submit("create_image", QualityTier::High).await;
    assert_eq!(job.resolved_tier, Some(QualityTier::High));
}

#[tokio::test]
async fn registry_update_applies_to_next_submission() {
    let harness = image_harness(20).await;
    harness.registry.register(
        "create_image".into(),
        QualityTier::High,
        WorkerProfile::new("flux-pro", DEFAULT_POOL, 12).with_priority(10),
    );

    let job = harness.submit("create_image", QualityTier::High).await;
    assert_eq!(
        harness.backend.backend_for(job.id).await.as_deref(),
        Some("flux-pro")
    );
}

#[tokio::test]
async fn refused_handoff_and_failed_cancel_are_survivable() {
    let harness = image_harness(20).await;
    harness.backend.refuse_jobs(true);
    let refused = harness.submit("create_image", QualityTier::Low).await;
    assert_eq!(refused.status, JobStatus::Failed);
    assert_eq!(
        harness.transport.kinds_for(refused.id).await,
        [EventKind::Queued, EventKind::Failed]
    );

    harness.backend.refuse_jobs(false);
    harness.backend.fail_cancels(true);
    let job = harness.submit("create_image", QualityTier::Low).await;
    let cancelled = harness.dispatcher.cancel(job.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
}
