// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job notifications: translation to client-safe events and delivery.
//!
//! [`NotificationEmitter::translate`] is the only place that decides what a
//! client sees. It works from the job's tiers, status and failure kind, and
//! never copies backend identifiers, pool names, resource units or raw
//! failure messages into the event.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use director_core::{
    Adapter, AdapterType, DirectorError, EventKind, FailureKind, FallbackDecision, FallbackReason,
    Job, JobEvent, NotificationTransport, ReasonCode,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

/// Translates job changes into [`JobEvent`]s and hands them to a transport.
#[derive(Clone)]
pub struct NotificationEmitter {
    transport: Arc<dyn NotificationTransport>,
}

impl NotificationEmitter {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self { transport }
    }

    /// Build the client-facing event for `kind`.
    ///
    /// `decision` is only consulted for [`EventKind::Downgraded`]; when absent
    /// the reason recorded on the job is used.
    pub fn translate(kind: EventKind, job: &Job, decision: Option<&FallbackDecision>) -> JobEvent {
        let downgraded = job.fallback_reason.is_some();
        let (reason_code, message, progress) = match kind {
            EventKind::Queued => (ReasonCode::NoReason, "Request queued".to_string(), None),
            EventKind::Downgraded => {
                let reason = decision
                    .map(|d| d.reason)
                    .or(job.fallback_reason)
                    .unwrap_or(FallbackReason::None);
                (ReasonCode::ReducedQuality, downgrade_message(reason), None)
            }
            EventKind::Started => (ReasonCode::NoReason, "Generation started".to_string(), None),
            EventKind::Progress => (
                ReasonCode::NoReason,
                "Generation in progress".to_string(),
                Some(job.progress),
            ),
            EventKind::Succeeded if downgraded => (
                ReasonCode::ReducedQuality,
                "Generation complete at reduced quality".to_string(),
                Some(100),
            ),
            EventKind::Succeeded => (
                ReasonCode::NoReason,
                "Generation complete".to_string(),
                Some(100),
            ),
            EventKind::Failed => {
                let (code, message) = failure_message(job.failure.as_ref().map(|f| f.kind));
                (code, message.to_string(), None)
            }
            EventKind::Cancelled => (ReasonCode::Cancelled, "Generation cancelled".to_string(), None),
        };

        JobEvent {
            job_id: job.id,
            kind,
            status: job.status,
            capability: job.capability.clone(),
            requested_tier: job.requested_tier,
            resolved_tier: job.resolved_tier,
            reason_code,
            message,
            progress,
            emitted_at: Utc::now(),
        }
    }

    /// Translate and publish. Transport failures are logged and absorbed so
    /// that a broken listener never affects job state.
    pub async fn emit(&self, kind: EventKind, job: &Job, decision: Option<&FallbackDecision>) {
        let event = Self::translate(kind, job, decision);
        if let Err(e) = self.transport.publish(event).await {
            warn!(
                job_id = %job.id,
                kind = %kind,
                transport = self.transport.name(),
                error = %e,
                "failed to deliver job event"
            );
        }
    }
}

fn downgrade_message(reason: FallbackReason) -> String {
    match reason {
        FallbackReason::InsufficientResources => {
            "Generated at reduced quality due to high demand".to_string()
        }
        FallbackReason::WorkerUnavailable => {
            "Generated at reduced quality because the requested quality is currently unavailable"
                .to_string()
        }
        FallbackReason::None => "Generated at reduced quality".to_string(),
    }
}

fn failure_message(kind: Option<FailureKind>) -> (ReasonCode, &'static str) {
    match kind {
        Some(FailureKind::ResourceExhausted) => (
            ReasonCode::CapacityUnavailable,
            "All workers are busy, please try again shortly",
        ),
        Some(FailureKind::UnsupportedCapability) => {
            (ReasonCode::Unsupported, "This request type is not supported")
        }
        Some(FailureKind::BackendRejected | FailureKind::BackendError) | None => {
            (ReasonCode::GenerationFailed, "Generation failed")
        }
    }
}

/// In-process fan-out over a tokio broadcast channel.
///
/// Subscribers that fall behind lose the oldest events. Publishing with no
/// subscribers is not an error.
pub struct BroadcastTransport {
    sender: broadcast::Sender<JobEvent>,
}

impl BroadcastTransport {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl Adapter for BroadcastTransport {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }
}

#[async_trait]
impl NotificationTransport for BroadcastTransport {
    async fn publish(&self, event: JobEvent) -> Result<(), DirectorError> {
        if self.sender.send(event).is_err() {
            debug!("no event subscribers");
        }
        Ok(())
    }
}

/// Writes one JSON object per line to any async writer.
pub struct JsonLinesTransport<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer, e.g. to inspect a buffer in tests.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Adapter for JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn name(&self) -> &str {
        "json_lines"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }
}

#[async_trait]
impl<W> NotificationTransport for JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn publish(&self, event: JobEvent) -> Result<(), DirectorError> {
        let mut line = serde_json::to_vec(&event).map_err(|e| DirectorError::Transport {
            message: "failed to encode job event".to_string(),
            source: Some(Box::new(e)),
        })?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| DirectorError::Transport {
                message: "failed to write job event".to_string(),
                source: Some(Box::new(e)),
            })?;
        writer.flush().await.map_err(|e| DirectorError::Transport {
            message: "failed to flush job event".to_string(),
            source: Some(Box::new(e)),
        })
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

#[async_trait]
impl Adapter for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }
}

#[async_trait]
impl NotificationTransport for NullTransport {
    async fn publish(&self, _event: JobEvent) -> Result<(), DirectorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use director_core::{Capability, JobFailure, JobStatus, QualityTier, WorkerProfile};

    use super::*;

    fn downgraded_job() -> (Job, FallbackDecision) {
        let decision = FallbackDecision {
            accepted_tier: QualityTier::Standard,
            original_tier: QualityTier::High,
            reason: FallbackReason::InsufficientResources,
        };
        let job = Job::queued(
            Capability::from("create_image"),
            QualityTier::High,
            Arc::new(WorkerProfile::new("secret-model-v7", "h100-pool", 16)),
            &decision,
        );
        (job, decision)
    }

    #[test]
    fn downgrade_uses_neutral_wording() {
        let (job, decision) = downgraded_job();
        let event = NotificationEmitter::translate(EventKind::Downgraded, &job, Some(&decision));

        assert_eq!(event.reason_code, ReasonCode::ReducedQuality);
        assert_eq!(event.message, "Generated at reduced quality due to high demand");
        assert_eq!(event.requested_tier, QualityTier::High);
        assert_eq!(event.resolved_tier, Some(QualityTier::Standard));
    }

    #[test]
    fn events_never_leak_backend_details() {
        let (mut job, decision) = downgraded_job();
        job.transition(JobStatus::Running).unwrap();
        job.fail(JobFailure {
            kind: FailureKind::BackendError,
            message: "secret-model-v7 ran out of memory on h100-pool".to_string(),
        })
        .unwrap();

        for kind in [
            EventKind::Queued,
            EventKind::Downgraded,
            EventKind::Started,
            EventKind::Progress,
            EventKind::Failed,
        ] {
            let event = NotificationEmitter::translate(kind, &job, Some(&decision));
            let json = serde_json::to_string(&event).unwrap();
            assert!(!json.contains("secret-model"), "{kind}: {json}");
            assert!(!json.contains("h100"), "{kind}: {json}");
        }
    }

    #[test]
    fn exhaustion_reads_as_capacity_unavailable() {
        let err = DirectorError::ResourceExhausted {
            capability: Capability::from("create_image"),
            tier: QualityTier::Low,
        };
        let job = Job::rejected(
            Capability::from("create_image"),
            QualityTier::Low,
            JobFailure::from_routing_error(&err).unwrap(),
        );
        let event = NotificationEmitter::translate(EventKind::Failed, &job, None);
        assert_eq!(event.reason_code, ReasonCode::CapacityUnavailable);
        assert_eq!(event.status, JobStatus::Failed);
        assert_eq!(event.resolved_tier, None);
    }

    #[test]
    fn downgraded_success_mentions_reduced_quality() {
        let (mut job, _) = downgraded_job();
        job.transition(JobStatus::Running).unwrap();
        job.transition(JobStatus::Succeeded).unwrap();
        let event = NotificationEmitter::translate(EventKind::Succeeded, &job, None);
        assert_eq!(event.reason_code, ReasonCode::ReducedQuality);
        assert_eq!(event.progress, Some(100));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let transport = Arc::new(BroadcastTransport::new(8));
        let mut first = transport.subscribe();
        let mut second = transport.subscribe();
        let emitter = NotificationEmitter::new(transport.clone());

        let (job, _) = downgraded_job();
        emitter.emit(EventKind::Queued, &job, None).await;

        assert_eq!(first.recv().await.unwrap().job_id, job.id);
        assert_eq!(second.recv().await.unwrap().kind, EventKind::Queued);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_fine() {
        let transport = BroadcastTransport::new(8);
        let (job, _) = downgraded_job();
        let event = NotificationEmitter::translate(EventKind::Queued, &job, None);
        assert!(transport.publish(event).await.is_ok());
    }

    #[tokio::test]
    async fn json_lines_writes_one_object_per_line() {
        let transport = JsonLinesTransport::new(Vec::<u8>::new());
        let (job, decision) = downgraded_job();
        for kind in [EventKind::Downgraded, EventKind::Queued] {
            let event = NotificationEmitter::translate(kind, &job, Some(&decision));
            transport.publish(event).await.unwrap();
        }

        let output = String::from_utf8(transport.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "downgraded");
        assert_eq!(first["reason_code"], "reduced_quality");
    }

    struct BrokenTransport;

    #[async_trait]
    impl Adapter for BrokenTransport {
        fn name(&self) -> &str {
            "broken"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 1)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Transport
        }
    }

    #[async_trait]
    impl NotificationTransport for BrokenTransport {
        async fn publish(&self, _event: JobEvent) -> Result<(), DirectorError> {
            Err(DirectorError::Transport {
                message: "socket closed".to_string(),
                source: None,
            })
        }
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn transport_failure_is_absorbed() {
        let emitter = NotificationEmitter::new(Arc::new(BrokenTransport));
        let (job, _) = downgraded_job();
        emitter.emit(EventKind::Queued, &job, None).await;
        assert!(logs_contain("failed to deliver job event"));
    }
}
