//! Detached broadcast fan-out.
//!
//! Resolves the audience to concrete target ids at execution time, attempts
//! delivery per target, classifies each outcome, and reports a summary to the
//! admin. A single target failure never aborts the run; only a failure while
//! resolving targets does, in which case the error text replaces the summary.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    broadcast::{AudienceKind, BroadcastJob},
    domain::ChatId,
    messaging::port::{notify, TransportPort},
    registry::Registry,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct DispatchConfig {
    /// Fixed spacing between sends, to respect transport rate limits.
    pub send_interval: Duration,
    /// How many failure descriptions the summary carries at most.
    pub failure_sample_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_millis(80),
            failure_sample_limit: 50,
        }
    }
}

/// Outcome of one broadcast run.
#[derive(Clone, Debug, PartialEq)]
pub struct BroadcastReport {
    pub audience: AudienceKind,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub success_rate: f64,
    /// First N failure descriptions, N = `failure_sample_limit`.
    pub failure_sample: Vec<String>,
}

impl BroadcastReport {
    fn render(&self) -> String {
        let mut out = format!(
            "✅ Broadcast finished\nType: {}\nTotal: {}\nSuccess: {}\nFailed: {}\nSuccess rate: {:.1}%",
            self.audience.label(),
            self.total,
            self.success,
            self.failed,
            self.success_rate
        );
        if !self.failure_sample.is_empty() {
            out.push_str("\n\nFailed sample:\n");
            out.push_str(&self.failure_sample.join("\n"));
        }
        out
    }
}

/// Run one broadcast to completion and deliver the report. Never panics out;
/// every terminal path messages `job.report_recipient`.
pub async fn run(
    job: BroadcastJob,
    registry: &Registry,
    transport: &dyn TransportPort,
    cfg: &DispatchConfig,
) {
    let targets = match resolve_targets(&job, registry) {
        Ok(t) => t,
        Err(e) => {
            warn!("broadcast aborted while resolving targets: {e}");
            notify(
                transport,
                job.report_recipient,
                &format!("❌ Broadcast failed before sending: {e}"),
            )
            .await;
            return;
        }
    };

    let report = fan_out(&job, &targets, registry, transport, cfg).await;
    info!(
        "broadcast done: {}/{} delivered ({})",
        report.success,
        report.total,
        job.audience.label()
    );
    notify(transport, job.report_recipient, &report.render()).await;
}

fn resolve_targets(job: &BroadcastJob, registry: &Registry) -> Result<Vec<i64>> {
    match job.audience {
        AudienceKind::AllOptedInUsers => registry.opted_in_user_ids(),
        AudienceKind::AllGroups => {
            Ok(registry.list_groups()?.into_iter().map(|g| g.group_id).collect())
        }
        AudienceKind::SpecificGroup => {
            Ok(job.selected_group.map(|g| g.0).into_iter().collect())
        }
    }
}

async fn fan_out(
    job: &BroadcastJob,
    targets: &[i64],
    registry: &Registry,
    transport: &dyn TransportPort,
    cfg: &DispatchConfig,
) -> BroadcastReport {
    let total = targets.len();
    let mut success = 0usize;
    let mut failed = 0usize;
    let mut failure_sample = Vec::new();

    for &target in targets {
        match transport.send_payload(ChatId(target), &job.payload).await {
            Ok(_) => success += 1,
            Err(e) => {
                failed += 1;
                let reason = e.label();
                if failure_sample.len() < cfg.failure_sample_limit {
                    failure_sample.push(format!("{target} ({reason})"));
                }
                registry.append_failed_delivery(target, &target.to_string(), &reason);
            }
        }
        sleep(cfg.send_interval).await;
    }

    let success_rate = if total > 0 {
        success as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    BroadcastReport {
        audience: job.audience,
        total,
        success,
        failed,
        success_rate,
        failure_sample,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::messaging::types::OutgoingPayload;
    use crate::testing::RecordingTransport;

    fn text_job(audience: AudienceKind, selected: Option<i64>) -> BroadcastJob {
        BroadcastJob {
            audience,
            payload: OutgoingPayload::Text {
                text: "hello everyone".to_string(),
            },
            selected_group: selected.map(ChatId),
            report_recipient: ChatId(999),
        }
    }

    fn cfg() -> DispatchConfig {
        DispatchConfig {
            send_interval: Duration::from_millis(1),
            failure_sample_limit: 50,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn all_groups_attempts_every_known_group() {
        let registry = Registry::open_in_memory().unwrap();
        for i in 1..=4 {
            registry.upsert_group(ChatId(-i), &format!("group {i}"));
        }
        let transport = RecordingTransport::default();

        run(text_job(AudienceKind::AllGroups, None), &registry, &transport, &cfg()).await;

        // 4 sends to groups + 1 report to the admin.
        let sent = transport.sent();
        assert_eq!(sent.len(), 5);
        let report = &sent.last().unwrap().1;
        assert!(report.contains("Total: 4"));
        assert!(report.contains("Success: 4"));
        assert!(report.contains("Failed: 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_recipients_are_recorded_and_skipped() {
        let registry = Registry::open_in_memory().unwrap();
        for i in 1..=5 {
            registry.upsert_opted_in_user(UserId(i), None, Some("user"), None);
        }
        let transport = RecordingTransport::default();
        transport.fail_send_for(2);
        transport.fail_send_for(4);

        run(
            text_job(AudienceKind::AllOptedInUsers, None),
            &registry,
            &transport,
            &cfg(),
        )
        .await;

        let report = transport.sent().last().unwrap().1.clone();
        assert!(report.contains("Success: 3"));
        assert!(report.contains("Failed: 2"));
        assert!(report.contains("Success rate: 60.0%"));
        assert!(report.contains("2 (Unauthorized)"));
        assert_eq!(registry.failed_delivery_count().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn specific_group_sends_exactly_once() {
        let registry = Registry::open_in_memory().unwrap();
        let transport = RecordingTransport::default();

        run(
            text_job(AudienceKind::SpecificGroup, Some(-42)),
            &registry,
            &transport,
            &cfg(),
        )
        .await;

        let sent = transport.sent();
        assert_eq!(sent[0].0, -42);
        assert_eq!(sent.len(), 2); // payload + report
    }

    #[tokio::test(start_paused = true)]
    async fn empty_audience_reports_zero_rate() {
        let registry = Registry::open_in_memory().unwrap();
        let transport = RecordingTransport::default();

        run(
            text_job(AudienceKind::AllOptedInUsers, None),
            &registry,
            &transport,
            &cfg(),
        )
        .await;

        let report = transport.sent().last().unwrap().1.clone();
        assert!(report.contains("Total: 0"));
        assert!(report.contains("Success rate: 0.0%"));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_sample_is_bounded() {
        let registry = Registry::open_in_memory().unwrap();
        let transport = RecordingTransport::default();
        for i in 1..=10 {
            registry.upsert_opted_in_user(UserId(i), None, None, None);
            transport.fail_send_for(i);
        }

        let mut small = cfg();
        small.failure_sample_limit = 3;
        run(
            text_job(AudienceKind::AllOptedInUsers, None),
            &registry,
            &transport,
            &small,
        )
        .await;

        let report = transport.sent().last().unwrap().1.clone();
        assert!(report.contains("Failed: 10"));
        assert_eq!(report.matches("(Unauthorized)").count(), 3);
        // Every failure is still recorded, only the sample is bounded.
        assert_eq!(registry.failed_delivery_count().unwrap(), 10);
    }
}
