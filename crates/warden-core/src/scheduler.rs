//! Delayed-action scheduler.
//!
//! Actions are explicit descriptors, not closures: each entry is an
//! `(execute_at, DelayedAction)` pair held in a min-heap and consumed by a
//! single worker task. Due actions are spawned onto the runtime so a slow
//! broadcast never delays a pending message deletion. Nothing here persists;
//! actions still pending at shutdown are lost (worst case a warning message is
//! never auto-deleted).

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    sync::Arc,
    time::Duration,
};

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    broadcast::{dispatcher, BroadcastJob},
    domain::MessageRef,
    errors::Error,
    messaging::port::TransportPort,
    registry::Registry,
    Result,
};

/// One-shot deferred work item.
#[derive(Clone, Debug)]
pub enum DelayedAction {
    /// Remove a previously sent message (warning/welcome cleanup).
    DeleteMessage(MessageRef),
    /// Run a broadcast fan-out as a detached job.
    Broadcast(BroadcastJob),
}

/// Shared context the worker needs to execute actions.
pub struct ActionRunner {
    pub transport: Arc<dyn TransportPort>,
    pub registry: Arc<Registry>,
    pub dispatch: dispatcher::DispatchConfig,
}

impl ActionRunner {
    async fn run(&self, action: DelayedAction) {
        match action {
            DelayedAction::DeleteMessage(msg) => {
                // Cleanup deletes are best-effort; the message may already be gone.
                if let Err(e) = self.transport.delete_message(msg).await {
                    tracing::debug!(
                        "scheduled delete failed for chat {} message {}: {e}",
                        msg.chat_id.0,
                        msg.message_id.0
                    );
                }
            }
            DelayedAction::Broadcast(job) => {
                dispatcher::run(job, &self.registry, self.transport.as_ref(), &self.dispatch)
                    .await;
            }
        }
    }
}

struct Entry {
    execute_at: Instant,
    action: DelayedAction,
}

/// Heap key: earliest deadline first, insertion order as tiebreak.
struct Pending {
    execute_at: Instant,
    seq: u64,
    action: DelayedAction,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.execute_at == other.execute_at && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.execute_at
            .cmp(&other.execute_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Handle for enqueueing delayed actions. Cheap to clone; scheduling is
/// fire-and-forget and never blocks the event-processing path.
#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<Entry>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Spawn the worker task. Must be called from within a tokio runtime.
    pub fn spawn(runner: ActionRunner) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(worker(rx, Arc::new(runner), cancel.clone()));
        Self { tx, cancel }
    }

    /// Execute `action` at-or-after `delay` from now. Returns immediately.
    pub fn schedule_after(&self, delay: Duration, action: DelayedAction) -> Result<()> {
        let entry = Entry {
            execute_at: Instant::now() + delay,
            action,
        };
        self.tx
            .send(entry)
            .map_err(|_| Error::Scheduling("scheduler worker has stopped".to_string()))
    }

    /// Execute `action` as soon as the worker picks it up.
    pub fn schedule_now(&self, action: DelayedAction) -> Result<()> {
        self.schedule_after(Duration::ZERO, action)
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn worker(
    mut rx: mpsc::UnboundedReceiver<Entry>,
    runner: Arc<ActionRunner>,
    cancel: CancellationToken,
) {
    let mut heap: BinaryHeap<Reverse<Pending>> = BinaryHeap::new();
    let mut seq: u64 = 0;
    let mut open = true;

    loop {
        if !open && heap.is_empty() {
            break;
        }
        let next_due = heap.peek().map(|Reverse(p)| p.execute_at);

        tokio::select! {
            _ = cancel.cancelled() => break,

            entry = rx.recv(), if open => {
                match entry {
                    Some(Entry { execute_at, action }) => {
                        seq += 1;
                        heap.push(Reverse(Pending { execute_at, seq, action }));
                    }
                    // All senders dropped: drain what is pending, then stop.
                    None => open = false,
                }
            }

            _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                let now = Instant::now();
                while let Some(Reverse(p)) = heap.peek() {
                    if p.execute_at > now {
                        break;
                    }
                    let Some(Reverse(p)) = heap.pop() else { break };
                    let runner = runner.clone();
                    // Detach so one long-running action cannot block the timer.
                    tokio::spawn(async move {
                        runner.run(p.action).await;
                    });
                }
            }
        }
    }
}
