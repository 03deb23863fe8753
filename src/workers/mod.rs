//! Pipeline stages and the worker pools that run them
//!
//! Every stage follows the same contract: take a message, acknowledge it,
//! perform one state transition inside a single storage transaction, and
//! publish the messages that transition produced once it has committed.
//!
//! # Stages
//!
//! - [`DomainWorker`]: registers domains, reads robots.txt, emits sitemaps
//! - [`SitemapWorker`]: expands sitemaps into links
//! - [`LinkWorker`]: registers links and checks them against robots.txt
//! - [`Prioritizer`]: sorts links into priority queues
//! - [`Router`]: spreads links over the selector pools
//! - [`Selector`]: crawls a page and grows the link graph

mod domains;
mod links;
mod prioritizer;
mod router;
mod selector;
mod sitemaps;

pub use domains::DomainWorker;
pub use links::LinkWorker;
pub use prioritizer::Prioritizer;
pub use router::Router;
pub use selector::Selector;
pub use sitemaps::SitemapWorker;

use crate::queue::MessageBus;
use crate::SumiError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A message to publish after a transition commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub queue: String,
    pub body: String,
}

/// The outcome of handling one message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// Messages to publish, in order
    pub outbound: Vec<Outbound>,
    /// Rows this transition created (domains or links, depending on the stage)
    pub added: u64,
}

impl Transition {
    /// A transition that publishes nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Queues a message for publication
    pub fn emit(&mut self, queue: impl Into<String>, body: impl Into<String>) {
        self.outbound.push(Outbound {
            queue: queue.into(),
            body: body.into(),
        });
    }

    /// Bodies queued for one queue, in order
    pub fn bodies(&self, queue: &str) -> Vec<&str> {
        self.outbound
            .iter()
            .filter(|o| o.queue == queue)
            .map(|o| o.body.as_str())
            .collect()
    }
}

/// One pipeline stage
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    /// Short name used in logs and statistics
    fn name(&self) -> &'static str;

    /// Performs the stage's transition for one message body
    ///
    /// An error means the message is lost; it is logged by the pool.
    async fn handle(&self, body: &str) -> Result<Transition, SumiError>;
}

/// Counters shared by every replica of a stage
#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    added: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub added: u64,
    pub dropped: u64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            added: self.added.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn record(&self, result: &Result<Transition, SumiError>) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(transition) => {
                self.added.fetch_add(transition.added, Ordering::Relaxed);
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Spawns `replicas` consumers of `queue` running `stage`
///
/// # Arguments
///
/// * `stage` - The stage every replica runs
/// * `queue` - The queue the replicas compete on
/// * `replicas` - Number of consumers
/// * `bus` - The message bus
/// * `token` - Cancelling it stops every replica after its current message
/// * `stats` - Counters the replicas update
///
/// # Returns
///
/// One join handle per replica
pub fn spawn_pool<S: Stage>(
    stage: Arc<S>,
    queue: String,
    replicas: usize,
    bus: Arc<dyn MessageBus>,
    token: CancellationToken,
    stats: Arc<WorkerStats>,
) -> Vec<JoinHandle<()>> {
    (1..=replicas)
        .map(|index| {
            tokio::spawn(run_worker(
                Arc::clone(&stage),
                queue.clone(),
                index,
                Arc::clone(&bus),
                token.clone(),
                Arc::clone(&stats),
            ))
        })
        .collect()
}

async fn run_worker<S: Stage>(
    stage: Arc<S>,
    queue: String,
    index: usize,
    bus: Arc<dyn MessageBus>,
    token: CancellationToken,
    stats: Arc<WorkerStats>,
) {
    tracing::debug!("[{}:{}] Waiting on '{}'", stage.name(), index, queue);

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => break,
            next = bus.consume(&queue) => next,
        };

        let delivery = match next {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                tracing::debug!("[{}:{}] Queue '{}' closed", stage.name(), index, queue);
                break;
            }
            Err(e) => {
                tracing::error!("[{}:{}] Could not consume '{}': {}", stage.name(), index, queue, e);
                break;
            }
        };

        if let Err(e) = bus.ack(&delivery).await {
            tracing::warn!("[{}:{}] Failed to ack {}: {}", stage.name(), index, delivery.tag, e);
        }

        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = stage.handle(&delivery.body) => result,
        };
        stats.record(&result);

        match result {
            Ok(transition) => {
                for outbound in transition.outbound {
                    if let Err(e) = bus.publish(&outbound.queue, outbound.body).await {
                        tracing::error!(
                            "[{}:{}] Failed to publish to '{}': {}",
                            stage.name(),
                            index,
                            outbound.queue,
                            e
                        );
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    "Lost {} inside a {} worker ({}): {}",
                    delivery.body,
                    stage.name(),
                    index,
                    e
                );
            }
        }
    }

    tracing::debug!("[{}:{}] Stopped", stage.name(), index);
}
