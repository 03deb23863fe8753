//! Message queues connecting the pipeline stages
//!
//! Every stage consumes one named queue and publishes plain UTF-8 bodies to
//! others. Delivery is at-least-once and unordered across competing
//! consumers of the same queue.

mod memory;

pub use memory::InMemoryBroker;

use crate::SumiError;
use async_trait::async_trait;

/// Domain URLs (`scheme://host`)
pub const DOMAINS: &str = "domains";
/// Sitemap URLs
pub const SITEMAPS: &str = "sitemaps";
/// Link URLs, raw or canonical
pub const LINKS: &str = "links";
/// Link IDs awaiting classification
pub const PRIORITIZER: &str = "prioritizer";

/// Prefix of the selector pool queues, `links_pool_1..=N`
pub const POOL_PREFIX: &str = "links_pool_";

/// Name of the selector pool queue with the given 1-based index
pub fn pool_queue(index: usize) -> String {
    format!("{}{}", POOL_PREFIX, index)
}

/// A message taken from a queue
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub queue: String,
    pub body: String,
    /// Broker-assigned tag used to acknowledge the message
    pub tag: u64,
}

/// A broker with named work queues
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Declares a queue; declaring an existing queue is a no-op
    async fn declare(&self, queue: &str) -> Result<(), SumiError>;

    /// Appends a message to a queue
    async fn publish(&self, queue: &str, body: String) -> Result<(), SumiError>;

    /// Waits for the next message on a queue
    ///
    /// Returns `None` once the queue is closed and empty.
    async fn consume(&self, queue: &str) -> Result<Option<Delivery>, SumiError>;

    /// Acknowledges a delivery
    async fn ack(&self, delivery: &Delivery) -> Result<(), SumiError>;
}
