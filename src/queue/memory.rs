//! In-process message broker
//!
//! Each queue is an unbounded tokio channel. Consumers of the same queue
//! share its receiver, so every message goes to exactly one of them.

use crate::queue::{Delivery, MessageBus};
use crate::SumiError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

struct QueueHandle {
    sender: UnboundedSender<String>,
    receiver: tokio::sync::Mutex<UnboundedReceiver<String>>,
    pending: AtomicUsize,
}

impl QueueHandle {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }
}

/// Broker keeping every queue in memory
///
/// Queues are created on first use, so publishing to an undeclared queue
/// never loses the message.
#[derive(Default)]
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, Arc<QueueHandle>>>,
    next_tag: AtomicU64,
    acked: AtomicU64,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, name: &str) -> Result<Arc<QueueHandle>, SumiError> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| SumiError::Queue("broker lock poisoned".to_string()))?;

        Ok(Arc::clone(
            queues
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(QueueHandle::new())),
        ))
    }

    /// Number of messages waiting in a queue
    pub fn pending(&self, queue: &str) -> usize {
        self.queue(queue)
            .map(|q| q.pending.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of acknowledged deliveries across all queues
    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::SeqCst)
    }

    /// Removes and returns every message currently waiting in a queue
    pub async fn drain(&self, queue: &str) -> Vec<String> {
        let Ok(handle) = self.queue(queue) else {
            return Vec::new();
        };

        let mut receiver = handle.receiver.lock().await;
        let mut bodies = Vec::new();
        while let Ok(body) = receiver.try_recv() {
            handle.pending.fetch_sub(1, Ordering::SeqCst);
            bodies.push(body);
        }
        bodies
    }
}

#[async_trait]
impl MessageBus for InMemoryBroker {
    async fn declare(&self, queue: &str) -> Result<(), SumiError> {
        self.queue(queue).map(|_| ())
    }

    async fn publish(&self, queue: &str, body: String) -> Result<(), SumiError> {
        let handle = self.queue(queue)?;
        handle.pending.fetch_add(1, Ordering::SeqCst);
        handle.sender.send(body).map_err(|_| {
            handle.pending.fetch_sub(1, Ordering::SeqCst);
            SumiError::Queue(format!("queue '{}' is closed", queue))
        })
    }

    async fn consume(&self, queue: &str) -> Result<Option<Delivery>, SumiError> {
        let handle = self.queue(queue)?;
        let mut receiver = handle.receiver.lock().await;

        match receiver.recv().await {
            Some(body) => {
                handle.pending.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(Delivery {
                    queue: queue.to_string(),
                    body,
                    tag: self.next_tag.fetch_add(1, Ordering::SeqCst) + 1,
                }))
            }
            None => Ok(None),
        }
    }

    async fn ack(&self, _delivery: &Delivery) -> Result<(), SumiError> {
        self.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
