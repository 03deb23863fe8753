//! Prioritizer
//!
//! Sorts link IDs into the high, medium and low priority queues.

use crate::state::PriorityLevel;
use crate::storage::{LinkRecord, SqliteStorage, Storage};
use crate::workers::{Stage, Transition};
use crate::SumiError;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Parses a link ID message body
pub(crate) fn parse_link_id(body: &str) -> Result<Uuid, SumiError> {
    Uuid::parse_str(body.trim()).map_err(|_| SumiError::InvalidId(body.to_string()))
}

/// Loads a link inside its own transaction
pub(crate) fn load_link(storage: &SqliteStorage, id: Uuid) -> Result<LinkRecord, SumiError> {
    storage.transaction(|tx| tx.get_link(id)?.ok_or(SumiError::LinkNotFound(id)))
}

pub struct Prioritizer {
    storage: Arc<SqliteStorage>,
}

impl Prioritizer {
    pub fn new(storage: Arc<SqliteStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Stage for Prioritizer {
    fn name(&self) -> &'static str {
        "prioritizer"
    }

    async fn handle(&self, body: &str) -> Result<Transition, SumiError> {
        let id = parse_link_id(body)?;
        let link = load_link(&self.storage, id)?;

        let mut transition = Transition::none();
        match PriorityLevel::classify(link.change_freq, link.priority) {
            Some(level) => transition.emit(level.queue_name(), id.to_string()),
            None => tracing::debug!("Skipping {} (change frequency: never)", link.url),
        }

        Ok(transition)
    }
}
