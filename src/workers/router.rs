//! Router
//!
//! Spreads link IDs from a priority queue uniformly over the selector pools.

use crate::queue::pool_queue;
use crate::storage::SqliteStorage;
use crate::workers::prioritizer::{load_link, parse_link_id};
use crate::workers::{Stage, Transition};
use crate::SumiError;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;

pub struct Router {
    storage: Arc<SqliteStorage>,
    pool_count: usize,
}

impl Router {
    /// Creates a router over `links_pool_1..=pool_count`
    pub fn new(storage: Arc<SqliteStorage>, pool_count: usize) -> Self {
        Self {
            storage,
            pool_count: pool_count.max(1),
        }
    }
}

#[async_trait]
impl Stage for Router {
    fn name(&self) -> &'static str {
        "router"
    }

    async fn handle(&self, body: &str) -> Result<Transition, SumiError> {
        let id = parse_link_id(body)?;
        let link = load_link(&self.storage, id)?;

        let index = rand::thread_rng().gen_range(1..=self.pool_count);

        let mut transition = Transition::none();
        transition.emit(pool_queue(index), link.id.to_string());
        Ok(transition)
    }
}
