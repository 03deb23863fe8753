//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::ChangeFreq;
use crate::storage::{DomainRecord, LinkRecord, LinkRelationRecord, NewLink};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Corrupt row in {table}: {message}")]
    CorruptRow {
        table: &'static str,
        message: String,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Operations on the link graph
///
/// Every stage of the pipeline performs its state transition through this
/// trait inside a single transaction. Inserts collapse uniqueness conflicts
/// into "already exists" and never fail on duplicates.
pub trait Storage {
    // ===== Domains =====

    /// Inserts a domain unless one with the same name exists
    ///
    /// # Arguments
    ///
    /// * `name` - The canonical host
    /// * `protocol` - The scheme the domain was first seen with
    ///
    /// # Returns
    ///
    /// The stored row and whether this call created it
    fn upsert_domain(&self, name: &str, protocol: &str) -> StorageResult<(DomainRecord, bool)>;

    /// Finds a domain by its unique name
    fn find_domain_by_name(&self, name: &str) -> StorageResult<Option<DomainRecord>>;

    /// Gets a domain by ID
    fn get_domain(&self, id: Uuid) -> StorageResult<Option<DomainRecord>>;

    /// Writes every mutable column of a domain back
    fn update_domain(&self, domain: &DomainRecord) -> StorageResult<()>;

    // ===== Links =====

    /// Inserts a link unless one with the same URL exists
    ///
    /// The priority is normalized before it is stored.
    ///
    /// # Returns
    ///
    /// The stored row and whether this call created it
    fn insert_link(&self, link: &NewLink) -> StorageResult<(LinkRecord, bool)>;

    /// Finds a link by its canonical URL
    fn find_link_by_url(&self, url: &str) -> StorageResult<Option<LinkRecord>>;

    /// Gets a link by ID
    fn get_link(&self, id: Uuid) -> StorageResult<Option<LinkRecord>>;

    /// Writes every mutable column of a link back
    fn update_link(&self, link: &LinkRecord) -> StorageResult<()>;

    /// Deletes a link and, through the foreign keys, its relations
    ///
    /// Returns true if a row was deleted
    fn delete_link(&self, id: Uuid) -> StorageResult<bool>;

    // ===== Relations =====

    /// Finds the edge `link_id -> has_link_id`
    fn find_relation(
        &self,
        link_id: Uuid,
        has_link_id: Uuid,
    ) -> StorageResult<Option<LinkRelationRecord>>;

    /// Inserts the edge `link_id -> has_link_id`
    ///
    /// Returns true if the edge was new
    fn insert_relation(&self, link_id: Uuid, has_link_id: Uuid) -> StorageResult<bool>;

    /// Gets the IDs of all links referenced by a link
    fn get_outgoing_links(&self, link_id: Uuid) -> StorageResult<Vec<Uuid>>;

    /// Gets the IDs of all links referencing a link
    fn get_incoming_links(&self, link_id: Uuid) -> StorageResult<Vec<Uuid>>;

    // ===== Statistics =====

    fn count_domains(&self) -> StorageResult<u64>;

    fn count_links(&self) -> StorageResult<u64>;

    /// Counts links with a `last_crawled_at` timestamp
    fn count_crawled_links(&self) -> StorageResult<u64>;

    fn count_relations(&self) -> StorageResult<u64>;

    /// Counts links per change frequency
    fn count_links_by_change_freq(&self) -> StorageResult<HashMap<ChangeFreq, u64>>;
}
