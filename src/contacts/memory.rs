//! In-memory contact store with optional JSON snapshot persistence
//!
//! All contacts live in a single table behind a `tokio::sync::RwLock`.
//! When opened on a directory, every mutation rewrites the snapshot while
//! the write lock is still held, so readers never observe a change that
//! has not been persisted:
//!
//! ```text
//! ~/.contactlink/
//! └── contacts.json
//! ```

use super::store::ContactStore;
use super::types::{Contact, ContactId, LinkPrecedence, NewContact};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

const SNAPSHOT_FILE: &str = "contacts.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactTable {
    next_id: ContactId,
    contacts: BTreeMap<ContactId, Contact>,
}

impl Default for ContactTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            contacts: BTreeMap::new(),
        }
    }
}

impl ContactTable {
    fn matches(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
        anchor: Option<ContactId>,
    ) -> Vec<Contact> {
        self.contacts
            .values()
            .filter(|c| {
                let email_hit = email.is_some() && c.email.as_deref() == email;
                let phone_hit = phone.is_some() && c.phone_number.as_deref() == phone;
                let anchor_hit = anchor.is_some() && c.linked_id == anchor;
                email_hit || phone_hit || anchor_hit
            })
            .cloned()
            .collect()
    }

    fn exists_exact(&self, email: Option<&str>, phone: Option<&str>) -> bool {
        self.contacts.values().any(|c| c.has_pair(email, phone))
    }

    /// Fails with `Error::Conflict` unless `id` is currently a primary
    fn require_primary(&self, id: ContactId) -> Result<()> {
        match self.contacts.get(&id) {
            Some(contact) if contact.is_primary() => Ok(()),
            Some(contact) => Err(Error::Conflict(format!(
                "Contact {} is no longer a primary (linked to {:?})",
                id, contact.linked_id
            ))),
            None => Err(Error::Store(format!("Contact {} not found", id))),
        }
    }

    /// Returns true if the contact changed
    fn demote(&mut self, contact_id: ContactId, new_primary_id: ContactId) -> Result<bool> {
        if !self.contacts.contains_key(&contact_id) {
            return Err(Error::Store(format!("Contact {} not found", contact_id)));
        }
        self.require_primary(new_primary_id)?;

        let contact = self
            .contacts
            .get_mut(&contact_id)
            .ok_or_else(|| Error::Store(format!("Contact {} not found", contact_id)))?;

        if contact.is_secondary() && contact.linked_id == Some(new_primary_id) {
            return Ok(false);
        }

        contact.link_precedence = LinkPrecedence::Secondary;
        contact.linked_id = Some(new_primary_id);
        contact.updated_at = Utc::now();
        Ok(true)
    }

    /// Demote every loser and re-link their secondaries to the survivor.
    /// Survivor and losers must all still be primaries; every check runs
    /// before anything changes, so a failure mutates nothing.
    fn merge(&mut self, survivor_id: ContactId, loser_ids: &[ContactId]) -> Result<bool> {
        for id in std::iter::once(&survivor_id).chain(loser_ids) {
            if !self.contacts.contains_key(id) {
                return Err(Error::Store(format!("Contact {} not found", id)));
            }
        }
        for &id in std::iter::once(&survivor_id).chain(loser_ids) {
            self.require_primary(id)?;
        }

        let orphans: Vec<ContactId> = self
            .contacts
            .values()
            .filter(|c| {
                c.is_secondary() && c.linked_id.is_some_and(|linked| loser_ids.contains(&linked))
            })
            .map(|c| c.id)
            .collect();

        let mut changed = false;
        for &id in loser_ids.iter().chain(&orphans) {
            changed |= self.demote(id, survivor_id)?;
        }
        if !orphans.is_empty() {
            tracing::debug!(
                "Re-linked {} secondaries to surviving primary {}",
                orphans.len(),
                survivor_id
            );
        }
        Ok(changed)
    }
}

/// In-memory `ContactStore`, optionally backed by a snapshot file
pub struct MemoryContactStore {
    table: Arc<RwLock<ContactTable>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryContactStore {
    /// Create an empty, non-persistent store
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(ContactTable::default())),
            snapshot_path: None,
        }
    }

    /// Open a persistent store in `data_dir`, loading any existing snapshot
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;

        let snapshot_path = data_dir.join(SNAPSHOT_FILE);
        let table = match tokio::fs::read_to_string(&snapshot_path).await {
            Ok(data) => serde_json::from_str::<ContactTable>(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ContactTable::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Opened contact store at {} ({} contacts)",
            snapshot_path.display(),
            table.contacts.len()
        );

        Ok(Self {
            table: Arc::new(RwLock::new(table)),
            snapshot_path: Some(snapshot_path),
        })
    }

    /// Whether mutations are written to disk
    pub fn is_persistent(&self) -> bool {
        self.snapshot_path.is_some()
    }

    /// Load an already-built contact verbatim, keeping its id and timestamps.
    /// Used for seeding from an export; fails if the id is taken.
    pub async fn import(&self, contact: Contact) -> Result<()> {
        let mut table = self.table.write().await;
        if table.contacts.contains_key(&contact.id) {
            return Err(Error::Conflict(format!(
                "Contact {} already exists",
                contact.id
            )));
        }

        let backup = self.backup(&table);
        table.next_id = table.next_id.max(contact.id + 1);
        table.contacts.insert(contact.id, contact);
        self.commit(&mut table, backup).await
    }

    fn backup(&self, table: &ContactTable) -> Option<ContactTable> {
        self.snapshot_path.as_ref().map(|_| table.clone())
    }

    /// Persist the table; on failure restore `backup` so memory matches disk
    async fn commit(&self, table: &mut ContactTable, backup: Option<ContactTable>) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        if let Err(e) = write_snapshot(path, table).await {
            tracing::warn!("Failed to persist contact snapshot {}: {}", path.display(), e);
            if let Some(previous) = backup {
                *table = previous;
            }
            return Err(e);
        }
        Ok(())
    }
}

impl Default for MemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Write to a sibling temp file, then rename over the snapshot
async fn write_snapshot(path: &Path, table: &ContactTable) -> Result<()> {
    let json = serde_json::to_string_pretty(table)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn find_matches(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
        anchor: Option<ContactId>,
    ) -> Result<Vec<Contact>> {
        Ok(self.table.read().await.matches(email, phone, anchor))
    }

    async fn find_primary_by_id(&self, id: ContactId) -> Result<Option<Contact>> {
        let table = self.table.read().await;
        Ok(table.contacts.get(&id).filter(|c| c.is_primary()).cloned())
    }

    async fn exists_exact(&self, email: Option<&str>, phone: Option<&str>) -> Result<bool> {
        Ok(self.table.read().await.exists_exact(email, phone))
    }

    async fn insert(&self, candidate: NewContact) -> Result<Contact> {
        let mut table = self.table.write().await;

        let email = candidate.email.as_deref();
        let phone = candidate.phone_number.as_deref();
        if table.exists_exact(email, phone) {
            return Err(Error::Conflict(format!(
                "Contact with email {:?} and phone {:?} already exists",
                email, phone
            )));
        }

        let precedence = candidate.link_precedence.unwrap_or_default();
        let linked_id = match precedence {
            LinkPrecedence::Primary => None,
            LinkPrecedence::Secondary => {
                let primary_id = candidate.linked_id.ok_or_else(|| {
                    Error::Store("Secondary contact requires a linked id".to_string())
                })?;
                table.require_primary(primary_id)?;
                Some(primary_id)
            }
        };

        let backup = self.backup(&table);
        let now = Utc::now();
        let contact = Contact {
            id: table.next_id,
            email: candidate.email,
            phone_number: candidate.phone_number,
            linked_id,
            link_precedence: precedence,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        table.next_id += 1;
        table.contacts.insert(contact.id, contact.clone());
        self.commit(&mut table, backup).await?;

        tracing::debug!(
            "Inserted {} contact {} (linked to {:?})",
            contact.link_precedence,
            contact.id,
            contact.linked_id
        );
        Ok(contact)
    }

    async fn demote_to_secondary(
        &self,
        contact_id: ContactId,
        new_primary_id: ContactId,
    ) -> Result<()> {
        let mut table = self.table.write().await;
        let backup = self.backup(&table);
        if table.demote(contact_id, new_primary_id)? {
            self.commit(&mut table, backup).await?;
        }
        Ok(())
    }

    async fn merge_clusters(
        &self,
        survivor_id: ContactId,
        loser_ids: &[ContactId],
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>> {
        let mut table = self.table.write().await;
        let backup = self.backup(&table);

        if table.merge(survivor_id, loser_ids)? {
            self.commit(&mut table, backup).await?;
        }

        Ok(table.matches(email, phone, Some(survivor_id)))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.read().await.contacts.len())
    }

    async fn all(&self) -> Result<Vec<Contact>> {
        Ok(self.table.read().await.contacts.values().cloned().collect())
    }
}
