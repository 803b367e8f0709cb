//! The `ContactStore` trait consumed by the identity resolver
//!
//! Backends are pure persistence: no matching or merge decisions live here.
//! The one compound operation, [`ContactStore::merge_clusters`], exists so a
//! backend can apply a whole merge inside a single transaction.

use super::types::{Contact, ContactId, NewContact};
use crate::error::Result;
use async_trait::async_trait;

/// Abstraction over a contact store backend
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Contacts whose email equals `email`, whose phone equals `phone`, or
    /// whose `linked_id` equals `anchor`. Absent inputs match nothing.
    /// Results are ordered by id.
    async fn find_matches(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
        anchor: Option<ContactId>,
    ) -> Result<Vec<Contact>>;

    /// The contact with this id, only if it is currently a primary
    async fn find_primary_by_id(&self, id: ContactId) -> Result<Option<Contact>>;

    /// Whether a contact holds exactly this (email, phone) pair
    async fn exists_exact(&self, email: Option<&str>, phone: Option<&str>) -> Result<bool>;

    /// Persist a new contact. Fails with `Error::Conflict` if the exact
    /// (email, phone) pair is already stored.
    async fn insert(&self, candidate: NewContact) -> Result<Contact>;

    /// Demote a contact to a secondary of `new_primary_id`.
    /// A contact already linked that way is left untouched.
    async fn demote_to_secondary(
        &self,
        contact_id: ContactId,
        new_primary_id: ContactId,
    ) -> Result<()>;

    /// Atomically demote every loser to a secondary of `survivor_id`,
    /// re-link the losers' own secondaries to `survivor_id`, and return the
    /// settled `find_matches(email, phone, Some(survivor_id))` read.
    async fn merge_clusters(
        &self,
        survivor_id: ContactId,
        loser_ids: &[ContactId],
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>>;

    /// Number of stored contacts
    async fn count(&self) -> Result<usize>;

    /// Every stored contact, ordered by id
    async fn all(&self) -> Result<Vec<Contact>>;
}
