//! Identity resolution and cluster merging
//!
//! Given an (email, phone) observation the resolver decides whether it
//! starts a new cluster, extends an existing one with a secondary contact,
//! or bridges two clusters that must be merged under the oldest primary.
//!
//! ## Flow
//!
//! ```text
//! observation ──► find_matches ──► none ───────────► insert primary
//!                      │
//!                      ▼
//!                cluster roots ──► one root ───────► insert secondary if the
//!                      │                              exact pair is new, re-read
//!                      ▼
//!                 several roots ──► merge_clusters (atomic demote + re-link
//!                                   + re-read under the oldest primary)
//! ```
//!
//! Resolutions are serialized per identity key (see [`KeyLocks`]); a lost
//! insert race reported by the store as a conflict re-runs the resolution.

use super::locks::KeyLocks;
use super::store::ContactStore;
use super::types::{ClusterView, Contact, ContactId, NewContact, Observation};
use super::view;
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of one resolution: the cluster's primary and its settled members
#[derive(Debug, Clone)]
pub struct Resolution {
    pub primary: Contact,
    pub cluster: Vec<Contact>,
}

impl Resolution {
    /// Public view of the cluster
    pub fn view(&self) -> ClusterView {
        view::project(&self.primary, &self.cluster)
    }
}

/// Identity resolver over a shared contact store
pub struct IdentityResolver {
    store: Arc<dyn ContactStore>,
    locks: KeyLocks,
    config: ResolverConfig,
}

impl IdentityResolver {
    /// Create a resolver with default settings
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    /// Create a resolver with explicit settings
    pub fn with_config(store: Arc<dyn ContactStore>, config: ResolverConfig) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
            config,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    /// Resolve an observation and project the resulting cluster
    pub async fn identify(&self, observation: &Observation) -> Result<ClusterView> {
        Ok(self.resolve(observation).await?.view())
    }

    /// Resolve an observation into its cluster, creating or merging as needed
    pub async fn resolve(&self, observation: &Observation) -> Result<Resolution> {
        observation.validate()?;

        let _guard = self.locks.acquire(&observation.identity_keys()).await;

        let mut attempt = 0;
        loop {
            match self.resolve_locked(observation).await {
                Err(e) if e.is_conflict() && attempt < self.config.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Resolution conflict for {:?}/{:?}, retrying ({}/{}): {}",
                        observation.email(),
                        observation.phone(),
                        attempt,
                        self.config.conflict_retries,
                        e
                    );
                }
                other => return other,
            }
        }
    }

    async fn resolve_locked(&self, observation: &Observation) -> Result<Resolution> {
        let email = observation.email();
        let phone = observation.phone();

        let matches = self.store.find_matches(email, phone, None).await?;
        if matches.is_empty() {
            let contact = self.store.insert(NewContact::primary(observation)).await?;
            tracing::debug!("No match for {:?}/{:?}, created primary {}", email, phone, contact.id);
            return Ok(Resolution {
                primary: contact.clone(),
                cluster: vec![contact],
            });
        }

        let mut primaries = self.cluster_primaries(&matches).await?;

        if primaries.len() > 1 {
            primaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            let survivor = primaries.remove(0);
            let losers: Vec<ContactId> = primaries.iter().map(|p| p.id).collect();

            tracing::info!("Merging clusters {:?} into primary {}", losers, survivor.id);
            let cluster = self
                .store
                .merge_clusters(survivor.id, &losers, email, phone)
                .await?;
            return Ok(Resolution {
                primary: survivor,
                cluster,
            });
        }

        let primary = primaries.remove(0);
        let primary_id = primary.root_id();

        if !self.store.exists_exact(email, phone).await? {
            let contact = self
                .store
                .insert(NewContact::secondary(observation, primary_id))
                .await?;
            tracing::debug!("Linked new secondary {} to primary {}", contact.id, primary_id);
        }

        let cluster = self.store.find_matches(email, phone, Some(primary_id)).await?;
        Ok(Resolution { primary, cluster })
    }

    /// Distinct primaries of every cluster the matches belong to.
    ///
    /// Primaries present in the matches are used directly; any other root
    /// is looked up, and a root that is not a live primary is an integrity
    /// fault.
    async fn cluster_primaries(&self, matches: &[Contact]) -> Result<Vec<Contact>> {
        let roots: BTreeSet<ContactId> = matches.iter().map(Contact::root_id).collect();
        let mut primaries = Vec::with_capacity(roots.len());

        for root in roots {
            if let Some(found) = matches.iter().find(|c| c.id == root && c.is_primary()) {
                primaries.push(found.clone());
                continue;
            }

            match self.store.find_primary_by_id(root).await? {
                Some(primary) => primaries.push(primary),
                None => {
                    let contact_id = matches
                        .iter()
                        .find(|c| c.root_id() == root)
                        .map(|c| c.id)
                        .unwrap_or(root);
                    tracing::error!(
                        "Contact {} links to {}, which is not a primary contact",
                        contact_id,
                        root
                    );
                    return Err(Error::Integrity {
                        contact_id,
                        linked_id: root,
                    });
                }
            }
        }

        Ok(primaries)
    }
}
