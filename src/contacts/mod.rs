//! Contacts module — identity resolution over linked contact records
//!
//! Contacts sharing an email or phone number form one cluster with a
//! single primary record. The resolver extends, creates, or merges
//! clusters as observations arrive; the store keeps the records; the view
//! projects a cluster into the `/api/identify` response.

pub mod handler;
pub mod locks;
pub mod memory;
pub mod resolver;
pub mod store;
pub mod types;
pub mod view;

pub use handler::{contacts_router, ContactsState};
pub use locks::KeyLocks;
pub use memory::MemoryContactStore;
pub use resolver::{IdentityResolver, Resolution};
pub use store::ContactStore;
pub use types::{ClusterView, Contact, ContactId, LinkPrecedence, NewContact, Observation};
