//! ContactLink - Contact identity resolution service
//!
//! ContactLink links contact records that share an email address or a
//! phone number into a single identity, even when the touchpoints arrive
//! separately and out of order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      HTTP API (axum)                     │
//! │             POST /api/identify    GET /health            │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ Observation { email, phone }
//! ┌────────────────────────────▼─────────────────────────────┐
//! │                     IdentityResolver                     │
//! │  - Per-identity-key locking                              │
//! │  - Create / extend / merge clusters                      │
//! │  - Oldest primary wins a merge                           │
//! └──────────────┬─────────────────────────────┬─────────────┘
//!                │                             │ Resolution
//! ┌──────────────▼──────────────┐   ┌──────────▼─────────────┐
//! │        ContactStore         │   │      view::project     │
//! │  - find / insert / demote   │   │  - primary values first│
//! │  - atomic merge_clusters    │   │  - deduplicated lists  │
//! └─────────────────────────────┘   └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`contacts`]: Contact model, store, resolver, and HTTP handler
//! - [`api`]: Router assembly with CORS and tracing
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod config;
pub mod contacts;
pub mod error;

pub use config::ContactLinkConfig;
pub use error::{Error, Result};
