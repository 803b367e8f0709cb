//! Contact types for the identity API
//!
//! Defines the stored contact record, the insert candidate, the resolver
//! input, and the wire types returned by `/api/identify`. Wire types use
//! camelCase JSON serialization.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Store-assigned contact identifier
pub type ContactId = u64;

/// Whether a contact is the canonical record of its cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    #[default]
    Primary,
    Secondary,
}

impl std::fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// A stored contact record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<ContactId>,
    pub link_precedence: LinkPrecedence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    pub fn is_secondary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Secondary
    }

    /// Id of the primary this contact belongs to (itself when primary)
    pub fn root_id(&self) -> ContactId {
        self.linked_id.unwrap_or(self.id)
    }

    /// Exact pair comparison; absent equals absent
    pub fn has_pair(&self, email: Option<&str>, phone: Option<&str>) -> bool {
        self.email.as_deref() == email && self.phone_number.as_deref() == phone
    }
}

/// Candidate for insertion; the store assigns id and timestamps
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub link_precedence: Option<LinkPrecedence>,
    pub linked_id: Option<ContactId>,
}

impl NewContact {
    /// A fresh primary for an observation nobody has seen
    pub fn primary(observation: &Observation) -> Self {
        Self {
            email: observation.email.clone(),
            phone_number: observation.phone.clone(),
            link_precedence: None,
            linked_id: None,
        }
    }

    /// A secondary carrying a new (email, phone) variant of an existing cluster
    pub fn secondary(observation: &Observation, primary_id: ContactId) -> Self {
        Self {
            email: observation.email.clone(),
            phone_number: observation.phone.clone(),
            link_precedence: Some(LinkPrecedence::Secondary),
            linked_id: Some(primary_id),
        }
    }
}

/// A single (email, phone) submission to resolve
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Observation {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Observation {
    /// Build an observation, trimming values and treating blanks as absent
    pub fn new(email: Option<String>, phone: Option<String>) -> Self {
        Self {
            email: normalize(email),
            phone: normalize(phone),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// At least one of email or phone must be present
    pub fn validate(&self) -> Result<()> {
        if self.email.is_none() && self.phone.is_none() {
            return Err(Error::InvalidInput(
                "Missing email and phoneNumber".to_string(),
            ));
        }
        Ok(())
    }

    /// Identity keys this observation touches, sorted
    pub fn identity_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(email) = &self.email {
            keys.push(format!("email:{}", email));
        }
        if let Some(phone) = &self.phone {
            keys.push(format!("phone:{}", phone));
        }
        keys.sort();
        keys
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Request body for `POST /api/identify`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone_number: Option<String>,
}

impl From<IdentifyRequest> for Observation {
    fn from(req: IdentifyRequest) -> Self {
        Observation::new(req.email, req.phone_number)
    }
}

/// Phone numbers arrive as JSON strings or bare numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

/// Deduplicated public view of one identity cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
    pub primary_contact_id: ContactId,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub secondary_contact_ids: Vec<ContactId>,
}

/// Response envelope for `POST /api/identify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub contact: ClusterView,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new("INTEGRITY_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}
