//! Record types held by the store and their safe projections.
//!
//! Full records carry the encrypted `Envelope` and only ever travel
//! between the store and its persistence backend.  Everything handed
//! to callers for enumeration is a `*Summary`, which has no field that
//! could hold value material.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::ValueType;
use crate::crypto::Envelope;
use crate::errors::{KeyStoreError, Result};

/// Maximum length of a namespace, secret key or API key name.
const MAX_IDENT_LEN: usize = 256;

/// Returns a timestamp strictly later than `previous`.
///
/// Two writes inside one clock tick would otherwise share an
/// `updated_at`; the second is bumped by a microsecond.
pub(crate) fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Reject empty or oversized identifiers.
pub(crate) fn validate_ident(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KeyStoreError::Validation(format!("{field} cannot be empty")));
    }
    if value.len() > MAX_IDENT_LEN {
        return Err(KeyStoreError::Validation(format!(
            "{field} cannot exceed {MAX_IDENT_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Namespaced secrets
// ---------------------------------------------------------------------------

/// Identity of a namespaced secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretId {
    pub namespace: String,
    pub key: String,
}

impl SecretId {
    /// Build an identity, rejecting empty namespaces and keys.
    pub fn new(namespace: &str, key: &str) -> Result<Self> {
        validate_ident("namespace", namespace)?;
        validate_ident("key", key)?;
        Ok(Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        })
    }
}

/// A namespaced secret as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub namespace: String,
    pub key: String,
    pub envelope: Envelope,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    pub fn id(&self) -> SecretId {
        SecretId {
            namespace: self.namespace.clone(),
            key: self.key.clone(),
        }
    }

    pub fn summary(&self) -> SecretSummary {
        SecretSummary {
            namespace: self.namespace.clone(),
            key: self.key.clone(),
            value_type: self.value_type,
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Safe projection of a secret: identity, type, metadata and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSummary {
    pub namespace: String,
    pub key: String,
    pub value_type: ValueType,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

/// A named credential as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub key_name: String,
    pub key_type: String,
    pub envelope: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKeyRecord {
    pub fn summary(&self) -> ApiKeySummary {
        ApiKeySummary {
            id: self.id,
            key_name: self.key_name.clone(),
            key_type: self.key_type.clone(),
            description: self.description.clone(),
            is_active: self.is_active,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Safe projection of an API key.  Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySummary {
    pub id: Uuid,
    pub key_name: String,
    pub key_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKeySummary {
    /// Whether the key is past its expiry at `now`.
    ///
    /// The store never acts on expiry; this is for callers that do.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Input for creating an API key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub key_name: String,
    pub key_type: String,
    pub value: String,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl NewApiKey {
    /// An active key with no description and no expiry.
    pub fn new(key_name: &str, key_type: &str, value: &str) -> Self {
        Self {
            key_name: key_name.to_string(),
            key_type: key_type.to_string(),
            value: value.to_string(),
            description: None,
            expires_at: None,
            is_active: true,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A partial update of an API key.  `None` leaves a field untouched.
///
/// `description` and `expires_at` are doubly optional so they can be
/// cleared with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyUpdate {
    pub key_name: Option<String>,
    pub key_type: Option<String>,
    pub value: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

// ---------------------------------------------------------------------------
// Application profile
// ---------------------------------------------------------------------------

/// The application profile kept alongside the secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub id: Uuid,
    pub app_id: String,
    pub app_name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for replacing the application profile.
#[derive(Debug, Clone)]
pub struct NewAppSettings {
    pub app_id: String,
    pub app_name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub metadata: Option<serde_json::Value>,
}

/// A partial update of the application profile.
#[derive(Debug, Clone, Default)]
pub struct AppSettingsUpdate {
    pub app_id: Option<String>,
    pub app_name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub metadata: Option<Option<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_timestamp_is_strictly_later() {
        let far_future = Utc::now() + Duration::hours(1);
        let next = next_timestamp(Some(far_future));
        assert!(next > far_future);

        let past = Utc::now() - Duration::hours(1);
        assert!(next_timestamp(Some(past)) > past);
    }

    #[test]
    fn secret_id_rejects_empty_parts() {
        assert!(SecretId::new("app", "token").is_ok());
        assert!(matches!(
            SecretId::new("", "token"),
            Err(KeyStoreError::Validation(_))
        ));
        assert!(matches!(
            SecretId::new("app", "  "),
            Err(KeyStoreError::Validation(_))
        ));
        assert!(SecretId::new("app", &"k".repeat(MAX_IDENT_LEN + 1)).is_err());
    }

    #[test]
    fn expiry_helper() {
        let now = Utc::now();
        let summary = ApiKeySummary {
            id: Uuid::new_v4(),
            key_name: "github".into(),
            key_type: "token".into(),
            description: None,
            is_active: true,
            expires_at: Some(now - Duration::seconds(1)),
            created_at: now,
            updated_at: now,
        };
        assert!(summary.is_expired(now));
        assert!(!ApiKeySummary {
            expires_at: None,
            ..summary
        }
        .is_expired(now));
    }
}
