//! Remote document store used by the sync engine.
//!
//! The store holds two collections: one document per identity (`users/{id}`)
//! carrying the shared seen list, and one alias record per short code
//! (`shortCodes/{alias}`) pointing back at an identity.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

/// The shared seen list for one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    #[serde(default)]
    pub seen_codes: Vec<String>,
    #[serde(default = "epoch")]
    pub last_modified: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

fn epoch() -> Timestamp {
    Timestamp::UNIX_EPOCH
}

impl RemoteDocument {
    pub fn new(seen_codes: Vec<String>, last_modified: Timestamp) -> Self {
        Self {
            seen_codes,
            last_modified,
            device_info: Some(DeviceInfo::current()),
        }
    }
}

/// Informational only; never read back by the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
}

impl DeviceInfo {
    pub fn current() -> Self {
        Self {
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

/// `shortCodes/{alias}` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasRecord {
    pub user_id: String,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Obtain an identity, reusing `existing` when the store still accepts it.
    async fn sign_in_anonymously(&self, existing: Option<&str>) -> Result<String>;

    async fn get_document(&self, id: &str) -> Result<Option<RemoteDocument>>;

    /// Overwrite the whole document.
    async fn set_document(&self, id: &str, document: &RemoteDocument) -> Result<()>;

    /// Resolve an alias to the identity it was reserved for.
    async fn lookup_alias(&self, alias: &str) -> Result<Option<String>>;

    /// Create the alias record if absent. Returns false when it is taken.
    async fn reserve_alias(&self, alias: &str, id: &str) -> Result<bool>;

    /// Live snapshots of a document. The current document, if any, is sent
    /// first. Dropping the receiver ends the subscription.
    async fn subscribe(&self, id: &str) -> Result<mpsc::Receiver<RemoteDocument>>;
}
