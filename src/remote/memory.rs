//! In-process [`RemoteStore`]: several engines sharing one `Arc<MemoryRemote>`
//! behave like devices sharing a cloud backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{AliasRecord, RemoteDocument, RemoteStore};
use crate::error::{KennzeichenError, Result};

const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Default)]
struct Inner {
    documents: HashMap<String, RemoteDocument>,
    aliases: HashMap<String, AliasRecord>,
    subscribers: HashMap<String, Vec<mpsc::Sender<RemoteDocument>>>,
}

#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
    offline: AtomicBool,
    reject_aliases: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails, as an unreachable backend would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every alias reservation report a collision.
    pub fn reject_alias_reservations(&self, reject: bool) {
        self.reject_aliases.store(reject, Ordering::SeqCst);
    }

    /// Number of successful `set_document` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn document(&self, id: &str) -> Option<RemoteDocument> {
        self.inner.lock().documents.get(id).cloned()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(KennzeichenError::Remote("remote store unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn sign_in_anonymously(&self, existing: Option<&str>) -> Result<String> {
        self.check_online()?;
        Ok(match existing {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().simple().to_string(),
        })
    }

    async fn get_document(&self, id: &str) -> Result<Option<RemoteDocument>> {
        self.check_online()?;
        Ok(self.document(id))
    }

    async fn set_document(&self, id: &str, document: &RemoteDocument) -> Result<()> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        inner.documents.insert(id.to_string(), document.clone());
        if let Some(subscribers) = inner.subscribers.get_mut(id) {
            subscribers.retain(|tx| match tx.try_send(document.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!("subscriber for {id} is lagging, dropping snapshot");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn lookup_alias(&self, alias: &str) -> Result<Option<String>> {
        self.check_online()?;
        Ok(self
            .inner
            .lock()
            .aliases
            .get(alias)
            .map(|record| record.user_id.clone()))
    }

    async fn reserve_alias(&self, alias: &str, id: &str) -> Result<bool> {
        self.check_online()?;
        if self.reject_aliases.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut inner = self.inner.lock();
        if inner.aliases.contains_key(alias) {
            return Ok(false);
        }
        inner.aliases.insert(
            alias.to_string(),
            AliasRecord {
                user_id: id.to_string(),
                created_at: Timestamp::now(),
            },
        );
        Ok(true)
    }

    async fn subscribe(&self, id: &str) -> Result<mpsc::Receiver<RemoteDocument>> {
        self.check_online()?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut inner = self.inner.lock();
        if let Some(current) = inner.documents.get(id) {
            let _ = tx.try_send(current.clone());
        }
        inner.subscribers.entry(id.to_string()).or_default().push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reserve_alias_is_create_if_absent() {
        let remote = MemoryRemote::new();
        assert!(remote.reserve_alias("ABC123", "one").await.unwrap());
        assert!(!remote.reserve_alias("ABC123", "two").await.unwrap());
        assert_eq!(
            remote.lookup_alias("ABC123").await.unwrap().as_deref(),
            Some("one")
        );
    }

    #[tokio::test]
    async fn test_subscribe_receives_current_and_later_snapshots() {
        let remote = MemoryRemote::new();
        let first = RemoteDocument::new(vec!["B".into()], Timestamp::now());
        remote.set_document("u", &first).await.unwrap();

        let mut rx = remote.subscribe("u").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().seen_codes, vec!["B"]);

        let second = RemoteDocument::new(vec!["B".into(), "M".into()], Timestamp::now());
        remote.set_document("u", &second).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().seen_codes, vec!["B", "M"]);
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        assert!(remote.sign_in_anonymously(None).await.is_err());
        assert!(remote.get_document("u").await.is_err());
        remote.set_offline(false);
        let id = remote.sign_in_anonymously(None).await.unwrap();
        assert_eq!(remote.sign_in_anonymously(Some(&id)).await.unwrap(), id);
    }
}
