//! Cross-device sync of the seen list.
//!
//! The engine reconciles the local [`SeenStore`] with one remote document by
//! set union. Codes are only ever added by a merge: a code removed on one
//! device reappears if another device still has it.
//!
//! Identity: an anonymous identity is obtained once and kept under
//! `syncIdentity`. A short alias (`ABC123`) is reserved for it so a second
//! device can link by typing six characters. A linked device stores the
//! peer identity under `targetUserId` and reads and writes the peer's
//! document instead of its own.
//!
//! Concurrency: at most one push runs at a time. Snapshots that arrive while
//! a push is in flight are dropped; the snapshot produced by that push's own
//! write brings in anything they carried.

pub mod alias;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use jiff::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{KennzeichenError, Result};
use crate::reactive::ListenerId;
use crate::remote::{RemoteDocument, RemoteStore};
use crate::seen::{ChangeOrigin, SeenStore};
use crate::storage::{KeyValueStore, keys};

/// How many random aliases are tried before giving up.
pub const MAX_ALIAS_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Offline,
    Syncing,
    Synced,
    Error,
}

enum_display_fromstr!(
    SyncStatus,
    KennzeichenError::InvalidSyncStatus,
    {
        Offline => "offline",
        Syncing => "syncing",
        Synced => "synced",
        Error => "error",
    }
);

/// Holds the in-flight flag for one push. Dropping it clears the flag, so an
/// aborted push task cannot leave it set.
struct PushGuard<'a>(&'a AtomicBool);

impl<'a> PushGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then_some(Self(flag))
    }
}

impl Drop for PushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What applying a remote snapshot did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PullOutcome {
    /// Codes added to the local store.
    pub added: usize,
    /// The remote document lacks codes the local store has.
    pub remote_behind: bool,
    /// Dropped because a push was in flight.
    pub ignored: bool,
}

#[derive(Default)]
struct Tasks {
    listener: Option<ListenerId>,
    push: Option<JoinHandle<()>>,
    pull: Option<JoinHandle<()>>,
}

pub struct SyncEngine {
    seen: Arc<SeenStore>,
    storage: Arc<dyn KeyValueStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    identity: Mutex<Option<String>>,
    syncing: AtomicBool,
    status: watch::Sender<SyncStatus>,
    last_sync: watch::Sender<Option<Timestamp>>,
    alias: watch::Sender<Option<String>>,
    tasks: Mutex<Tasks>,
}

impl SyncEngine {
    /// Build an engine. `remote: None` is offline mode: every operation is a
    /// no-op and the status stays `offline`.
    pub fn new(
        seen: Arc<SeenStore>,
        storage: Arc<dyn KeyValueStore>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Arc<Self> {
        let stored_alias = read_key(storage.as_ref(), keys::SYNC_ALIAS);
        Arc::new(Self {
            seen,
            storage,
            remote,
            identity: Mutex::new(None),
            syncing: AtomicBool::new(false),
            status: watch::channel(SyncStatus::Offline).0,
            last_sync: watch::channel(None).0,
            alias: watch::channel(stored_alias).0,
            tasks: Mutex::new(Tasks::default()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// Configured and signed in.
    pub fn is_enabled(&self) -> bool {
        self.remote.is_some() && self.identity.lock().is_some()
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn last_sync(&self) -> Option<Timestamp> {
        *self.last_sync.borrow()
    }

    pub fn subscribe_last_sync(&self) -> watch::Receiver<Option<Timestamp>> {
        self.last_sync.subscribe()
    }

    pub fn alias(&self) -> Option<String> {
        self.alias.borrow().clone()
    }

    pub fn subscribe_alias(&self) -> watch::Receiver<Option<String>> {
        self.alias.subscribe()
    }

    /// This device's identity, for pairing by full id.
    pub fn export_identity(&self) -> Option<String> {
        self.identity.lock().clone()
    }

    /// The identity of the document being synced: the linked peer if any,
    /// otherwise our own.
    pub fn target_id(&self) -> Option<String> {
        read_key(self.storage.as_ref(), keys::SYNC_TARGET).or_else(|| self.export_identity())
    }

    /// Sign in, reserve an alias, start listening and push once.
    ///
    /// Returns false in offline mode or when sign-in fails; the local store
    /// keeps working either way.
    pub async fn start(self: &Arc<Self>) -> bool {
        let Some(remote) = self.remote.clone() else {
            tracing::info!("sync not configured, running offline");
            self.status.send_replace(SyncStatus::Offline);
            return false;
        };

        let existing = read_key(self.storage.as_ref(), keys::SYNC_IDENTITY);
        let identity = match remote.sign_in_anonymously(existing.as_deref()).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!("sync sign-in failed: {e}");
                self.status.send_replace(SyncStatus::Error);
                return false;
            }
        };
        if existing.as_deref() != Some(identity.as_str())
            && let Err(e) = self.storage.set(keys::SYNC_IDENTITY, &identity)
        {
            tracing::warn!("failed to persist sync identity: {e}");
        }
        tracing::info!("sync signed in as {identity}");
        *self.identity.lock() = Some(identity.clone());

        self.ensure_alias(remote.as_ref(), &identity).await;
        self.spawn_push_trigger();
        self.restart_pull().await;
        self.push().await;
        true
    }

    /// Reuse the stored alias or reserve a fresh one.
    async fn ensure_alias(&self, remote: &dyn RemoteStore, identity: &str) -> Option<String> {
        if let Some(alias) = read_key(self.storage.as_ref(), keys::SYNC_ALIAS) {
            self.alias.send_replace(Some(alias.clone()));
            return Some(alias);
        }

        for attempt in 1..=MAX_ALIAS_ATTEMPTS {
            let candidate = alias::generate(&mut rand::rng());
            match remote.reserve_alias(&candidate, identity).await {
                Ok(true) => {
                    if let Err(e) = self.storage.set(keys::SYNC_ALIAS, &candidate) {
                        tracing::warn!("failed to persist sync code: {e}");
                    }
                    tracing::info!("reserved sync code {candidate}");
                    self.alias.send_replace(Some(candidate.clone()));
                    return Some(candidate);
                }
                Ok(false) => {
                    tracing::debug!("sync code {candidate} taken (attempt {attempt})");
                }
                Err(e) => {
                    tracing::warn!("failed to reserve sync code: {e}");
                    return None;
                }
            }
        }

        tracing::error!(
            "failed to generate a unique sync code after {MAX_ALIAS_ATTEMPTS} attempts"
        );
        None
    }

    /// Forward local and import changes to a single push task.
    fn spawn_push_trigger(self: &Arc<Self>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let listener = self.seen.on_change(move |change| {
            if change.origin != ChangeOrigin::Sync {
                let _ = tx.send(());
            }
        });

        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Coalesce a burst of changes into one push
                while rx.try_recv().is_ok() {}
                let Some(engine) = weak.upgrade() else {
                    break;
                };
                engine.push().await;
            }
        });

        let mut tasks = self.tasks.lock();
        if let Some(old) = tasks.listener.replace(listener) {
            self.seen.off_change(old);
        }
        if let Some(old) = tasks.push.replace(handle) {
            old.abort();
        }
    }

    /// (Re)subscribe to the target document, replacing any previous listener.
    async fn restart_pull(self: &Arc<Self>) {
        if let Some(old) = self.tasks.lock().pull.take() {
            old.abort();
        }
        let (Some(remote), Some(target)) = (self.remote.clone(), self.target_id()) else {
            return;
        };

        let mut rx = match remote.subscribe(&target).await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!("failed to listen for remote changes on {target}: {e}");
                self.status.send_replace(SyncStatus::Error);
                return;
            }
        };
        tracing::debug!("listening for remote changes on {target}");

        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            while let Some(document) = rx.recv().await {
                let Some(engine) = weak.upgrade() else {
                    break;
                };
                let outcome = engine.apply_remote_snapshot(&document);
                if outcome.remote_behind {
                    engine.push().await;
                }
            }
        });
        self.tasks.lock().pull = Some(handle);
    }

    /// Merge a remote snapshot into the local store.
    ///
    /// Ignored while a push is in flight.
    pub fn apply_remote_snapshot(&self, document: &RemoteDocument) -> PullOutcome {
        if self.syncing.load(Ordering::SeqCst) {
            tracing::debug!("ignoring remote snapshot during push");
            return PullOutcome {
                ignored: true,
                ..Default::default()
            };
        }

        let added = self
            .seen
            .merge_from_sync(document.seen_codes.iter().map(String::as_str));
        if added > 0 {
            tracing::info!("received {added} new codes from remote");
        }

        let remote: BTreeSet<&str> = document.seen_codes.iter().map(String::as_str).collect();
        let remote_behind = self
            .seen
            .list_seen_codes()
            .iter()
            .any(|code| !remote.contains(code.as_str()));

        self.last_sync.send_replace(Some(document.last_modified));
        self.status.send_replace(SyncStatus::Synced);
        PullOutcome {
            added,
            remote_behind,
            ignored: false,
        }
    }

    /// Read the remote document, union it into the local store and write the
    /// union back. A no-op when offline, not signed in or already pushing.
    pub async fn push(&self) {
        if !self.is_enabled() {
            tracing::debug!("cannot push: sync not initialized");
            return;
        }
        let (Some(remote), Some(target)) = (self.remote.clone(), self.target_id()) else {
            return;
        };
        let Some(_in_flight) = PushGuard::acquire(&self.syncing) else {
            tracing::debug!("push already in progress");
            return;
        };

        self.status.send_replace(SyncStatus::Syncing);
        match self.push_inner(remote.as_ref(), &target).await {
            Ok(count) => {
                tracing::info!("synced {count} codes to {target}");
                self.last_sync.send_replace(Some(Timestamp::now()));
                self.status.send_replace(SyncStatus::Synced);
            }
            Err(e) => {
                tracing::warn!("push to {target} failed: {e}");
                self.status.send_replace(SyncStatus::Error);
            }
        }
    }

    async fn push_inner(&self, remote: &dyn RemoteStore, target: &str) -> Result<usize> {
        if let Some(document) = remote.get_document(target).await? {
            let added = self
                .seen
                .merge_from_sync(document.seen_codes.iter().map(String::as_str));
            if added > 0 {
                tracing::info!("merged {added} codes from remote");
            }
        }

        let codes: Vec<String> = self.seen.list_seen_codes().into_iter().collect();
        let count = codes.len();
        remote
            .set_document(target, &RemoteDocument::new(codes, Timestamp::now()))
            .await?;
        Ok(count)
    }

    /// Manual "sync now".
    pub async fn sync_now(&self) {
        self.push().await;
    }

    /// Link to another device by alias or full identity. Input of alias
    /// length is resolved as an alias, case-insensitively.
    ///
    /// Returns the identity now being synced.
    pub async fn link_peer(self: &Arc<Self>, input: &str) -> Result<String> {
        let Some(remote) = self.remote.clone() else {
            return Err(KennzeichenError::SyncUnavailable(
                "no remote configured".to_string(),
            ));
        };
        let input = input.trim();
        if input.is_empty() {
            return Err(KennzeichenError::Other(
                "expected a sync code or identity".to_string(),
            ));
        }

        let target = if input.chars().count() == alias::ALIAS_LEN {
            let code = alias::normalize(input);
            remote
                .lookup_alias(&code)
                .await?
                .ok_or(KennzeichenError::AliasNotFound(code))?
        } else {
            input.to_string()
        };

        self.storage.set(keys::SYNC_TARGET, &target)?;
        tracing::info!("linked to {target}");

        if self.is_enabled() {
            self.restart_pull().await;
            self.push().await;
        }
        Ok(target)
    }

    /// Go back to syncing this device's own document.
    pub async fn unlink_peer(self: &Arc<Self>) -> Result<()> {
        self.storage.remove(keys::SYNC_TARGET)?;
        if self.is_enabled() {
            self.restart_pull().await;
            self.push().await;
        }
        Ok(())
    }

    /// Stop listening and pushing. Local state is untouched.
    pub fn stop(&self) {
        self.shutdown_tasks();
        self.status.send_replace(SyncStatus::Offline);
    }

    fn shutdown_tasks(&self) {
        let mut tasks = self.tasks.lock();
        if let Some(id) = tasks.listener.take() {
            self.seen.off_change(id);
        }
        if let Some(handle) = tasks.push.take() {
            handle.abort();
        }
        if let Some(handle) = tasks.pull.take() {
            handle.abort();
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown_tasks();
    }
}

fn read_key(storage: &dyn KeyValueStore, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(Some(value)) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("failed to read {key}: {e}");
            None
        }
    }
}
