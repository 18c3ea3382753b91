//! Seen-state store: which codes the user has spotted, and when.
//!
//! The in-memory map is authoritative for the session. Every mutation is
//! written through to the [`KeyValueStore`]; a failed write is logged and the
//! session carries on with the in-memory view. Change events are emitted after
//! the write has been attempted.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use jiff::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KennzeichenError, Result};
use crate::reactive::{EventEmitter, ListenerId};
use crate::storage::{KeyValueStore, keys};

/// Default number of entries returned by [`SeenStore::recently_seen`].
pub const DEFAULT_RECENT_LIMIT: usize = 10;

pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenEntry {
    pub code: String,
    pub seen_at: Timestamp,
}

/// What caused a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Import,
    Sync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenChange {
    pub codes: BTreeSet<String>,
    pub origin: ChangeOrigin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
}

pub struct SeenStore {
    storage: Arc<dyn KeyValueStore>,
    entries: Mutex<HashMap<String, Timestamp>>,
    changes: EventEmitter<SeenChange>,
    clock: Clock,
}

impl SeenStore {
    /// Open the store, loading whatever is persisted under the seen key.
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(storage, Arc::new(Timestamp::now))
    }

    pub fn with_clock(storage: Arc<dyn KeyValueStore>, clock: Clock) -> Self {
        let entries = load_entries(storage.as_ref());
        Self {
            storage,
            entries: Mutex::new(entries),
            changes: EventEmitter::new(),
            clock,
        }
    }

    pub fn on_change(&self, callback: impl Fn(&SeenChange) + Send + Sync + 'static) -> ListenerId {
        self.changes.on(callback)
    }

    pub fn off_change(&self, id: ListenerId) {
        self.changes.off(id);
    }

    /// Mark a code as seen now. Re-marking refreshes the timestamp.
    pub fn mark_seen(&self, code: &str) {
        let now = (self.clock)();
        self.mutate(ChangeOrigin::Local, |entries| {
            entries.insert(code.to_string(), now);
        });
    }

    /// Forget a code. Absent codes are a no-op (a change event is still emitted).
    pub fn unsee(&self, code: &str) {
        self.mutate(ChangeOrigin::Local, |entries| {
            entries.remove(code);
        });
    }

    /// Flip the seen state of a code, returning the new state.
    pub fn toggle(&self, code: &str) -> bool {
        if self.is_seen(code) {
            self.unsee(code);
            false
        } else {
            self.mark_seen(code);
            true
        }
    }

    pub fn clear(&self) {
        self.mutate(ChangeOrigin::Local, |entries| entries.clear());
    }

    pub fn is_seen(&self, code: &str) -> bool {
        self.entries.lock().contains_key(code)
    }

    pub fn seen_at(&self, code: &str) -> Option<Timestamp> {
        self.entries.lock().get(code).copied()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn list_seen_codes(&self) -> BTreeSet<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// All entries, most recently seen first.
    pub fn list_seen_details(&self) -> Vec<SeenEntry> {
        let entries = self.entries.lock();
        sorted_by_recency(&entries)
    }

    pub fn recently_seen(&self, limit: usize) -> Vec<SeenEntry> {
        let mut details = self.list_seen_details();
        details.truncate(limit);
        details
    }

    /// Full snapshot in the persisted/export shape.
    pub fn export_all(&self) -> Vec<SeenEntry> {
        self.list_seen_details()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_all())?)
    }

    /// Parse an import file and merge it. The top level must be a flat array.
    pub fn import_json(&self, content: &str) -> Result<ImportResult> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| KennzeichenError::InvalidImport(format!("not valid JSON: {e}")))?;
        let Value::Array(items) = value else {
            return Err(KennzeichenError::InvalidImport(
                "expected a JSON array of seen entries".to_string(),
            ));
        };
        if items.iter().any(Value::is_array) {
            return Err(KennzeichenError::InvalidImport(
                "nested arrays are not supported".to_string(),
            ));
        }
        Ok(self.import_merge(&items))
    }

    /// Merge imported entries. Existing local entries always win; malformed
    /// entries are skipped and counted.
    pub fn import_merge(&self, items: &[Value]) -> ImportResult {
        let mut result = ImportResult::default();
        let mut entries = self.entries.lock();
        for item in items {
            match parse_entry(item) {
                Some(entry) if !entries.contains_key(&entry.code) => {
                    entries.insert(entry.code, entry.seen_at);
                    result.imported += 1;
                }
                _ => result.skipped += 1,
            }
        }

        if result.imported == 0 {
            return result;
        }
        self.persist(&entries);
        let codes = entries.keys().cloned().collect();
        drop(entries);

        tracing::info!(
            "imported {} seen entries, skipped {}",
            result.imported,
            result.skipped
        );
        self.changes.emit(&SeenChange {
            codes,
            origin: ChangeOrigin::Import,
        });
        result
    }

    /// Replace the live set with `codes`, keeping known timestamps for codes
    /// that survive. New codes are stamped with the current time.
    pub fn replace_all<I, S>(&self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = (self.clock)();
        let incoming: Vec<String> = codes.into_iter().map(Into::into).collect();
        self.mutate(ChangeOrigin::Sync, |entries| {
            let mut replaced = HashMap::with_capacity(incoming.len());
            for code in incoming {
                let seen_at = entries.get(&code).copied().unwrap_or(now);
                replaced.insert(code, seen_at);
            }
            *entries = replaced;
        });
    }

    /// Union `codes` into the live set under one lock. Returns how many were
    /// new; emits a sync change only when that is non-zero.
    pub fn merge_from_sync<'a>(&self, codes: impl IntoIterator<Item = &'a str>) -> usize {
        let now = (self.clock)();
        let (added, snapshot) = {
            let mut entries = self.entries.lock();
            let mut added = 0;
            for code in codes {
                if code.is_empty() || entries.contains_key(code) {
                    continue;
                }
                entries.insert(code.to_string(), now);
                added += 1;
            }
            if added > 0 {
                self.persist(&entries);
            }
            (added, entries.keys().cloned().collect::<BTreeSet<_>>())
        };
        if added > 0 {
            self.changes.emit(&SeenChange {
                codes: snapshot,
                origin: ChangeOrigin::Sync,
            });
        }
        added
    }

    fn mutate(&self, origin: ChangeOrigin, f: impl FnOnce(&mut HashMap<String, Timestamp>)) {
        let codes = {
            let mut entries = self.entries.lock();
            f(&mut entries);
            self.persist(&entries);
            entries.keys().cloned().collect()
        };
        self.changes.emit(&SeenChange { codes, origin });
    }

    fn persist(&self, entries: &HashMap<String, Timestamp>) {
        let snapshot = sorted_by_recency(entries);
        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Error serializing seen codes: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set(keys::SEEN, &json) {
            tracing::warn!("Error saving seen codes, keeping in-memory state: {e}");
        }
    }
}

fn sorted_by_recency(entries: &HashMap<String, Timestamp>) -> Vec<SeenEntry> {
    let mut list: Vec<SeenEntry> = entries
        .iter()
        .map(|(code, seen_at)| SeenEntry {
            code: code.clone(),
            seen_at: *seen_at,
        })
        .collect();
    list.sort_by(|a, b| b.seen_at.cmp(&a.seen_at).then_with(|| a.code.cmp(&b.code)));
    list
}

/// Lenient entry parsing: `code` must be a non-empty string and `seenAt` a
/// parseable timestamp.
fn parse_entry(item: &Value) -> Option<SeenEntry> {
    let code = item.get("code")?.as_str()?.trim();
    if code.is_empty() {
        return None;
    }
    let seen_at: Timestamp = item.get("seenAt")?.as_str()?.parse().ok()?;
    Some(SeenEntry {
        code: code.to_string(),
        seen_at,
    })
}

fn load_entries(storage: &dyn KeyValueStore) -> HashMap<String, Timestamp> {
    let mut entries = HashMap::new();
    let content = match storage.get(keys::SEEN) {
        Ok(Some(content)) => content,
        Ok(None) => return entries,
        Err(e) => {
            tracing::warn!("Error loading seen codes: {e}");
            return entries;
        }
    };

    let items = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!("Persisted seen codes are not an array, ignoring");
            return entries;
        }
        Err(e) => {
            tracing::warn!("Error parsing persisted seen codes: {e}");
            return entries;
        }
    };

    for item in &items {
        match parse_entry(item) {
            Some(entry) => {
                let slot = entries.entry(entry.code).or_insert(entry.seen_at);
                if entry.seen_at > *slot {
                    *slot = entry.seen_at;
                }
            }
            None => tracing::warn!("Skipping malformed persisted seen entry: {item}"),
        }
    }
    entries
}

/// File name used for exports, e.g. `kennzeichen-seen-2025-03-01.json`.
pub fn export_file_name(date: jiff::civil::Date) -> String {
    format!("kennzeichen-seen-{date}.json")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStore;

    /// Clock that advances one second on every read.
    fn ticking_clock(start: i64) -> (Clock, Arc<AtomicI64>) {
        let seconds = Arc::new(AtomicI64::new(start));
        let handle = Arc::clone(&seconds);
        let clock: Clock = Arc::new(move || {
            let s = handle.fetch_add(1, Ordering::SeqCst);
            Timestamp::from_second(s).unwrap()
        });
        (clock, seconds)
    }

    fn store() -> SeenStore {
        let (clock, _) = ticking_clock(1_700_000_000);
        SeenStore::with_clock(Arc::new(MemoryStore::new()), clock)
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(KennzeichenError::Other("storage unavailable".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(KennzeichenError::Other("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(KennzeichenError::Other("storage unavailable".into()))
        }
    }

    #[test]
    fn test_mark_then_is_seen() {
        let store = store();
        store.mark_seen("M");
        assert!(store.is_seen("M"));
        store.unsee("M");
        assert!(!store.is_seen("M"));
        assert_eq!(store.seen_at("M"), None);
    }

    #[test]
    fn test_mark_twice_keeps_one_entry_with_later_timestamp() {
        let store = store();
        store.mark_seen("M");
        let first = store.seen_at("M").unwrap();
        store.mark_seen("M");
        let second = store.seen_at("M").unwrap();
        assert_eq!(store.count(), 1);
        assert!(second > first);
    }

    #[test]
    fn test_unsee_absent_is_noop() {
        let store = store();
        store.unsee("ZZ");
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_details_most_recent_first() {
        let store = store();
        store.mark_seen("A");
        store.mark_seen("B");
        store.mark_seen("C");
        let codes: Vec<String> = store.list_seen_details().into_iter().map(|e| e.code).collect();
        assert_eq!(codes, vec!["C", "B", "A"]);
        assert_eq!(store.recently_seen(2).len(), 2);
    }

    #[test]
    fn test_toggle_and_clear() {
        let store = store();
        assert!(store.toggle("HH"));
        assert!(!store.toggle("HH"));
        store.mark_seen("B");
        store.clear();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_change_events_carry_full_set() {
        let store = store();
        let last = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&last);
        store.on_change(move |change| {
            *sink.lock() = Some(change.clone());
        });
        store.mark_seen("B");
        store.mark_seen("M");
        let change = last.lock().clone().unwrap();
        assert_eq!(change.origin, ChangeOrigin::Local);
        assert_eq!(change.codes, BTreeSet::from(["B".to_string(), "M".to_string()]));
    }

    #[test]
    fn test_change_fires_after_write() {
        let storage = Arc::new(MemoryStore::new());
        let store = SeenStore::open(storage.clone());
        let persisted = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&persisted);
        let reader = storage.clone();
        store.on_change(move |_| {
            *sink.lock() = reader.get(keys::SEEN).unwrap();
        });

        store.mark_seen("M");

        let raw = persisted.lock().clone().expect("seen list not persisted before event");
        let entries: Vec<SeenEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].code, "M");
    }

    #[test]
    fn test_unsee_absent_still_emits() {
        let store = store();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        store.on_change(move |change| {
            assert!(change.codes.is_empty());
            counter.fetch_add(1, Ordering::SeqCst);
        });
        store.unsee("ZZ");
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_import_never_overwrites_local() {
        let store = store();
        store.mark_seen("A");
        let t1 = store.seen_at("A").unwrap();

        let result = store.import_merge(&[
            json!({"code": "A", "seenAt": "2020-01-01T00:00:00Z"}),
            json!({"code": "B", "seenAt": "2021-06-01T12:00:00Z"}),
        ]);

        assert_eq!(result, ImportResult { imported: 1, skipped: 1 });
        assert_eq!(store.seen_at("A"), Some(t1));
        assert_eq!(
            store.seen_at("B"),
            Some("2021-06-01T12:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn test_import_skips_malformed_entries() {
        let store = store();
        let result = store
            .import_json(
                r#"[
                    {"code": "B", "seenAt": "2024-01-01T00:00:00.000Z"},
                    {"code": "M"},
                    {"seenAt": "2024-01-01T00:00:00Z"},
                    {"code": "HH", "seenAt": "yesterday"},
                    42
                ]"#,
            )
            .unwrap();
        assert_eq!(result, ImportResult { imported: 1, skipped: 4 });
    }

    #[test]
    fn test_import_is_idempotent() {
        let store = store();
        let file = r#"[{"code": "B", "seenAt": "2024-01-01T00:00:00Z"}]"#;
        assert_eq!(store.import_json(file).unwrap().imported, 1);
        assert_eq!(
            store.import_json(file).unwrap(),
            ImportResult { imported: 0, skipped: 1 }
        );
    }

    #[test]
    fn test_import_rejects_non_array() {
        let store = store();
        assert!(matches!(
            store.import_json(r#"{"code": "B"}"#),
            Err(KennzeichenError::InvalidImport(_))
        ));
        assert!(matches!(
            store.import_json("[[{\"code\": \"B\"}]]"),
            Err(KennzeichenError::InvalidImport(_))
        ));
        assert!(matches!(
            store.import_json("not json"),
            Err(KennzeichenError::InvalidImport(_))
        ));
    }

    #[test]
    fn test_replace_all_preserves_known_timestamps() {
        let store = store();
        store.mark_seen("A");
        store.mark_seen("B");
        let a = store.seen_at("A").unwrap();

        store.replace_all(["A", "C"]);

        assert_eq!(store.list_seen_codes(), BTreeSet::from(["A".into(), "C".into()]));
        assert_eq!(store.seen_at("A"), Some(a));
        assert!(store.seen_at("C").is_some());
        assert!(!store.is_seen("B"));
    }

    #[test]
    fn test_merge_from_sync_only_adds() {
        let store = store();
        store.mark_seen("A");
        let a = store.seen_at("A").unwrap();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        store.on_change(move |change| {
            assert_eq!(change.origin, ChangeOrigin::Sync);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(store.merge_from_sync(["A", "B", ""]), 1);
        assert_eq!(store.merge_from_sync(["A", "B"]), 0);

        assert_eq!(store.seen_at("A"), Some(a));
        assert_eq!(store.count(), 2);
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_persisted_state_survives_reopen() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let (clock, _) = ticking_clock(1_700_000_000);
        let store = SeenStore::with_clock(Arc::clone(&storage), clock);
        store.mark_seen("M");
        let seen_at = store.seen_at("M");

        let reopened = SeenStore::open(storage);
        assert_eq!(reopened.seen_at("M"), seen_at);
    }

    #[test]
    fn test_corrupt_persisted_data_loads_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::SEEN, "{\"oops\": true}").unwrap();
        let store = SeenStore::open(storage);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_storage_failure_keeps_session_usable() {
        let store = SeenStore::open(Arc::new(FailingStore));
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.mark_seen("B");

        assert!(store.is_seen("B"));
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_export_round_trips_through_import() {
        let source = store();
        source.mark_seen("B");
        source.mark_seen("M");
        let json = source.export_json().unwrap();
        assert!(json.contains("\"seenAt\""));

        let target = store();
        let result = target.import_json(&json).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(target.seen_at("B"), source.seen_at("B"));
    }

    #[test]
    fn test_export_file_name() {
        let date = jiff::civil::date(2025, 3, 1);
        assert_eq!(export_file_name(date), "kennzeichen-seen-2025-03-01.json");
    }
}
