//! The session store: the single owned copy of the current session.
//!
//! The store keeps two copies of the session, one in memory and one
//! serialized into a [`Storage`] backend, and always writes them
//! together under one lock. Consumers read snapshots with
//! [`SessionStore::get`] and learn about changes through
//! [`SessionStore::subscribe`].
//!
//! # Storage scope
//!
//! The backend models browser *session* storage: it survives a reload of
//! the same tab and disappears with it. [`MemoryStorage`] is that
//! backend for a process. Opening a second store over a clone of the same
//! `MemoryStorage` is what a page reload looks like.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use carprice_protocol::{Codec, JsonCodec, PersistedSession, STORAGE_KEY};

use crate::{Session, lock};

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// A key/value backend for the persisted session record.
///
/// Infallible by contract: a backend that cannot write should drop the
/// value, which the store then treats as "no session" on the next open.
pub trait Storage: Send + Sync + 'static {
    fn load(&self, key: &str) -> Option<Vec<u8>>;
    fn save(&self, key: &str, value: Vec<u8>);
    fn remove(&self, key: &str);
}

/// Tab-scoped in-memory storage.
///
/// Cloning shares the underlying map, so clones see each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.entries).get(key).cloned()
    }

    fn save(&self, key: &str, value: Vec<u8>) {
        lock(&self.entries).insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        lock(&self.entries).remove(key);
    }
}

/// Lets callers choose a backend at runtime (a builder holding
/// `Box<dyn Storage>`, say) and still hand it to [`SessionStore::open`].
impl Storage for Box<dyn Storage> {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: Vec<u8>) {
        (**self).save(key, value);
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

type Listener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Handle returned by [`SessionStore::subscribe`].
///
/// The listener stays registered until this handle is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called. Use
/// [`detach`](Self::detach) to keep it for the store's lifetime.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Removes the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keeps the listener registered until the store is disposed.
    pub fn detach(mut self) {
        self.listeners = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

struct StoreState {
    current: Option<Session>,
    /// Bumped by every external write ([`SessionStore::set`],
    /// [`SessionStore::dispose`]). In-flight operations capture it when
    /// they start and may only commit if it is unchanged, so a logout
    /// can't be undone by a response that arrives after it.
    epoch: u64,
}

/// Holds the current session and keeps storage and subscribers in step.
pub struct SessionStore {
    state: Mutex<StoreState>,
    listeners: Arc<Mutex<Listeners>>,
    storage: Arc<dyn Storage>,
    key: String,
}

impl SessionStore {
    /// Opens a store over `storage` using the standard key.
    pub fn open(storage: impl Storage) -> Self {
        Self::open_with_key(storage, STORAGE_KEY)
    }

    /// Opens a store, seeding it from whatever is persisted under `key`.
    ///
    /// Missing, undecodable, or half-empty records all yield an empty
    /// store. They are logged, never returned as errors.
    pub fn open_with_key(storage: impl Storage, key: impl Into<String>) -> Self {
        let key = key.into();
        let current = storage.load(&key).and_then(|bytes| {
            let restored = JsonCodec
                .decode::<PersistedSession>(&bytes)
                .map_err(|e| tracing::warn!(error = %e, "discarding unreadable session record"))
                .ok()
                .and_then(Session::from_record);
            if restored.is_none() {
                tracing::warn!(%key, "persisted session invalid, starting anonymous");
            }
            restored
        });

        if let Some(session) = &current {
            tracing::info!(subject = %session.subject(), "session restored from storage");
        }

        Self {
            state: Mutex::new(StoreState { current, epoch: 0 }),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            storage: Arc::new(storage),
            key,
        }
    }

    /// Returns a snapshot of the current session.
    pub fn get(&self) -> Option<Session> {
        lock(&self.state).current.clone()
    }

    /// Replaces the session, persists it (or clears storage on `None`),
    /// and notifies subscribers.
    ///
    /// Supersedes any login or refresh that is still in flight.
    pub fn set(&self, session: Option<Session>) {
        {
            let mut state = lock(&self.state);
            state.epoch += 1;
            self.write(&mut state, session.clone());
        }
        self.notify(session.as_ref());
    }

    /// Registers a change listener. It is called after every write with
    /// the new snapshot, outside the store's lock, so it may call back
    /// into the store.
    pub fn subscribe(
        &self,
        listener: impl Fn(Option<&Session>) + Send + Sync + 'static,
    ) -> Subscription {
        let mut listeners = lock(&self.listeners);
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Drops the in-memory session and every listener. Persisted state is
    /// left alone, so a store reopened over the same storage still sees it.
    pub fn dispose(&self) {
        {
            let mut state = lock(&self.state);
            state.epoch += 1;
            state.current = None;
        }
        lock(&self.listeners).entries.clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    // -- Conditional writes used by the lifecycle manager -----------------

    pub(crate) fn epoch(&self) -> u64 {
        lock(&self.state).epoch
    }

    /// Writes `next` only if no external write happened since `epoch`.
    pub(crate) fn commit_if_epoch(&self, epoch: u64, next: Session) -> bool {
        {
            let mut state = lock(&self.state);
            if state.epoch != epoch {
                return false;
            }
            self.write(&mut state, Some(next.clone()));
        }
        self.notify(Some(&next));
        true
    }

    /// Writes `next` only if no external write happened since `epoch`
    /// AND the current session is still `expected`.
    pub(crate) fn commit_if_current(
        &self,
        epoch: u64,
        expected: &Session,
        next: Option<Session>,
    ) -> bool {
        {
            let mut state = lock(&self.state);
            if state.epoch != epoch || state.current.as_ref() != Some(expected) {
                return false;
            }
            self.write(&mut state, next.clone());
        }
        self.notify(next.as_ref());
        true
    }

    // -- Internals ---------------------------------------------------------

    fn write(&self, state: &mut StoreState, next: Option<Session>) {
        match &next {
            Some(session) => match JsonCodec.encode(&session.to_record()) {
                Ok(bytes) => self.storage.save(&self.key, bytes),
                Err(e) => {
                    tracing::warn!(error = %e, "could not persist session");
                    self.storage.remove(&self.key);
                }
            },
            None => self.storage.remove(&self.key),
        }
        state.current = next;
    }

    fn notify(&self, session: Option<&Session>) {
        let listeners: Vec<Listener> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(session);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionStore`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn session(subject: &str, token: &str) -> Session {
        Session::new(subject, token).expect("valid session")
    }

    // =====================================================================
    // open()
    // =====================================================================

    #[test]
    fn test_open_empty_storage_starts_anonymous() {
        let store = SessionStore::open(MemoryStorage::new());
        assert!(store.get().is_none());
    }

    #[test]
    fn test_open_restores_persisted_session() {
        let storage = MemoryStorage::new();
        SessionStore::open(storage.clone()).set(Some(session("u1", "tok1")));

        // A new store over the same storage is a page reload.
        let reopened = SessionStore::open(storage);

        assert_eq!(reopened.get(), Some(session("u1", "tok1")));
    }

    #[test]
    fn test_open_corrupt_record_starts_anonymous() {
        let storage = MemoryStorage::new();
        storage.save(STORAGE_KEY, b"{not json".to_vec());

        let store = SessionStore::open(storage);

        assert!(store.get().is_none());
    }

    #[test]
    fn test_open_record_with_empty_token_starts_anonymous() {
        let storage = MemoryStorage::new();
        storage.save(
            STORAGE_KEY,
            br#"{"subject":"u1","accessToken":""}"#.to_vec(),
        );

        let store = SessionStore::open(storage);

        assert!(store.get().is_none());
    }

    #[test]
    fn test_open_with_key_ignores_other_keys() {
        let storage = MemoryStorage::new();
        SessionStore::open(storage.clone()).set(Some(session("u1", "tok1")));

        let other = SessionStore::open_with_key(storage, "other-app");

        assert!(other.get().is_none());
    }

    // =====================================================================
    // set()
    // =====================================================================

    #[test]
    fn test_set_persists_camel_case_record() {
        let storage = MemoryStorage::new();
        let store = SessionStore::open(storage.clone());

        store.set(Some(session("u1", "tok1")));

        let raw = storage.load(STORAGE_KEY).expect("record written");
        assert_eq!(raw, br#"{"subject":"u1","accessToken":"tok1"}"#.to_vec());
    }

    #[test]
    fn test_set_none_removes_persisted_record() {
        let storage = MemoryStorage::new();
        let store = SessionStore::open(storage.clone());
        store.set(Some(session("u1", "tok1")));

        store.set(None);

        assert!(store.get().is_none());
        assert!(storage.load(STORAGE_KEY).is_none());
    }

    #[test]
    fn test_set_bumps_epoch_and_blocks_stale_commit() {
        let store = SessionStore::open(MemoryStorage::new());
        let epoch = store.epoch();

        store.set(None);

        assert!(!store.commit_if_epoch(epoch, session("u1", "tok1")));
        assert!(store.get().is_none());
    }

    // =====================================================================
    // commit_if_current()
    // =====================================================================

    #[test]
    fn test_commit_if_current_rejects_replaced_session() {
        let store = SessionStore::open(MemoryStorage::new());
        let original = session("u1", "tok1");
        assert!(store.commit_if_epoch(store.epoch(), original.clone()));
        // A newer login swapped the session without an external write.
        assert!(store.commit_if_epoch(store.epoch(), session("u2", "tokB")));

        let applied =
            store.commit_if_current(store.epoch(), &original, original.with_token("tok2"));

        assert!(!applied);
        assert_eq!(store.get(), Some(session("u2", "tokB")));
    }

    // =====================================================================
    // subscribe()
    // =====================================================================

    #[test]
    fn test_subscribe_listener_sees_every_change() {
        let store = SessionStore::open(MemoryStorage::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(move |s| {
            sink.lock()
                .unwrap()
                .push(s.map(|s| s.access_token().to_owned()));
        });

        store.set(Some(session("u1", "tok1")));
        store.set(None);

        assert_eq!(*seen.lock().unwrap(), vec![Some("tok1".to_owned()), None]);
    }

    #[test]
    fn test_subscribe_drop_unsubscribes() {
        let store = SessionStore::open(MemoryStorage::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set(None);
        sub.unsubscribe();
        store.set(None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_subscribe_detach_keeps_listener() {
        let store = SessionStore::open(MemoryStorage::new());
        store.subscribe(|_| {}).detach();
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn test_subscribe_listener_can_read_store() {
        let store = Arc::new(SessionStore::open(MemoryStorage::new()));
        let observed = Arc::new(Mutex::new(None));
        let (inner, sink) = (Arc::clone(&store), Arc::clone(&observed));
        let _sub = store.subscribe(move |_| {
            *sink.lock().unwrap() = inner.get();
        });

        store.set(Some(session("u1", "tok1")));

        assert_eq!(*observed.lock().unwrap(), Some(session("u1", "tok1")));
    }

    // =====================================================================
    // dispose()
    // =====================================================================

    #[test]
    fn test_dispose_clears_memory_but_not_storage() {
        let storage = MemoryStorage::new();
        let store = SessionStore::open(storage.clone());
        store.set(Some(session("u1", "tok1")));
        store.subscribe(|_| {}).detach();

        store.dispose();

        assert!(store.get().is_none());
        assert_eq!(store.listener_count(), 0);
        assert_eq!(
            SessionStore::open(storage).get(),
            Some(session("u1", "tok1"))
        );
    }
}
