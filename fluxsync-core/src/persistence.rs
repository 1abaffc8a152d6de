//! Record storage keyed by local id
//!
//! Every model carries a stable [`LocalId`] assigned on first insert and an
//! optional server-assigned [`RemoteId`]. Site-scoped records also carry the
//! local id of their site. Once synced, a `(site, remote id)` pair maps to at
//! most one record.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub i64);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted record
pub trait Model: Clone + fmt::Debug + Send + Sync + 'static {
    /// `LocalId::default()` (zero) until the record is first stored
    fn local_id(&self) -> LocalId;
    fn set_local_id(&mut self, id: LocalId);
    fn remote_id(&self) -> Option<RemoteId>;

    /// Local id of the owning site; records that are not site-scoped use the default
    fn local_site_id(&self) -> LocalId {
        LocalId::default()
    }
}

/// Storage for one model type
pub trait Persistence<M: Model>: Send {
    /// Insert or update, returning the stored record's local id.
    ///
    /// A record whose local id is already stored replaces it. Otherwise a
    /// record with a remote id replaces the row holding the same
    /// `(site, remote id)`, keeping that row's local id. Anything else is
    /// inserted under a fresh local id.
    fn upsert(&mut self, model: M) -> LocalId;

    fn get_by_id(&self, id: LocalId) -> Option<M>;

    fn get_by_remote_id(&self, site: LocalId, remote: RemoteId) -> Option<M>;

    /// All records for `site`, ordered by local id
    fn get_all_for_site(&self, site: LocalId) -> Vec<M>;

    fn remove_by_id(&mut self, id: LocalId) -> Option<M>;

    /// Returns the number of records removed
    fn remove_all_for_site(&mut self, site: LocalId) -> usize;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`Persistence`] implementation
#[derive(Debug, Clone)]
pub struct MemoryTable<M> {
    rows: BTreeMap<LocalId, M>,
    by_remote: HashMap<(LocalId, RemoteId), LocalId>,
    next_id: u64,
}

impl<M> Default for MemoryTable<M> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            by_remote: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<M: Model> MemoryTable<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &M> {
        self.rows.values()
    }

    /// Remove every record matching `predicate`, returning how many went
    pub fn remove_where(&mut self, predicate: impl Fn(&M) -> bool) -> usize {
        let doomed: Vec<LocalId> = self
            .rows
            .iter()
            .filter(|(_, row)| predicate(row))
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            self.remove_by_id(*id);
        }
        doomed.len()
    }

    fn allocate(&mut self) -> LocalId {
        let id = LocalId(self.next_id);
        self.next_id += 1;
        id
    }

    fn unindex(&mut self, row: &M) {
        if let Some(remote) = row.remote_id() {
            let key = (row.local_site_id(), remote);
            if self.by_remote.get(&key) == Some(&row.local_id()) {
                self.by_remote.remove(&key);
            }
        }
    }
}

impl<M: Model> Persistence<M> for MemoryTable<M> {
    fn upsert(&mut self, mut model: M) -> LocalId {
        let by_local = Some(model.local_id())
            .filter(|id| self.rows.contains_key(id));
        let by_remote = model
            .remote_id()
            .and_then(|remote| self.by_remote.get(&(model.local_site_id(), remote)).copied());

        let id = match (by_local, by_remote) {
            (Some(local), Some(other)) if local != other => {
                // The record just learned a remote id another row already holds
                self.remove_by_id(other);
                local
            }
            (Some(local), _) => local,
            (None, Some(remote)) => remote,
            (None, None) => self.allocate(),
        };

        if let Some(previous) = self.rows.remove(&id) {
            self.unindex(&previous);
        }
        model.set_local_id(id);
        if let Some(remote) = model.remote_id() {
            self.by_remote.insert((model.local_site_id(), remote), id);
        }
        self.rows.insert(id, model);
        id
    }

    fn get_by_id(&self, id: LocalId) -> Option<M> {
        self.rows.get(&id).cloned()
    }

    fn get_by_remote_id(&self, site: LocalId, remote: RemoteId) -> Option<M> {
        self.by_remote
            .get(&(site, remote))
            .and_then(|id| self.rows.get(id))
            .cloned()
    }

    fn get_all_for_site(&self, site: LocalId) -> Vec<M> {
        self.rows
            .values()
            .filter(|row| row.local_site_id() == site)
            .cloned()
            .collect()
    }

    fn remove_by_id(&mut self, id: LocalId) -> Option<M> {
        let row = self.rows.remove(&id)?;
        self.unindex(&row);
        Some(row)
    }

    fn remove_all_for_site(&mut self, site: LocalId) -> usize {
        self.remove_where(|row| row.local_site_id() == site)
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.by_remote.clear();
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: LocalId,
        site: LocalId,
        remote: Option<RemoteId>,
        body: String,
    }

    impl Note {
        fn new(site: u64, remote: Option<i64>, body: &str) -> Self {
            Self {
                id: LocalId::default(),
                site: LocalId(site),
                remote: remote.map(RemoteId),
                body: body.into(),
            }
        }
    }

    impl Model for Note {
        fn local_id(&self) -> LocalId {
            self.id
        }
        fn set_local_id(&mut self, id: LocalId) {
            self.id = id;
        }
        fn remote_id(&self) -> Option<RemoteId> {
            self.remote
        }
        fn local_site_id(&self) -> LocalId {
            self.site
        }
    }

    #[test]
    fn test_upsert_assigns_local_ids() {
        let mut table = MemoryTable::new();
        let a = table.upsert(Note::new(1, None, "draft"));
        let b = table.upsert(Note::new(1, None, "another draft"));

        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_by_id(a).unwrap().local_id(), a);
    }

    #[test]
    fn test_upsert_same_remote_is_idempotent() {
        let mut table = MemoryTable::new();
        let first = table.upsert(Note::new(1, Some(42), "v1"));
        let second = table.upsert(Note::new(1, Some(42), "v1"));

        assert_eq!(first, second);
        assert_eq!(table.len(), 1);

        table.upsert(Note::new(1, Some(42), "v2"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_by_remote_id(LocalId(1), RemoteId(42)).unwrap().body, "v2");
    }

    #[test]
    fn test_same_remote_on_different_sites() {
        let mut table = MemoryTable::new();
        table.upsert(Note::new(1, Some(7), "site one"));
        table.upsert(Note::new(2, Some(7), "site two"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get_all_for_site(LocalId(2)).len(), 1);
    }

    #[test]
    fn test_local_record_gains_remote_id() {
        let mut table = MemoryTable::new();
        let id = table.upsert(Note::new(1, None, "draft"));

        let mut pushed = table.get_by_id(id).unwrap();
        pushed.remote = Some(RemoteId(99));
        assert_eq!(table.upsert(pushed), id);

        // A later fetch of the same remote record lands on the same row
        assert_eq!(table.upsert(Note::new(1, Some(99), "fetched")), id);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_local_record_takes_over_duplicate_remote() {
        let mut table = MemoryTable::new();
        let fetched = table.upsert(Note::new(1, Some(5), "fetched"));
        let draft = table.upsert(Note::new(1, None, "draft"));

        let mut pushed = table.get_by_id(draft).unwrap();
        pushed.remote = Some(RemoteId(5));
        table.upsert(pushed);

        assert_eq!(table.len(), 1);
        assert!(table.get_by_id(fetched).is_none());
        assert_eq!(table.get_by_remote_id(LocalId(1), RemoteId(5)).unwrap().id, draft);
    }

    #[test]
    fn test_remove() {
        let mut table = MemoryTable::new();
        let a = table.upsert(Note::new(1, Some(1), "a"));
        table.upsert(Note::new(1, Some(2), "b"));
        table.upsert(Note::new(2, Some(3), "c"));

        assert!(table.remove_by_id(a).is_some());
        assert!(table.remove_by_id(a).is_none());
        assert!(table.get_by_remote_id(LocalId(1), RemoteId(1)).is_none());

        assert_eq!(table.remove_all_for_site(LocalId(1)), 1);
        assert_eq!(table.len(), 1);

        table.clear();
        assert!(table.is_empty());
    }
}
