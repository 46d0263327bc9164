//! Ordered, byte-keyed key-value store abstraction, with a scoped write
//! transaction guaranteeing release (commit or rollback) on every exit path.

/// Ordered bytes-to-bytes map, consumed from the host.
///
/// `prefix_iterate` returns entries in ascending key order; it is
/// collected into a `Vec` rather than a lazy iterator so the trait stays
/// object-safe — every prefix scanned by this module (a single asset's
/// snapshots, a single nonce namespace) is bounded in size by the
/// module's own retention rules.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn set(&mut self, key: &[u8], value: Vec<u8>);
    fn delete(&mut self, key: &[u8]);
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
    fn prefix_iterate(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// A scoped handle staging writes against a [`KvStore`], applied atomically
/// on [`StoreTx::commit`] and silently discarded otherwise.
///
/// Every store-mutating operation in this module acquires one of these and
/// lets it drop uncommitted on any early return, so a failed handler never
/// leaves a partial write visible — the transaction-scoped rollback
/// required by the concurrency model.
pub struct StoreTx<'a> {
    store: &'a mut dyn KvStore,
    sets: Vec<(Vec<u8>, Vec<u8>)>,
    deletes: Vec<Vec<u8>>,
    committed: bool,
}

impl<'a> StoreTx<'a> {
    pub fn begin(store: &'a mut dyn KvStore) -> Self {
        StoreTx {
            store,
            sets: Vec::new(),
            deletes: Vec::new(),
            committed: false,
        }
    }

    /// Reads see the underlying store plus any writes already staged in
    /// this same transaction.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(pos) = self.deletes.iter().rposition(|k| k == key) {
            if self.sets.iter().skip(pos).all(|(k, _)| k != key) {
                return None;
            }
        }
        if let Some((_, v)) = self.sets.iter().rev().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        self.store.get(key)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: Vec<u8>) {
        self.sets.push((key.into(), value));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.deletes.push(key.into());
    }

    pub fn prefix_iterate(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: Vec<(Vec<u8>, Vec<u8>)> = self
            .store
            .prefix_iterate(prefix)
            .into_iter()
            .filter(|(k, _)| !self.deletes.contains(k))
            .collect();
        for (k, v) in &self.sets {
            if k.starts_with(prefix) {
                merged.retain(|(existing, _)| existing != k);
                merged.push((k.clone(), v.clone()));
            }
        }
        merged.sort_by(|a, b| a.0.cmp(&b.0));
        merged
    }

    /// Apply every staged write to the underlying store. Consumes `self`
    /// so a transaction can only be committed once.
    pub fn commit(mut self) {
        for key in std::mem::take(&mut self.deletes) {
            self.store.delete(&key);
        }
        for (key, value) in std::mem::take(&mut self.sets) {
            self.store.set(&key, value);
        }
        self.committed = true;
    }
}

impl Drop for StoreTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(
                staged_sets = self.sets.len(),
                staged_deletes = self.deletes.len(),
                "oracle store transaction dropped without commit; writes discarded"
            );
        }
    }
}

/// A simple ordered in-memory store, used by the module's own tests and as
/// the default adapter where no real backing store is wired.
#[derive(Default)]
pub struct InMemoryKvStore {
    data: std::collections::BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.data.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    fn prefix_iterate(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
