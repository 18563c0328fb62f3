//! Storage for fixed-window counters.
//!
//! The limiter never touches a map directly; it goes through [`RateStore`] so
//! a different backend can be dropped in without changing the pipeline.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Debug;
use std::time::Instant;

/// Hit count for one key inside its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    /// Successful hits recorded in this window.
    pub count: u32,
    /// Instant at which the window closes.
    pub reset_at: Instant,
}

impl WindowRecord {
    /// A window is over once `now` reaches `reset_at`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

/// Backend holding one [`WindowRecord`] per rate key.
pub trait RateStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<WindowRecord>;

    fn set(&self, key: &str, record: WindowRecord);

    fn delete(&self, key: &str);

    /// Run `f` against the slot for `key` while no other caller can observe or
    /// modify it. Leaving `None` in the slot removes the record.
    ///
    /// `f` is called exactly once.
    fn update(&self, key: &str, f: &mut dyn FnMut(&mut Option<WindowRecord>));

    /// Drop every record whose window has closed. Returns how many were removed.
    fn purge_expired(&self, now: Instant) -> usize;

    /// Number of live records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store on top of a sharded concurrent map.
///
/// `update` holds the shard lock for the key's entry, so two requests for the
/// same key are serialized while unrelated keys proceed in parallel.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, WindowRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<WindowRecord> {
        self.records.get(key).map(|r| *r.value())
    }

    fn set(&self, key: &str, record: WindowRecord) {
        self.records.insert(key.to_owned(), record);
    }

    fn delete(&self, key: &str) {
        self.records.remove(key);
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(&mut Option<WindowRecord>)) {
        match self.records.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(*occupied.get());
                f(&mut slot);
                match slot {
                    Some(record) => *occupied.get_mut() = record,
                    None => {
                        occupied.remove();
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                f(&mut slot);
                if let Some(record) = slot {
                    vacant.insert(record);
                }
            }
        }
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
