//! Per-client draw-without-replacement state
//!
//! Each client holds one shuffled permutation of item indices per category.
//! Draws consume the permutation front to back; the draw that empties it
//! reshuffles before returning, so the next caller always sees a full run.
//!
//! Locking: the map sits behind an `RwLock` that is only held for lookups,
//! inserts and removals. Draws lock the client's own record, so different
//! clients never wait on each other and same-client draws/removals serialize.

use crate::core::content::{Category, ITEMS_PER_CATEGORY};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Source of permutations
///
/// Injected into the table so cycling order is reproducible under test.
pub trait Shuffler: Send + Sync {
    fn shuffle(&self, indices: &mut [usize]);
}

/// Thread-local OS-seeded RNG, no shared state between callers
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngShuffler;

impl Shuffler for ThreadRngShuffler {
    fn shuffle(&self, indices: &mut [usize]) {
        indices.shuffle(&mut rand::thread_rng());
    }
}

/// Deterministic shuffler for tests and reproducible runs
#[derive(Debug)]
pub struct SeededShuffler {
    rng: Mutex<StdRng>,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Shuffler for SeededShuffler {
    fn shuffle(&self, indices: &mut [usize]) {
        indices.shuffle(&mut *self.rng.lock());
    }
}

/// Result of a single draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    /// Item index within the category
    pub index: usize,
    /// This draw finished a run and the permutation was regenerated
    pub cycle_complete: bool,
    /// The client record was created for this draw
    pub first_contact: bool,
}

/// Remaining permutation for one (client, category) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleState {
    order: [usize; ITEMS_PER_CATEGORY],
    next: usize,
}

impl CycleState {
    /// Fresh full permutation
    pub fn shuffled(shuffler: &dyn Shuffler) -> Self {
        let mut order: [usize; ITEMS_PER_CATEGORY] = std::array::from_fn(|i| i);
        shuffler.shuffle(&mut order);
        Self { order, next: 0 }
    }

    /// Pop the front index, regenerating once the run is exhausted
    pub fn draw(&mut self, shuffler: &dyn Shuffler) -> (usize, bool) {
        let index = self.order[self.next];
        self.next += 1;

        let exhausted = self.next == ITEMS_PER_CATEGORY;
        if exhausted {
            *self = Self::shuffled(shuffler);
        }
        (index, exhausted)
    }

    /// Indices not yet drawn in the current run, in draw order
    pub fn remaining(&self) -> &[usize] {
        &self.order[self.next..]
    }
}

/// Cycling state for one client, one `CycleState` per category
#[derive(Debug, Clone)]
pub struct ClientRecord {
    cycles: [CycleState; 2],
}

impl ClientRecord {
    fn new(shuffler: &dyn Shuffler) -> Self {
        Self {
            cycles: [CycleState::shuffled(shuffler), CycleState::shuffled(shuffler)],
        }
    }

    pub fn cycle(&self, category: Category) -> &CycleState {
        &self.cycles[category.slot()]
    }
}

type RecordHandle = Arc<Mutex<ClientRecord>>;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("No cycle state for client {0}")]
    UnknownClient(Uuid),
}

/// Client token -> cycling state
pub struct CycleTable {
    records: RwLock<HashMap<Uuid, RecordHandle>>,
    shuffler: Arc<dyn Shuffler>,
}

impl CycleTable {
    /// Table backed by the thread-local RNG
    pub fn new() -> Self {
        Self::with_shuffler(Arc::new(ThreadRngShuffler))
    }

    pub fn with_shuffler(shuffler: Arc<dyn Shuffler>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            shuffler,
        }
    }

    /// Deterministic table; same seed and call order give the same draws
    pub fn seeded(seed: u64) -> Self {
        Self::with_shuffler(Arc::new(SeededShuffler::new(seed)))
    }

    /// Get-or-create the record for `id`
    fn record(&self, id: Uuid) -> (RecordHandle, bool) {
        if let Some(record) = self.records.read().get(&id) {
            return (Arc::clone(record), false);
        }

        // Re-check under the write lock: another connection may have won the race
        let mut records = self.records.write();
        let mut created = false;
        let record = records.entry(id).or_insert_with(|| {
            created = true;
            Arc::new(Mutex::new(ClientRecord::new(&*self.shuffler)))
        });
        (Arc::clone(record), created)
    }

    /// Create a record for `id` unless one exists. Returns true if created.
    pub fn ensure(&self, id: Uuid) -> bool {
        self.record(id).1
    }

    /// Draw the next index for an existing client
    pub fn draw(&self, id: Uuid, category: Category) -> Result<Draw, CycleError> {
        let record = self
            .records
            .read()
            .get(&id)
            .cloned()
            .ok_or(CycleError::UnknownClient(id))?;
        Ok(self.draw_from(&record, category, false))
    }

    /// Ensure and draw against the same record
    ///
    /// A departure racing with this call cannot make the draw fail; the draw
    /// lands on the record that was current when it was looked up.
    pub fn next_index(&self, id: Uuid, category: Category) -> Draw {
        let (record, created) = self.record(id);
        self.draw_from(&record, category, created)
    }

    fn draw_from(&self, record: &RecordHandle, category: Category, first_contact: bool) -> Draw {
        let mut record = record.lock();
        let (index, cycle_complete) = record.cycles[category.slot()].draw(&*self.shuffler);
        Draw {
            index,
            cycle_complete,
            first_contact,
        }
    }

    /// Drop the record for `id`. Returns true if one existed.
    pub fn remove(&self, id: Uuid) -> bool {
        self.records.write().remove(&id).is_some()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records.read().contains_key(&id)
    }

    /// Snapshot of a client's record
    pub fn get(&self, id: Uuid) -> Option<ClientRecord> {
        let record = self.records.read().get(&id).cloned()?;
        let snapshot = record.lock().clone();
        Some(snapshot)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for CycleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CycleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleTable")
            .field("clients", &self.len())
            .finish_non_exhaustive()
    }
}
